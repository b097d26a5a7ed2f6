//! Evaluation of transaction source condition scripts.
//!
//! A source created by a transaction output carries a condition script; the
//! transaction that later consumes it provides unlock parameters. This
//! crate parses the script and decides whether the parameters satisfy it.
//!
//! The verdict is three-valued: `Some(true)` unlocks the source,
//! `Some(false)` means the parameters address the script but fail it, and
//! `None` means the attempt is indeterminate. Indeterminate covers every
//! case where the parameters cannot be matched against the script at all:
//! a script that does not parse, more parameters than the script has
//! `SIG`/`XHX` locks, a signature parameter whose signature does not
//! verify, or a preimage hashing to no digest awaited by the script. The
//! caller treats `None` the same way as `Some(false)` for spending, but
//! the distinction is kept because indeterminate scripts must not be
//! considered "definitely locked" when sweeping accounts.

pub mod parser;

pub use parser::{parse, Condition, ParseError};

use sha2::{Digest, Sha256};

/// One signature unlock parameter, already verified against the spending
/// document by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigParam {
    /// Key that produced the signature.
    pub pubkey: String,
    /// Whether the signature itself verifies.
    pub ok: bool,
}

/// An unlock parameter provided by the consuming transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Sig(SigParam),
    /// Preimage for an `XHX` hash lock.
    Xhx(String),
}

/// Time context of the evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalContext {
    /// Median time of the block trying to consume the source.
    pub median_time: u64,
    /// Seconds elapsed since the source was written.
    pub elapsed: u64,
}

/// SHA-256 of a preimage, in the uppercase hex form scripts use.
pub fn hash_preimage(preimage: &str) -> String {
    let digest = Sha256::digest(preimage.as_bytes());
    let mut hex = [0u8; 64];
    faster_hex::hex_encode_upper(&digest, &mut hex).expect("The output is exactly twice the size of the input");
    String::from_utf8_lossy(&hex).into_owned()
}

/// Evaluates `script` against the unlock parameters.
pub fn unlock(script: &str, params: &[Param], ctx: &EvalContext) -> Option<bool> {
    let condition = parse(script).ok()?;
    if params.len() > condition.lock_count() {
        return None;
    }
    let awaited = condition.xhx_digests();
    let mut signers: Vec<&str> = Vec::new();
    let mut digests: Vec<String> = Vec::new();
    for param in params {
        match param {
            Param::Sig(sig) => {
                if !sig.ok {
                    return None;
                }
                signers.push(&sig.pubkey);
            }
            Param::Xhx(preimage) => {
                let digest = hash_preimage(preimage);
                if !awaited.contains(&digest.as_str()) {
                    return None;
                }
                digests.push(digest);
            }
        }
    }
    Some(eval(&condition, &signers, &digests, ctx))
}

fn eval(condition: &Condition, signers: &[&str], digests: &[String], ctx: &EvalContext) -> bool {
    match condition {
        Condition::Sig(pubkey) => signers.contains(&pubkey.as_str()),
        Condition::Xhx(digest) => digests.iter().any(|d| d == digest),
        Condition::Cltv(timestamp) => ctx.median_time >= *timestamp,
        Condition::Csv(seconds) => ctx.elapsed >= *seconds,
        Condition::And(l, r) => eval(l, signers, digests, ctx) && eval(r, signers, digests, ctx),
        Condition::Or(l, r) => eval(l, signers, digests, ctx) || eval(r, signers, digests, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // SHA-256 of "a" and "z".
    const HA: &str = "CA978112CA1BBDCAFAC231B39A23DC4DA786EFF8147C4E72B9807785AFEE48BB";
    const HZ: &str = "594E519AE499312B29433B7DD8A97FF068DEFCBA9755B6D5D00E84C524D67B06";

    fn sig(pubkey: &str) -> Param {
        Param::Sig(SigParam { pubkey: pubkey.into(), ok: true })
    }

    fn bad_sig(pubkey: &str) -> Param {
        Param::Sig(SigParam { pubkey: pubkey.into(), ok: false })
    }

    fn ctx() -> EvalContext {
        EvalContext::default()
    }

    #[test]
    fn sig_lock() {
        assert_eq!(unlock("SIG(A)", &[sig("A")], &ctx()), Some(true));
        // Valid signature from the wrong key: a definite no.
        assert_eq!(unlock("SIG(A)", &[sig("B")], &ctx()), Some(false));
        // Invalid signature: indeterminate.
        assert_eq!(unlock("SIG(A)", &[bad_sig("A")], &ctx()), None);
        assert_eq!(unlock("SIG(A)", &[], &ctx()), Some(false));
    }

    #[test]
    fn xhx_lock() {
        assert_eq!(unlock(&format!("XHX({HA})"), &[Param::Xhx("a".into())], &ctx()), Some(true));
        // "z" hashes to a digest the script does not await: indeterminate.
        assert_eq!(unlock(&format!("XHX({HA})"), &[Param::Xhx("z".into())], &ctx()), None);
        assert_eq!(unlock(&format!("XHX({HZ})"), &[Param::Xhx("z".into())], &ctx()), Some(true));
    }

    #[test]
    fn and_or() {
        let script = format!("SIG(A) && XHX({HA})");
        assert_eq!(unlock(&script, &[sig("A"), Param::Xhx("a".into())], &ctx()), Some(true));
        assert_eq!(unlock(&script, &[sig("A")], &ctx()), Some(false));

        let script = "SIG(A) || SIG(B)";
        assert_eq!(unlock(script, &[sig("A")], &ctx()), Some(true));
        assert_eq!(unlock(script, &[sig("B")], &ctx()), Some(true));
        assert_eq!(unlock(script, &[sig("C")], &ctx()), Some(false));
    }

    #[test]
    fn same_tier_left_associativity() {
        // (SIG(A) || SIG(B)) && SIG(C): C alone is not enough.
        let script = "SIG(A) || SIG(B) && SIG(C)";
        assert_eq!(unlock(script, &[sig("C")], &ctx()), Some(false));
        assert_eq!(unlock(script, &[sig("A"), sig("C")], &ctx()), Some(true));
    }

    #[test]
    fn time_locks() {
        let at = |median_time, elapsed| EvalContext { median_time, elapsed };
        assert_eq!(unlock("SIG(A) && CLTV(1000)", &[sig("A")], &at(999, 0)), Some(false));
        assert_eq!(unlock("SIG(A) && CLTV(1000)", &[sig("A")], &at(1000, 0)), Some(true));
        assert_eq!(unlock("SIG(A) && CSV(100)", &[sig("A")], &at(0, 99)), Some(false));
        assert_eq!(unlock("SIG(A) && CSV(100)", &[sig("A")], &at(0, 100)), Some(true));
    }

    #[test]
    fn too_many_params_is_indeterminate() {
        assert_eq!(unlock("SIG(A)", &[sig("A"), sig("A")], &ctx()), None);
        assert_eq!(unlock("CSV(1)", &[sig("A")], &ctx()), None);
    }

    #[test]
    fn unparseable_script_is_indeterminate() {
        assert_eq!(unlock("SIG(A) &&", &[sig("A")], &ctx()), None);
        assert_eq!(unlock("RANDOM(THING)", &[], &ctx()), None);
    }
}
