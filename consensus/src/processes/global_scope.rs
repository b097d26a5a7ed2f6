//! Global-scope annotation of a block's local index.
//!
//! Fills the transient verdict fields of every entry by confronting the
//! block with the ledger: document ages, uniqueness, membership state,
//! certification stock, distance, source availability and lock
//! evaluation. The rule pass afterwards only reads these verdicts.

use crate::processes::distance::people_are_outdistanced;
use crate::processes::local_index::LocalIndex;
use trellis_consensus_core::api::{LedgerView, SignatureVerifier, WotGraph};
use trellis_consensus_core::block::{Block, CertificationDoc, Transaction, UnlockParam};
use trellis_consensus_core::blockstamp::Blockstamp;
use trellis_consensus_core::config::Params;
use trellis_consensus_core::constants::TX_WINDOW;
use trellis_consensus_core::errors::ConsensusResult;
use trellis_consensus_core::head::ChainHead;
use trellis_consensus_core::index::{MembershipKind, Op, SourceEntry};
use trellis_consensus_core::keys::Pubkey;
use trellis_consensus_core::Timestamp;
use trellis_txunlock::{EvalContext, Param, SigParam};

/// Annotates `index` in place. `head` is the computed head of the
/// candidate block, `prev` the stored head it builds on.
pub fn annotate<L: LedgerView, W: WotGraph + Clone, V: SignatureVerifier>(
    params: &Params,
    block: &Block,
    index: &mut LocalIndex,
    head: &ChainHead,
    prev: Option<&ChainHead>,
    ledger: &L,
    wot: &W,
    verifier: &V,
) -> ConsensusResult<()> {
    let ref_time = prev.map_or(head.median_time, |p| p.median_time);

    annotate_identities(params, block, index, ref_time, ledger)?;
    annotate_memberships(params, block, index, head, ref_time, ledger, wot, verifier)?;
    annotate_certs(params, block, index, head, ref_time, ledger, verifier)?;
    annotate_sources(block, index, head, ref_time, ledger, verifier)?;
    Ok(())
}

/// Age of a document anchored on `created_on`, seen from the previous
/// head. Documents anchored on an unknown block get `window + 1`, which
/// fails every writability rule.
fn age_of<L: LedgerView>(
    block: &Block,
    created_on: Blockstamp,
    window: u64,
    ref_time: Timestamp,
    ledger: &L,
) -> ConsensusResult<u64> {
    if block.is_genesis() && created_on == Blockstamp::zero() {
        return Ok(0);
    }
    Ok(match ledger.block_by_blockstamp(&created_on)? {
        Some(anchor) => ref_time.saturating_sub(anchor.median_time),
        None => window + 1,
    })
}

fn annotate_identities<L: LedgerView>(
    params: &Params,
    block: &Block,
    index: &mut LocalIndex,
    ref_time: Timestamp,
    ledger: &L,
) -> ConsensusResult<()> {
    let revoked_in_block: Vec<Pubkey> =
        index.memberships.iter().filter(|ms| ms.revoked_on.is_some()).map(|ms| ms.pubkey.clone()).collect();

    for entry in &mut index.identities {
        if entry.op == Op::Create {
            entry.age = age_of(block, entry.created_on.unwrap_or_default(), params.idty_window, ref_time, ledger)?;
            entry.uid_unique = match &entry.uid {
                Some(uid) => ledger.identity_by_uid(uid)?.is_none(),
                None => true,
            };
            entry.pub_unique = ledger.identity(&entry.pubkey)?.is_none();
        }
        if entry.member == Some(false) {
            let stored = ledger.identity(&entry.pubkey)?;
            entry.excluded_is_member = stored.as_ref().is_some_and(|i| i.member == Some(true));
            entry.has_to_be_excluded =
                stored.is_some_and(|i| i.kick == Some(true)) || revoked_in_block.contains(&entry.pubkey);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn annotate_memberships<L: LedgerView, W: WotGraph + Clone, V: SignatureVerifier>(
    params: &Params,
    block: &Block,
    index: &mut LocalIndex,
    head: &ChainHead,
    ref_time: Timestamp,
    ledger: &L,
    wot: &W,
    verifier: &V,
) -> ConsensusResult<()> {
    let block_certs: Vec<(Pubkey, Pubkey)> =
        index.certs.iter().map(|c| (c.issuer.clone(), c.receiver.clone())).collect();

    // Distance is a single verdict over every join and renewal.
    let checked: Vec<Pubkey> =
        index.memberships.iter().filter(|ms| ms.expires_on.is_some()).map(|ms| ms.pubkey.clone()).collect();
    let outdistanced = !checked.is_empty()
        && people_are_outdistanced(
            params,
            wot,
            head.members_count,
            &checked,
            |p| ledger.identity(p).ok().flatten().and_then(|i| i.wot_id),
            &block_certs,
        );

    for entry in &mut index.memberships {
        let stored_idty = ledger.identity(&entry.pubkey)?;
        let stored_ms = ledger.membership(&entry.pubkey)?;

        if entry.revoked_on.is_some() {
            // Explicit revocation document.
            entry.number_follows = true;
            entry.revoked_is_member = stored_idty.as_ref().is_some_and(|i| i.member == Some(true));
            entry.already_revoked = stored_ms.as_ref().is_some_and(|ms| ms.revoked_on.is_some());
            entry.revocation_sig_ok = match (&stored_idty, &entry.revocation_sig) {
                (Some(idty), Some(sig)) => {
                    !entry.already_revoked
                        && verifier.revocation_sig_ok(
                            &entry.pubkey,
                            idty.uid.as_deref().unwrap_or_default(),
                            idty.created_on.unwrap_or_default(),
                            sig,
                        )
                }
                _ => false,
            };
            continue;
        }

        entry.age = age_of(block, entry.created_on, params.ms_window, ref_time, ledger)?;
        entry.number_follows = match &stored_ms {
            Some(prior) => entry.created_on.number > prior.created_on.number,
            None => true,
        };
        entry.on_revoked = stored_ms.as_ref().is_some_and(|ms| ms.revoked_on.is_some());
        entry.joins_twice = entry.op == Op::Update
            && entry.kind == Some(MembershipKind::Join)
            && stored_idty.as_ref().is_some_and(|i| i.member == Some(true));
        entry.leaver_is_member =
            entry.kind == Some(MembershipKind::Leave) && stored_idty.as_ref().is_some_and(|i| i.member == Some(true));
        entry.active_is_member =
            entry.kind == Some(MembershipKind::Renew) && stored_idty.as_ref().is_some_and(|i| i.member == Some(true));
        entry.unchainable = params.ms_period > 0
            && stored_ms.as_ref().and_then(|ms| ms.chainable_on).is_some_and(|t| t > ref_time);

        if entry.expires_on.is_some() {
            entry.distance_ok = !outdistanced;
            let stored_certs = ledger
                .certs_to(&entry.pubkey)?
                .into_iter()
                .filter(|c| c.issuer != entry.pubkey)
                .count();
            let block_received = block_certs
                .iter()
                .filter(|(issuer, receiver)| receiver == &entry.pubkey && issuer != &entry.pubkey)
                .count();
            entry.enough_certs = stored_certs + block_received >= params.sig_qty as usize;
        }
    }
    Ok(())
}

fn annotate_certs<L: LedgerView, V: SignatureVerifier>(
    params: &Params,
    block: &Block,
    index: &mut LocalIndex,
    head: &ChainHead,
    ref_time: Timestamp,
    ledger: &L,
    verifier: &V,
) -> ConsensusResult<()> {
    let newcomers: Vec<Pubkey> =
        index.identities.iter().filter(|i| i.member == Some(true)).map(|i| i.pubkey.clone()).collect();

    for entry in &mut index.certs {
        let anchor = ledger.block_at(entry.created_on)?;
        entry.age = match (&anchor, block.is_genesis() && entry.created_on == 0) {
            (_, true) => 0,
            (Some(anchor), _) => ref_time.saturating_sub(anchor.median_time),
            (None, _) => params.sig_window + 1,
        };

        let issued = ledger.certs_from(&entry.issuer)?;
        entry.stock = issued.len() as u64;
        entry.unchainable = params.sig_period > 0
            && issued.iter().filter_map(|c| c.chainable_on).max().is_some_and(|t| t > ref_time);
        entry.is_replay = issued.iter().any(|c| c.receiver == entry.receiver);

        entry.from_member = ledger.identity(&entry.issuer)?.is_some_and(|i| i.member == Some(true));
        entry.to_member = ledger.identity(&entry.receiver)?.is_some_and(|i| i.member == Some(true));
        entry.to_newcomer = newcomers.contains(&entry.receiver);
        entry.to_leaver = ledger.membership(&entry.receiver)?.is_some_and(|ms| ms.leaving == Some(true));

        entry.sig_ok = certification_is_valid(
            params,
            block,
            entry.issuer.clone(),
            entry.receiver.clone(),
            entry.created_on,
            entry.sig.clone().unwrap_or_default(),
            head,
            ledger,
            verifier,
        )?;
    }
    Ok(())
}

/// Full certification validity: anchoring, expiry and signature.
#[allow(clippy::too_many_arguments)]
fn certification_is_valid<L: LedgerView, V: SignatureVerifier>(
    params: &Params,
    block: &Block,
    issuer: Pubkey,
    receiver: Pubkey,
    created_on: u64,
    sig: String,
    head: &ChainHead,
    ledger: &L,
    verifier: &V,
) -> ConsensusResult<bool> {
    if issuer == receiver {
        return Ok(false);
    }
    if block.is_genesis() && created_on != 0 {
        return Ok(false);
    }

    let (receiver_uid, receiver_created_on) = match block.identities.iter().find(|i| i.pubkey == receiver) {
        Some(doc) => (doc.uid.clone(), doc.created_on),
        None => match ledger.identity(&receiver)? {
            Some(idty) => (idty.uid.unwrap_or_default(), idty.created_on.unwrap_or_default()),
            None => return Ok(false),
        },
    };

    let anchor_time = if block.is_genesis() {
        head.median_time
    } else {
        match ledger.block_at(created_on)? {
            Some(anchor) => anchor.median_time,
            None => return Ok(false),
        }
    };
    if head.median_time > anchor_time + params.sig_validity {
        return Ok(false);
    }

    let doc = CertificationDoc { issuer, receiver, block_number: created_on, sig };
    Ok(verifier.certification_sig_ok(&doc, &receiver_uid, receiver_created_on))
}

fn annotate_sources<L: LedgerView, V: SignatureVerifier>(
    block: &Block,
    index: &mut LocalIndex,
    head: &ChainHead,
    ref_time: Timestamp,
    ledger: &L,
    verifier: &V,
) -> ConsensusResult<()> {
    // Outputs of earlier transactions of the same block may be consumed by
    // later ones before ever reaching the store.
    let in_block_creates: Vec<SourceEntry> =
        index.sources.iter().filter(|s| s.op == Op::Create).cloned().collect();

    for entry in &mut index.sources {
        if entry.op != Op::Update {
            continue;
        }
        let stored = ledger.source(entry.kind, &entry.identifier, entry.pos)?;
        let source = match stored {
            Some(src) if !src.consumed => Some(src),
            Some(_) => None,
            None => in_block_creates
                .iter()
                .find(|s| s.kind == entry.kind && s.identifier == entry.identifier && s.pos == entry.pos)
                .cloned(),
        };

        let Some(source) = source else {
            entry.available = false;
            entry.is_locked = true;
            continue;
        };

        entry.available = source.amount == entry.amount && source.base == entry.base;
        entry.conditions = source.conditions.clone();

        let elapsed = entry.written_time.saturating_sub(source.written_time);
        entry.is_time_locked = elapsed < entry.locktime;

        let tx = entry.tx_index.and_then(|i| block.transactions.get(i));
        let verdict = match (tx, entry.input_index) {
            (Some(tx), Some(input_index)) => {
                entry.age = transaction_age(block, tx, ref_time, ledger)?;
                let params = unlock_params(tx, input_index, verifier);
                let ctx = EvalContext { median_time: head.median_time, elapsed };
                trellis_txunlock::unlock(&source.conditions, &params, &ctx)
            }
            _ => None,
        };
        entry.is_locked = verdict != Some(true);
    }
    Ok(())
}

fn transaction_age<L: LedgerView>(block: &Block, tx: &Transaction, ref_time: Timestamp, ledger: &L) -> ConsensusResult<u64> {
    if block.is_genesis() && tx.blockstamp == Blockstamp::zero() {
        return Ok(0);
    }
    Ok(match ledger.block_by_blockstamp(&tx.blockstamp)? {
        Some(anchor) => ref_time.saturating_sub(anchor.median_time),
        None => TX_WINDOW + 1,
    })
}

fn unlock_params<V: SignatureVerifier>(tx: &Transaction, input_index: usize, verifier: &V) -> Vec<Param> {
    let Some(unlock) = tx.unlocks.iter().find(|u| u.input_index == input_index) else {
        return Vec::new();
    };
    unlock
        .params
        .iter()
        .filter_map(|param| match param {
            UnlockParam::Sig(sig_index) => tx.issuers.get(*sig_index).map(|issuer| {
                Param::Sig(SigParam { pubkey: issuer.to_string(), ok: verifier.transaction_sig_ok(tx, *sig_index) })
            }),
            UnlockParam::Xhx(preimage) => Some(Param::Xhx(preimage.clone())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::stores::MemoryLedger;
    use crate::model::wot::MemoryWot;
    use crate::processes::local_index;
    use trellis_consensus_core::api::{CommitSink, IndexBatch};
    use trellis_consensus_core::block::{IdentityDoc, MembershipDoc, RevocationDoc, TxInput, TxOutput, TxUnlock};
    use trellis_consensus_core::hash::Hash;
    use trellis_consensus_core::index::{CertEntry, IdentityEntry, MembershipEntry, SourceEntry, SourceKind};

    struct Approving;

    impl SignatureVerifier for Approving {
        fn block_sig_ok(&self, _: &Block) -> bool {
            true
        }
        fn identity_sig_ok(&self, _: &IdentityDoc) -> bool {
            true
        }
        fn membership_sig_ok(&self, _: &MembershipDoc, _: &str, _: &str) -> bool {
            true
        }
        fn certification_sig_ok(&self, _: &CertificationDoc, _: &str, _: Blockstamp) -> bool {
            true
        }
        fn revocation_sig_ok(&self, _: &Pubkey, _: &str, _: Blockstamp, _: &str) -> bool {
            true
        }
        fn transaction_sig_ok(&self, _: &Transaction, _: usize) -> bool {
            true
        }
    }

    const T0: Timestamp = 1_500_000_000;

    fn block(number: u64) -> Block {
        Block {
            version: 10,
            number,
            currency: "trellis_test".into(),
            hash: Hash::EMPTY_DOC,
            previous_hash: (number > 0).then_some(Hash::EMPTY_DOC),
            issuer: Pubkey::from("AAA"),
            previous_issuer: None,
            signature: String::new(),
            time: T0 + number * 100,
            median_time: T0 + number * 100,
            members_count: 2,
            issuers_count: 0,
            issuers_frame: 1,
            issuers_frame_var: 0,
            pow_min: 0,
            dividend: None,
            unit_base: 0,
            size: 0,
            identities: vec![],
            joiners: vec![],
            actives: vec![],
            leavers: vec![],
            revoked: vec![],
            excluded: vec![],
            certifications: vec![],
            transactions: vec![],
        }
    }

    fn head_of(b: &Block, members_count: u64) -> ChainHead {
        ChainHead {
            version: b.version,
            number: b.number,
            hash: b.hash,
            previous_hash: b.previous_hash,
            issuer: b.issuer.clone(),
            previous_issuer: None,
            time: b.time,
            median_time: b.median_time,
            bsize: 0,
            avg_block_size: 0,
            members_count,
            issuers_count: 0,
            issuers_frame: 1,
            issuers_frame_var: 0,
            issuer_diff: 0,
            issuer_is_member: true,
            pow_min: 0,
            pow_zeros: 0,
            pow_remainder: 0,
            diff_number: 0,
            speed: 0.0,
            unit_base: 0,
            dividend: 100,
            new_dividend: None,
            ud_time: 0,
            ud_reeval_time: 0,
            mass: 0,
            mass_reeval: 0,
        }
    }

    /// A ledger holding two members AAA and BBB certifying each other,
    /// plus one spendable transaction source locked to AAA.
    fn seed() -> (MemoryLedger, MemoryWot, ChainHead) {
        let params = Params::for_tests();
        let genesis = block(0);
        let head = head_of(&genesis, 2);
        let written_on = genesis.blockstamp();
        let member = |pubkey: &str, uid: &str, wot_id: usize| IdentityEntry {
            op: Op::Create,
            pubkey: Pubkey::from(pubkey),
            written_on,
            uid: Some(uid.into()),
            created_on: Some(Blockstamp::zero()),
            sig: Some("SIG".into()),
            member: Some(true),
            was_member: Some(true),
            kick: Some(false),
            wot_id: Some(wot_id),
            ..IdentityEntry::default()
        };
        let ms = |pubkey: &str| MembershipEntry {
            op: Op::Create,
            pubkey: Pubkey::from(pubkey),
            written_on,
            created_on: Blockstamp::zero(),
            kind: Some(MembershipKind::Join),
            expires_on: Some(T0 + params.ms_validity),
            expired_on: Some(0),
            revokes_on: Some(T0 + 2 * params.ms_validity),
            leaving: Some(false),
            ..MembershipEntry::default()
        };
        let cert = |issuer: &str, receiver: &str| CertEntry {
            op: Op::Create,
            issuer: Pubkey::from(issuer),
            receiver: Pubkey::from(receiver),
            written_on,
            created_on: 0,
            sig: Some("SIG".into()),
            expires_on: Some(T0 + params.sig_validity),
            expired_on: 0,
            chainable_on: Some(T0),
            ..CertEntry::default()
        };
        let batch = IndexBatch {
            identities: vec![member("AAA", "alice", 0), member("BBB", "bob", 1)],
            memberships: vec![ms("AAA"), ms("BBB")],
            certs: vec![cert("AAA", "BBB"), cert("BBB", "AAA")],
            sources: vec![SourceEntry {
                op: Op::Create,
                kind: SourceKind::Transaction,
                identifier: "TXID".into(),
                pos: 0,
                written_on,
                written_time: T0,
                amount: 100,
                base: 0,
                conditions: "SIG(AAA)".into(),
                ..SourceEntry::default()
            }],
        };
        let mut ledger = MemoryLedger::new();
        ledger.commit(&genesis, &head, &batch).unwrap();

        let mut wot = MemoryWot::default();
        wot.add_node();
        wot.add_node();
        wot.add_link(0, 1);
        wot.add_link(1, 0);
        (ledger, wot, head)
    }

    fn annotated(b: &Block, ledger: &MemoryLedger, wot: &MemoryWot, prev: &ChainHead, members: u64) -> LocalIndex {
        let params = Params::for_tests();
        let mut index = local_index::extract(b, &params);
        let head = head_of(b, members);
        annotate(&params, b, &mut index, &head, Some(prev), ledger, wot, &Approving).unwrap();
        index
    }

    #[test]
    fn certified_newcomer_passes_membership_checks() {
        let (ledger, wot, head0) = seed();
        let mut b = block(1);
        b.identities.push(IdentityDoc {
            pubkey: Pubkey::from("CCC"),
            uid: "carol".into(),
            created_on: Blockstamp::zero(),
            sig: "SIG".into(),
        });
        b.joiners.push(MembershipDoc { pubkey: Pubkey::from("CCC"), created_on: Blockstamp::zero(), sig: "SIG".into() });
        b.certifications.push(CertificationDoc {
            issuer: Pubkey::from("AAA"),
            receiver: Pubkey::from("CCC"),
            block_number: 0,
            sig: "SIG".into(),
        });
        b.certifications.push(CertificationDoc {
            issuer: Pubkey::from("BBB"),
            receiver: Pubkey::from("CCC"),
            block_number: 0,
            sig: "SIG".into(),
        });

        let index = annotated(&b, &ledger, &wot, &head0, 3);
        let join = &index.memberships[0];
        assert!(join.enough_certs);
        assert!(join.distance_ok);
        assert!(join.number_follows);
        assert!(!join.joins_twice);
        let idty = &index.identities[0];
        assert!(idty.uid_unique);
        assert!(idty.pub_unique);
        assert!(idty.age <= Params::for_tests().idty_window);
        for cert in &index.certs {
            assert!(cert.from_member);
            assert!(cert.to_newcomer);
            assert!(!cert.is_replay);
            assert!(cert.sig_ok);
        }
    }

    #[test]
    fn duplicate_uid_and_pubkey_are_flagged() {
        let (ledger, wot, head0) = seed();
        let mut b = block(1);
        b.identities.push(IdentityDoc {
            pubkey: Pubkey::from("AAA"),
            uid: "alice".into(),
            created_on: Blockstamp::zero(),
            sig: "SIG".into(),
        });
        b.joiners.push(MembershipDoc { pubkey: Pubkey::from("AAA"), created_on: Blockstamp::zero(), sig: "SIG".into() });

        let index = annotated(&b, &ledger, &wot, &head0, 2);
        let idty = &index.identities[0];
        assert!(!idty.uid_unique);
        assert!(!idty.pub_unique);
    }

    #[test]
    fn joining_while_member_is_flagged() {
        let (ledger, wot, head0) = seed();
        let mut b = block(1);
        b.joiners.push(MembershipDoc {
            pubkey: Pubkey::from("AAA"),
            created_on: Blockstamp { number: 0, hash: Hash::EMPTY_DOC },
            sig: "SIG".into(),
        });

        let index = annotated(&b, &ledger, &wot, &head0, 2);
        assert_eq!(index.memberships[0].op, Op::Update);
        assert!(index.memberships[0].joins_twice);
    }

    #[test]
    fn replayed_certification_is_flagged() {
        let (ledger, wot, head0) = seed();
        let mut b = block(1);
        b.certifications.push(CertificationDoc {
            issuer: Pubkey::from("AAA"),
            receiver: Pubkey::from("BBB"),
            block_number: 0,
            sig: "SIG".into(),
        });

        let index = annotated(&b, &ledger, &wot, &head0, 2);
        assert!(index.certs[0].is_replay);
        assert!(index.certs[0].to_member);
    }

    #[test]
    fn revocation_of_a_member_is_accepted() {
        let (ledger, wot, head0) = seed();
        let mut b = block(1);
        b.revoked.push(RevocationDoc { pubkey: Pubkey::from("BBB"), sig: "REVOC_SIG".into() });

        let index = annotated(&b, &ledger, &wot, &head0, 2);
        let revocation = &index.memberships[0];
        assert!(revocation.revoked_is_member);
        assert!(!revocation.already_revoked);
        assert!(revocation.revocation_sig_ok);
    }

    #[test]
    fn spending_a_source_fills_availability_and_locks() {
        let (ledger, wot, head0) = seed();
        let mut b = block(1);
        b.transactions.push(Transaction {
            hash: Hash::EMPTY_DOC,
            blockstamp: Blockstamp::zero(),
            locktime: 0,
            issuers: vec![Pubkey::from("AAA")],
            inputs: vec![TxInput {
                amount: 100,
                base: 0,
                kind: SourceKind::Transaction,
                identifier: "TXID".into(),
                pos: 0,
            }],
            unlocks: vec![TxUnlock { input_index: 0, params: vec![UnlockParam::Sig(0)] }],
            outputs: vec![TxOutput { amount: 100, base: 0, conditions: "SIG(BBB)".into() }],
            signatures: vec!["SIG".into()],
            comment: String::new(),
        });

        let index = annotated(&b, &ledger, &wot, &head0, 2);
        let input = index.sources.iter().find(|s| s.op == Op::Update).unwrap();
        assert!(input.available);
        assert_eq!(input.conditions, "SIG(AAA)");
        assert!(!input.is_locked);
        assert!(!input.is_time_locked);
        assert!(input.age <= TX_WINDOW);
    }

    #[test]
    fn spending_with_the_wrong_key_stays_locked() {
        let (ledger, wot, head0) = seed();
        let mut b = block(1);
        b.transactions.push(Transaction {
            hash: Hash::EMPTY_DOC,
            blockstamp: Blockstamp::zero(),
            locktime: 0,
            issuers: vec![Pubkey::from("BBB")],
            inputs: vec![TxInput {
                amount: 100,
                base: 0,
                kind: SourceKind::Transaction,
                identifier: "TXID".into(),
                pos: 0,
            }],
            unlocks: vec![TxUnlock { input_index: 0, params: vec![UnlockParam::Sig(0)] }],
            outputs: vec![TxOutput { amount: 100, base: 0, conditions: "SIG(BBB)".into() }],
            signatures: vec!["SIG".into()],
            comment: String::new(),
        });

        let index = annotated(&b, &ledger, &wot, &head0, 2);
        let input = index.sources.iter().find(|s| s.op == Op::Update).unwrap();
        assert!(input.available);
        assert!(input.is_locked);
    }
}
