use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// A base58-encoded Ed25519 public key. The consensus core never decodes
/// keys; they are opaque identifiers, compared and stored as text.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Pubkey(String);

impl Pubkey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Pubkey {
    fn from(s: &str) -> Self {
        Pubkey(s.to_owned())
    }
}

impl From<String> for Pubkey {
    fn from(s: String) -> Self {
        Pubkey(s)
    }
}

impl Display for Pubkey {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for Pubkey {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A base64-encoded detached signature, opaque to the core. Verification
/// happens behind the [`crate::api::SignatureVerifier`] seam.
pub type Signature = String;

/// User identifier chosen at identity creation.
pub type UserId = String;
