use crate::blockstamp::Blockstamp;
use crate::hash::Hash;
use crate::keys::{Pubkey, Signature, UserId};
use crate::{BlockNumber, Timestamp};
use serde::{Deserialize, Serialize};

/// A new identity declared in a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityDoc {
    pub pubkey: Pubkey,
    pub uid: UserId,
    /// Blockstamp the identity document was signed over.
    pub created_on: Blockstamp,
    pub sig: Signature,
}

/// A membership document. Whether it joins, renews or leaves is given by
/// the block list it appears in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipDoc {
    pub pubkey: Pubkey,
    /// Blockstamp the membership document was signed over.
    pub created_on: Blockstamp,
    pub sig: Signature,
}

/// An explicit revocation of an identity, signed with its own key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevocationDoc {
    pub pubkey: Pubkey,
    pub sig: Signature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificationDoc {
    pub issuer: Pubkey,
    pub receiver: Pubkey,
    /// Number of the block the certification was signed over.
    pub block_number: BlockNumber,
    pub sig: Signature,
}

/// What a transaction input spends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxInput {
    pub amount: u64,
    pub base: u64,
    pub kind: crate::index::SourceKind,
    /// Transaction hash or dividend pubkey, depending on `kind`.
    pub identifier: String,
    /// Output position or dividend block number.
    pub pos: u64,
}

/// A parameter handed to the condition script of the matching input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnlockParam {
    /// Index into the transaction's signature list.
    Sig(usize),
    /// Preimage for a hash-lock condition.
    Xhx(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxUnlock {
    pub input_index: usize,
    pub params: Vec<UnlockParam>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxOutput {
    pub amount: u64,
    pub base: u64,
    /// Condition script guarding the created source.
    pub conditions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: Hash,
    /// Blockstamp the transaction was signed over.
    pub blockstamp: Blockstamp,
    pub locktime: u64,
    pub issuers: Vec<Pubkey>,
    pub inputs: Vec<TxInput>,
    pub unlocks: Vec<TxUnlock>,
    pub outputs: Vec<TxOutput>,
    pub signatures: Vec<Signature>,
    pub comment: String,
}

impl Transaction {
    /// Total input amount in common units, or `None` when an amount or a
    /// unit base is large enough to overflow. The unit bases come straight
    /// from the submitted block, so overflow is a rejection, not a panic.
    pub fn input_sum(&self) -> Option<u64> {
        self.inputs.iter().try_fold(0u64, |sum, i| sum.checked_add(in_common_units(i.amount, i.base)?))
    }

    pub fn output_sum(&self) -> Option<u64> {
        self.outputs.iter().try_fold(0u64, |sum, o| sum.checked_add(in_common_units(o.amount, o.base)?))
    }
}

fn in_common_units(amount: u64, base: u64) -> Option<u64> {
    amount.checked_mul(10u64.checked_pow(u32::try_from(base).ok()?)?)
}

/// A block as submitted for validation, header fields plus document lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub version: u32,
    pub number: BlockNumber,
    pub currency: String,
    pub hash: Hash,
    pub previous_hash: Option<Hash>,
    pub issuer: Pubkey,
    pub previous_issuer: Option<Pubkey>,
    pub signature: Signature,
    pub time: Timestamp,
    pub median_time: Timestamp,
    pub members_count: u64,
    pub issuers_count: u64,
    pub issuers_frame: u64,
    pub issuers_frame_var: i64,
    pub pow_min: u64,
    pub dividend: Option<u64>,
    pub unit_base: u64,
    /// Serialized size in bytes.
    pub size: u64,

    pub identities: Vec<IdentityDoc>,
    pub joiners: Vec<MembershipDoc>,
    pub actives: Vec<MembershipDoc>,
    pub leavers: Vec<MembershipDoc>,
    pub revoked: Vec<RevocationDoc>,
    pub excluded: Vec<Pubkey>,
    pub certifications: Vec<CertificationDoc>,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn blockstamp(&self) -> Blockstamp {
        Blockstamp { number: self.number, hash: self.hash }
    }

    pub fn is_genesis(&self) -> bool {
        self.number == 0
    }
}
