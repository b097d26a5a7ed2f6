//! Traits at the boundary of the consensus core.
//!
//! The validation pipeline is written against these seams so that it can
//! run over any ledger backend, and so that tests can substitute in-memory
//! fakes for storage and cryptography.

use crate::block::{Block, CertificationDoc, IdentityDoc, MembershipDoc, Transaction};
use crate::blockstamp::Blockstamp;
use crate::errors::StoreResult;
use crate::hash::Hash;
use crate::head::ChainHead;
use crate::index::{CertEntry, IdentityEntry, MembershipEntry, SourceEntry, SourceKind};
use crate::keys::Pubkey;
use crate::{BlockNumber, Timestamp};

/// Node id inside the web of trust graph.
pub type WotId = usize;

/// Access to computed chain heads.
pub trait HeadReader {
    /// Head of the chain, `None` on an empty ledger.
    fn head(&self) -> StoreResult<Option<ChainHead>>;

    /// Head computed for the block at `number`, if still within the kept
    /// window.
    fn head_at(&self, number: BlockNumber) -> StoreResult<Option<ChainHead>>;

    /// Up to `count` most recent heads, newest first.
    fn recent_heads(&self, count: usize) -> StoreResult<Vec<ChainHead>>;
}

/// Access to the reduced identity index.
pub trait IdentityIndexReader {
    fn identity(&self, pubkey: &Pubkey) -> StoreResult<Option<IdentityEntry>>;

    fn identity_by_uid(&self, uid: &str) -> StoreResult<Option<IdentityEntry>>;

    /// Identities whose reduced state is currently a member.
    fn members(&self) -> StoreResult<Vec<IdentityEntry>>;

    /// Identities currently flagged for exclusion.
    fn identities_to_kick(&self) -> StoreResult<Vec<IdentityEntry>>;
}

/// Access to the reduced membership index.
pub trait MembershipIndexReader {
    fn membership(&self, pubkey: &Pubkey) -> StoreResult<Option<MembershipEntry>>;

    /// Keys whose membership expiry time has been reached at `median_time`
    /// and that have not expired yet.
    fn memberships_to_expire(&self, median_time: Timestamp) -> StoreResult<Vec<MembershipEntry>>;

    /// Keys whose implicit revocation time has been reached at
    /// `median_time` and that have not been revoked yet.
    fn memberships_to_revoke(&self, median_time: Timestamp) -> StoreResult<Vec<MembershipEntry>>;
}

/// Access to the reduced certification index.
pub trait CertIndexReader {
    /// Active (non-expired) certifications issued by `issuer`, reduced per
    /// (issuer, receiver, created_on) record.
    fn certs_from(&self, issuer: &Pubkey) -> StoreResult<Vec<CertEntry>>;

    /// Active certifications received by `receiver`.
    fn certs_to(&self, receiver: &Pubkey) -> StoreResult<Vec<CertEntry>>;

    /// Certifications whose expiry time has been reached at `median_time`
    /// and that are not expired yet.
    fn certs_to_expire(&self, median_time: Timestamp) -> StoreResult<Vec<CertEntry>>;
}

/// Access to the reduced source index.
pub trait SourceIndexReader {
    /// Reduced state of one source, `None` if it was never created.
    fn source(&self, kind: SourceKind, identifier: &str, pos: u64) -> StoreResult<Option<SourceEntry>>;

    /// Available (unconsumed) sources guarded by exactly `conditions`.
    fn available_sources_of(&self, conditions: &str) -> StoreResult<Vec<SourceEntry>>;
}

/// Access to per-script wallet balances, maintained from consumed and
/// created sources.
pub trait WalletReader {
    /// Balance of the wallet guarded by `conditions`, in base units. Zero
    /// for unknown scripts.
    fn wallet_balance(&self, conditions: &str) -> StoreResult<i64>;
}

/// Access to the blocks of the main chain, used to resolve the block
/// references carried by documents.
pub trait BlockHistoryReader {
    fn block_at(&self, number: BlockNumber) -> StoreResult<Option<BlockSummary>>;

    /// The main-chain block matching both number and hash of `bs`, if any.
    fn block_by_blockstamp(&self, bs: &Blockstamp) -> StoreResult<Option<BlockSummary>>;

    /// Full block of the main chain, for fork exploration and replay.
    fn full_block(&self, number: BlockNumber, hash: &Hash) -> StoreResult<Option<Block>>;
}

/// Everything the global rules need to read. Blanket-implemented for any
/// type providing the individual reader traits.
pub trait LedgerView:
    HeadReader
    + BlockHistoryReader
    + IdentityIndexReader
    + MembershipIndexReader
    + CertIndexReader
    + SourceIndexReader
    + WalletReader
{
}

impl<T> LedgerView for T where
    T: HeadReader
        + BlockHistoryReader
        + IdentityIndexReader
        + MembershipIndexReader
        + CertIndexReader
        + SourceIndexReader
        + WalletReader
{
}

/// Index entries produced by one block, ready to be committed atomically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexBatch {
    pub identities: Vec<IdentityEntry>,
    pub memberships: Vec<MembershipEntry>,
    pub certs: Vec<CertEntry>,
    pub sources: Vec<SourceEntry>,
}

impl IndexBatch {
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty() && self.memberships.is_empty() && self.certs.is_empty() && self.sources.is_empty()
    }
}

/// Write side of a ledger backend.
pub trait CommitSink {
    /// Appends one validated block: stores the block, its head and index
    /// entries, and updates wallet balances from the batch's sources.
    fn commit(&mut self, block: &Block, head: &ChainHead, batch: &IndexBatch) -> StoreResult<()>;

    /// Removes the top block `number`: its head, every index entry written
    /// on it, and the wallet movements it caused. Returns the removed
    /// block and its index entries so the caller can stash the block and
    /// undo the web-of-trust changes it carried.
    fn remove_block(&mut self, number: BlockNumber) -> StoreResult<(Block, IndexBatch)>;

    /// Drops index entries of blocks at or below `below` that no longer
    /// influence validation, compacting each record to its reduced state.
    fn trim(&mut self, below: BlockNumber) -> StoreResult<()>;
}

/// Mutable web of trust graph. Node ids are dense indices assigned in
/// creation order; removal is only ever of the most recently added node,
/// which keeps ids stable under revert.
pub trait WotGraph {
    fn add_node(&mut self) -> WotId;

    /// Removes the most recently added node, returning the id that will be
    /// assigned next.
    fn rem_node(&mut self) -> Option<WotId>;

    fn node_count(&self) -> usize;

    fn is_enabled(&self, id: WotId) -> Option<bool>;

    fn set_enabled(&mut self, id: WotId, enabled: bool) -> Option<bool>;

    fn has_link(&self, from: WotId, to: WotId) -> bool;

    fn add_link(&mut self, from: WotId, to: WotId);

    fn rem_link(&mut self, from: WotId, to: WotId);

    /// Ids of the nodes certifying `id`.
    fn sources_of(&self, id: WotId) -> Vec<WotId>;

    /// Number of links issued by `id`.
    fn issued_count(&self, id: WotId) -> Option<usize>;

    /// A sentry is an enabled node with at least `d_min` links issued and
    /// `d_min` links received.
    fn is_sentry(&self, id: WotId, d_min: usize) -> Option<bool>;

    fn sentries(&self, d_min: usize) -> Vec<WotId>;
}

/// Cryptographic signature checks, kept outside the consensus core.
///
/// Implementations verify detached Ed25519 signatures over the canonical
/// document serializations; the core only consumes the boolean verdicts.
pub trait SignatureVerifier {
    fn block_sig_ok(&self, block: &Block) -> bool;

    fn identity_sig_ok(&self, idty: &IdentityDoc) -> bool;

    /// `kind` is the raw membership type string written in the document:
    /// `"IN"` for a join or renewal, `"OUT"` for a leave.
    fn membership_sig_ok(&self, ms: &MembershipDoc, currency: &str, kind: &str) -> bool;

    /// The certification is signed over the receiver's identity document.
    fn certification_sig_ok(&self, cert: &CertificationDoc, receiver_uid: &str, receiver_created_on: Blockstamp) -> bool;

    /// A revocation is signed with the revoked identity's own key, over its
    /// identity document.
    fn revocation_sig_ok(&self, pubkey: &Pubkey, uid: &str, created_on: Blockstamp, sig: &str) -> bool;

    /// Whether `tx.signatures[index]` is a valid signature of the
    /// transaction by `tx.issuers[index]`.
    fn transaction_sig_ok(&self, tx: &Transaction, index: usize) -> bool;
}

/// Minimal view of a stored block used by fork-choice exploration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSummary {
    pub number: BlockNumber,
    pub hash: Hash,
    pub previous_hash: Option<Hash>,
    pub issuer: Pubkey,
    pub median_time: Timestamp,
}

impl BlockSummary {
    pub fn blockstamp(&self) -> Blockstamp {
        Blockstamp { number: self.number, hash: self.hash }
    }
}
