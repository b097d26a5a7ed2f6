//! Ledger index entries.
//!
//! Each accepted block is translated into four streams of index entries:
//! identities, memberships, certifications and sources. An entry is either
//! a `Create` for a key never seen before or an `Update` amending it; the
//! current state of a key is recovered by [`reduce`]-ing its entries in
//! write order, where each later non-null field overrides the earlier one.
//!
//! Entries also carry transient annotation fields (`age`, `available`, ..)
//! filled in while the global rules run over a candidate block. Those are
//! never meaningful on entries read back from a store.

use crate::blockstamp::Blockstamp;
use crate::keys::{Pubkey, Signature, UserId};
use crate::{BlockNumber, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Create,
    Update,
}

/// Membership document kind, as written in the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipKind {
    Join,
    Renew,
    Leave,
}

/// One identity (IINDEX) entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityEntry {
    pub op: Op,
    pub pubkey: Pubkey,
    pub written_on: Blockstamp,
    /// Only set on `Create`.
    pub uid: Option<UserId>,
    /// Blockstamp the identity document was signed over. Only set on `Create`.
    pub created_on: Option<Blockstamp>,
    pub sig: Option<Signature>,
    pub member: Option<bool>,
    pub was_member: Option<bool>,
    pub kick: Option<bool>,
    /// Node id in the web of trust graph, assigned on `Create`.
    pub wot_id: Option<usize>,

    // Transient annotations.
    #[serde(skip)]
    pub age: u64,
    #[serde(skip)]
    pub uid_unique: bool,
    #[serde(skip)]
    pub pub_unique: bool,
    #[serde(skip)]
    pub excluded_is_member: bool,
    #[serde(skip)]
    pub has_to_be_excluded: bool,
}

/// One membership (MINDEX) entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipEntry {
    pub op: Op,
    pub pubkey: Pubkey,
    pub written_on: Blockstamp,
    /// Blockstamp the membership document was signed over.
    pub created_on: Blockstamp,
    pub kind: Option<MembershipKind>,
    pub expires_on: Option<Timestamp>,
    pub expired_on: Option<Timestamp>,
    pub revokes_on: Option<Timestamp>,
    /// Median time the key was revoked at; presence alone marks revocation.
    pub revoked_on: Option<Timestamp>,
    pub leaving: Option<bool>,
    /// Pre-signed revocation document carried by a join.
    pub revocation_sig: Option<Signature>,
    pub chainable_on: Option<Timestamp>,

    // Transient annotations.
    #[serde(skip)]
    pub age: u64,
    #[serde(skip)]
    pub number_follows: bool,
    #[serde(skip)]
    pub distance_ok: bool,
    #[serde(skip)]
    pub on_revoked: bool,
    #[serde(skip)]
    pub joins_twice: bool,
    #[serde(skip)]
    pub enough_certs: bool,
    #[serde(skip)]
    pub leaver_is_member: bool,
    #[serde(skip)]
    pub active_is_member: bool,
    #[serde(skip)]
    pub revoked_is_member: bool,
    #[serde(skip)]
    pub already_revoked: bool,
    #[serde(skip)]
    pub revocation_sig_ok: bool,
    #[serde(skip)]
    pub unchainable: bool,
}

impl MembershipEntry {
    /// Whether the reduced membership is currently expired. Joining and
    /// renewing write `expired_on = Some(0)`, which resets an earlier
    /// expiry under last-non-null-wins reduction.
    pub fn is_expired(&self) -> bool {
        self.expired_on.unwrap_or(0) > 0
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_on.is_some()
    }
}

/// One certification (CINDEX) entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertEntry {
    pub op: Op,
    pub issuer: Pubkey,
    pub receiver: Pubkey,
    pub written_on: Blockstamp,
    /// Number of the block the certification was signed over.
    pub created_on: BlockNumber,
    pub sig: Option<Signature>,
    pub expires_on: Option<Timestamp>,
    /// Median time of expiry; 0 while the certification is active.
    pub expired_on: Timestamp,
    pub chainable_on: Option<Timestamp>,

    // Transient annotations.
    #[serde(skip)]
    pub age: u64,
    #[serde(skip)]
    pub stock: u64,
    #[serde(skip)]
    pub from_member: bool,
    #[serde(skip)]
    pub to_member: bool,
    #[serde(skip)]
    pub to_newcomer: bool,
    #[serde(skip)]
    pub to_leaver: bool,
    #[serde(skip)]
    pub is_replay: bool,
    #[serde(skip)]
    pub sig_ok: bool,
    #[serde(skip)]
    pub unchainable: bool,
}

/// What a source is identified by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// Transaction output, identified by the transaction hash.
    Transaction,
    /// Universal dividend, identified by the receiving pubkey.
    Dividend,
}

/// One source (SINDEX) entry. A `Create` makes a source available, an
/// `Update` consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub op: Op,
    pub kind: SourceKind,
    /// Transaction hash or receiving pubkey, depending on `kind`.
    pub identifier: String,
    /// Output position inside the transaction, or the dividend block number.
    pub pos: u64,
    pub written_on: Blockstamp,
    /// Median time of the block writing this entry.
    pub written_time: Timestamp,
    pub amount: u64,
    pub base: u64,
    pub locktime: u64,
    /// Output condition script of the source.
    pub conditions: String,
    pub consumed: bool,
    /// Position of the consuming transaction in the block, while checking.
    #[serde(skip)]
    pub tx_index: Option<usize>,
    /// Position of the input inside that transaction, while checking.
    #[serde(skip)]
    pub input_index: Option<usize>,

    // Transient annotations.
    #[serde(skip)]
    pub age: u64,
    #[serde(skip)]
    pub available: bool,
    #[serde(skip)]
    pub is_locked: bool,
    #[serde(skip)]
    pub is_time_locked: bool,
}

impl SourceEntry {
    /// Stable key of the underlying source, shared by the entry that
    /// creates it and the entry that consumes it.
    pub fn source_key(&self) -> (SourceKind, &str, u64) {
        (self.kind, self.identifier.as_str(), self.pos)
    }
}

impl Default for IdentityEntry {
    fn default() -> Self {
        IdentityEntry {
            op: Op::Create,
            pubkey: Pubkey::default(),
            written_on: Blockstamp::zero(),
            uid: None,
            created_on: None,
            sig: None,
            member: None,
            was_member: None,
            kick: None,
            wot_id: None,
            age: 0,
            uid_unique: true,
            pub_unique: true,
            excluded_is_member: false,
            has_to_be_excluded: false,
        }
    }
}

impl Default for MembershipEntry {
    fn default() -> Self {
        MembershipEntry {
            op: Op::Create,
            pubkey: Pubkey::default(),
            written_on: Blockstamp::zero(),
            created_on: Blockstamp::zero(),
            kind: None,
            expires_on: None,
            expired_on: None,
            revokes_on: None,
            revoked_on: None,
            leaving: None,
            revocation_sig: None,
            chainable_on: None,
            age: 0,
            number_follows: true,
            distance_ok: true,
            on_revoked: false,
            joins_twice: false,
            enough_certs: true,
            leaver_is_member: false,
            active_is_member: false,
            revoked_is_member: false,
            already_revoked: false,
            revocation_sig_ok: true,
            unchainable: false,
        }
    }
}

impl Default for CertEntry {
    fn default() -> Self {
        CertEntry {
            op: Op::Create,
            issuer: Pubkey::default(),
            receiver: Pubkey::default(),
            written_on: Blockstamp::zero(),
            created_on: 0,
            sig: None,
            expires_on: None,
            expired_on: 0,
            chainable_on: None,
            age: 0,
            stock: 0,
            from_member: false,
            to_member: false,
            to_newcomer: false,
            to_leaver: false,
            is_replay: false,
            sig_ok: true,
            unchainable: false,
        }
    }
}

impl Default for SourceEntry {
    fn default() -> Self {
        SourceEntry {
            op: Op::Create,
            kind: SourceKind::Transaction,
            identifier: String::new(),
            pos: 0,
            written_on: Blockstamp::zero(),
            written_time: 0,
            amount: 0,
            base: 0,
            locktime: 0,
            conditions: String::new(),
            consumed: false,
            tx_index: None,
            input_index: None,
            age: 0,
            available: false,
            is_locked: false,
            is_time_locked: false,
        }
    }
}

/// One entry of any stream, as produced by local index extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexEntry {
    Identity(IdentityEntry),
    Membership(MembershipEntry),
    Cert(CertEntry),
    Source(SourceEntry),
}

/// Field-wise merge used by [`reduce`]: every later non-null field wins.
pub trait Reducible {
    /// Key identifying which entries amend the same record.
    type Key: Eq + Clone;

    fn key(&self) -> Self::Key;
    fn merge(&mut self, later: &Self);
    /// Number of the block this entry was written on.
    fn written_number(&self) -> BlockNumber;
}

macro_rules! merge_opt {
    ($dst:expr, $src:expr, $($field:ident),+ $(,)?) => {
        $(if $src.$field.is_some() {
            $dst.$field = $src.$field.clone();
        })+
    };
}

impl Reducible for IdentityEntry {
    type Key = Pubkey;

    fn key(&self) -> Pubkey {
        self.pubkey.clone()
    }

    fn merge(&mut self, later: &Self) {
        self.op = later.op;
        self.written_on = later.written_on;
        merge_opt!(self, later, uid, created_on, sig, member, was_member, kick, wot_id);
    }

    fn written_number(&self) -> BlockNumber {
        self.written_on.number
    }
}

impl Reducible for MembershipEntry {
    type Key = Pubkey;

    fn key(&self) -> Pubkey {
        self.pubkey.clone()
    }

    fn merge(&mut self, later: &Self) {
        self.op = later.op;
        self.written_on = later.written_on;
        self.created_on = later.created_on;
        merge_opt!(
            self,
            later,
            kind,
            expires_on,
            expired_on,
            revokes_on,
            revoked_on,
            leaving,
            revocation_sig,
            chainable_on,
        );
    }

    fn written_number(&self) -> BlockNumber {
        self.written_on.number
    }
}

impl Reducible for CertEntry {
    type Key = (Pubkey, Pubkey, BlockNumber);

    fn key(&self) -> Self::Key {
        (self.issuer.clone(), self.receiver.clone(), self.created_on)
    }

    fn merge(&mut self, later: &Self) {
        self.op = later.op;
        self.written_on = later.written_on;
        self.expired_on = later.expired_on;
        merge_opt!(self, later, sig, expires_on, chainable_on);
    }

    fn written_number(&self) -> BlockNumber {
        self.written_on.number
    }
}

impl Reducible for SourceEntry {
    type Key = (SourceKind, String, u64);

    fn key(&self) -> Self::Key {
        (self.kind, self.identifier.clone(), self.pos)
    }

    fn merge(&mut self, later: &Self) {
        self.op = later.op;
        self.written_on = later.written_on;
        self.written_time = later.written_time;
        self.consumed = self.consumed || later.consumed;
    }

    fn written_number(&self) -> BlockNumber {
        self.written_on.number
    }
}

/// Reduces entries of a single record into its current state. Returns
/// `None` on an empty slice.
pub fn reduce<T: Reducible + Clone>(entries: &[T]) -> Option<T> {
    let mut iter = entries.iter();
    let mut acc = iter.next()?.clone();
    for entry in iter {
        acc.merge(entry);
    }
    Some(acc)
}

/// Groups entries by record key, preserving first-seen order, and reduces
/// each group.
pub fn reduce_by<T: Reducible + Clone>(entries: &[T]) -> Vec<T> {
    let mut acc: Vec<T> = Vec::new();
    for entry in entries {
        match acc.iter_mut().find(|e| e.key() == entry.key()) {
            Some(existing) => existing.merge(entry),
            None => acc.push(entry.clone()),
        }
    }
    acc
}
