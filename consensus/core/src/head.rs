use crate::blockstamp::Blockstamp;
use crate::hash::Hash;
use crate::keys::Pubkey;
use crate::{BlockNumber, Timestamp};

/// Fully computed chain head for one block.
///
/// Every field is the value the chain-head rules assign for the block at
/// `number`; a candidate block is accepted only when its own header fields
/// match the corresponding ones here. Heads are persisted so that the head
/// of block N can be derived from the head of block N-1 plus the window of
/// recent heads.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainHead {
    pub version: u32,
    pub number: BlockNumber,
    pub hash: Hash,
    pub previous_hash: Option<Hash>,
    pub issuer: Pubkey,
    pub previous_issuer: Option<Pubkey>,
    pub time: Timestamp,
    pub median_time: Timestamp,

    /// Size of the block itself, in bytes.
    pub bsize: u64,
    /// Rolling average block size over the last blocks, used for the
    /// maximum acceptable size of the next block.
    pub avg_block_size: u64,

    pub members_count: u64,
    pub issuers_count: u64,
    pub issuers_frame: u64,
    pub issuers_frame_var: i64,
    /// Personalized proof-of-work difficulty required of this head's
    /// issuer.
    pub issuer_diff: u64,
    pub issuer_is_member: bool,

    pub pow_min: u64,
    /// Number of leading zero nibbles required of the block hash.
    pub pow_zeros: usize,
    /// Maximum value of the first non-zero nibble.
    pub pow_remainder: u64,
    /// Number of the block the current difficulty window started at.
    pub diff_number: BlockNumber,
    /// Blocks per second over the difficulty window.
    pub speed: f64,

    pub unit_base: u64,
    /// Universal dividend in force at this block, in units of `10^unit_base`.
    pub dividend: u64,
    /// Dividend produced by this block, if it is a dividend block.
    pub new_dividend: Option<u64>,
    /// Next time a dividend is due.
    pub ud_time: Timestamp,
    /// Next time the dividend formula is reevaluated.
    pub ud_reeval_time: Timestamp,
    /// Monetary mass after this block, in base units.
    pub mass: u64,
    /// Monetary mass frozen at the last dividend reevaluation.
    pub mass_reeval: u64,
}

impl ChainHead {
    pub fn blockstamp(&self) -> Blockstamp {
        Blockstamp { number: self.number, hash: self.hash }
    }
}
