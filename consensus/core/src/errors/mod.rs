pub mod rule;
pub mod store;

pub use rule::{RuleError, RuleResult};
pub use store::{StoreError, StoreResult};

use thiserror::Error;

/// Top-level error of a block check/apply/revert/switch operation.
///
/// Failures fall into three classes: malformed input
/// ([`ConsensusError::MalformedBlock`]), rule violation
/// ([`ConsensusError::Rule`]) and invariant breach
/// ([`ConsensusError::InvariantViolation`] / [`ConsensusError::Store`]).
/// Only the first two are "expected" failures that condemn the block alone;
/// the fork switcher swallows them during chain exploration, everything
/// else always propagates.
#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("malformed block: {0}")]
    MalformedBlock(String),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl ConsensusError {
    /// True for failures that only condemn the checked block, not the node
    /// state. The fork switcher relies on this to truncate a candidate
    /// chain instead of aborting the whole switch.
    pub fn is_block_rejection(&self) -> bool {
        matches!(self, ConsensusError::Rule(_) | ConsensusError::MalformedBlock(_))
    }
}

pub type ConsensusResult<T> = std::result::Result<T, ConsensusError>;
