use crate::blockstamp::Blockstamp;
use crate::BlockNumber;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("block {0} not found in the ledger")]
    BlockNotFound(BlockNumber),
    #[error("block {0} not found in the fork window")]
    ForkBlockNotFound(Blockstamp),
    #[error("no chain head, the ledger is empty")]
    EmptyLedger,
    #[error("identity of key {0} not found")]
    IdentityNotFound(String),
    #[error("web of trust node of key {0} not found")]
    WotNodeNotFound(String),
    #[error("ledger data inconsistency: {0}")]
    DataInconsistency(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
