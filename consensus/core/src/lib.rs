pub mod api;
pub mod block;
pub mod blockstamp;
pub mod config;
pub mod constants;
pub mod errors;
pub mod hash;
pub mod head;
pub mod index;
pub mod keys;

/// Height of a block within the chain.
pub type BlockNumber = u64;

/// Seconds since the UNIX epoch, as carried by block time fields.
pub type Timestamp = u64;
