//! Consensus of the Trellis currency: block validation, ledger index
//! bookkeeping, universal dividend creation and fork resolution.
//!
//! The crate is organized in three layers:
//!
//! - [`model`] holds the state: an in-memory ledger backend and the
//!   certification graph.
//! - [`processes`] are the pure-ish computations: local index extraction,
//!   chain-head derivation, entry annotation against the ledger, distance
//!   checks and derived-entry generation.
//! - [`pipeline`] ties them together: the ordered rule catalogue, the
//!   chain manager that checks/applies/reverts blocks, and the fork
//!   switcher.

pub mod model;
pub mod pipeline;
pub mod processes;

pub use pipeline::applier::{Chain, CheckProfile};
pub use pipeline::switcher::{ForkResolutionDao, Switcher};
