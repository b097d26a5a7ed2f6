//! Protocol-wide constants. These participate in consensus: changing any of
//! them is a protocol change.

/// Maximum number of decimal digits of a universal dividend before the
/// amount is rescaled into the next unit base.
pub const NB_DIGITS_UD: u32 = 4;

/// A membership can be implicitly revoked `REVOCATION_FACTOR * ms_validity`
/// seconds after its creation.
pub const REVOCATION_FACTOR: u64 = 2;

/// Window (in seconds) during which a transaction document may be written
/// after the block it is anchored to.
pub const TX_WINDOW: u64 = 3600 * 24 * 7;

/// Hexadecimal relation between two proof-of-work difficulty units,
/// approximately `16^(1/16)`.
pub const POW_DIFFICULTY_RANGE_RATIO: f64 = 1.189;

/// Accounts whose balance falls below `100 * 10^unit_base` have their
/// remaining sources garbage-collected.
pub const ACCOUNT_MINIMUM_CURRENT_BASED_AMOUNT: u64 = 100;

/// For a personalized difficulty `D = 16 * zeros + remainder`, the
/// hexadecimal digit following the zeros must be at most
/// `POW_UPPER_BOUND[remainder]`. The last entry covers remainder 15 in case
/// it ever happens.
pub const POW_UPPER_BOUND: [u8; 16] = [15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 1];

/// Floor for the size rule: a block is always allowed to reach this size,
/// whatever the rolling average says.
pub const MIN_ACCEPTABLE_BLOCK_SIZE: u64 = 500;
