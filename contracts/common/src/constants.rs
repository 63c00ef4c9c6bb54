//! Ledger Constants
//!
//! Fixed parameters of the accrual engine. Grouped in submodules so call
//! sites read as `time::SECONDS_PER_HOUR` or `precision::TARGET_DECIMALS`.

/// Time-related constants
pub mod time {
    /// Accrual rates are expressed per hour; timestamps are in seconds
    pub const SECONDS_PER_HOUR: u64 = 3_600;
}

/// Precision constants
pub mod precision {
    /// Common fixed-point scale every deposit is normalized to
    pub const TARGET_DECIMALS: u8 = 18;

    /// One whole unit at the common scale (1e18)
    pub const ONE: u128 = 1_000_000_000_000_000_000;

    /// Largest scale whose power of ten still fits in a u128
    pub const MAX_TARGET_DECIMALS: u8 = 38;
}

/// Address constants
pub mod address {
    use crate::types::Address;

    /// The all-zero address, never a valid role holder or vault
    pub const ZERO: Address = [0u8; 32];
}
