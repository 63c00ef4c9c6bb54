//! Error Types for the Points Ledger
//!
//! Every failure is local to the triggering call and aborts it with no
//! state change. Nothing is retried internally.

use core::fmt;

use crate::types::{Address, TokenId};

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Main error enum for all ledger errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // ============ Deposit Errors ============
    /// Token is not accepted by the whitelist predicate
    NotWhitelisted { token: TokenId },

    /// Zero amount not allowed
    ZeroAmount,

    /// Deposits were stopped at or before the current time
    DepositsStopped { stopped_at: u64, now: u64 },

    /// Token precision exceeds the common fixed-point scale
    UnsupportedDecimals { decimals: u8, max: u8 },

    /// The vault itself cannot deposit into the ledger
    VaultDeposit { vault: Address },

    // ============ Authorization Errors ============
    /// Caller does not hold the role required for this operation
    Unauthorized { expected: Address, actual: Address },

    // ============ Stop Errors ============
    /// Deposits have already been stopped
    AlreadyStopped { stopped_at: u64 },

    // ============ Collaborator Errors ============
    /// Token transfer into the vault failed
    TransferFailed {
        token: TokenId,
        from: Address,
        to: Address,
        amount: u128,
    },

    /// A mutating entry point was re-entered while another call was active
    ReentrantCall,

    // ============ Math Errors ============
    /// Arithmetic overflow occurred
    Overflow,

    // ============ Configuration Errors ============
    /// Ledger configuration is unusable
    InvalidConfig { param: &'static str, reason: &'static str },

    /// Encoded action or state could not be decoded
    InvalidEncoding,
}

impl LedgerError {
    /// Returns a stable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotWhitelisted { .. } => "E001_NOT_WHITELISTED",
            Self::ZeroAmount => "E002_ZERO_AMOUNT",
            Self::DepositsStopped { .. } => "E003_DEPOSITS_STOPPED",
            Self::UnsupportedDecimals { .. } => "E004_UNSUPPORTED_DECIMALS",
            Self::VaultDeposit { .. } => "E005_VAULT_DEPOSIT",
            Self::Unauthorized { .. } => "E010_UNAUTHORIZED",
            Self::AlreadyStopped { .. } => "E020_ALREADY_STOPPED",
            Self::TransferFailed { .. } => "E030_TRANSFER_FAILED",
            Self::ReentrantCall => "E031_REENTRANT_CALL",
            Self::Overflow => "E040_OVERFLOW",
            Self::InvalidConfig { .. } => "E050_INVALID_CONFIG",
            Self::InvalidEncoding => "E051_INVALID_ENCODING",
        }
    }

    /// Returns true if the caller can succeed by retrying the whole call
    /// after changing something on their side
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::TransferFailed { .. } => true, // Fund or approve, then retry
            Self::ReentrantCall => true,         // Retry outside the callback
            _ => false,
        }
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotWhitelisted { .. } => write!(f, "token is not whitelisted"),
            Self::ZeroAmount => write!(f, "amount must be nonzero"),
            Self::DepositsStopped { stopped_at, now } => {
                write!(f, "deposits stopped at {} (now {})", stopped_at, now)
            }
            Self::UnsupportedDecimals { decimals, max } => {
                write!(f, "token has {} decimals, at most {} supported", decimals, max)
            }
            Self::VaultDeposit { .. } => write!(f, "the vault cannot deposit"),
            Self::Unauthorized { .. } => write!(f, "caller is not authorized"),
            Self::AlreadyStopped { stopped_at } => {
                write!(f, "deposits already stopped at {}", stopped_at)
            }
            Self::TransferFailed { amount, .. } => {
                write!(f, "transfer of {} into the vault failed", amount)
            }
            Self::ReentrantCall => write!(f, "reentrant call rejected"),
            Self::Overflow => write!(f, "arithmetic overflow"),
            Self::InvalidConfig { param, reason } => {
                write!(f, "invalid config `{}`: {}", param, reason)
            }
            Self::InvalidEncoding => write!(f, "invalid encoding"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LedgerError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_error_codes_unique() {
        let errors = [
            LedgerError::NotWhitelisted { token: [1u8; 32] },
            LedgerError::ZeroAmount,
            LedgerError::DepositsStopped { stopped_at: 10, now: 11 },
            LedgerError::UnsupportedDecimals { decimals: 24, max: 18 },
            LedgerError::VaultDeposit { vault: [3u8; 32] },
            LedgerError::Unauthorized {
                expected: [1u8; 32],
                actual: [2u8; 32],
            },
            LedgerError::AlreadyStopped { stopped_at: 10 },
            LedgerError::TransferFailed {
                token: [1u8; 32],
                from: [2u8; 32],
                to: [3u8; 32],
                amount: 5,
            },
            LedgerError::ReentrantCall,
            LedgerError::Overflow,
            LedgerError::InvalidConfig { param: "owner", reason: "zero" },
            LedgerError::InvalidEncoding,
        ];

        let codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        let unique: BTreeSet<_> = codes.iter().collect();
        assert_eq!(codes.len(), unique.len(), "Error codes must be unique");
    }

    #[test]
    fn test_display_includes_context() {
        let err = LedgerError::DepositsStopped { stopped_at: 100, now: 250 };
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("250"));
    }

    #[test]
    fn test_recoverable() {
        assert!(LedgerError::ReentrantCall.is_recoverable());
        assert!(!LedgerError::ZeroAmount.is_recoverable());
        assert!(!LedgerError::AlreadyStopped { stopped_at: 1 }.is_recoverable());
    }
}
