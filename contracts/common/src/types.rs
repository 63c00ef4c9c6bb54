//! Core Types for the Points Ledger
//!
//! Account records, configuration, call context and the action set
//! accepted by the ledger.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::{address, precision};
use crate::errors::{LedgerError, LedgerResult};

/// Type alias for addresses (32-byte hash)
pub type Address = [u8; 32];

/// Type alias for token identifiers
pub type TokenId = [u8; 32];

/// Seconds since the epoch, supplied by the caller on every call
pub type Timestamp = u64;

// ============ Account Types ============

/// Per-user accrual record
///
/// Created zeroed on first deposit and never removed. `claim` only resets
/// `point_balance`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct UserAccount {
    /// Sum of all normalized deposits, never decreases
    pub total_deposited: u128,
    /// Points per hour, increased by each normalized deposit
    pub accrual_rate: u128,
    /// Time up to which accrual has been folded into `point_balance`
    pub last_update: Timestamp,
    /// Accrued, unclaimed points
    pub point_balance: u128,
}

impl UserAccount {
    /// Creates an empty account
    pub fn new() -> Self {
        Self::default()
    }

    /// Public projection of the account
    pub fn view(&self) -> AccountView {
        AccountView {
            total_deposited: self.total_deposited,
            accrual_rate: self.accrual_rate,
            point_balance: self.point_balance,
        }
    }
}

/// Read API tuple exposed per user
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct AccountView {
    /// Sum of normalized deposits
    pub total_deposited: u128,
    /// Points per hour
    pub accrual_rate: u128,
    /// Points settled so far (not including pending accrual)
    pub point_balance: u128,
}

// ============ Configuration ============

/// Ledger configuration, fixed at deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct LedgerConfig {
    /// May stop deposits
    pub owner: Address,
    /// May zero a user's points
    pub claim_manager: Address,
    /// Receives deposited tokens
    pub vault: Address,
    /// Common fixed-point scale for accrual rates
    pub target_decimals: u8,
}

impl LedgerConfig {
    /// Config with the default 18-decimal scale
    pub fn new(owner: Address, claim_manager: Address, vault: Address) -> Self {
        Self {
            owner,
            claim_manager,
            vault,
            target_decimals: precision::TARGET_DECIMALS,
        }
    }

    /// Reject configurations the ledger cannot operate with
    pub fn validate(&self) -> LedgerResult<()> {
        if self.owner == address::ZERO {
            return Err(LedgerError::InvalidConfig {
                param: "owner",
                reason: "owner cannot be the zero address",
            });
        }
        if self.claim_manager == address::ZERO {
            return Err(LedgerError::InvalidConfig {
                param: "claim_manager",
                reason: "claim manager cannot be the zero address",
            });
        }
        if self.vault == address::ZERO {
            return Err(LedgerError::InvalidConfig {
                param: "vault",
                reason: "vault cannot be the zero address",
            });
        }
        if self.target_decimals > precision::MAX_TARGET_DECIMALS {
            return Err(LedgerError::InvalidConfig {
                param: "target_decimals",
                reason: "scale does not fit in 128 bits",
            });
        }
        Ok(())
    }
}

// ============ Call Context ============

/// Who is calling and when
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Caller address
    pub caller: Address,
    /// Current wall-clock time in seconds
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self { caller, now }
    }
}

// ============ Actions ============

/// Mutating operations accepted by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum LedgerAction {
    /// Deposit `amount` raw units of `token` from the caller
    Deposit { token: TokenId, amount: u128 },
    /// Zero `user`'s points (claim manager only)
    Claim { user: Address },
    /// Halt deposits and accrual at the current time (owner only)
    StopDeposits,
}

impl LedgerAction {
    /// Encode for transport
    pub fn to_bytes(&self) -> crate::Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Decode from transport bytes
    pub fn from_bytes(bytes: &[u8]) -> LedgerResult<Self> {
        borsh::from_slice(bytes).map_err(|_| LedgerError::InvalidEncoding)
    }
}

/// Result of a successfully executed action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    /// Deposit committed; the depositor's new account view
    Deposited(AccountView),
    /// Points claimed for a user
    Claimed(u128),
    /// Deposits stopped at the given time
    Stopped(Timestamp),
}
