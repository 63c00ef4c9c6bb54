//! Points Ledger Common Library
//!
//! Shared types, constants and the settlement arithmetic used by the
//! points ledger.
//!
//! ## Accrual Model
//!
//! Every depositor carries an accrual rate ("points per hour") equal to the
//! sum of their normalized deposits. Points are folded into the depositor's
//! balance lazily, on settlement:
//!
//! ```text
//! effective_now = min(now, deposit_stop_time)
//! delta_points  = (effective_now - last_update) * accrual_rate / 3600
//! ```
//!
//! - **Normalization**: every token amount is scaled to 18 decimals before it
//!   touches the accrual rate, so a 6-decimal stablecoin and an 18-decimal
//!   token earn the same points per nominal unit
//! - **Stop capping**: once deposits are stopped, no settlement advances past
//!   the stop instant
//! - **Single-flight lock**: mutating entry points hold an exclusive lock
//!   for the whole call, including the external token transfer
//!
//! This crate is `no_std` compatible when built without the `std` feature.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

// Re-export Vec for submodules based on feature
#[cfg(not(feature = "std"))]
pub use alloc::vec::Vec;
#[cfg(feature = "std")]
pub use std::vec::Vec;

pub mod constants;
pub mod errors;
pub mod types;
pub mod math;
pub mod events;
pub mod access_control;
pub mod reentrancy;

// Re-exports for convenience
pub use constants::*;
pub use errors::*;
pub use types::*;
pub use math::*;
pub use events::*;
pub use access_control::*;
pub use reentrancy::*;
