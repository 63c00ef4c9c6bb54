//! Settlement Math for the Points Ledger
//!
//! Pure functions shared by every mutating entry point and by the read-only
//! points query, so rounding and stop-time capping cannot diverge between
//! call sites.
//!
//! Truncation is floor division at every settlement. The dust lost to one
//! settlement is `(elapsed * rate) % 3600 / 3600`, strictly less than one
//! point.

use crate::constants::time::SECONDS_PER_HOUR;
use crate::errors::{LedgerError, LedgerResult};
use crate::types::{Timestamp, UserAccount};

/// Outcome of settling one account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Account after the pending accrual was folded in
    pub account: UserAccount,
    /// Points added by this settlement
    pub delta_points: u128,
    /// Seconds of accrual covered by this settlement
    pub elapsed: u64,
}

/// Current time capped at the stop time, if one is set
pub fn effective_time(now: Timestamp, stop_time: Option<Timestamp>) -> Timestamp {
    match stop_time {
        Some(stop) => now.min(stop),
        None => now,
    }
}

/// Seconds between `last_update` and `effective_now`, zero when the marker
/// is already at or past it
pub fn elapsed_since(last_update: Timestamp, effective_now: Timestamp) -> u64 {
    if effective_now <= last_update {
        0
    } else {
        effective_now - last_update
    }
}

/// Points accrued over `elapsed` seconds at `rate` points per hour
///
/// `elapsed * rate / 3600`, truncating toward zero.
pub fn accrued_points(rate: u128, elapsed: u64) -> LedgerResult<u128> {
    let weighted = (elapsed as u128)
        .checked_mul(rate)
        .ok_or(LedgerError::Overflow)?;

    Ok(weighted / SECONDS_PER_HOUR as u128)
}

/// Fold pending accrual into a copy of `account`
///
/// Uses the account's current (pre-event) rate. The last-update marker
/// moves to the effective time and never backwards, so once it has been
/// capped at the stop time every later settlement covers zero seconds.
pub fn settle(
    account: &UserAccount,
    now: Timestamp,
    stop_time: Option<Timestamp>,
) -> LedgerResult<Settlement> {
    let effective_now = effective_time(now, stop_time);
    let elapsed = elapsed_since(account.last_update, effective_now);
    let delta_points = accrued_points(account.accrual_rate, elapsed)?;

    let mut settled = *account;
    settled.point_balance = settled
        .point_balance
        .checked_add(delta_points)
        .ok_or(LedgerError::Overflow)?;
    settled.last_update = settled.last_update.max(effective_now);

    Ok(Settlement {
        account: settled,
        delta_points,
        elapsed,
    })
}

/// Balance `account` would hold after a settlement at `now`
pub fn pending_points(
    account: &UserAccount,
    now: Timestamp,
    stop_time: Option<Timestamp>,
) -> LedgerResult<u128> {
    settle(account, now, stop_time).map(|s| s.account.point_balance)
}

/// Scale a raw token amount to `target_decimals`
///
/// `amount * 10^(target_decimals - token_decimals)`; tokens more precise
/// than the target scale are rejected rather than truncated.
pub fn normalize_amount(amount: u128, token_decimals: u8, target_decimals: u8) -> LedgerResult<u128> {
    if token_decimals > target_decimals {
        return Err(LedgerError::UnsupportedDecimals {
            decimals: token_decimals,
            max: target_decimals,
        });
    }

    let factor = 10u128
        .checked_pow((target_decimals - token_decimals) as u32)
        .ok_or(LedgerError::Overflow)?;

    amount.checked_mul(factor).ok_or(LedgerError::Overflow)
}

/// True while deposits are still accepted at `now`
pub fn deposits_open(now: Timestamp, stop_time: Option<Timestamp>) -> bool {
    match stop_time {
        Some(stop) => now < stop,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::precision::{ONE, TARGET_DECIMALS};
    use proptest::prelude::*;

    const HOUR: u64 = SECONDS_PER_HOUR;

    fn account(rate: u128, last_update: u64) -> UserAccount {
        UserAccount {
            total_deposited: rate,
            accrual_rate: rate,
            last_update,
            point_balance: 0,
        }
    }

    #[test]
    fn test_one_hour_at_rate_100() {
        let acc = account(100, 1_000);
        let s = settle(&acc, 1_000 + HOUR, None).unwrap();
        assert_eq!(s.delta_points, 100);
        assert_eq!(s.account.point_balance, 100);
        assert_eq!(s.account.last_update, 1_000 + HOUR);
    }

    #[test]
    fn test_settlement_capped_at_stop() {
        let acc = account(100, 1_000);
        let stop = 1_000 + HOUR;

        // Two hours past the stop only one hour counts
        let s = settle(&acc, stop + 2 * HOUR, Some(stop)).unwrap();
        assert_eq!(s.elapsed, HOUR);
        assert_eq!(s.account.point_balance, 100);
        assert_eq!(s.account.last_update, stop);

        // A second settlement later still adds nothing
        let again = settle(&s.account, stop + 10 * HOUR, Some(stop)).unwrap();
        assert_eq!(again.delta_points, 0);
        assert_eq!(again.account, s.account);
    }

    #[test]
    fn test_marker_past_stop_does_not_underflow() {
        // Marker already beyond the effective time
        let acc = account(500, 2_000);
        let s = settle(&acc, 5_000, Some(1_500)).unwrap();
        assert_eq!(s.elapsed, 0);
        assert_eq!(s.delta_points, 0);
        assert_eq!(s.account.last_update, 2_000);
    }

    #[test]
    fn test_clock_behind_marker_is_noop() {
        let acc = account(100, 10_000);
        let s = settle(&acc, 9_000, None).unwrap();
        assert_eq!(s.delta_points, 0);
        assert_eq!(s.account.last_update, 10_000);
    }

    #[test]
    fn test_truncation() {
        // 1 second at 3599 points/hour rounds down to zero
        assert_eq!(accrued_points(3_599, 1).unwrap(), 0);
        assert_eq!(accrued_points(3_600, 1).unwrap(), 1);
        assert_eq!(accrued_points(7_199, 1).unwrap(), 1);
    }

    #[test]
    fn test_accrual_overflow() {
        assert_eq!(accrued_points(u128::MAX, 2), Err(LedgerError::Overflow));
    }

    #[test]
    fn test_balance_overflow() {
        let mut acc = account(HOUR as u128, 0);
        acc.point_balance = u128::MAX;
        assert_eq!(settle(&acc, 1, None), Err(LedgerError::Overflow));
    }

    #[test]
    fn test_normalize_amount() {
        assert_eq!(normalize_amount(100, 18, 18).unwrap(), 100);
        assert_eq!(normalize_amount(100, 6, 18).unwrap(), 100_000_000_000_000);
        assert_eq!(normalize_amount(1, 0, 18).unwrap(), ONE);
    }

    #[test]
    fn test_normalize_rejects_wide_tokens() {
        assert_eq!(
            normalize_amount(100, 24, 18),
            Err(LedgerError::UnsupportedDecimals { decimals: 24, max: 18 })
        );
    }

    #[test]
    fn test_normalize_overflow() {
        assert_eq!(normalize_amount(u128::MAX, 0, 18), Err(LedgerError::Overflow));
    }

    #[test]
    fn test_deposits_open() {
        assert!(deposits_open(100, None));
        assert!(deposits_open(99, Some(100)));
        assert!(!deposits_open(100, Some(100)));
        assert!(!deposits_open(101, Some(100)));
    }

    proptest! {
        #[test]
        fn prop_split_settlement_loses_under_one_point(
            rate in 0u128..1_000_000_000_000_000_000_000u128,
            first in 0u64..10_000_000,
            second in 0u64..10_000_000,
        ) {
            let start = account(rate, 1);
            let whole = settle(&start, 1 + first + second, None).unwrap();

            let mid = settle(&start, 1 + first, None).unwrap();
            let split = settle(&mid.account, 1 + first + second, None).unwrap();

            let whole_pts = whole.account.point_balance;
            let split_pts = split.account.point_balance;
            prop_assert!(split_pts <= whole_pts);
            prop_assert!(whole_pts - split_pts <= 1);
            prop_assert_eq!(split.account.last_update, whole.account.last_update);
        }

        #[test]
        fn prop_no_accrual_past_stop(
            rate in 0u128..1_000_000_000_000u128,
            last_update in 1u64..1_000_000,
            until_stop in 0u64..1_000_000,
            after_stop in 0u64..1_000_000,
        ) {
            let stop = last_update + until_stop;
            let acc = account(rate, last_update);
            let at_stop = settle(&acc, stop, Some(stop)).unwrap();
            let later = settle(&acc, stop + after_stop, Some(stop)).unwrap();
            prop_assert_eq!(at_stop, later);
            prop_assert!(later.account.last_update <= stop);
        }

        #[test]
        fn prop_query_matches_settlement(
            rate in 0u128..1_000_000_000_000u128,
            last_update in 0u64..1_000_000,
            now in 0u64..2_000_000,
            stop in proptest::option::of(0u64..2_000_000),
        ) {
            let acc = account(rate, last_update);
            let queried = pending_points(&acc, now, stop).unwrap();
            let settled = settle(&acc, now, stop).unwrap();
            prop_assert_eq!(queried, settled.account.point_balance);
        }

        #[test]
        fn prop_normalization_is_decimal_fair(
            whole_units in 0u128..1_000_000_000,
            decimals in 0u8..=TARGET_DECIMALS,
        ) {
            let raw = whole_units * 10u128.pow(decimals as u32);
            let normalized = normalize_amount(raw, decimals, TARGET_DECIMALS).unwrap();
            prop_assert_eq!(normalized, whole_units * ONE);
        }
    }
}
