//! Single-flight reentrancy lock
//!
//! One call stack at a time may run through the mutating entry points of a
//! ledger. Acquisition never blocks: a second acquisition while the lock is
//! held fails immediately with [`LedgerError::ReentrantCall`]. The returned
//! guard releases the lock when dropped, which covers early returns via `?`
//! and unwinding.
//!
//! Rejections are remembered for the lifetime of the outer guard, so the
//! holder can detect an attempted re-entry even when the callback that made
//! it discarded the error.

use core::cell::Cell;

use crate::errors::{LedgerError, LedgerResult};

/// Exclusive per-ledger entry lock
#[derive(Debug, Default)]
pub struct ReentrancyLock {
    entered: Cell<bool>,
    rejected: Cell<bool>,
}

impl ReentrancyLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for the lifetime of the returned guard
    pub fn acquire(&self) -> LedgerResult<LockGuard<'_>> {
        if self.entered.replace(true) {
            self.rejected.set(true);
            tracing::warn!("reentrant call rejected");
            return Err(LedgerError::ReentrantCall);
        }
        self.rejected.set(false);
        Ok(LockGuard { lock: self })
    }

    /// True while a guard is alive
    pub fn is_locked(&self) -> bool {
        self.entered.get()
    }
}

/// Proof of exclusive entry; releases the lock on drop
#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LockGuard<'a> {
    lock: &'a ReentrancyLock,
}

impl LockGuard<'_> {
    /// True if anything tried to enter while this guard was held
    pub fn reentry_attempted(&self) -> bool {
        self.lock.rejected.get()
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.lock.entered.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_fast() {
        let lock = ReentrancyLock::new();
        let guard = lock.acquire().unwrap();
        assert!(lock.is_locked());
        assert_eq!(lock.acquire().unwrap_err(), LedgerError::ReentrantCall);
        drop(guard);
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_released_on_error_path() {
        fn fails(lock: &ReentrancyLock) -> LedgerResult<()> {
            let _guard = lock.acquire()?;
            Err(LedgerError::ZeroAmount)
        }

        let lock = ReentrancyLock::new();
        assert_eq!(fails(&lock), Err(LedgerError::ZeroAmount));
        assert!(!lock.is_locked());
        assert!(lock.acquire().is_ok());
    }

    #[test]
    fn test_released_on_unwind() {
        let lock = ReentrancyLock::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = lock.acquire().unwrap();
            panic!("collaborator panicked");
        }));
        assert!(result.is_err());
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_rejected_acquire_keeps_outer_lock() {
        let lock = ReentrancyLock::new();
        let _outer = lock.acquire().unwrap();
        let _ = lock.acquire();
        // The failed inner attempt must not release the outer holder
        assert!(lock.is_locked());
    }

    #[test]
    fn test_rejection_visible_to_outer_guard() {
        let lock = ReentrancyLock::new();
        let outer = lock.acquire().unwrap();
        assert!(!outer.reentry_attempted());

        // Inner caller drops the error
        assert!(lock.acquire().is_err());
        assert!(outer.reentry_attempted());
        drop(outer);

        let next = lock.acquire().unwrap();
        assert!(!next.reentry_attempted());
    }
}
