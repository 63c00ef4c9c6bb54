//! Token collaborators
//!
//! The ledger never moves tokens itself. It asks a [`TokenRegistry`] whether
//! a token is acceptable and how many decimals it has, and asks a
//! [`TokenTransfer`] to move the deposit into the vault. Both are external
//! components; this module defines their seams and ships in-memory
//! implementations for embedding and tests.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use points_common::{Address, LedgerError, LedgerResult, TokenId};

use crate::PointsLedger;

/// Whitelist predicate and decimals oracle
pub trait TokenRegistry {
    /// Whether deposits of `token` are accepted
    fn is_whitelisted(&self, token: &TokenId) -> bool;

    /// Native decimal precision of `token`
    fn decimals(&self, token: &TokenId) -> u8;
}

/// Moves value from a depositor to the vault
///
/// Runs while the ledger's entry lock is held. The ledger passes itself so
/// an implementation can observe it or call back into it, the way a token
/// contract with transfer hooks can; any mutating call made from here fails
/// with [`LedgerError::ReentrantCall`], and so does the deposit that made the
/// transfer. Returning an error aborts the deposit and rolls back every
/// change it made.
pub trait TokenTransfer {
    fn transfer_from(
        &self,
        ledger: &PointsLedger,
        token: &TokenId,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> LedgerResult<()>;
}

impl<T: TokenRegistry + ?Sized> TokenRegistry for Rc<T> {
    fn is_whitelisted(&self, token: &TokenId) -> bool {
        (**self).is_whitelisted(token)
    }

    fn decimals(&self, token: &TokenId) -> u8 {
        (**self).decimals(token)
    }
}

impl<T: TokenTransfer + ?Sized> TokenTransfer for Rc<T> {
    fn transfer_from(
        &self,
        ledger: &PointsLedger,
        token: &TokenId,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> LedgerResult<()> {
        (**self).transfer_from(ledger, token, from, to, amount)
    }
}

// ============================================================================
// Static registry
// ============================================================================

/// Fixed whitelist mapping each accepted token to its decimals
#[derive(Debug, Clone, Default)]
pub struct StaticTokenRegistry {
    tokens: BTreeMap<TokenId, u8>,
}

impl StaticTokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`add_token`](Self::add_token)
    pub fn with_token(mut self, token: TokenId, decimals: u8) -> Self {
        self.add_token(token, decimals);
        self
    }

    /// Accept `token` with the given precision
    pub fn add_token(&mut self, token: TokenId, decimals: u8) {
        self.tokens.insert(token, decimals);
    }

    /// Stop accepting `token`
    pub fn remove_token(&mut self, token: &TokenId) -> bool {
        self.tokens.remove(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl TokenRegistry for StaticTokenRegistry {
    fn is_whitelisted(&self, token: &TokenId) -> bool {
        self.tokens.contains_key(token)
    }

    // Unknown tokens report an unsupported precision so they can never be
    // normalized even if a caller skips the whitelist check.
    fn decimals(&self, token: &TokenId) -> u8 {
        self.tokens.get(token).copied().unwrap_or(u8::MAX)
    }
}

// ============================================================================
// In-memory token bank
// ============================================================================

/// Record of one completed transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRecord {
    pub token: TokenId,
    pub from: Address,
    pub to: Address,
    pub amount: u128,
}

/// Balances held per (holder, token), moved atomically by `transfer_from`
#[derive(Debug, Default)]
pub struct InMemoryTokenBank {
    balances: RefCell<BTreeMap<(Address, TokenId), u128>>,
    history: RefCell<Vec<TransferRecord>>,
}

impl InMemoryTokenBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `holder` with `amount` of `token`
    pub fn mint(&self, holder: Address, token: TokenId, amount: u128) -> LedgerResult<()> {
        let mut balances = self.balances.borrow_mut();
        let balance = balances.entry((holder, token)).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    /// Current balance of `holder` in `token`
    pub fn balance_of(&self, holder: &Address, token: &TokenId) -> u128 {
        self.balances
            .borrow()
            .get(&(*holder, *token))
            .copied()
            .unwrap_or(0)
    }

    /// Transfers completed so far, oldest first
    pub fn history(&self) -> Vec<TransferRecord> {
        self.history.borrow().clone()
    }

    fn move_balance(
        &self,
        token: &TokenId,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> LedgerResult<()> {
        let failed = || LedgerError::TransferFailed {
            token: *token,
            from: *from,
            to: *to,
            amount,
        };

        let mut balances = self.balances.borrow_mut();
        let from_balance = balances.get(&(*from, *token)).copied().unwrap_or(0);
        let to_balance = balances.get(&(*to, *token)).copied().unwrap_or(0);

        let new_from = from_balance.checked_sub(amount).ok_or_else(failed)?;
        let new_to = if from == to {
            from_balance
        } else {
            to_balance.checked_add(amount).ok_or_else(failed)?
        };

        if from == to {
            balances.insert((*from, *token), new_to);
        } else {
            balances.insert((*from, *token), new_from);
            balances.insert((*to, *token), new_to);
        }
        Ok(())
    }
}

impl TokenTransfer for InMemoryTokenBank {
    fn transfer_from(
        &self,
        _ledger: &PointsLedger,
        token: &TokenId,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> LedgerResult<()> {
        self.move_balance(token, from, to, amount)?;
        self.history.borrow_mut().push(TransferRecord {
            token: *token,
            from: *from,
            to: *to,
            amount,
        });
        Ok(())
    }
}
