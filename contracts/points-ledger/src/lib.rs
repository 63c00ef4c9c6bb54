//! Points Ledger
//!
//! Tracks deposits of whitelisted tokens and accrues time-weighted points
//! to every depositor.
//!
//! ## Call Model
//!
//! Each mutating entry point (`deposit`, `claim`, `stop_deposits`) runs
//! under the ledger's single-flight lock and follows the same order:
//!
//! ```text
//! acquire lock -> check -> settle target at min(now, stop) with old rate
//!              -> apply event -> (deposit only) external transfer
//!              -> record events -> release lock
//! ```
//!
//! Entry points take `&self` so the token collaborator can hold the ledger
//! during its transfer. A reentrant mutating call from there is rejected by
//! the lock and fails the outer deposit as well. A failed transfer restores
//! every entry the deposit touched.

use std::cell::RefCell;
use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use points_common::{
    access_control::{require_permission, Permission},
    errors::{LedgerError, LedgerResult},
    events::{EventLog, LedgerEvent},
    math::{self, Settlement},
    reentrancy::ReentrancyLock,
    types::{
        AccountView, ActionOutcome, Address, CallContext, LedgerAction, LedgerConfig, Timestamp,
        TokenId, UserAccount,
    },
};

pub mod token_ops;

pub use token_ops::{
    InMemoryTokenBank, StaticTokenRegistry, TokenRegistry, TokenTransfer, TransferRecord,
};


// ============ Ledger State ============

/// Everything the ledger persists
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct LedgerState {
    /// Set once by the owner; no deposits or accrual past this instant
    pub deposit_stop_time: Option<Timestamp>,
    /// Per-user accrual records
    pub accounts: BTreeMap<Address, UserAccount>,
    /// Raw amounts deposited per (user, token)
    pub deposits_by_token: BTreeMap<(Address, TokenId), u128>,
    /// Raw amounts held by the vault per token
    pub custody: BTreeMap<TokenId, u128>,
    /// Sum of every user's accrual rate
    pub total_accrual_rate: u128,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode for persistence
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Decode a persisted state
    pub fn from_bytes(bytes: &[u8]) -> LedgerResult<Self> {
        borsh::from_slice(bytes).map_err(|_| LedgerError::InvalidEncoding)
    }

    /// SHA-256 commitment over the encoded state
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.to_bytes());
        let result = hasher.finalize();
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&result);
        hash
    }

    fn account(&self, user: &Address) -> UserAccount {
        self.accounts.get(user).copied().unwrap_or_default()
    }
}

/// Prior values of every entry a deposit writes
#[derive(Debug)]
struct DepositRollback {
    user: Address,
    token: TokenId,
    account: Option<UserAccount>,
    user_token: Option<u128>,
    custody: Option<u128>,
    total_accrual_rate: u128,
}

impl DepositRollback {
    fn capture(state: &LedgerState, user: Address, token: TokenId) -> Self {
        Self {
            user,
            token,
            account: state.accounts.get(&user).copied(),
            user_token: state.deposits_by_token.get(&(user, token)).copied(),
            custody: state.custody.get(&token).copied(),
            total_accrual_rate: state.total_accrual_rate,
        }
    }

    fn restore(self, state: &mut LedgerState) {
        match self.account {
            Some(account) => state.accounts.insert(self.user, account),
            None => state.accounts.remove(&self.user),
        };
        match self.user_token {
            Some(amount) => state.deposits_by_token.insert((self.user, self.token), amount),
            None => state.deposits_by_token.remove(&(self.user, self.token)),
        };
        match self.custody {
            Some(amount) => state.custody.insert(self.token, amount),
            None => state.custody.remove(&self.token),
        };
        state.total_accrual_rate = self.total_accrual_rate;
    }
}

// ============ Points Ledger ============

/// The points-accrual ledger
pub struct PointsLedger {
    config: LedgerConfig,
    registry: Box<dyn TokenRegistry>,
    transfer: Box<dyn TokenTransfer>,
    state: RefCell<LedgerState>,
    events: RefCell<EventLog>,
    lock: ReentrancyLock,
}

impl PointsLedger {
    /// Deploy an empty ledger
    pub fn new(
        config: LedgerConfig,
        registry: impl TokenRegistry + 'static,
        transfer: impl TokenTransfer + 'static,
    ) -> LedgerResult<Self> {
        Self::with_state(config, registry, transfer, LedgerState::new())
    }

    /// Resume a ledger from persisted state
    pub fn with_state(
        config: LedgerConfig,
        registry: impl TokenRegistry + 'static,
        transfer: impl TokenTransfer + 'static,
        state: LedgerState,
    ) -> LedgerResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: Box::new(registry),
            transfer: Box::new(transfer),
            state: RefCell::new(state),
            events: RefCell::new(EventLog::new()),
            lock: ReentrancyLock::new(),
        })
    }

    // ============ Mutating Entry Points ============

    /// Deposit `amount` raw units of `token` from the caller into the vault
    ///
    /// Settles the caller with the pre-deposit rate, then raises both the
    /// caller's total and rate by the amount normalized to the common scale.
    /// The new account is committed before the transfer runs and restored
    /// if the transfer fails or tries to re-enter the ledger.
    pub fn deposit(&self, ctx: &CallContext, token: TokenId, amount: u128) -> LedgerResult<AccountView> {
        let guard = self.lock.acquire()?;

        if ctx.caller == self.config.vault {
            return Err(LedgerError::VaultDeposit {
                vault: self.config.vault,
            });
        }
        if !self.registry.is_whitelisted(&token) {
            return Err(LedgerError::NotWhitelisted { token });
        }
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let stop_time = self.state.borrow().deposit_stop_time;
        if let Some(stopped_at) = stop_time {
            if !math::deposits_open(ctx.now, stop_time) {
                return Err(LedgerError::DepositsStopped {
                    stopped_at,
                    now: ctx.now,
                });
            }
        }

        let decimals = self.registry.decimals(&token);
        let normalized = math::normalize_amount(amount, decimals, self.config.target_decimals)?;

        let (rollback, settlement, updated) = {
            let mut state = self.state.borrow_mut();
            let settlement = math::settle(&state.account(&ctx.caller), ctx.now, stop_time)?;

            let mut updated = settlement.account;
            updated.total_deposited = updated
                .total_deposited
                .checked_add(normalized)
                .ok_or(LedgerError::Overflow)?;
            updated.accrual_rate = updated
                .accrual_rate
                .checked_add(normalized)
                .ok_or(LedgerError::Overflow)?;

            let total_rate = state
                .total_accrual_rate
                .checked_add(normalized)
                .ok_or(LedgerError::Overflow)?;
            let user_token = state
                .deposits_by_token
                .get(&(ctx.caller, token))
                .copied()
                .unwrap_or(0)
                .checked_add(amount)
                .ok_or(LedgerError::Overflow)?;
            let custody = state
                .custody
                .get(&token)
                .copied()
                .unwrap_or(0)
                .checked_add(amount)
                .ok_or(LedgerError::Overflow)?;

            let rollback = DepositRollback::capture(&state, ctx.caller, token);
            state.accounts.insert(ctx.caller, updated);
            state.deposits_by_token.insert((ctx.caller, token), user_token);
            state.custody.insert(token, custody);
            state.total_accrual_rate = total_rate;

            (rollback, settlement, updated)
        };

        let transferred = self
            .transfer
            .transfer_from(self, &token, &ctx.caller, &self.config.vault, amount)
            .and_then(|()| {
                // A rejected re-entry fails the deposit even if the token ignored it
                if guard.reentry_attempted() {
                    Err(LedgerError::ReentrantCall)
                } else {
                    Ok(())
                }
            });
        if let Err(err) = transferred {
            rollback.restore(&mut self.state.borrow_mut());
            warn!(
                code = err.code(),
                recoverable = err.is_recoverable(),
                amount,
                "deposit transfer failed, state rolled back"
            );
            return Err(err);
        }

        let mut events = self.events.borrow_mut();
        self.record_settlement(&mut events, &ctx.caller, &settlement, ctx.now);
        events.emit(LedgerEvent::Deposited {
            user: ctx.caller,
            token,
            amount,
            normalized,
            new_rate: updated.accrual_rate,
            timestamp: ctx.now,
        });

        info!(
            amount,
            decimals,
            normalized,
            new_rate = updated.accrual_rate,
            "deposit committed"
        );

        Ok(updated.view())
    }

    /// Settle `user` and zero their point balance, returning what it held
    ///
    /// Only the claim manager may call this. The user keeps their rate and
    /// keeps accruing from now on.
    pub fn claim(&self, ctx: &CallContext, user: Address) -> LedgerResult<u128> {
        let _guard = self.lock.acquire()?;
        require_permission(&self.config, &ctx.caller, Permission::ClaimPoints)?;

        let (settlement, claimed) = {
            let mut state = self.state.borrow_mut();
            let Some(account) = state.accounts.get(&user).copied() else {
                debug!("claim for unknown user, nothing to do");
                return Ok(0);
            };

            let settlement = math::settle(&account, ctx.now, state.deposit_stop_time)?;
            let claimed = settlement.account.point_balance;

            let mut updated = settlement.account;
            updated.point_balance = 0;
            state.accounts.insert(user, updated);

            (settlement, claimed)
        };

        let mut events = self.events.borrow_mut();
        self.record_settlement(&mut events, &user, &settlement, ctx.now);
        events.emit(LedgerEvent::PointsClaimed {
            user,
            points: claimed,
            timestamp: ctx.now,
        });

        info!(points = claimed, "points claimed");

        Ok(claimed)
    }

    /// Stop deposits and accrual at the current time, once and for good
    pub fn stop_deposits(&self, ctx: &CallContext) -> LedgerResult<Timestamp> {
        let _guard = self.lock.acquire()?;
        require_permission(&self.config, &ctx.caller, Permission::StopDeposits)?;

        {
            let mut state = self.state.borrow_mut();
            if let Some(stopped_at) = state.deposit_stop_time {
                return Err(LedgerError::AlreadyStopped { stopped_at });
            }
            state.deposit_stop_time = Some(ctx.now);
        }

        self.events.borrow_mut().emit(LedgerEvent::DepositsStopped {
            by: ctx.caller,
            timestamp: ctx.now,
        });

        info!(stopped_at = ctx.now, "deposits stopped");

        Ok(ctx.now)
    }

    /// Dispatch an action to its entry point
    pub fn execute(&self, ctx: &CallContext, action: &LedgerAction) -> LedgerResult<ActionOutcome> {
        match action {
            LedgerAction::Deposit { token, amount } => {
                self.deposit(ctx, *token, *amount).map(ActionOutcome::Deposited)
            }
            LedgerAction::Claim { user } => self.claim(ctx, *user).map(ActionOutcome::Claimed),
            LedgerAction::StopDeposits => self.stop_deposits(ctx).map(ActionOutcome::Stopped),
        }
    }

    // ============ Read-only Queries ============

    /// Balance `user` would hold after a settlement at `now`
    ///
    /// Same formula as the mutating paths, so a query followed by a
    /// settling call at the same `now` yields the same number.
    pub fn points_of(&self, user: &Address, now: Timestamp) -> LedgerResult<u128> {
        let state = self.state.borrow();
        math::pending_points(&state.account(user), now, state.deposit_stop_time)
    }

    /// `(total_deposited, accrual_rate, point_balance)` for `user`
    pub fn account(&self, user: &Address) -> AccountView {
        self.state.borrow().account(user).view()
    }

    /// Full account record, if the user ever deposited
    pub fn account_record(&self, user: &Address) -> Option<UserAccount> {
        self.state.borrow().accounts.get(user).copied()
    }

    pub fn deposit_stop_time(&self) -> Option<Timestamp> {
        self.state.borrow().deposit_stop_time
    }

    /// Whether a deposit at `now` would pass the stop-time check
    pub fn deposits_open(&self, now: Timestamp) -> bool {
        math::deposits_open(now, self.state.borrow().deposit_stop_time)
    }

    /// Raw amount of `token` held by the vault
    pub fn custody_of(&self, token: &TokenId) -> u128 {
        self.state.borrow().custody.get(token).copied().unwrap_or(0)
    }

    /// Raw amount of `token` deposited by `user`
    pub fn deposited_of(&self, user: &Address, token: &TokenId) -> u128 {
        self.state
            .borrow()
            .deposits_by_token
            .get(&(*user, *token))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_accrual_rate(&self) -> u128 {
        self.state.borrow().total_accrual_rate
    }

    pub fn account_count(&self) -> usize {
        self.state.borrow().accounts.len()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Copy of the persisted state
    pub fn snapshot(&self) -> LedgerState {
        self.state.borrow().clone()
    }

    /// SHA-256 commitment over the current state
    pub fn state_hash(&self) -> [u8; 32] {
        self.state.borrow().hash()
    }

    /// Events recorded so far
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.borrow().events().to_vec()
    }

    /// Drain recorded events
    pub fn take_events(&self) -> Vec<LedgerEvent> {
        std::mem::take(&mut *self.events.borrow_mut()).into_events()
    }

    /// True while a mutating call is in progress
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    // ============ Helpers ============

    fn record_settlement(
        &self,
        events: &mut EventLog,
        user: &Address,
        settlement: &Settlement,
        now: Timestamp,
    ) {
        if settlement.delta_points == 0 {
            return;
        }
        debug!(
            elapsed = settlement.elapsed,
            delta = settlement.delta_points,
            balance = settlement.account.point_balance,
            "settled pending points"
        );
        events.emit(LedgerEvent::PointsSettled {
            user: *user,
            delta_points: settlement.delta_points,
            new_balance: settlement.account.point_balance,
            timestamp: now,
        });
    }
}

impl std::fmt::Debug for PointsLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointsLedger")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("locked", &self.lock.is_locked())
            .finish()
    }
}
