//! Access Control Module
//!
//! Capability predicates over the explicit role fields of [`LedgerConfig`].
//! There is no role registry: the owner and the claim manager are fixed at
//! deployment and every privileged entry point checks its predicate.

use crate::errors::{LedgerError, LedgerResult};
use crate::types::{Address, LedgerConfig};

/// Ledger roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Deployer, may stop deposits
    Owner,
    /// Off-chain redemption operator, may zero points
    ClaimManager,
}

/// Privileged operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Halt deposits and accrual
    StopDeposits,
    /// Zero a user's accrued points
    ClaimPoints,
}

impl Permission {
    /// Role required for this permission
    pub fn required_role(&self) -> Role {
        match self {
            Permission::StopDeposits => Role::Owner,
            Permission::ClaimPoints => Role::ClaimManager,
        }
    }
}

impl LedgerConfig {
    /// Check if `caller` is the owner
    pub fn is_owner(&self, caller: &Address) -> bool {
        self.owner == *caller
    }

    /// Check if `caller` is the claim manager
    pub fn is_claim_manager(&self, caller: &Address) -> bool {
        self.claim_manager == *caller
    }

    /// Address holding `role`
    pub fn holder_of(&self, role: Role) -> Address {
        match role {
            Role::Owner => self.owner,
            Role::ClaimManager => self.claim_manager,
        }
    }
}

/// Check if address holds a specific role
pub fn has_role(config: &LedgerConfig, address: &Address, role: Role) -> bool {
    match role {
        Role::Owner => config.is_owner(address),
        Role::ClaimManager => config.is_claim_manager(address),
    }
}

/// Fail with `Unauthorized` unless `caller` may perform `permission`
pub fn require_permission(
    config: &LedgerConfig,
    caller: &Address,
    permission: Permission,
) -> LedgerResult<()> {
    let role = permission.required_role();
    if has_role(config, caller, role) {
        Ok(())
    } else {
        Err(LedgerError::Unauthorized {
            expected: config.holder_of(role),
            actual: *caller,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Address {
        [1u8; 32]
    }

    fn manager() -> Address {
        [2u8; 32]
    }

    fn config() -> LedgerConfig {
        LedgerConfig::new(owner(), manager(), [9u8; 32])
    }

    #[test]
    fn test_role_predicates() {
        let config = config();
        assert!(config.is_owner(&owner()));
        assert!(!config.is_owner(&manager()));
        assert!(config.is_claim_manager(&manager()));
        assert!(!config.is_claim_manager(&owner()));
    }

    #[test]
    fn test_roles_do_not_overlap() {
        let config = config();
        assert!(require_permission(&config, &owner(), Permission::StopDeposits).is_ok());
        assert!(require_permission(&config, &manager(), Permission::ClaimPoints).is_ok());

        assert_eq!(
            require_permission(&config, &owner(), Permission::ClaimPoints),
            Err(LedgerError::Unauthorized {
                expected: manager(),
                actual: owner(),
            })
        );
        assert_eq!(
            require_permission(&config, &manager(), Permission::StopDeposits),
            Err(LedgerError::Unauthorized {
                expected: owner(),
                actual: manager(),
            })
        );
    }

    #[test]
    fn test_single_holder_may_hold_both_roles() {
        let config = LedgerConfig::new(owner(), owner(), [9u8; 32]);
        assert!(has_role(&config, &owner(), Role::Owner));
        assert!(has_role(&config, &owner(), Role::ClaimManager));
    }
}
