//! Access Control Module
//!
//! In-memory role registry for the savings vault. Implements
//! [`PermissionSource`] so it can be injected wherever the vault checks
//! capabilities.
//!
//! ## Roles
//!
//! - **Governor**: connector changes, fraction, emergency actions, role admin
//! - **Poker**: may trigger unforced rebalances
//! - **InterestDistributor**: may push interest into the vault

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{VaultError, VaultResult};
use crate::interfaces::PermissionSource;
use crate::types::{require_address, Address};

// ============================================================================
// Types
// ============================================================================

/// Vault roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum Role {
    Governor,
    Poker,
    InterestDistributor,
}

impl Role {
    /// Capability name used in `PermissionDenied` errors
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Governor => "governor",
            Role::Poker => "poker",
            Role::InterestDistributor => "interest distributor",
        }
    }
}

/// Role assignment for an address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct RoleAssignment {
    /// Address with the role
    pub address: Address,
    /// Assigned role
    pub role: Role,
    /// Unix time the role was granted
    pub granted_at: u64,
    /// Unix time the role expires (0 = never)
    pub expires_at: u64,
    /// Address that granted the role
    pub granted_by: Address,
    /// Whether assignment is active
    pub is_active: bool,
}

impl RoleAssignment {
    /// Create new role assignment
    pub fn new(address: Address, role: Role, granted_by: Address, now: u64) -> Self {
        Self {
            address,
            role,
            granted_at: now,
            expires_at: 0,
            granted_by,
            is_active: true,
        }
    }

    /// Create role assignment with expiration
    pub fn with_expiration(address: Address, role: Role, granted_by: Address, now: u64, duration: u64) -> Self {
        Self {
            expires_at: now.saturating_add(duration),
            ..Self::new(address, role, granted_by, now)
        }
    }

    /// Check if role is valid at `now`
    pub fn is_valid(&self, now: u64) -> bool {
        self.is_active && (self.expires_at == 0 || now < self.expires_at)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Role registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct AccessControl {
    /// Founding governor; cannot lose the Governor role
    pub admin: Address,
    /// Role assignments, including inactive ones
    pub roles: Vec<RoleAssignment>,
    /// Unix time of the last change
    pub last_update: u64,
}

impl AccessControl {
    /// Create a registry whose `admin` holds the Governor role
    pub fn new(admin: Address, now: u64) -> Self {
        Self {
            admin,
            roles: vec![RoleAssignment::new(admin, Role::Governor, admin, now)],
            last_update: now,
        }
    }

    /// Check if address has a specific role
    pub fn has_role(&self, address: &Address, role: Role, now: u64) -> bool {
        self.roles
            .iter()
            .any(|r| r.address == *address && r.role == role && r.is_valid(now))
    }

    /// Grant a permanent role
    pub fn grant_role(&mut self, granter: Address, grantee: Address, role: Role, now: u64) -> VaultResult<()> {
        self.insert(granter, RoleAssignment::new(grantee, role, granter, now), now)
    }

    /// Grant a role that lapses after `duration` seconds
    pub fn grant_role_with_expiry(
        &mut self,
        granter: Address,
        grantee: Address,
        role: Role,
        now: u64,
        duration: u64,
    ) -> VaultResult<()> {
        self.insert(
            granter,
            RoleAssignment::with_expiration(grantee, role, granter, now, duration),
            now,
        )
    }

    fn insert(&mut self, granter: Address, assignment: RoleAssignment, now: u64) -> VaultResult<()> {
        self.require_governor(&granter, now)?;
        require_address(&assignment.address, "grantee")?;

        // Already has role
        if self.has_role(&assignment.address, assignment.role, now) {
            return Ok(());
        }

        debug!(role = assignment.role.as_str(), expires_at = assignment.expires_at, "role granted");
        self.roles.push(assignment);
        self.last_update = now;
        Ok(())
    }

    /// Revoke a role from an address
    pub fn revoke_role(&mut self, revoker: Address, target: Address, role: Role, now: u64) -> VaultResult<()> {
        if target == self.admin && role == Role::Governor {
            return Err(VaultError::invalid("target", "admin cannot lose the governor role"));
        }
        self.require_governor(&revoker, now)?;

        for r in self.roles.iter_mut() {
            if r.address == target && r.role == role && r.is_valid(now) {
                r.is_active = false;
            }
        }

        debug!(role = role.as_str(), "role revoked");
        self.last_update = now;
        Ok(())
    }

    /// Get all roles for an address
    pub fn roles_of(&self, address: &Address, now: u64) -> Vec<Role> {
        self.roles
            .iter()
            .filter(|r| r.address == *address && r.is_valid(now))
            .map(|r| r.role)
            .collect()
    }

    fn require_governor(&self, who: &Address, now: u64) -> VaultResult<()> {
        if !self.has_role(who, Role::Governor, now) {
            return Err(VaultError::PermissionDenied {
                caller: *who,
                required: Role::Governor.as_str(),
            });
        }
        Ok(())
    }
}

impl PermissionSource for AccessControl {
    fn is_authorized_governor(&self, who: &Address, now: u64) -> bool {
        self.has_role(who, Role::Governor, now)
    }

    fn is_authorized_interest_distributor(&self, who: &Address, now: u64) -> bool {
        self.has_role(who, Role::InterestDistributor, now)
    }

    fn is_authorized_poker(&self, who: &Address, now: u64) -> bool {
        self.has_role(who, Role::Poker, now)
    }
}

// ============================================================================
// Tests
// ============================================================================
