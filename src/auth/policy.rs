//! Self-or-admin authorization rules.
//!
//! Every mutating operation on an account or on an account-owned resource goes
//! through these predicates. They are pure: no store access, no logging.

use super::Principal;
use crate::domain::{AccountId, RoleName};
use thiserror::Error;

/// A policy predicate evaluated to false.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct AccessDenied(pub String);

#[must_use]
pub fn is_self(principal: &Principal, target: AccountId) -> bool {
    principal.id() == target
}

#[must_use]
pub fn has_role(principal: &Principal, role: RoleName) -> bool {
    principal.roles().contains(&role)
}

#[must_use]
pub fn is_admin(principal: &Principal) -> bool {
    has_role(principal, RoleName::Admin)
}

#[must_use]
pub fn can_act_on_account(principal: &Principal, target: AccountId) -> bool {
    is_self(principal, target) || is_admin(principal)
}

/// Ownership check for events and memberships: the owner or an admin.
#[must_use]
pub fn can_modify_resource_owned_by(principal: &Principal, owner: AccountId) -> bool {
    can_act_on_account(principal, owner)
}

/// Turns a predicate result into a typed denial.
pub fn require(allowed: bool, message: impl Into<String>) -> Result<(), AccessDenied> {
    if allowed {
        Ok(())
    } else {
        Err(AccessDenied(message.into()))
    }
}
