//! Domain service for the account lifecycle and authentication.
//!
//! Handles registration, profile updates, credential rotation, deletion and
//! turning credentials into a [`Principal`]. Every mutation that targets an
//! existing account is gated by [`crate::auth::policy`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::auth::{AccessDenied, Principal};
use crate::db::{Account, StoreError};
use crate::domain::{AccountId, Gender, RoleName};
use crate::services::role_registry::RoleError;

/// Errors specific to account operations.
///
/// `NotFound` and `InvalidCredentials` stay distinct here so callers can log
/// which one happened; the HTTP layer folds them together for login.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AccountError {
    pub fn account_not_found(id: AccountId) -> Self {
        Self::NotFound(format!("Account {id} not found"))
    }
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::NotFound(msg) => Self::NotFound(msg),
            StoreError::Database(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<sea_orm::DbErr> for AccountError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<AccessDenied> for AccountError {
    fn from(err: AccessDenied) -> Self {
        Self::Forbidden(err.0)
    }
}

impl From<RoleError> for AccountError {
    fn from(err: RoleError) -> Self {
        match err {
            RoleError::NotFound(name) => Self::NotFound(format!("Role '{name}' not found")),
            RoleError::Database(msg) => Self::Internal(msg),
        }
    }
}

/// Registration payload. Field-level constraints (lengths, non-blank) are
/// expected to be checked before this reaches the service.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Profile fields to merge. Absent fields are left untouched; username and
/// password cannot be changed through this path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<Gender>,
    pub birthday: Option<NaiveDate>,
    pub hide_birthday: Option<bool>,
    pub info: Option<String>,
    pub photo_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChangeRequest {
    #[serde(default)]
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

/// Public profile view. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountProfile {
    pub id: AccountId,
    pub username: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub gender: Gender,
    pub birthday: Option<NaiveDate>,
    pub hide_birthday: bool,
    pub info: Option<String>,
    pub photo_link: Option<String>,
}

impl AccountProfile {
    /// View for anyone: the birthday is withheld when the owner hid it.
    #[must_use]
    pub fn public(account: &Account) -> Self {
        let mut view = Self::owner(account);
        if view.hide_birthday {
            view.birthday = None;
        }
        view
    }

    /// View for the account owner.
    #[must_use]
    pub fn owner(account: &Account) -> Self {
        let profile = &account.profile;
        Self {
            id: account.id,
            username: account.username.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            gender: profile.gender,
            birthday: profile.birthday,
            hide_birthday: profile.hide_birthday,
            info: profile.info.clone(),
            photo_link: profile.photo_link.clone(),
        }
    }
}

/// Domain service trait for accounts.
///
/// # Examples
///
/// ```rust,ignore
/// use dosport::services::{AccountService, AccountError};
/// use std::sync::Arc;
///
/// async fn login(service: Arc<dyn AccountService>) -> Result<(), AccountError> {
///     let principal = service.authenticate("alice1", "secret1").await?;
///     let _me = service.current_profile(&principal).await?;
///     Ok(())
/// }
/// ```
#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// Creates an account holding the default USER role.
    ///
    /// # Errors
    ///
    /// - [`AccountError::ValidationFailed`] if the password confirmation differs
    /// - [`AccountError::Conflict`] if the username is taken
    async fn register(&self, request: RegisterRequest) -> Result<AccountProfile, AccountError>;

    /// # Errors
    ///
    /// Returns [`AccountError::NotFound`] if the account does not exist.
    async fn get_profile(&self, id: AccountId) -> Result<AccountProfile, AccountError>;

    /// Profile of the principal's own account, birthday included.
    async fn current_profile(&self, principal: &Principal)
    -> Result<AccountProfile, AccountError>;

    async fn list_profiles(&self) -> Result<Vec<AccountProfile>, AccountError>;

    /// Profiles for the given ids; unknown ids are skipped.
    async fn get_profiles(&self, ids: &[AccountId]) -> Result<Vec<AccountProfile>, AccountError>;

    /// # Errors
    ///
    /// - [`AccountError::Forbidden`] unless the principal is the target or an admin
    /// - [`AccountError::NotFound`] if the target does not exist
    /// - [`AccountError::ValidationFailed`] if a provided first name is blank
    async fn update_profile(
        &self,
        principal: &Principal,
        target: AccountId,
        changes: ProfileUpdate,
    ) -> Result<AccountProfile, AccountError>;

    /// Self-service change (old password verified) or administrative reset
    /// (old password ignored).
    ///
    /// # Errors
    ///
    /// - [`AccountError::ValidationFailed`] if the confirmation differs
    /// - [`AccountError::Forbidden`] on a wrong old password, or when a
    ///   non-admin targets another account
    async fn change_password(
        &self,
        principal: &Principal,
        target: AccountId,
        request: PasswordChangeRequest,
    ) -> Result<(), AccountError>;

    /// # Errors
    ///
    /// - [`AccountError::Forbidden`] unless the principal is the target or an admin
    /// - [`AccountError::NotFound`] if the target is already gone
    async fn delete_account(&self, principal: &Principal, target: AccountId)
    -> Result<(), AccountError>;

    /// # Errors
    ///
    /// - [`AccountError::NotFound`] if the username is unknown
    /// - [`AccountError::InvalidCredentials`] on a wrong password or a blocked account
    async fn authenticate(&self, username: &str, password: &str)
    -> Result<Principal, AccountError>;

    /// Re-derives the principal for an established session.
    async fn resolve_principal(&self, id: AccountId) -> Result<Principal, AccountError>;

    /// Blocks or unblocks an account. Admin only.
    async fn set_enabled(
        &self,
        principal: &Principal,
        target: AccountId,
        enabled: bool,
    ) -> Result<AccountProfile, AccountError>;

    /// Adds a role to an account. Admin only; idempotent.
    async fn grant_role(
        &self,
        principal: &Principal,
        target: AccountId,
        role: &str,
    ) -> Result<BTreeSet<RoleName>, AccountError>;
}
