//! `SeaORM` implementation of the `AccountService` trait.

use async_trait::async_trait;
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::auth::{CredentialHasher, Principal, policy};
use crate::config::{BootstrapAdminConfig, SecurityConfig};
use crate::db::{Account, AccountProfileFields, NewAccount, Store};
use crate::domain::{AccountId, RoleName};
use crate::services::account_service::{
    AccountError, AccountProfile, AccountService, PasswordChangeRequest, ProfileUpdate,
    RegisterRequest,
};
use crate::services::role_registry::RoleRegistry;

pub struct SeaOrmAccountService {
    store: Store,
    roles: RoleRegistry,
    hasher: CredentialHasher,
    auto_migrate_hashes: bool,
}

impl SeaOrmAccountService {
    pub fn new(store: Store, roles: RoleRegistry, security: &SecurityConfig) -> anyhow::Result<Self> {
        Ok(Self {
            store,
            roles,
            hasher: CredentialHasher::new(security)?,
            auto_migrate_hashes: security.auto_migrate_password_hashes,
        })
    }

    async fn find_account(&self, id: AccountId) -> Result<Account, AccountError> {
        self.store
            .find_account_by_id(id)
            .await?
            .ok_or_else(|| AccountError::account_not_found(id))
    }

    fn principal_of(account: &Account) -> Principal {
        Principal::new(
            account.id,
            account.username.clone(),
            account.roles.iter().copied(),
        )
    }

    /// Re-hashes with the current parameters after a successful login.
    /// Only the hash column is written, and only while it still holds the
    /// digest that was verified. Failures are logged and never fail the login.
    async fn migrate_hash_if_outdated(&self, account: &Account, password: &str) {
        if !self.auto_migrate_hashes || !self.hasher.needs_rehash(&account.password_hash) {
            return;
        }

        let result = async {
            let rehashed = self.hasher.hash_blocking(password).await?;
            let replaced = self
                .store
                .replace_password_hash(account.id, &account.password_hash, &rehashed)
                .await?;
            Ok::<bool, AccountError>(replaced)
        }
        .await;

        match result {
            Ok(true) => info!(account_id = %account.id, "Migrated password hash to current params"),
            Ok(false) => {
                info!(account_id = %account.id, "Password changed during hash migration, kept the newer hash");
            }
            Err(e) => warn!(account_id = %account.id, error = %e, "Password hash migration failed"),
        }
    }

    /// Creates `config.username` if needed and makes sure it holds ADMIN.
    pub async fn bootstrap_admin(
        &self,
        config: &BootstrapAdminConfig,
    ) -> Result<AccountId, AccountError> {
        let account = match self.store.find_account_by_username(&config.username).await? {
            Some(account) => account,
            None => {
                let profile = self
                    .register(RegisterRequest {
                        username: config.username.clone(),
                        password: config.password.clone(),
                        password_confirm: config.password.clone(),
                        first_name: config.first_name.clone(),
                        last_name: None,
                    })
                    .await?;
                self.find_account(profile.id).await?
            }
        };

        let admin = self.roles.get(RoleName::Admin)?.name;
        if self.store.add_account_role(account.id, admin).await? {
            info!(account_id = %account.id, username = %account.username, "Granted ADMIN to bootstrap account");
        }

        Ok(account.id)
    }
}

/// Loads the principal's own account, failing when it was deleted or blocked
/// after the principal was issued.
pub(crate) async fn load_active_account(
    store: &Store,
    principal: &Principal,
) -> Result<Account, AccountError> {
    let account = store
        .find_account_by_id(principal.id())
        .await?
        .ok_or_else(|| AccountError::NotFound("account not found".to_string()))?;

    if !account.enabled {
        return Err(AccountError::Forbidden("account is blocked".to_string()));
    }

    Ok(account)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[async_trait]
impl AccountService for SeaOrmAccountService {
    async fn register(&self, request: RegisterRequest) -> Result<AccountProfile, AccountError> {
        if request.password != request.password_confirm {
            return Err(AccountError::ValidationFailed(
                "Passwords do not match".to_string(),
            ));
        }

        // Fast path only: the unique index settles races between concurrent
        // registrations.
        if self.store.username_exists(&request.username).await? {
            return Err(AccountError::Conflict(format!(
                "User '{}' already exists",
                request.username
            )));
        }

        let default_role = self.roles.get(RoleName::User)?;
        let password_hash = self.hasher.hash_blocking(&request.password).await?;

        let account = self
            .store
            .insert_account(NewAccount {
                username: request.username,
                password_hash,
                enabled: true,
                roles: BTreeSet::from([default_role.name]),
                profile: AccountProfileFields {
                    first_name: request.first_name,
                    last_name: non_blank(request.last_name),
                    ..AccountProfileFields::default()
                },
            })
            .await?;

        metrics::counter!("accounts_registered_total").increment(1);
        info!(account_id = %account.id, username = %account.username, "Registered account");

        Ok(AccountProfile::owner(&account))
    }

    async fn get_profile(&self, id: AccountId) -> Result<AccountProfile, AccountError> {
        let account = self.find_account(id).await?;
        Ok(AccountProfile::public(&account))
    }

    async fn current_profile(
        &self,
        principal: &Principal,
    ) -> Result<AccountProfile, AccountError> {
        let account = load_active_account(&self.store, principal).await?;
        Ok(AccountProfile::owner(&account))
    }

    async fn list_profiles(&self) -> Result<Vec<AccountProfile>, AccountError> {
        let accounts = self.store.list_accounts().await?;
        Ok(accounts.iter().map(AccountProfile::public).collect())
    }

    async fn get_profiles(&self, ids: &[AccountId]) -> Result<Vec<AccountProfile>, AccountError> {
        let accounts = self.store.find_accounts_by_ids(ids).await?;
        Ok(accounts.iter().map(AccountProfile::public).collect())
    }

    async fn update_profile(
        &self,
        principal: &Principal,
        target: AccountId,
        changes: ProfileUpdate,
    ) -> Result<AccountProfile, AccountError> {
        policy::require(
            policy::can_act_on_account(principal, target),
            "Not allowed to modify this account",
        )?;
        load_active_account(&self.store, principal).await?;

        let mut account = self.find_account(target).await?;
        let profile = &mut account.profile;

        if let Some(first_name) = changes.first_name {
            if first_name.trim().is_empty() {
                return Err(AccountError::ValidationFailed(
                    "First name must not be blank".to_string(),
                ));
            }
            profile.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            profile.last_name = non_blank(Some(last_name));
        }
        if let Some(gender) = changes.gender {
            profile.gender = gender;
        }
        if let Some(birthday) = changes.birthday {
            profile.birthday = Some(birthday);
        }
        if let Some(hide_birthday) = changes.hide_birthday {
            profile.hide_birthday = hide_birthday;
        }
        if let Some(info) = changes.info {
            profile.info = non_blank(Some(info));
        }
        if let Some(photo_link) = changes.photo_link {
            profile.photo_link = non_blank(Some(photo_link));
        }

        let saved = self
            .store
            .update_account_profile(target, &account.profile)
            .await?;
        info!(account_id = %target, actor = %principal.id(), "Updated profile");

        Ok(AccountProfile::owner(&saved))
    }

    async fn change_password(
        &self,
        principal: &Principal,
        target: AccountId,
        request: PasswordChangeRequest,
    ) -> Result<(), AccountError> {
        if request.new_password != request.new_password_confirm {
            return Err(AccountError::ValidationFailed(
                "Passwords do not match".to_string(),
            ));
        }

        policy::require(
            policy::can_act_on_account(principal, target),
            "Not allowed to change this account's password",
        )?;
        let actor = load_active_account(&self.store, principal).await?;

        let account = if policy::is_self(principal, target) {
            let valid = self
                .hasher
                .verify_blocking(&request.old_password, &actor.password_hash)
                .await?;
            if !valid {
                warn!(account_id = %target, "Password change rejected: invalid old password");
                return Err(AccountError::Forbidden("Invalid old password".to_string()));
            }
            actor
        } else {
            // can_act_on_account passed for someone else: administrative reset
            info!(account_id = %target, admin = %principal.id(), "Administrative password reset");
            self.find_account(target).await?
        };

        let password_hash = self.hasher.hash_blocking(&request.new_password).await?;
        self.store
            .update_password_hash(account.id, &password_hash)
            .await?;

        info!(account_id = %target, "Password changed");
        Ok(())
    }

    async fn delete_account(
        &self,
        principal: &Principal,
        target: AccountId,
    ) -> Result<(), AccountError> {
        policy::require(
            policy::can_act_on_account(principal, target),
            "Not allowed to delete this account",
        )?;
        load_active_account(&self.store, principal).await?;

        if !self.store.account_exists(target).await? {
            return Err(AccountError::account_not_found(target));
        }

        self.store.delete_account(target).await?;

        if self.store.account_exists(target).await? {
            return Err(AccountError::Internal(format!(
                "Account {target} still present after deletion"
            )));
        }

        info!(account_id = %target, actor = %principal.id(), "Deleted account");
        Ok(())
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Principal, AccountError> {
        let Some(account) = self.store.find_account_by_username(username).await? else {
            metrics::counter!("auth_attempts_total", "outcome" => "unknown_user").increment(1);
            warn!(username = %username, "Login failed: unknown username");
            return Err(AccountError::NotFound(format!("User '{username}' not found")));
        };

        let valid = self
            .hasher
            .verify_blocking(password, &account.password_hash)
            .await?;
        if !valid {
            metrics::counter!("auth_attempts_total", "outcome" => "bad_password").increment(1);
            warn!(account_id = %account.id, "Login failed: wrong password");
            return Err(AccountError::InvalidCredentials);
        }

        if !account.enabled {
            metrics::counter!("auth_attempts_total", "outcome" => "blocked").increment(1);
            warn!(account_id = %account.id, "Login failed: account is blocked");
            return Err(AccountError::InvalidCredentials);
        }

        metrics::counter!("auth_attempts_total", "outcome" => "success").increment(1);
        let principal = Self::principal_of(&account);
        self.migrate_hash_if_outdated(&account, password).await;

        Ok(principal)
    }

    async fn resolve_principal(&self, id: AccountId) -> Result<Principal, AccountError> {
        let account = self
            .store
            .find_account_by_id(id)
            .await?
            .ok_or_else(|| AccountError::NotFound("account not found".to_string()))?;

        if !account.enabled {
            return Err(AccountError::InvalidCredentials);
        }

        Ok(Self::principal_of(&account))
    }

    async fn set_enabled(
        &self,
        principal: &Principal,
        target: AccountId,
        enabled: bool,
    ) -> Result<AccountProfile, AccountError> {
        policy::require(policy::is_admin(principal), "Only admins can block accounts")?;
        load_active_account(&self.store, principal).await?;

        self.store.set_account_enabled(target, enabled).await?;
        let saved = self.find_account(target).await?;

        info!(account_id = %target, enabled, admin = %principal.id(), "Changed account state");
        Ok(AccountProfile::owner(&saved))
    }

    async fn grant_role(
        &self,
        principal: &Principal,
        target: AccountId,
        role: &str,
    ) -> Result<BTreeSet<RoleName>, AccountError> {
        policy::require(policy::is_admin(principal), "Only admins can grant roles")?;
        load_active_account(&self.store, principal).await?;

        let role = self.roles.find_by_name(role)?;

        if self.store.add_account_role(target, role.name).await? {
            info!(account_id = %target, role = %role.name, admin = %principal.id(), "Granted role");
        }

        Ok(self.find_account(target).await?.roles)
    }
}
