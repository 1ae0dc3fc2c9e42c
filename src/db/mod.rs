use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::domain::{AccountId, EventId, RoleName};
use crate::entities::authorities;

pub mod migrator;
pub mod repositories;

pub use repositories::account::{Account, AccountProfileFields, NewAccount};
pub use repositories::event::{EventChanges, EventMember, NewEvent, SportEvent};

/// Failures surfaced by the persistence layer.
///
/// Uniqueness violations are reported as [`StoreError::Conflict`] whether they
/// are caught by a pre-check or by the unique index itself.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn account_repo(&self) -> repositories::account::AccountRepository {
        repositories::account::AccountRepository::new(self.conn.clone())
    }

    fn role_repo(&self) -> repositories::role::RoleRepository {
        repositories::role::RoleRepository::new(self.conn.clone())
    }

    fn event_repo(&self) -> repositories::event::EventRepository {
        repositories::event::EventRepository::new(self.conn.clone())
    }

    // Accounts

    pub async fn find_account_by_id(&self, id: AccountId) -> StoreResult<Option<Account>> {
        self.account_repo().find_by_id(id).await
    }

    pub async fn find_account_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        self.account_repo().find_by_username(username).await
    }

    pub async fn account_exists(&self, id: AccountId) -> StoreResult<bool> {
        self.account_repo().exists_by_id(id).await
    }

    pub async fn username_exists(&self, username: &str) -> StoreResult<bool> {
        self.account_repo().exists_by_username(username).await
    }

    pub async fn insert_account(&self, account: NewAccount) -> StoreResult<Account> {
        self.account_repo().insert(account).await
    }

    pub async fn update_account_profile(
        &self,
        id: AccountId,
        profile: &AccountProfileFields,
    ) -> StoreResult<Account> {
        self.account_repo().update_profile(id, profile).await
    }

    pub async fn update_password_hash(&self, id: AccountId, password_hash: &str) -> StoreResult<()> {
        self.account_repo()
            .update_password_hash(id, password_hash)
            .await
    }

    pub async fn replace_password_hash(
        &self,
        id: AccountId,
        current: &str,
        replacement: &str,
    ) -> StoreResult<bool> {
        self.account_repo()
            .replace_password_hash(id, current, replacement)
            .await
    }

    pub async fn set_account_enabled(&self, id: AccountId, enabled: bool) -> StoreResult<()> {
        self.account_repo().set_enabled(id, enabled).await
    }

    pub async fn add_account_role(&self, id: AccountId, role: RoleName) -> StoreResult<bool> {
        self.account_repo().add_role(id, role).await
    }

    pub async fn delete_account(&self, id: AccountId) -> StoreResult<bool> {
        self.account_repo().delete_by_id(id).await
    }

    pub async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        self.account_repo().find_all().await
    }

    pub async fn find_accounts_by_ids(&self, ids: &[AccountId]) -> StoreResult<Vec<Account>> {
        self.account_repo().find_all_by_id(ids).await
    }

    // Roles

    pub async fn list_authorities(&self) -> StoreResult<Vec<authorities::Model>> {
        self.role_repo().list().await
    }

    // Events

    pub async fn insert_event(&self, event: NewEvent) -> StoreResult<SportEvent> {
        self.event_repo().insert(event).await
    }

    pub async fn find_event(&self, id: EventId) -> StoreResult<Option<SportEvent>> {
        self.event_repo().find_by_id(id).await
    }

    pub async fn list_events(&self) -> StoreResult<Vec<SportEvent>> {
        self.event_repo().find_all().await
    }

    pub async fn update_event(&self, id: EventId, changes: EventChanges) -> StoreResult<SportEvent> {
        self.event_repo().update(id, changes).await
    }

    pub async fn delete_event(&self, id: EventId) -> StoreResult<bool> {
        self.event_repo().delete_by_id(id).await
    }

    pub async fn list_event_members(&self, id: EventId) -> StoreResult<Vec<EventMember>> {
        self.event_repo().members(id).await
    }

    pub async fn add_event_member(
        &self,
        event_id: EventId,
        account_id: AccountId,
        status: crate::domain::MemberStatus,
    ) -> StoreResult<EventMember> {
        self.event_repo()
            .add_member(event_id, account_id, status)
            .await
    }

    pub async fn remove_event_member(
        &self,
        event_id: EventId,
        account_id: AccountId,
    ) -> StoreResult<bool> {
        self.event_repo().remove_member(event_id, account_id).await
    }
}
