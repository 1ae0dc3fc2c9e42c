use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AccountService, EventService, RoleRegistry, SeaOrmAccountService, SeaOrmEventService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub roles: RoleRegistry,

    pub account_service: Arc<dyn AccountService>,

    pub event_service: Arc<dyn EventService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Self::with_store(config, store).await
    }

    /// Builds the services on top of an already migrated store.
    pub async fn with_store(config: Config, store: Store) -> anyhow::Result<Self> {
        let roles = RoleRegistry::load(&store)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to load roles: {e}"))?;

        let accounts = Arc::new(SeaOrmAccountService::new(
            store.clone(),
            roles.clone(),
            &config.security,
        )?);

        if let Some(admin) = &config.security.bootstrap_admin {
            let id = accounts
                .bootstrap_admin(admin)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to bootstrap admin '{}': {e}", admin.username))?;
            info!(account_id = %id, username = %admin.username, "Bootstrap admin ready");
        }

        let event_service =
            Arc::new(SeaOrmEventService::new(store.clone())) as Arc<dyn EventService>;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            roles,
            account_service: accounts as Arc<dyn AccountService>,
            event_service,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
