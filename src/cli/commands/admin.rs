//! Create admin command handler

use crate::config::{BootstrapAdminConfig, Config};
use crate::db::Store;
use crate::services::{RoleRegistry, SeaOrmAccountService};

pub async fn cmd_create_admin(
    config: &Config,
    username: &str,
    password: &str,
    first_name: &str,
) -> anyhow::Result<()> {
    let admin = BootstrapAdminConfig {
        username: username.to_string(),
        password: password.to_string(),
        first_name: first_name.to_string(),
    };

    let mut candidate = config.clone();
    candidate.security.bootstrap_admin = Some(admin.clone());
    candidate.validate()?;

    let store = Store::new(&config.general.database_path).await?;
    let roles = RoleRegistry::load(&store)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load roles: {e}"))?;
    let accounts = SeaOrmAccountService::new(store, roles, &config.security)?;

    let id = accounts
        .bootstrap_admin(&admin)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create admin: {e}"))?;

    println!("Account '{username}' (id {id}) now holds ADMIN.");
    Ok(())
}
