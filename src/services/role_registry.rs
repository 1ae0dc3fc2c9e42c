//! Cached view of the closed role set.
//!
//! The `authorities` rows are seeded by the migrator and never change while
//! the process runs, so they are read once at startup.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::db::{Store, StoreError};
use crate::domain::RoleName;

#[derive(Debug, Error)]
pub enum RoleError {
    #[error("Role not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<StoreError> for RoleError {
    fn from(err: StoreError) -> Self {
        Self::Database(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Role {
    pub id: i32,
    pub name: RoleName,
}

#[derive(Debug, Clone)]
pub struct RoleRegistry {
    roles: Arc<BTreeMap<RoleName, Role>>,
}

impl RoleRegistry {
    /// Loads the seeded roles. Rows whose name is outside the known set are
    /// ignored.
    pub async fn load(store: &Store) -> Result<Self, RoleError> {
        let rows = store.list_authorities().await?;

        let roles: BTreeMap<RoleName, Role> = rows
            .into_iter()
            .filter_map(|row| {
                RoleName::parse(&row.authority).map(|name| (name, Role { id: row.id, name }))
            })
            .collect();

        let registry = Self {
            roles: Arc::new(roles),
        };
        debug!(
            roles = ?registry.all().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            "Role registry loaded"
        );

        Ok(registry)
    }

    /// Looks a role up by its short (`ADMIN`) or stored (`ROLE_ADMIN`) name.
    pub fn find_by_name(&self, name: &str) -> Result<Role, RoleError> {
        RoleName::parse(name)
            .and_then(|role| self.roles.get(&role).copied())
            .ok_or_else(|| RoleError::NotFound(name.to_string()))
    }

    pub fn get(&self, role: RoleName) -> Result<Role, RoleError> {
        self.roles
            .get(&role)
            .copied()
            .ok_or_else(|| RoleError::NotFound(role.to_string()))
    }

    /// Cached roles in ascending order (USER before ADMIN).
    pub fn all(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }
}
