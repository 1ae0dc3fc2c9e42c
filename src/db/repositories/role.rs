use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};

use crate::db::StoreResult;
use crate::entities::{authorities, prelude::*};

pub struct RoleRepository {
    conn: DatabaseConnection,
}

impl RoleRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> StoreResult<Vec<authorities::Model>> {
        let rows = Authorities::find()
            .order_by_asc(authorities::Column::Id)
            .all(&self.conn)
            .await?;
        Ok(rows)
    }
}
