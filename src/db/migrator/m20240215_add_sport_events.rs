use crate::entities::{event_members, prelude::*};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(SportEvents)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(EventMembers)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // An account joins a given event at most once
        manager
            .create_index(
                Index::create()
                    .name("idx_event_members_event_user")
                    .table(EventMembers)
                    .col(event_members::Column::EventId)
                    .col(event_members::Column::UserId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EventMembers).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SportEvents).to_owned())
            .await?;

        Ok(())
    }
}
