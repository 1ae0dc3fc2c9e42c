use crate::domain::RoleName;
use crate::entities::{authorities, prelude::*};
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
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Authorities)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(UsersAuthorities)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Roles are reference data: seed the closed set once.
        let mut insert = Query::insert()
            .into_table(Authorities)
            .columns([authorities::Column::Authority])
            .to_owned();
        for role in RoleName::ALL {
            insert.values_panic([role.authority().into()]);
        }

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UsersAuthorities).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Authorities).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;

        Ok(())
    }
}
