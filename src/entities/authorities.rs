use sea_orm::entity::prelude::*;

/// Reference rows for the closed role set, seeded by the initial migration.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "authorities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub authority: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::users_authorities::Entity")]
    UsersAuthorities,
}

impl Related<super::users_authorities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UsersAuthorities.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
