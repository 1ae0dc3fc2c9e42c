use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    /// Argon2id password hash (PHC string)
    pub password_hash: String,

    /// `false` means the account is blocked and cannot authenticate.
    pub enabled: bool,

    pub first_name: String,

    pub last_name: Option<String>,

    /// One of `NOT_SELECTED`, `MALE`, `FEMALE`.
    pub gender: String,

    /// ISO 8601 calendar date (`YYYY-MM-DD`)
    pub birthday: Option<String>,

    pub hide_birthday: bool,

    pub info: Option<String>,

    pub photo_link: Option<String>,

    pub created_at: String,

    pub updated_at: String,
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

impl Related<super::authorities::Entity> for Entity {
    fn to() -> RelationDef {
        super::users_authorities::Relation::Authority.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::users_authorities::Relation::User.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
