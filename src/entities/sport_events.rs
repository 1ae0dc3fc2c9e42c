use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sport_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Account that owns the event.
    pub organizer_id: i32,

    pub title: String,

    pub description: Option<String>,

    /// RFC 3339 timestamp
    pub starts_at: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OrganizerId",
        to = "super::users::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Organizer,
    #[sea_orm(has_many = "super::event_members::Entity")]
    EventMembers,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organizer.def()
    }
}

impl Related<super::event_members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EventMembers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
