use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "event_members")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub event_id: i32,

    pub user_id: i32,

    /// `PARTICIPANT` or `WAITING`
    pub status: String,

    pub joined_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sport_events::Entity",
        from = "Column::EventId",
        to = "super::sport_events::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    SportEvent,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::sport_events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SportEvent.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
