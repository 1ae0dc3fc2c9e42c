use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use tracing::{debug, warn};

use crate::db::{StoreError, StoreResult};
use crate::domain::{AccountId, EventId, MemberStatus};
use crate::entities::{event_members, prelude::*, sport_events};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SportEvent {
    pub id: EventId,
    pub organizer_id: AccountId,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: String,
    pub created_at: String,
}

impl From<sport_events::Model> for SportEvent {
    fn from(model: sport_events::Model) -> Self {
        Self {
            id: EventId::new(model.id),
            organizer_id: AccountId::new(model.organizer_id),
            title: model.title,
            description: model.description,
            starts_at: model.starts_at,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub organizer_id: AccountId,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: String,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMember {
    pub event_id: EventId,
    pub account_id: AccountId,
    pub status: MemberStatus,
    pub joined_at: String,
}

impl TryFrom<event_members::Model> for EventMember {
    type Error = StoreError;

    fn try_from(model: event_members::Model) -> StoreResult<Self> {
        let status: MemberStatus = model.status.parse().map_err(|e: String| {
            warn!(member_id = model.id, detail = %e, "Unreadable membership status");
            StoreError::Database(DbErr::Type(format!(
                "event_members.status of member {}: {e}",
                model.id
            )))
        })?;

        Ok(Self {
            event_id: EventId::new(model.event_id),
            account_id: AccountId::new(model.user_id),
            status,
            joined_at: model.joined_at,
        })
    }
}

pub struct EventRepository {
    conn: DatabaseConnection,
}

impl EventRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(&self, event: NewEvent) -> StoreResult<SportEvent> {
        let model = sport_events::ActiveModel {
            organizer_id: Set(event.organizer_id.value()),
            title: Set(event.title),
            description: Set(event.description),
            starts_at: Set(event.starts_at),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await?;

        Ok(model.into())
    }

    pub async fn find_by_id(&self, id: EventId) -> StoreResult<Option<SportEvent>> {
        let event = SportEvents::find_by_id(id.value()).one(&self.conn).await?;
        Ok(event.map(SportEvent::from))
    }

    pub async fn find_all(&self) -> StoreResult<Vec<SportEvent>> {
        let events = SportEvents::find()
            .order_by_asc(sport_events::Column::StartsAt)
            .all(&self.conn)
            .await?;
        Ok(events.into_iter().map(SportEvent::from).collect())
    }

    pub async fn update(&self, id: EventId, changes: EventChanges) -> StoreResult<SportEvent> {
        let event = SportEvents::find_by_id(id.value())
            .one(&self.conn)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Event {id}")))?;

        let mut active: sport_events::ActiveModel = event.into();
        if let Some(title) = changes.title {
            active.title = Set(title);
        }
        if let Some(description) = changes.description {
            active.description = Set(Some(description));
        }
        if let Some(starts_at) = changes.starts_at {
            active.starts_at = Set(starts_at);
        }

        let model = active.update(&self.conn).await?;
        Ok(model.into())
    }

    /// Removes the event and its memberships in one transaction.
    pub async fn delete_by_id(&self, id: EventId) -> StoreResult<bool> {
        let txn = self.conn.begin().await?;

        // Explicit so the result does not depend on the foreign_keys pragma
        EventMembers::delete_many()
            .filter(event_members::Column::EventId.eq(id.value()))
            .exec(&txn)
            .await?;

        let result = SportEvents::delete_by_id(id.value()).exec(&txn).await?;

        txn.commit().await?;
        debug!(event_id = %id, rows = result.rows_affected, "Deleted event");

        Ok(result.rows_affected > 0)
    }

    pub async fn members(&self, id: EventId) -> StoreResult<Vec<EventMember>> {
        let members = EventMembers::find()
            .filter(event_members::Column::EventId.eq(id.value()))
            .order_by_asc(event_members::Column::Id)
            .all(&self.conn)
            .await?;
        members.into_iter().map(EventMember::try_from).collect()
    }

    pub async fn add_member(
        &self,
        event_id: EventId,
        account_id: AccountId,
        status: MemberStatus,
    ) -> StoreResult<EventMember> {
        let model = event_members::ActiveModel {
            event_id: Set(event_id.value()),
            user_id: Set(account_id.value()),
            status: Set(status.as_str().to_string()),
            joined_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::Conflict(format!(
                "Account {account_id} already joined event {event_id}"
            )),
            _ => StoreError::Database(e),
        })?;

        model.try_into()
    }

    pub async fn remove_member(&self, event_id: EventId, account_id: AccountId) -> StoreResult<bool> {
        let result = EventMembers::delete_many()
            .filter(event_members::Column::EventId.eq(event_id.value()))
            .filter(event_members::Column::UserId.eq(account_id.value()))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
