use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::auth::{Principal, policy};
use crate::db::{EventChanges, NewEvent, SportEvent, Store};
use crate::domain::{AccountId, EventId, MemberStatus};
use crate::services::account_service_impl::load_active_account;
use crate::services::event_service::{
    CreateEventRequest, EventError, EventService, EventView, MemberView, UpdateEventRequest,
};

pub struct SeaOrmEventService {
    store: Store,
}

impl SeaOrmEventService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn find_event(&self, id: EventId) -> Result<SportEvent, EventError> {
        self.store
            .find_event(id)
            .await?
            .ok_or_else(|| EventError::event_not_found(id))
    }
}

fn validate_title(title: &str) -> Result<String, EventError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(EventError::ValidationFailed(
            "Title must not be blank".to_string(),
        ));
    }
    Ok(title.to_string())
}

/// Accepts any RFC 3339 timestamp and stores it normalized to UTC so that
/// events sort chronologically by their text column.
fn normalize_starts_at(value: &str) -> Result<String, EventError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc).to_rfc3339())
        .map_err(|e| EventError::ValidationFailed(format!("Invalid starts_at '{value}': {e}")))
}

#[async_trait]
impl EventService for SeaOrmEventService {
    async fn create_event(
        &self,
        principal: &Principal,
        request: CreateEventRequest,
    ) -> Result<EventView, EventError> {
        let title = validate_title(&request.title)?;
        let starts_at = normalize_starts_at(&request.starts_at)?;
        load_active_account(&self.store, principal).await?;

        let event = self
            .store
            .insert_event(NewEvent {
                organizer_id: principal.id(),
                title,
                description: request.description.filter(|d| !d.trim().is_empty()),
                starts_at,
            })
            .await?;

        info!(event_id = %event.id, organizer = %principal.id(), "Created event");
        Ok(event.into())
    }

    async fn get_event(&self, id: EventId) -> Result<EventView, EventError> {
        Ok(self.find_event(id).await?.into())
    }

    async fn list_events(&self) -> Result<Vec<EventView>, EventError> {
        let events = self.store.list_events().await?;
        Ok(events.into_iter().map(EventView::from).collect())
    }

    async fn update_event(
        &self,
        principal: &Principal,
        id: EventId,
        request: UpdateEventRequest,
    ) -> Result<EventView, EventError> {
        let event = self.find_event(id).await?;
        policy::require(
            policy::can_modify_resource_owned_by(principal, event.organizer_id),
            "Only the organizer can modify this event",
        )?;
        load_active_account(&self.store, principal).await?;

        let changes = EventChanges {
            title: request.title.as_deref().map(validate_title).transpose()?,
            description: request.description,
            starts_at: request
                .starts_at
                .as_deref()
                .map(normalize_starts_at)
                .transpose()?,
        };

        let updated = self.store.update_event(id, changes).await?;
        info!(event_id = %id, actor = %principal.id(), "Updated event");
        Ok(updated.into())
    }

    async fn delete_event(&self, principal: &Principal, id: EventId) -> Result<(), EventError> {
        let event = self.find_event(id).await?;
        policy::require(
            policy::can_modify_resource_owned_by(principal, event.organizer_id),
            "Only the organizer can delete this event",
        )?;
        load_active_account(&self.store, principal).await?;

        self.store.delete_event(id).await?;
        info!(event_id = %id, actor = %principal.id(), "Deleted event");
        Ok(())
    }

    async fn list_members(&self, id: EventId) -> Result<Vec<MemberView>, EventError> {
        self.find_event(id).await?;
        let members = self.store.list_event_members(id).await?;
        Ok(members.into_iter().map(MemberView::from).collect())
    }

    async fn join_event(
        &self,
        principal: &Principal,
        event_id: EventId,
        account_id: AccountId,
        status: MemberStatus,
    ) -> Result<MemberView, EventError> {
        policy::require(
            policy::can_modify_resource_owned_by(principal, account_id),
            "Cannot add another account to an event",
        )?;
        load_active_account(&self.store, principal).await?;

        self.find_event(event_id).await?;
        if !self.store.account_exists(account_id).await? {
            return Err(EventError::NotFound(format!(
                "Account {account_id} not found"
            )));
        }

        let member = self
            .store
            .add_event_member(event_id, account_id, status)
            .await?;

        info!(event_id = %event_id, account_id = %account_id, status = member.status.as_str(), "Joined event");
        Ok(member.into())
    }

    async fn leave_event(
        &self,
        principal: &Principal,
        event_id: EventId,
        account_id: AccountId,
    ) -> Result<(), EventError> {
        let event = self.find_event(event_id).await?;
        policy::require(
            policy::can_modify_resource_owned_by(principal, account_id)
                || policy::can_modify_resource_owned_by(principal, event.organizer_id),
            "Cannot remove this member",
        )?;
        load_active_account(&self.store, principal).await?;

        if !self.store.remove_event_member(event_id, account_id).await? {
            return Err(EventError::NotFound(format!(
                "Account {account_id} is not a member of event {event_id}"
            )));
        }

        info!(event_id = %event_id, account_id = %account_id, actor = %principal.id(), "Left event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_is_normalized_to_utc() {
        let normalized = normalize_starts_at("2024-06-01T18:30:00+02:00").unwrap();
        assert_eq!(normalized, "2024-06-01T16:30:00+00:00");
    }

    #[test]
    fn starts_at_rejects_plain_dates() {
        assert!(matches!(
            normalize_starts_at("2024-06-01"),
            Err(EventError::ValidationFailed(_))
        ));
    }

    #[test]
    fn blank_title_is_rejected() {
        assert!(validate_title("   ").is_err());
        assert_eq!(validate_title(" Morning run ").unwrap(), "Morning run");
    }
}
