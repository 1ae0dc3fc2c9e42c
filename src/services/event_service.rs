//! Domain service for sport events and their memberships.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{AccessDenied, Principal};
use crate::db::{EventMember, SportEvent, StoreError};
use crate::domain::{AccountId, EventId, MemberStatus};
use crate::services::account_service::AccountError;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EventError {
    pub fn event_not_found(id: EventId) -> Self {
        Self::NotFound(format!("Event {id} not found"))
    }
}

impl From<StoreError> for EventError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::NotFound(msg) => Self::NotFound(msg),
            StoreError::Database(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<AccessDenied> for EventError {
    fn from(err: AccessDenied) -> Self {
        Self::Forbidden(err.0)
    }
}

impl From<AccountError> for EventError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::ValidationFailed(msg) => Self::ValidationFailed(msg),
            AccountError::Conflict(msg) => Self::Conflict(msg),
            AccountError::NotFound(msg) => Self::NotFound(msg),
            AccountError::Forbidden(msg) => Self::Forbidden(msg),
            AccountError::InvalidCredentials => Self::Forbidden("Invalid credentials".to_string()),
            AccountError::Internal(msg) => Self::Internal(msg),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub starts_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventView {
    pub id: EventId,
    pub organizer_id: AccountId,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: String,
    pub created_at: String,
}

impl From<SportEvent> for EventView {
    fn from(event: SportEvent) -> Self {
        Self {
            id: event.id,
            organizer_id: event.organizer_id,
            title: event.title,
            description: event.description,
            starts_at: event.starts_at,
            created_at: event.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberView {
    pub event_id: EventId,
    pub account_id: AccountId,
    pub status: MemberStatus,
    pub joined_at: String,
}

impl From<EventMember> for MemberView {
    fn from(member: EventMember) -> Self {
        Self {
            event_id: member.event_id,
            account_id: member.account_id,
            status: member.status,
            joined_at: member.joined_at,
        }
    }
}

/// Ownership of an event belongs to its organizer; ownership of a membership
/// belongs to the member.
#[async_trait::async_trait]
pub trait EventService: Send + Sync {
    /// Creates an event organized by the principal.
    async fn create_event(
        &self,
        principal: &Principal,
        request: CreateEventRequest,
    ) -> Result<EventView, EventError>;

    async fn get_event(&self, id: EventId) -> Result<EventView, EventError>;

    async fn list_events(&self) -> Result<Vec<EventView>, EventError>;

    /// # Errors
    ///
    /// [`EventError::Forbidden`] unless the principal organizes the event or is an admin.
    async fn update_event(
        &self,
        principal: &Principal,
        id: EventId,
        request: UpdateEventRequest,
    ) -> Result<EventView, EventError>;

    async fn delete_event(&self, principal: &Principal, id: EventId) -> Result<(), EventError>;

    async fn list_members(&self, id: EventId) -> Result<Vec<MemberView>, EventError>;

    /// Adds `account_id` to the event. Only that account or an admin may do so.
    ///
    /// # Errors
    ///
    /// - [`EventError::Conflict`] if the account is already a member
    /// - [`EventError::NotFound`] if the event or the account is absent
    async fn join_event(
        &self,
        principal: &Principal,
        event_id: EventId,
        account_id: AccountId,
        status: MemberStatus,
    ) -> Result<MemberView, EventError>;

    /// Allowed for the member, the organizer, or an admin.
    async fn leave_event(
        &self,
        principal: &Principal,
        event_id: EventId,
        account_id: AccountId,
    ) -> Result<(), EventError>;
}
