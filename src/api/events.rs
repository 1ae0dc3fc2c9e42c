use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use std::sync::Arc;

use super::validation::{validate_id, validate_title};
use super::{ApiError, ApiResponse, AppState, JoinEventRequest, MessageResponse};
use crate::auth::Principal;
use crate::domain::{AccountId, EventId};
use crate::services::{CreateEventRequest, EventError, EventView, MemberView, UpdateEventRequest};

impl From<EventError> for ApiError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::ValidationFailed(msg) => Self::validation(msg),
            EventError::Conflict(msg) => Self::Conflict(msg),
            EventError::NotFound(msg) => Self::NotFound(msg),
            EventError::Forbidden(msg) => Self::Forbidden(msg),
            EventError::Internal(msg) => Self::internal(msg),
        }
    }
}

/// Event routes. Mounted behind the auth middleware.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/events/{id}/members", get(list_members).post(join_event))
        .route("/events/{id}/members/{account_id}", delete(leave_event))
}

fn event_id(id: i32) -> Result<EventId, ApiError> {
    validate_id("event", id).map(EventId::new)
}

async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<EventView>>>, ApiError> {
    let events = state.event_service().list_events().await?;
    Ok(Json(ApiResponse::success(events)))
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<ApiResponse<EventView>>), ApiError> {
    validate_title(&payload.title)?;
    let event = state
        .event_service()
        .create_event(&principal, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(event))))
}

async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<EventView>>, ApiError> {
    let event = state.event_service().get_event(event_id(id)?).await?;
    Ok(Json(ApiResponse::success(event)))
}

async fn update_event(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<Json<ApiResponse<EventView>>, ApiError> {
    if let Some(title) = &payload.title {
        validate_title(title)?;
    }
    let event = state
        .event_service()
        .update_event(&principal, event_id(id)?, payload)
        .await?;
    Ok(Json(ApiResponse::success(event)))
}

async fn delete_event(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = event_id(id)?;
    state.event_service().delete_event(&principal, id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Event {id} deleted"
    )))))
}

async fn list_members(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<MemberView>>>, ApiError> {
    let members = state.event_service().list_members(event_id(id)?).await?;
    Ok(Json(ApiResponse::success(members)))
}

async fn join_event(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(payload): Json<JoinEventRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MemberView>>), ApiError> {
    let account = payload.account_id.unwrap_or_else(|| principal.id());
    let member = state
        .event_service()
        .join_event(&principal, event_id(id)?, account, payload.status)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(member))))
}

async fn leave_event(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((id, account_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = event_id(id)?;
    let account = AccountId::new(validate_id("account", account_id)?);
    state
        .event_service()
        .leave_event(&principal, id, account)
        .await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Account {account} left event {id}"
    )))))
}
