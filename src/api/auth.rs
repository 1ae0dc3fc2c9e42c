use axum::{
    Extension, Json,
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, MessageResponse, PrincipalDto};
use crate::auth::Principal;
use crate::domain::AccountId;
use crate::services::{AccountError, AccountProfile};

const SESSION_ACCOUNT_KEY: &str = "account_id";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl From<&Principal> for PrincipalDto {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id(),
            username: principal.username().to_string(),
            roles: principal.roles().iter().copied().collect(),
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Re-derives the [`Principal`] from the session for every protected request.
///
/// A session whose account was deleted or blocked since login is flushed and
/// rejected.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let account_id = session
        .get::<i32>(SESSION_ACCOUNT_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?
        .ok_or_else(ApiError::unauthorized)?;

    let principal = match state
        .account_service()
        .resolve_principal(AccountId::new(account_id))
        .await
    {
        Ok(principal) => principal,
        Err(AccountError::NotFound(_) | AccountError::InvalidCredentials) => {
            tracing::warn!(account_id, "Rejecting session of a deleted or blocked account");
            let _ = session.flush().await;
            return Err(ApiError::unauthorized());
        }
        Err(e) => return Err(ApiError::internal(e.to_string())),
    };

    tracing::Span::current().record("user_id", principal.id().value());
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<PrincipalDto>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    // Unknown user and wrong password look the same from outside
    let principal = match state
        .account_service()
        .authenticate(&payload.username, &payload.password)
        .await
    {
        Ok(principal) => principal,
        Err(AccountError::NotFound(_) | AccountError::InvalidCredentials) => {
            return Err(ApiError::invalid_credentials());
        }
        Err(e) => return Err(e.into()),
    };

    session
        .cycle_id()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;
    session
        .insert(SESSION_ACCOUNT_KEY, principal.id().value())
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    tracing::info!(account_id = %principal.id(), "Login succeeded");

    Ok(Json(ApiResponse::success(PrincipalDto::from(&principal))))
}

/// POST /auth/logout
pub async fn logout(session: Session) -> Json<ApiResponse<MessageResponse>> {
    let _ = session.flush().await;
    Json(ApiResponse::success(MessageResponse::new("Logged out")))
}

/// GET /auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<AccountProfile>>, ApiError> {
    let profile = state.account_service().current_profile(&principal).await?;
    Ok(Json(ApiResponse::success(profile)))
}
