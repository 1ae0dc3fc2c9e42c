use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{
    validate_birthday, validate_first_name, validate_id, validate_password, validate_username,
};
use super::{
    AccountListQuery, ApiError, ApiResponse, AppState, GrantRoleRequest, MessageResponse,
    RolesResponse, SetEnabledRequest,
};
use crate::auth::Principal;
use crate::domain::{AccountId, Gender, RoleName};
use crate::services::{
    AccountError, AccountProfile, PasswordChangeRequest, ProfileUpdate, RegisterRequest,
};

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::ValidationFailed(msg) => Self::validation(msg),
            AccountError::Conflict(msg) => Self::Conflict(msg),
            AccountError::NotFound(msg) => Self::NotFound(msg),
            AccountError::Forbidden(msg) => Self::Forbidden(msg),
            AccountError::InvalidCredentials => Self::invalid_credentials(),
            AccountError::Internal(msg) => Self::internal(msg),
        }
    }
}

/// Profile changes as sent over the wire. Birthday and gender arrive as
/// strings so malformed values yield a validation error instead of a
/// deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileBody {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub birthday: Option<String>,
    pub hide_birthday: Option<bool>,
    pub info: Option<String>,
    pub photo_link: Option<String>,
}

impl UpdateProfileBody {
    fn into_update(self) -> Result<ProfileUpdate, ApiError> {
        if let Some(first_name) = &self.first_name {
            validate_first_name(first_name)?;
        }

        let gender = self
            .gender
            .as_deref()
            .map(str::parse::<Gender>)
            .transpose()
            .map_err(ApiError::validation)?;

        let birthday = self.birthday.as_deref().map(validate_birthday).transpose()?;

        Ok(ProfileUpdate {
            first_name: self.first_name,
            last_name: self.last_name,
            gender,
            birthday,
            hide_birthday: self.hide_birthday,
            info: self.info,
            photo_link: self.photo_link,
        })
    }
}

fn account_id(id: i32) -> Result<AccountId, ApiError> {
    validate_id("account", id).map(AccountId::new)
}

/// POST /accounts
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AccountProfile>>), ApiError> {
    validate_username(&payload.username)?;
    validate_password(&payload.password)?;
    validate_first_name(&payload.first_name)?;

    let profile = state.account_service().register(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(profile))))
}

/// GET /accounts, optionally narrowed with `?ids=1,2`
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccountListQuery>,
) -> Result<Json<ApiResponse<Vec<AccountProfile>>>, ApiError> {
    let service = state.account_service();

    let profiles = match query.ids {
        Some(ids) => {
            let ids = ids
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| {
                    s.trim()
                        .parse::<i32>()
                        .map_err(|_| ApiError::validation(format!("Invalid account ID: {s}")))
                        .and_then(account_id)
                })
                .collect::<Result<Vec<_>, _>>()?;
            service.get_profiles(&ids).await?
        }
        None => service.list_profiles().await?,
    };

    Ok(Json(ApiResponse::success(profiles)))
}

/// GET /accounts/{id}
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<AccountProfile>>, ApiError> {
    let profile = state.account_service().get_profile(account_id(id)?).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// PUT /accounts/{id}
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProfileBody>,
) -> Result<Json<ApiResponse<AccountProfile>>, ApiError> {
    let changes = payload.into_update()?;
    let profile = state
        .account_service()
        .update_profile(&principal, account_id(id)?, changes)
        .await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// PUT /accounts/{id}/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(payload): Json<PasswordChangeRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    validate_password(&payload.new_password)?;

    state
        .account_service()
        .change_password(&principal, account_id(id)?, payload)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password updated successfully",
    ))))
}

/// DELETE /accounts/{id}
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let target = account_id(id)?;
    state
        .account_service()
        .delete_account(&principal, target)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Account {target} deleted"
    )))))
}

/// PUT /accounts/{id}/enabled
pub async fn set_enabled(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(payload): Json<SetEnabledRequest>,
) -> Result<Json<ApiResponse<AccountProfile>>, ApiError> {
    let profile = state
        .account_service()
        .set_enabled(&principal, account_id(id)?, payload.enabled)
        .await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// GET /roles
pub async fn list_roles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<RoleName>>>, ApiError> {
    let roles = state.roles().all().map(|role| role.name).collect();
    Ok(Json(ApiResponse::success(roles)))
}

/// POST /accounts/{id}/roles
pub async fn grant_role(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(payload): Json<GrantRoleRequest>,
) -> Result<Json<ApiResponse<RolesResponse>>, ApiError> {
    let target = account_id(id)?;
    let roles = state
        .account_service()
        .grant_role(&principal, target, &payload.role)
        .await?;

    Ok(Json(ApiResponse::success(RolesResponse {
        id: target,
        roles: roles.into_iter().collect(),
    })))
}
