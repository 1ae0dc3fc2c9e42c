use serde::{Deserialize, Serialize};

use crate::domain::{AccountId, MemberStatus, RoleName};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PrincipalDto {
    pub id: AccountId,
    pub username: String,
    pub roles: Vec<RoleName>,
}

#[derive(Debug, Deserialize)]
pub struct SetEnabledRequest {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct GrantRoleRequest {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct RolesResponse {
    pub id: AccountId,
    pub roles: Vec<RoleName>,
}

#[derive(Debug, Deserialize)]
pub struct JoinEventRequest {
    /// Defaults to the caller.
    #[serde(default)]
    pub account_id: Option<AccountId>,
    #[serde(default)]
    pub status: MemberStatus,
}

/// `GET /accounts?ids=1,2,3`
#[derive(Debug, Deserialize)]
pub struct AccountListQuery {
    #[serde(default)]
    pub ids: Option<String>,
}
