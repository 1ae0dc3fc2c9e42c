use crate::domain::{AccountId, RoleName};
use serde::Serialize;
use std::collections::BTreeSet;

/// Authenticated identity of the current request.
///
/// Produced once by the authentication flow (login, or session re-resolution)
/// and handed to services by explicit parameter. There are no setters: a
/// principal reflects role membership at the moment it was issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    id: AccountId,
    username: String,
    roles: BTreeSet<RoleName>,
}

impl Principal {
    #[must_use]
    pub fn new(
        id: AccountId,
        username: impl Into<String>,
        roles: impl IntoIterator<Item = RoleName>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            roles: roles.into_iter().collect(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> AccountId {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub const fn roles(&self) -> &BTreeSet<RoleName> {
        &self.roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_roles_collapse() {
        let principal = Principal::new(
            AccountId::new(1),
            "alice1",
            [RoleName::User, RoleName::User, RoleName::Admin],
        );
        assert_eq!(principal.roles().len(), 2);
    }

    #[test]
    fn serializes_without_credentials() {
        let principal = Principal::new(AccountId::new(3), "alice1", [RoleName::User]);
        let json = serde_json::to_value(&principal).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["username"], "alice1");
        assert_eq!(json["roles"], serde_json::json!(["USER"]));
    }
}
