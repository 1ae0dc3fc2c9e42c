//! Domain types for accounts, roles and events with strong typing.
//!
//! Identifiers follow the Newtype pattern so an account id can never be passed
//! where an event id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for an Account.
///
/// # Examples
///
/// ```rust
/// use dosport::domain::AccountId;
///
/// let id = AccountId::new(42);
/// assert_eq!(id.value(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AccountId(i32);

impl AccountId {
    /// Creates a new `AccountId` from a raw i32 value.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if `id` is negative.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        debug_assert!(id >= 0, "AccountId should be non-negative");
        Self(id)
    }

    /// Returns the underlying i32 value.
    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<AccountId> for i32 {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl From<i32> for AccountId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl Serialize for AccountId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(self.0)
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = i32::deserialize(deserializer)?;
        Ok(Self::new(id))
    }
}

/// Unique identifier for a sport event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EventId(i32);

impl EventId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        debug_assert!(id >= 0, "EventId should be non-negative");
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for EventId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl Serialize for EventId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(self.0)
    }
}

/// Named authority assignable to an account.
///
/// The set is closed: roles are reference data seeded by the migrator and are
/// never created by end users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoleName {
    User,
    Admin,
}

impl RoleName {
    pub const ALL: [Self; 2] = [Self::User, Self::Admin];

    /// Name as persisted in the `authorities` table.
    #[must_use]
    pub const fn authority(&self) -> &'static str {
        match self {
            Self::User => "ROLE_USER",
            Self::Admin => "ROLE_ADMIN",
        }
    }

    /// Short name used in API payloads and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }

    /// Accepts both the short (`ADMIN`) and the stored (`ROLE_ADMIN`) spelling,
    /// case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        let short = upper.strip_prefix("ROLE_").unwrap_or(&upper);
        Self::ALL.into_iter().find(|role| role.as_str() == short)
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RoleName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    #[default]
    NotSelected,
    Male,
    Female,
}

impl Gender {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotSelected => "NOT_SELECTED",
            Self::Male => "MALE",
            Self::Female => "FEMALE",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NOT_SELECTED" | "" => Ok(Self::NotSelected),
            "MALE" => Ok(Self::Male),
            "FEMALE" => Ok(Self::Female),
            other => Err(format!("Unknown gender: {other}")),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Participation status of an account in an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    #[default]
    Participant,
    Waiting,
}

impl MemberStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Participant => "PARTICIPANT",
            Self::Waiting => "WAITING",
        }
    }
}

impl FromStr for MemberStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PARTICIPANT" => Ok(Self::Participant),
            "WAITING" => Ok(Self::Waiting),
            other => Err(format!("Unknown member status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_name_parses_both_spellings() {
        assert_eq!(RoleName::parse("ADMIN"), Some(RoleName::Admin));
        assert_eq!(RoleName::parse("ROLE_ADMIN"), Some(RoleName::Admin));
        assert_eq!(RoleName::parse("user"), Some(RoleName::User));
        assert_eq!(RoleName::parse("role_user"), Some(RoleName::User));
        assert_eq!(RoleName::parse("MODERATOR"), None);
        assert_eq!(RoleName::parse(""), None);
    }

    #[test]
    fn role_name_authority_roundtrip() {
        for role in RoleName::ALL {
            assert_eq!(RoleName::parse(role.authority()), Some(role));
        }
    }

    #[test]
    fn gender_parsing() {
        assert_eq!("male".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!("".parse::<Gender>().unwrap(), Gender::NotSelected);
        assert!("robot".parse::<Gender>().is_err());
        assert_eq!(Gender::default(), Gender::NotSelected);
    }

    #[test]
    fn gender_serializes_screaming_case() {
        let json = serde_json::to_string(&Gender::NotSelected).unwrap();
        assert_eq!(json, "\"NOT_SELECTED\"");
    }

    #[test]
    fn account_id_display() {
        let id = AccountId::new(7);
        assert_eq!(id.to_string(), "7");
        assert_eq!(i32::from(id), 7);
    }
}
