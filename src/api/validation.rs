use chrono::NaiveDate;

use super::ApiError;

pub const USERNAME_MIN: usize = 4;
pub const USERNAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 4;
pub const PASSWORD_MAX: usize = 20;

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{field} cannot be blank")));
    }

    let len = value.chars().count();
    if !(min..=max).contains(&len) {
        return Err(ApiError::validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    check_length("Username", username, USERNAME_MIN, USERNAME_MAX)?;
    Ok(username)
}

pub fn validate_password(password: &str) -> Result<&str, ApiError> {
    check_length("Password", password, PASSWORD_MIN, PASSWORD_MAX)?;
    Ok(password)
}

pub fn validate_first_name(name: &str) -> Result<&str, ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::validation("First name cannot be blank"));
    }
    Ok(name)
}

pub fn validate_title(title: &str) -> Result<&str, ApiError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Title cannot be empty"));
    }
    if trimmed.chars().count() > 200 {
        return Err(ApiError::validation(
            "Title must be 200 characters or less",
        ));
    }
    Ok(trimmed)
}

pub fn validate_birthday(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ApiError::validation(format!(
            "Invalid birthday: {value}. Expected format YYYY-MM-DD"
        ))
    })
}

pub fn validate_id(kind: &str, id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid {kind} ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice1").is_ok());
        assert!(validate_username("abcd").is_ok());
        assert!(validate_username(&"a".repeat(50)).is_ok());
        assert!(validate_username("abc").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
        assert!(validate_username("    ").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret1").is_ok());
        assert!(validate_password("abc").is_err());
        assert!(validate_password(&"x".repeat(21)).is_err());
        assert!(validate_password("      ").is_err());
    }

    #[test]
    fn test_validate_first_name() {
        assert!(validate_first_name("Alice").is_ok());
        assert!(validate_first_name("").is_err());
        assert!(validate_first_name("  ").is_err());
    }

    #[test]
    fn test_validate_birthday() {
        assert_eq!(
            validate_birthday("1990-04-01").unwrap(),
            NaiveDate::from_ymd_opt(1990, 4, 1).unwrap()
        );
        assert!(validate_birthday("01.04.1990").is_err());
        assert!(validate_birthday("1990-13-01").is_err());
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("account", 1).is_ok());
        assert!(validate_id("account", 0).is_err());
        assert!(validate_id("event", -3).is_err());
    }
}
