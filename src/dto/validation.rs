//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::state::nicknames::is_candidate;

/// Validates that a nickname looks like an in-game tag (`name#tag`, at least 3 characters).
///
/// # Examples
///
/// ```ignore
/// validate_nickname("player#KR1") // Ok
/// validate_nickname("player")     // Err - no tag separator
/// validate_nickname("#1")         // Err - too short
/// ```
pub fn validate_nickname(nickname: &str) -> Result<(), ValidationError> {
    if !is_candidate(nickname) {
        let mut err = ValidationError::new("nickname_format");
        err.message = Some("Nickname must contain `#` and be at least 3 characters long".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a member reference: a numeric user ID, a display name or a user name.
pub fn validate_member_ref(reference: &str) -> Result<(), ValidationError> {
    if reference.trim().is_empty() {
        let mut err = ValidationError::new("member_blank");
        err.message = Some("Member reference must not be blank".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_nickname_valid() {
        assert!(validate_nickname("player#KR1").is_ok());
        assert!(validate_nickname("  a#b  ").is_ok());
    }

    #[test]
    fn test_validate_nickname_invalid() {
        assert!(validate_nickname("player").is_err()); // no tag
        assert!(validate_nickname("#1").is_err()); // too short
        assert!(validate_nickname("   ").is_err()); // blank
    }

    #[test]
    fn test_validate_member_ref() {
        assert!(validate_member_ref("1234").is_ok());
        assert!(validate_member_ref("Alice").is_ok());
        assert!(validate_member_ref(" ").is_err());
    }
}
