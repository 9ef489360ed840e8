//! Session identity types.
//!
//! The identity provider publishes the signed-in user as a [`SessionUser`]; the
//! cart sync coordinator keys every persistence call off [`SessionUser::key`].

use serde::{Deserialize, Serialize};

use shopfront_core::{Email, UserKey};

use super::user::UserProfile;

/// Fallback display name when neither a name nor an email local part is usable.
pub const DEFAULT_DISPLAY_NAME: &str = "User";

/// The currently signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// Identity provider key; shared namespace with stored users and carts.
    pub key: UserKey,
    pub email: Email,
    pub display_name: String,
    #[serde(default)]
    pub profile_image: String,
}

impl SessionUser {
    /// Create a session user, deriving a display name when `display_name` is
    /// blank: the email's local part, or [`DEFAULT_DISPLAY_NAME`].
    #[must_use]
    pub fn new(key: UserKey, email: Email, display_name: Option<&str>) -> Self {
        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .or_else(|| Some(email.local_part()).filter(|local| !local.is_empty()))
            .unwrap_or(DEFAULT_DISPLAY_NAME)
            .to_owned();

        Self {
            key,
            email,
            display_name,
            profile_image: String::new(),
        }
    }

    /// Profile to upsert in the persistence service for this user.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            email: self.email.clone(),
            name: self.display_name.clone(),
            profile_image: self.profile_image.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key() -> UserKey {
        UserKey::parse("uid-1").unwrap()
    }

    #[test]
    fn test_display_name_kept_when_present() {
        let email = Email::parse("ada@example.com").unwrap();
        let user = SessionUser::new(key(), email, Some("Ada Lovelace"));
        assert_eq!(user.display_name, "Ada Lovelace");
    }

    #[test]
    fn test_display_name_falls_back_to_local_part() {
        let email = Email::parse("grace@example.com").unwrap();
        assert_eq!(
            SessionUser::new(key(), email.clone(), None).display_name,
            "grace"
        );
        assert_eq!(
            SessionUser::new(key(), email, Some("   ")).display_name,
            "grace"
        );
    }

    #[test]
    fn test_profile_mirrors_user() {
        let email = Email::parse("ada@example.com").unwrap();
        let mut user = SessionUser::new(key(), email, Some("Ada"));
        user.profile_image = "/ada.png".to_string();

        let profile = user.profile();
        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.profile_image, "/ada.png");
    }
}
