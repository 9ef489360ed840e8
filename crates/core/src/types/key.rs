//! String keys owned by systems outside the persistence service.
//!
//! - [`ItemId`] identifies a catalog item. Catalog IDs arrive as either
//!   strings or numbers; both are stored as their string form, so `7` and
//!   `"7"` name the same item.
//! - [`UserKey`] is the identity provider's stable user identifier. It is the
//!   namespace shared by user records and stored carts.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Opaque catalog item identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Create an item ID from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the ID is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors that can occur when parsing a [`UserKey`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UserKeyError {
    /// The key is empty after trimming.
    #[error("user key cannot be empty")]
    Empty,
    /// The key is longer than allowed.
    #[error("user key must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The key contains whitespace or control characters.
    #[error("user key contains invalid characters")]
    InvalidCharacters,
}

/// External identity key for a user.
///
/// ```
/// use shopfront_core::UserKey;
///
/// assert!(UserKey::parse("uid_8f2a").is_ok());
/// assert!(UserKey::parse("  ").is_err());
/// assert!(UserKey::parse("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserKey(String);

impl UserKey {
    /// Maximum key length accepted from identity providers.
    pub const MAX_LENGTH: usize = 128;

    /// Parse a user key, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed key is empty, longer than
    /// [`Self::MAX_LENGTH`], or contains whitespace/control characters.
    pub fn parse(s: &str) -> Result<Self, UserKeyError> {
        let key = s.trim();
        if key.is_empty() {
            return Err(UserKeyError::Empty);
        }
        if key.chars().count() > Self::MAX_LENGTH {
            return Err(UserKeyError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(UserKeyError::InvalidCharacters);
        }
        Ok(Self(key.to_owned()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UserKey {
    type Err = UserKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for UserKey {
    type Error = UserKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UserKey> for String {
    fn from(key: UserKey) -> Self {
        key.0
    }
}

impl AsRef<str> for UserKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_and_string_item_ids_match() {
        assert_eq!(ItemId::from(7_u64), ItemId::from("7"));
        assert_eq!(ItemId::from(-3_i64).as_str(), "-3");
    }

    #[test]
    fn test_item_id_blank() {
        assert!(ItemId::from("   ").is_blank());
        assert!(!ItemId::from("sku-1").is_blank());
    }

    #[test]
    fn test_user_key_trims() {
        let key = UserKey::parse("  abc123 ").unwrap();
        assert_eq!(key.as_str(), "abc123");
    }

    #[test]
    fn test_user_key_rejects_invalid() {
        assert_eq!(UserKey::parse(""), Err(UserKeyError::Empty));
        assert_eq!(
            UserKey::parse("a b"),
            Err(UserKeyError::InvalidCharacters)
        );
        let long = "k".repeat(UserKey::MAX_LENGTH + 1);
        assert!(matches!(
            UserKey::parse(&long),
            Err(UserKeyError::TooLong { .. })
        ));
    }

    #[test]
    fn test_user_key_deserialize_validates() {
        let ok: Result<UserKey, _> = serde_json::from_str("\"uid-1\"");
        assert!(ok.is_ok());
        let bad: Result<UserKey, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }
}
