//! Persistence contract consumed by the cart session.
//!
//! The cart sync coordinator and the identity hub only talk to persistence
//! through [`Persistence`]. Two implementations ship with the crate:
//!
//! - [`ApiClient`](crate::api_client::ApiClient) - HTTP client for the `/api`
//!   routes served by this crate's binary
//! - [`InMemoryPersistence`] - process-local store used for offline sessions
//!
//! No call is retried; callers decide what a failure means.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use shopfront_core::{CartValidationError, StoredCartLine, UserId, UserKey};

use crate::models::{Address, ProfileUpdate, User, UserProfile};

/// Failures reported by a [`Persistence`] implementation.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// Transport or server failure.
    #[error("remote error: {0}")]
    Remote(String),

    /// No user record for the key.
    #[error("user not found")]
    NotFound,

    /// Stored data could not be mapped into cart lines.
    #[error("invalid cart data: {0}")]
    Validation(#[from] CartValidationError),
}

/// Cart and user storage keyed by the identity provider's user key.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Stored cart lines for `user`, in insertion order.
    async fn fetch_cart(&self, user: &UserKey) -> Result<Vec<StoredCartLine>, SyncError>;

    /// Overwrite the stored cart for `user`.
    async fn replace_cart(&self, user: &UserKey, lines: &[StoredCartLine])
    -> Result<(), SyncError>;

    /// Empty the stored cart for `user`.
    async fn clear_cart(&self, user: &UserKey) -> Result<(), SyncError>;

    /// Create the user if missing, otherwise refresh its profile.
    async fn fetch_or_create_user(
        &self,
        user: &UserKey,
        profile: &UserProfile,
    ) -> Result<User, SyncError>;

    /// Apply a partial profile update.
    async fn update_user(&self, user: &UserKey, update: &ProfileUpdate)
    -> Result<User, SyncError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<UserKey, User>,
    carts: HashMap<UserKey, Vec<StoredCartLine>>,
    next_id: i64,
}

/// Process-local [`Persistence`].
///
/// Cheap to clone; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPersistence {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryPersistence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `lines` as the cart of `user`, creating the user from `profile`
    /// if needed.
    pub fn seed_cart(&self, user: &UserKey, profile: &UserProfile, lines: Vec<StoredCartLine>) {
        self.with_state(|state| {
            state.upsert(user, profile);
            state.carts.insert(user.clone(), lines);
        });
    }

    /// The stored cart of `user`, if the user exists.
    #[must_use]
    pub fn stored_cart(&self, user: &UserKey) -> Option<Vec<StoredCartLine>> {
        self.with_state(|state| {
            state
                .users
                .contains_key(user)
                .then(|| state.carts.get(user).cloned().unwrap_or_default())
        })
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> T {
        // A panic while holding the lock cannot leave the maps half-updated.
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

impl MemoryState {
    fn upsert(&mut self, key: &UserKey, profile: &UserProfile) -> User {
        let now = Utc::now();
        if let Some(user) = self.users.get_mut(key) {
            user.email = profile.email.clone();
            user.name.clone_from(&profile.name);
            user.profile_image.clone_from(&profile.profile_image);
            user.updated_at = now;
            return user.clone();
        }

        self.next_id += 1;
        let user = User {
            id: UserId::new(self.next_id),
            user_key: key.clone(),
            email: profile.email.clone(),
            name: profile.name.clone(),
            profile_image: profile.profile_image.clone(),
            phone: String::new(),
            address: Address::default(),
            created_at: now,
            updated_at: now,
        };
        self.users.insert(key.clone(), user.clone());
        user
    }
}

#[async_trait]
impl Persistence for InMemoryPersistence {
    async fn fetch_cart(&self, user: &UserKey) -> Result<Vec<StoredCartLine>, SyncError> {
        self.stored_cart(user).ok_or(SyncError::NotFound)
    }

    async fn replace_cart(
        &self,
        user: &UserKey,
        lines: &[StoredCartLine],
    ) -> Result<(), SyncError> {
        for line in lines {
            line.validate()?;
        }
        self.with_state(|state| {
            if !state.users.contains_key(user) {
                return Err(SyncError::NotFound);
            }
            state.carts.insert(user.clone(), lines.to_vec());
            Ok(())
        })
    }

    async fn clear_cart(&self, user: &UserKey) -> Result<(), SyncError> {
        self.replace_cart(user, &[]).await
    }

    async fn fetch_or_create_user(
        &self,
        user: &UserKey,
        profile: &UserProfile,
    ) -> Result<User, SyncError> {
        Ok(self.with_state(|state| state.upsert(user, profile)))
    }

    async fn update_user(
        &self,
        user: &UserKey,
        update: &ProfileUpdate,
    ) -> Result<User, SyncError> {
        self.with_state(|state| {
            let stored = state.users.get_mut(user).ok_or(SyncError::NotFound)?;
            if let Some(name) = update.effective_name() {
                name.clone_into(&mut stored.name);
            }
            if let Some(image) = &update.profile_image {
                stored.profile_image.clone_from(image);
            }
            if let Some(phone) = &update.phone {
                stored.phone.clone_from(phone);
            }
            if let Some(address) = &update.address {
                stored.address = address.clone();
            }
            stored.updated_at = Utc::now();
            Ok(stored.clone())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use shopfront_core::Email;

    use super::*;

    fn key(s: &str) -> UserKey {
        UserKey::parse(s).unwrap()
    }

    fn profile(name: &str) -> UserProfile {
        UserProfile {
            email: Email::parse(&format!("{name}@example.com")).unwrap(),
            name: name.to_string(),
            profile_image: String::new(),
        }
    }

    fn line(id: &str, quantity: i64) -> StoredCartLine {
        StoredCartLine {
            product_id: id.to_string(),
            name: format!("Product {id}"),
            price: Decimal::from(10),
            image: String::new(),
            description: String::new(),
            category: "misc".to_string(),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let store = InMemoryPersistence::new();
        let missing = key("nobody");
        assert!(matches!(
            store.fetch_cart(&missing).await,
            Err(SyncError::NotFound)
        ));
        assert!(matches!(
            store.replace_cart(&missing, &[]).await,
            Err(SyncError::NotFound)
        ));
        assert!(matches!(
            store.clear_cart(&missing).await,
            Err(SyncError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_and_keeps_cart() {
        let store = InMemoryPersistence::new();
        let ada = key("ada");
        let first = store
            .fetch_or_create_user(&ada, &profile("ada"))
            .await
            .unwrap();
        store.replace_cart(&ada, &[line("1", 2)]).await.unwrap();

        let second = store
            .fetch_or_create_user(&ada, &profile("ada"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.fetch_cart(&ada).await.unwrap(), vec![line("1", 2)]);
    }

    #[tokio::test]
    async fn test_replace_rejects_invalid_lines() {
        let store = InMemoryPersistence::new();
        let ada = key("ada");
        store.seed_cart(&ada, &profile("ada"), vec![line("1", 1)]);

        let result = store.replace_cart(&ada, &[line("2", 0)]).await;

        assert!(matches!(result, Err(SyncError::Validation(_))));
        assert_eq!(store.stored_cart(&ada).unwrap(), vec![line("1", 1)]);
    }

    #[tokio::test]
    async fn test_update_user_partial() {
        let store = InMemoryPersistence::new();
        let ada = key("ada");
        store
            .fetch_or_create_user(&ada, &profile("ada"))
            .await
            .unwrap();

        let updated = store
            .update_user(
                &ada,
                &ProfileUpdate {
                    name: Some(String::new()),
                    phone: Some("555-0100".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "ada");
        assert_eq!(updated.phone, "555-0100");
    }
}
