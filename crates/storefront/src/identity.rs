//! Signed-in identity, published to cart sessions.
//!
//! [`IdentityHub`] stands in for the identity provider: it holds the current
//! [`SessionUser`] in a `watch` channel that every
//! [`CartSession`](crate::sync::CartSession) follows. Signing in mirrors the
//! profile into persistence before the user is published, so the stored user
//! exists by the time the session fetches its cart.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use shopfront_core::{Email, UserKey};

use crate::models::{ProfileUpdate, SessionUser};
use crate::persistence::{Persistence, SyncError};

/// Errors from [`IdentityHub`] operations.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no user is signed in")]
    NotSignedIn,

    #[error("display name is required")]
    MissingName,

    #[error(transparent)]
    Persistence(#[from] SyncError),
}

/// Owner of the current identity.
pub struct IdentityHub {
    tx: watch::Sender<Option<SessionUser>>,
    persistence: Arc<dyn Persistence>,
}

impl IdentityHub {
    /// Create a hub with nobody signed in.
    #[must_use]
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx, persistence }
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn current(&self) -> Option<SessionUser> {
        self.tx.borrow().clone()
    }

    /// Receiver for identity changes; pass it to
    /// [`CartSession::spawn`](crate::sync::CartSession::spawn).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionUser>> {
        self.tx.subscribe()
    }

    /// Sign `user` in.
    ///
    /// The profile upsert is best effort: a failure is logged and the user is
    /// published anyway.
    #[instrument(skip(self, user), fields(user = %user.key))]
    pub async fn sign_in(&self, user: SessionUser) {
        if let Err(e) = self
            .persistence
            .fetch_or_create_user(&user.key, &user.profile())
            .await
        {
            warn!(error = %e, "failed to sync user profile; signing in anyway");
        }
        info!("user signed in");
        self.tx.send_replace(Some(user));
    }

    /// Register a new account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::MissingName`] if `name` is blank.
    pub async fn register(
        &self,
        key: UserKey,
        email: Email,
        name: &str,
    ) -> Result<SessionUser, IdentityError> {
        if name.trim().is_empty() {
            return Err(IdentityError::MissingName);
        }
        let user = SessionUser::new(key, email, Some(name));
        self.sign_in(user.clone()).await;
        Ok(user)
    }

    /// Sign the current user out. Does nothing when nobody is signed in.
    pub fn sign_out(&self) {
        let previous = self.tx.send_replace(None);
        if let Some(user) = previous {
            info!(user = %user.key, "user signed out");
        }
    }

    /// Push a profile update to persistence, then publish the updated user.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::NotSignedIn`] when nobody is signed in, or the
    /// persistence error if the update was rejected. The published user is
    /// left unchanged on error.
    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        update: ProfileUpdate,
    ) -> Result<SessionUser, IdentityError> {
        let mut user = self.current().ok_or(IdentityError::NotSignedIn)?;

        let stored = self.persistence.update_user(&user.key, &update).await?;
        user.display_name = stored.name;
        user.profile_image = stored.profile_image;

        // Only publish if the same user is still signed in.
        let published = self.tx.send_if_modified(|current| match current {
            Some(current) if current.key == user.key => {
                *current = user.clone();
                true
            }
            _ => false,
        });
        if !published {
            return Err(IdentityError::NotSignedIn);
        }
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::persistence::InMemoryPersistence;

    use super::*;

    fn hub() -> (IdentityHub, InMemoryPersistence) {
        let store = InMemoryPersistence::new();
        (IdentityHub::new(Arc::new(store.clone())), store)
    }

    fn ada() -> SessionUser {
        SessionUser::new(
            UserKey::parse("ada").unwrap(),
            Email::parse("ada@example.com").unwrap(),
            Some("Ada"),
        )
    }

    #[tokio::test]
    async fn test_sign_in_creates_stored_user_and_publishes() {
        let (hub, store) = hub();
        let mut rx = hub.subscribe();

        hub.sign_in(ada()).await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref(), Some(&ada()));
        assert_eq!(store.stored_cart(&ada().key), Some(vec![]));
    }

    #[tokio::test]
    async fn test_register_requires_name() {
        let (hub, _) = hub();
        let user = ada();

        let result = hub.register(user.key, user.email, "  ").await;

        assert!(matches!(result, Err(IdentityError::MissingName)));
        assert!(hub.current().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_publishes_none() {
        let (hub, _) = hub();
        hub.sign_in(ada()).await;

        hub.sign_out();

        assert!(hub.current().is_none());
    }

    #[tokio::test]
    async fn test_update_profile_requires_sign_in() {
        let (hub, _) = hub();
        let result = hub.update_profile(ProfileUpdate::default()).await;
        assert!(matches!(result, Err(IdentityError::NotSignedIn)));
    }

    #[tokio::test]
    async fn test_update_profile_publishes_new_name() {
        let (hub, _) = hub();
        hub.sign_in(ada()).await;

        let updated = hub
            .update_profile(ProfileUpdate {
                name: Some("Ada Lovelace".to_string()),
                ..ProfileUpdate::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.display_name, "Ada Lovelace");
        assert_eq!(hub.current().unwrap().display_name, "Ada Lovelace");
    }
}
