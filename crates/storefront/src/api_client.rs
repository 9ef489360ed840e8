//! HTTP client for the persistence API.
//!
//! [`ApiClient`] implements [`Persistence`] against the `/api` routes served
//! by the `shopfront-storefront` binary. Status mapping:
//!
//! - `404 Not Found` becomes [`SyncError::NotFound`]
//! - any other non-success status, a transport failure or a body that does
//!   not parse becomes [`SyncError::Remote`]
//!
//! Requests are never retried.

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use shopfront_core::{StoredCartLine, UserKey};

use crate::config::ClientConfig;
use crate::models::api::{
    CartResponse, ErrorResponse, MessageResponse, ReplaceCartRequest, ReplaceCartResponse,
    SyncUserRequest, UpdateUserRequest, UserResponse,
};
use crate::models::{ProfileUpdate, User, UserProfile};
use crate::persistence::{Persistence, SyncError};

/// Persistence API client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client for the API described by `config`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        // Joining relative paths replaces the last segment unless the base
        // ends with a slash.
        let mut base_url = config.api_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { http, base_url })
    }

    /// The base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, SyncError> {
        self.base_url
            .join(path)
            .map_err(|e| SyncError::Remote(format!("invalid endpoint {path}: {e}")))
    }

    fn cart_url(&self, user: &UserKey) -> Result<Url, SyncError> {
        let mut url = self.endpoint("api/cart")?;
        url.query_pairs_mut().append_pair("userKey", user.as_str());
        Ok(url)
    }
}

/// Turn a response into `T`, mapping failure statuses onto [`SyncError`].
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, SyncError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(SyncError::NotFound);
    }
    if !status.is_success() {
        let message = response
            .json::<ErrorResponse>()
            .await
            .map_or_else(|_| status.to_string(), |body| body.error);
        return Err(SyncError::Remote(format!("{status}: {message}")));
    }

    response
        .json()
        .await
        .map_err(|e| SyncError::Remote(format!("malformed response: {e}")))
}

fn transport(e: reqwest::Error) -> SyncError {
    SyncError::Remote(format!("request failed: {e}"))
}

#[async_trait]
impl Persistence for ApiClient {
    #[instrument(skip(self), fields(user = %user))]
    async fn fetch_cart(&self, user: &UserKey) -> Result<Vec<StoredCartLine>, SyncError> {
        let response = self
            .http
            .get(self.cart_url(user)?)
            .send()
            .await
            .map_err(transport)?;

        let body: CartResponse = read_json(response).await?;
        Ok(body.cart)
    }

    #[instrument(skip(self, lines), fields(user = %user, lines = lines.len()))]
    async fn replace_cart(
        &self,
        user: &UserKey,
        lines: &[StoredCartLine],
    ) -> Result<(), SyncError> {
        let request = ReplaceCartRequest {
            user_key: user.to_string(),
            cart: lines.to_vec(),
        };
        let response = self
            .http
            .post(self.endpoint("api/cart")?)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;

        let _: ReplaceCartResponse = read_json(response).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(user = %user))]
    async fn clear_cart(&self, user: &UserKey) -> Result<(), SyncError> {
        let response = self
            .http
            .delete(self.cart_url(user)?)
            .send()
            .await
            .map_err(transport)?;

        let _: MessageResponse = read_json(response).await?;
        Ok(())
    }

    #[instrument(skip(self, profile), fields(user = %user))]
    async fn fetch_or_create_user(
        &self,
        user: &UserKey,
        profile: &UserProfile,
    ) -> Result<User, SyncError> {
        let request = SyncUserRequest {
            user_key: user.to_string(),
            email: profile.email.to_string(),
            name: profile.name.clone(),
            profile_image: profile.profile_image.clone(),
        };
        let response = self
            .http
            .post(self.endpoint("api/users/sync")?)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;

        let body: UserResponse = read_json(response).await?;
        Ok(body.user)
    }

    #[instrument(skip(self, update), fields(user = %user))]
    async fn update_user(
        &self,
        user: &UserKey,
        update: &ProfileUpdate,
    ) -> Result<User, SyncError> {
        let request = UpdateUserRequest {
            user_key: user.to_string(),
            update: update.clone(),
        };
        let response = self
            .http
            .put(self.endpoint("api/users/update")?)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;

        let body: UserResponse = read_json(response).await?;
        Ok(body.user)
    }
}
