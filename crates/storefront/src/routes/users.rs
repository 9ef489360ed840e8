//! User route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use shopfront_core::Email;

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::models::SessionUser;
use crate::models::api::{SyncUserRequest, UpdateUserRequest, UserResponse};
use crate::state::AppState;

use super::require_user_key;

/// `POST /api/users/sync` - create the user or refresh its profile.
///
/// A blank name falls back to the email's local part.
#[instrument(skip(state, request), fields(user = %request.user_key))]
pub async fn sync(
    State(state): State<AppState>,
    Json(request): Json<SyncUserRequest>,
) -> Result<Json<UserResponse>> {
    let key = require_user_key(Some(&request.user_key))?;
    let email = Email::parse(&request.email)
        .map_err(|e| AppError::BadRequest(format!("invalid email: {e}")))?;

    let mut session_user = SessionUser::new(key, email, Some(&request.name));
    session_user.profile_image = request.profile_image;

    let user = UserRepository::new(state.pool())
        .upsert(&session_user.key, &session_user.profile())
        .await?;

    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

/// `GET /api/users/{userKey}` - a user's profile.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(user_key): Path<String>,
) -> Result<Json<UserResponse>> {
    let key = require_user_key(Some(&user_key))?;

    let user = UserRepository::new(state.pool())
        .get_by_key(&key)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

/// `PUT /api/users/update` - partial profile update.
#[instrument(skip(state, request), fields(user = %request.user_key))]
pub async fn update(
    State(state): State<AppState>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    let key = require_user_key(Some(&request.user_key))?;

    let user = UserRepository::new(state.pool())
        .update_profile(&key, &request.update)
        .await?;

    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}
