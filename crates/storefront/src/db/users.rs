//! User repository for database operations.
//!
//! Users are addressed by the identity provider's key; the numeric id stays
//! internal to the database.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use shopfront_core::{Email, UserId, UserKey};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Address, ProfileUpdate, User, UserProfile};

const USER_COLUMNS: &str = "id, user_key, email, name, profile_image, phone, \
     street, city, state, zip_code, country, created_at, updated_at";

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    user_key: String,
    email: String,
    name: String,
    profile_image: String,
    phone: String,
    street: String,
    city: String,
    state: String,
    zip_code: String,
    country: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let user_key = UserKey::parse(&r.user_key).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid user key in database: {e}"))
        })?;
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(r.id),
            user_key,
            email,
            name: r.name,
            profile_image: r.profile_image,
            phone: r.phone,
            address: Address {
                street: r.street,
                city: r.city,
                state: r.state,
                zip_code: r.zip_code,
                country: r.country,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their identity provider key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_key(&self, key: &UserKey) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM shop.user WHERE user_key = $1"
        ))
        .bind(key.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get the internal id of the user with `key`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn id_for_key(&self, key: &UserKey) -> Result<Option<UserId>, RepositoryError> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM shop.user WHERE user_key = $1")
            .bind(key.as_str())
            .fetch_optional(self.pool)
            .await?;

        Ok(id.map(UserId::new))
    }

    /// Create the user, or refresh email, name and image if the key exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if another user owns the email.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn upsert(
        &self,
        key: &UserKey,
        profile: &UserProfile,
    ) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(&format!(
            r"
            INSERT INTO shop.user (user_key, email, name, profile_image)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_key) DO UPDATE
               SET email = EXCLUDED.email,
                   name = EXCLUDED.name,
                   profile_image = EXCLUDED.profile_image,
                   updated_at = now()
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(key.as_str())
        .bind(profile.email.as_str())
        .bind(&profile.name)
        .bind(&profile.profile_image)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique("email already exists"))?;

        User::try_from(row)
    }

    /// Apply a partial profile update. A blank name leaves the name unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has `key`.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_profile(
        &self,
        key: &UserKey,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        let address = update.address.as_ref();
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r"
            UPDATE shop.user
               SET name = COALESCE($2, name),
                   profile_image = COALESCE($3, profile_image),
                   phone = COALESCE($4, phone),
                   street = COALESCE($5, street),
                   city = COALESCE($6, city),
                   state = COALESCE($7, state),
                   zip_code = COALESCE($8, zip_code),
                   country = COALESCE($9, country),
                   updated_at = now()
             WHERE user_key = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(key.as_str())
        .bind(update.effective_name())
        .bind(update.profile_image.as_deref())
        .bind(update.phone.as_deref())
        .bind(address.map(|a| a.street.as_str()))
        .bind(address.map(|a| a.city.as_str()))
        .bind(address.map(|a| a.state.as_str()))
        .bind(address.map(|a| a.zip_code.as_str()))
        .bind(address.map(|a| a.country.as_str()))
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from)
            .transpose()?
            .ok_or(RepositoryError::NotFound)
    }
}
