//! User accounts, their credentials and their active authentication tokens.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE users (
//!     id UUID PRIMARY KEY,
//!     name TEXT NOT NULL,
//!     email TEXT NOT NULL UNIQUE,
//!     password_hash TEXT NOT NULL,
//!     age INTEGER NOT NULL DEFAULT 0 CHECK (age >= 0),
//!     avatar BYTEA,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//!
//! CREATE TABLE user_tokens (
//!     id BIGSERIAL PRIMARY KEY,
//!     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     token TEXT NOT NULL UNIQUE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::auth::password::hash_password_blocking;
use crate::error::AppError;

/// Keys a client may send to `PATCH /users/me`.
pub const USER_UPDATE_FIELDS: &[&str] = &["name", "email", "password", "age"];

const USER_COLUMNS: &str = "id, name, email, password_hash, age, created_at, updated_at";

/// A user account as stored in the database.
///
/// The password hash is never serialized, and neither the token set nor the
/// avatar blob is part of this struct.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Rejects passwords that contain the word "password" in any casing.
fn validate_password_content(password: &str) -> Result<(), ValidationError> {
    if password.to_lowercase().contains("password") {
        let mut error = ValidationError::new("password_content");
        error.message = Some("Password cannot contain \"password\"".into());
        return Err(error);
    }
    Ok(())
}

/// Signup payload for `POST /users`.
#[derive(Debug, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Email is invalid"))]
    pub email: String,
    #[validate(
        length(min = 7, message = "Password must be at least 7 characters"),
        custom = "validate_password_content"
    )]
    pub password: String,
    #[validate(range(min = 0, message = "Age must be a positive number"))]
    pub age: Option<i32>,
}

impl NewUser {
    /// Trims text fields and lower-cases the email.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: normalize_email(&self.email),
            password: self.password.trim().to_string(),
            age: self.age,
        }
    }
}

/// Partial update payload for `PATCH /users/me`.
///
/// Callers check the raw keys against [`USER_UPDATE_FIELDS`] before building this.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,
    #[validate(
        length(min = 7, message = "Password must be at least 7 characters"),
        custom = "validate_password_content"
    )]
    pub password: Option<String>,
    #[validate(range(min = 0, message = "Age must be a positive number"))]
    pub age: Option<i32>,
}

impl UserUpdate {
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.map(|name| name.trim().to_string()),
            email: self.email.as_deref().map(normalize_email),
            password: self.password.map(|password| password.trim().to_string()),
            age: self.age,
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    /// Inserts a new account together with its first token.
    ///
    /// `password_hash` must already be hashed.
    pub async fn create(
        pool: &PgPool,
        input: &NewUser,
        password_hash: &str,
        token_for: impl FnOnce(Uuid) -> Result<String, AppError>,
    ) -> Result<(User, String), AppError> {
        let id = Uuid::new_v4();
        let token = token_for(id)?;

        let mut tx = pool.begin().await?;
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, name, email, password_hash, age) VALUES ($1, $2, $3, $4, $5) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(password_hash)
        .bind(input.age.unwrap_or(0))
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO user_tokens (user_id, token) VALUES ($1, $2)")
            .bind(user.id)
            .bind(&token)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok((user, token))
    }

    pub async fn email_taken(pool: &PgPool, email: &str) -> Result<bool, AppError> {
        let existing = sqlx::query_as::<_, (Uuid,)>("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?;
        Ok(existing.is_some())
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    /// Loads the user `id` only if `token` is one of its active tokens.
    pub async fn find_by_token(pool: &PgPool, id: Uuid, token: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT u.id, u.name, u.email, u.password_hash, u.age, u.created_at, u.updated_at \
             FROM users u JOIN user_tokens t ON t.user_id = u.id \
             WHERE u.id = $1 AND t.token = $2",
        )
        .bind(id)
        .bind(token)
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    pub async fn add_token(pool: &PgPool, id: Uuid, token: &str) -> Result<(), AppError> {
        sqlx::query("INSERT INTO user_tokens (user_id, token) VALUES ($1, $2)")
            .bind(id)
            .bind(token)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Active tokens of a user, oldest first.
    pub async fn tokens(pool: &PgPool, id: Uuid) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query_as::<_, (String,)>(
            "SELECT token FROM user_tokens WHERE user_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(token,)| token).collect())
    }

    pub async fn remove_token(pool: &PgPool, id: Uuid, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_tokens WHERE user_id = $1 AND token = $2")
            .bind(id)
            .bind(token)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn clear_tokens(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_tokens WHERE user_id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Saves a profile update.
    ///
    /// The update is normalized and validated first. A new password is hashed
    /// before it reaches the database; fields left as `None` keep their value.
    pub async fn apply_update(pool: &PgPool, id: Uuid, update: UserUpdate) -> Result<User, AppError> {
        let update = update.normalized();
        update.validate()?;

        let password_hash = match update.password {
            Some(password) => Some(hash_password_blocking(password).await?),
            None => None,
        };

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                 name = COALESCE($2, name), \
                 email = COALESCE($3, email), \
                 password_hash = COALESCE($4, password_hash), \
                 age = COALESCE($5, age), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.name)
        .bind(update.email)
        .bind(password_hash)
        .bind(update.age)
        .fetch_optional(pool)
        .await?;

        user.ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    /// Deletes the account, its tokens and every task it owns in one transaction.
    pub async fn delete_with_tasks(pool: &PgPool, id: Uuid) -> Result<User, AppError> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM tasks WHERE owner_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let user = sqlx::query_as::<_, User>(&format!(
            "DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        tx.commit().await?;
        Ok(user)
    }

    /// Stores (or with `None`, clears) the avatar blob.
    pub async fn set_avatar(pool: &PgPool, id: Uuid, avatar: Option<Vec<u8>>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET avatar = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(avatar)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// The avatar blob, or `None` when the user is unknown or has no avatar.
    pub async fn find_avatar(pool: &PgPool, id: Uuid) -> Result<Option<Vec<u8>>, AppError> {
        let row = sqlx::query_as::<_, (Option<Vec<u8>>,)>("SELECT avatar FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.and_then(|(avatar,)| avatar))
    }
}
