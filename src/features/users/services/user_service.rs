use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::error::{AppError, Result};
use crate::features::auth::{AuthenticatedUser, JwtKeys};
use crate::features::users::dtos::{
    AuthResponseDto, LoginDto, RegisterUserDto, UpdateUserDto, UserResponseDto,
};
use crate::features::users::models::User;
use crate::modules::storage::DiskStore;
use crate::shared::password;
use crate::shared::validation::USERNAME_REGEX;

/// Service for account management
pub struct UserService {
    pool: PgPool,
    keys: Arc<JwtKeys>,
    store: Arc<DiskStore>,
}

impl UserService {
    pub fn new(pool: PgPool, keys: Arc<JwtKeys>, store: Arc<DiskStore>) -> Self {
        Self { pool, keys, store }
    }

    /// Register a new account and issue a session token.
    ///
    /// The password is hashed here, before anything is persisted.
    pub async fn register(&self, dto: RegisterUserDto) -> Result<AuthResponseDto> {
        if !USERNAME_REGEX.is_match(&dto.username) {
            return Err(AppError::Validation(
                "Username must start with a letter or underscore and contain only letters, digits, and underscores".to_string(),
            ));
        }

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM users WHERE email = $1 OR username = $2",
        )
        .bind(&dto.email)
        .bind(&dto.username)
        .fetch_optional(&self.pool)
        .await?;

        if existing.is_some() {
            return Err(AppError::Conflict(
                "Email or username already exists".to_string(),
            ));
        }

        let hash = password::hash_password(&dto.password)
            .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

        let profile_pic = fallback_avatar_url(&dto.fullname);

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (fullname, username, email, password, profile_pic)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&dto.fullname)
        .bind(&dto.username)
        .bind(&dto.email)
        .bind(&hash)
        .bind(&profile_pic)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Races with a concurrent registration land here.
            if is_unique_violation(&e) {
                AppError::Conflict("Email or username already exists".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        let token = self
            .keys
            .sign(user.id, &user.email)
            .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

        info!("User registered: id={}, username={}", user.id, user.username);

        Ok(AuthResponseDto {
            token,
            user: user.into(),
        })
    }

    /// Verify credentials, refresh last_login, and issue a fresh token.
    ///
    /// A mismatched password is rejected outright; the stored hash is never
    /// rewritten on a failed login.
    pub async fn login(&self, dto: LoginDto) -> Result<AuthResponseDto> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(&dto.email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

        let is_valid = password::verify_password(&dto.password, &user.password)
            .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;

        if !is_valid {
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }

        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET last_login = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(user.id)
        .fetch_one(&self.pool)
        .await?;

        let token = self
            .keys
            .sign(user.id, &user.email)
            .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

        info!("User logged in: id={}", user.id);

        Ok(AuthResponseDto {
            token,
            user: user.into(),
        })
    }

    /// List all users, passwords excluded.
    pub async fn list(&self) -> Result<Vec<UserResponseDto>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(users.into_iter().map(|u| u.into()).collect())
    }

    /// Get one user by id, password excluded.
    pub async fn get(&self, user_id: i64) -> Result<UserResponseDto> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(user.into())
    }

    /// Update fullname/username/password. Callers may only update themselves.
    pub async fn update(
        &self,
        caller: &AuthenticatedUser,
        user_id: i64,
        dto: UpdateUserDto,
    ) -> Result<UserResponseDto> {
        if caller.user_id != user_id {
            return Err(AppError::Forbidden(
                "You may only update your own account".to_string(),
            ));
        }

        if let Some(ref username) = dto.username {
            if !USERNAME_REGEX.is_match(username) {
                return Err(AppError::Validation(
                    "Username must start with a letter or underscore and contain only letters, digits, and underscores".to_string(),
                ));
            }
        }

        // Re-hash before persisting; plaintext never reaches the database.
        let password_hash = match dto.password {
            Some(ref plaintext) => Some(
                password::hash_password(plaintext)
                    .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?,
            ),
            None => None,
        };

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET fullname   = COALESCE($2, fullname),
                username   = COALESCE($3, username),
                password   = COALESCE($4, password),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(dto.fullname.as_deref())
        .bind(dto.username.as_deref())
        .bind(password_hash.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Username already exists".to_string())
            } else {
                AppError::Database(e)
            }
        })?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        info!("User updated: id={}", user.id);

        Ok(user.into())
    }

    /// Delete an account along with its file records. Blob removal is
    /// best-effort: a storage failure is logged and the rows go away anyway.
    pub async fn delete(&self, caller: &AuthenticatedUser, user_id: i64) -> Result<()> {
        if caller.user_id != user_id {
            return Err(AppError::Forbidden(
                "You may only delete your own account".to_string(),
            ));
        }

        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        if exists.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let paths =
            sqlx::query_scalar::<_, String>("SELECT path FROM files WHERE created_by = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        for path in &paths {
            if let Err(e) = self.store.delete(path).await {
                warn!("Failed to delete blob {} during account removal: {}", path, e);
            }
        }

        // Owned file rows go with the account (ON DELETE CASCADE backstop).
        sqlx::query("DELETE FROM files WHERE created_by = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        info!(
            "User deleted: id={}, removed {} owned files",
            user_id,
            paths.len()
        );

        Ok(())
    }
}

/// Generated avatar used when no profile picture has been set.
fn fallback_avatar_url(fullname: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background=0D8ABC&color=fff",
        urlencoding::encode(fullname)
    )
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_avatar_url_encodes_name() {
        assert_eq!(
            fallback_avatar_url("Jane Doe"),
            "https://ui-avatars.com/api/?name=Jane%20Doe&background=0D8ABC&color=fff"
        );
    }
}
