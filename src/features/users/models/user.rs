use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for users
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub fullname: String,
    pub username: String,
    pub email: String,
    /// Argon2 hash, never the plaintext.
    pub password: String,
    pub profile_pic: String,
    pub total_uploads: i64,
    pub total_downloads: i64,
    pub image_count: i64,
    pub video_count: i64,
    pub document_count: i64,
    pub last_login: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
