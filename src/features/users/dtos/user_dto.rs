use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::features::users::models::User;

/// Request DTO for user registration
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserDto {
    #[validate(length(min = 1, max = 128, message = "Fullname is required"))]
    pub fullname: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 50, message = "Username must be 1-50 characters"))]
    pub username: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Request DTO for login
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginDto {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Request DTO for profile updates; absent fields are left untouched
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserDto {
    #[validate(length(min = 1, max = 128, message = "Fullname must be 1-128 characters"))]
    pub fullname: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Username must be 1-50 characters"))]
    pub username: Option<String>,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

/// User view returned by the API; the password hash never appears here.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponseDto {
    pub id: i64,
    pub fullname: String,
    pub username: String,
    pub email: String,
    pub profile_pic: String,
    pub total_uploads: i64,
    pub total_downloads: i64,
    pub image_count: i64,
    pub video_count: i64,
    pub document_count: i64,
    pub last_login: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponseDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            fullname: user.fullname,
            username: user.username,
            email: user.email,
            profile_pic: user.profile_pic,
            total_uploads: user.total_uploads,
            total_downloads: user.total_downloads,
            image_count: user.image_count,
            video_count: user.video_count,
            document_count: user.document_count,
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

/// Response DTO for register/login: session token plus the user view
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponseDto {
    pub token: String,
    pub user: UserResponseDto,
}
