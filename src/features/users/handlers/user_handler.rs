use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::auth::AuthenticatedUser;
use crate::features::users::dtos::{
    AuthResponseDto, LoginDto, RegisterUserDto, UpdateUserDto, UserResponseDto,
};
use crate::features::users::services::UserService;
use crate::shared::types::ApiResponse;

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/users/register",
    request_body = RegisterUserDto,
    responses(
        (status = 201, description = "User registered successfully", body = ApiResponse<AuthResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email or username already in use")
    ),
    tag = "users"
)]
pub async fn register(
    State(service): State<Arc<UserService>>,
    AppJson(dto): AppJson<RegisterUserDto>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let response = service.register(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(response),
            Some("User registered successfully".to_string()),
            None,
        )),
    ))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = LoginDto,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<AuthResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "users"
)]
pub async fn login(
    State(service): State<Arc<UserService>>,
    AppJson(dto): AppJson<LoginDto>,
) -> Result<Json<ApiResponse<AuthResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let response = service.login(dto).await?;
    Ok(Json(ApiResponse::success(
        Some(response),
        Some("Login successful".to_string()),
        None,
    )))
}

/// Logout
///
/// Sessions are stateless bearer tokens; the client just drops its copy.
#[utoipa::path(
    get,
    path = "/api/users/logout",
    responses(
        (status = 200, description = "Logged out")
    ),
    tag = "users"
)]
pub async fn logout() -> Json<ApiResponse<()>> {
    Json(ApiResponse::success(
        None,
        Some("Logged out successfully".to_string()),
        None,
    ))
}

/// List all users (passwords excluded)
#[utoipa::path(
    get,
    path = "/api/users/user",
    responses(
        (status = 200, description = "List of users", body = ApiResponse<Vec<UserResponseDto>>)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(service): State<Arc<UserService>>,
) -> Result<Json<ApiResponse<Vec<UserResponseDto>>>> {
    let users = service.list().await?;
    Ok(Json(ApiResponse::success(Some(users), None, None)))
}

/// Get a user by id (password excluded)
#[utoipa::path(
    get,
    path = "/api/users/user/{userId}",
    params(
        ("userId" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = ApiResponse<UserResponseDto>),
        (status = 404, description = "User not found")
    ),
    tag = "users"
)]
pub async fn get_user(
    State(service): State<Arc<UserService>>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<UserResponseDto>>> {
    let user = service.get(user_id).await?;
    Ok(Json(ApiResponse::success(Some(user), None, None)))
}

/// Update the authenticated user's account
#[utoipa::path(
    put,
    path = "/api/users/user/{userId}",
    params(
        ("userId" = i64, Path, description = "User ID")
    ),
    request_body = UpdateUserDto,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not your account"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Username already taken")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "users"
)]
pub async fn update_user(
    user: AuthenticatedUser,
    State(service): State<Arc<UserService>>,
    Path(user_id): Path<i64>,
    AppJson(dto): AppJson<UpdateUserDto>,
) -> Result<Json<ApiResponse<UserResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let updated = service.update(&user, user_id, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(updated),
        Some("User updated successfully".to_string()),
        None,
    )))
}

/// Delete the authenticated user's account and its files
#[utoipa::path(
    delete,
    path = "/api/users/user/{userId}",
    params(
        ("userId" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deleted"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not your account"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "users"
)]
pub async fn delete_user(
    user: AuthenticatedUser,
    State(service): State<Arc<UserService>>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete(&user, user_id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("User deleted successfully".to_string()),
        None,
    )))
}
