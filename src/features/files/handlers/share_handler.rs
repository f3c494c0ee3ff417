use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::files::dtos::{FileDetailsDto, SharedFileDto, VerifyPasswordDto};
use crate::features::files::routes::FilesState;
use crate::shared::types::ApiResponse;

/// Resolve a share code to public metadata
///
/// No side effects; the download counter only moves on actual downloads.
#[utoipa::path(
    get,
    path = "/api/files/shared/{code}",
    tag = "shares",
    params(
        ("code" = String, Path, description = "Share code from the short link")
    ),
    responses(
        (status = 200, description = "Share metadata", body = ApiResponse<SharedFileDto>),
        (status = 404, description = "Unknown code"),
        (status = 410, description = "Share expired")
    )
)]
pub async fn resolve_share(
    State(state): State<FilesState>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<SharedFileDto>>> {
    let shared = state.shares.resolve(&code).await?;
    Ok(Json(ApiResponse::success(Some(shared), None, None)))
}

/// Verify a share password
///
/// On success returns the fuller detail view, including the storage locator.
#[utoipa::path(
    post,
    path = "/api/files/verify-password",
    tag = "shares",
    request_body = VerifyPasswordDto,
    responses(
        (status = 200, description = "Password correct", body = ApiResponse<FileDetailsDto>),
        (status = 400, description = "File is not password protected"),
        (status = 403, description = "Incorrect password"),
        (status = 404, description = "File not found")
    )
)]
pub async fn verify_password(
    State(state): State<FilesState>,
    AppJson(dto): AppJson<VerifyPasswordDto>,
) -> Result<Json<ApiResponse<FileDetailsDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let details = state.shares.verify_password(dto).await?;
    Ok(Json(ApiResponse::success(Some(details), None, None)))
}

/// QR code for a file's share URL
#[utoipa::path(
    get,
    path = "/api/files/{fileId}/qr",
    tag = "shares",
    params(
        ("fileId" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "PNG image"),
        (status = 404, description = "File not found")
    )
)]
pub async fn share_qr(
    State(state): State<FilesState>,
    Path(file_id): Path<i64>,
) -> Result<Response> {
    let png = state.shares.qr_png(file_id).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/png")
        .header(header::CONTENT_LENGTH, png.len().to_string())
        .body(Body::from(png))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}
