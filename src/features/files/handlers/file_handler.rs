use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::debug;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::auth::AuthenticatedUser;
use crate::features::files::dtos::{
    DownloadBody, DownloadCountDto, DownloadQuery, EmailShareDto, FileDetailsDto, SearchQuery,
    ShareLinkDto, SharedFileDto, UpdateExpiryDto, UpdatePasswordDto, UpdateStatusDto,
    UploadFormDto, UploadOptions, UploadResponseDto, UploadedFile,
};
use crate::features::files::routes::FilesState;
use crate::features::files::services::{DownloadGrant, TransferStream};
use crate::shared::constants::MAX_FILES_PER_UPLOAD;
use crate::shared::types::ApiResponse;

/// Upload one or more files
///
/// Accepts multipart/form-data with:
/// - `files`: the files to upload (repeated, up to 5)
/// - `userId`: owner of the uploads (required)
/// - `isPasswordProtected` + `password`: optional protection
/// - `hasExpiry` + `expiresAt`: optional expiry (ISO timestamp or hours)
#[utoipa::path(
    post,
    path = "/api/files/upload",
    tag = "files",
    request_body(
        content = UploadFormDto,
        content_type = "multipart/form-data",
        description = "Upload form: files plus protection/expiry options",
    ),
    responses(
        (status = 201, description = "Files uploaded", body = ApiResponse<UploadResponseDto>),
        (status = 400, description = "No files or invalid options"),
        (status = 404, description = "Owner not found"),
        (status = 413, description = "Upload too large")
    )
)]
pub async fn upload_files(
    State(state): State<FilesState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UploadResponseDto>>)> {
    let mut files: Vec<UploadedFile> = Vec::new();
    let mut user_id: Option<i64> = None;
    let mut is_password_protected = false;
    let mut password: Option<String> = None;
    let mut has_expiry = false;
    let mut expires_at: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "files" => {
                if files.len() >= MAX_FILES_PER_UPLOAD {
                    return Err(AppError::BadRequest(format!(
                        "At most {} files per upload",
                        MAX_FILES_PER_UPLOAD
                    )));
                }

                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                let name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unnamed".to_string());

                let data = field.bytes().await.map_err(|e| {
                    debug!("Failed to read file bytes: {}", e);
                    AppError::BadRequest(format!("Failed to read file data: {}", e))
                })?;

                files.push(UploadedFile {
                    data: data.to_vec(),
                    name,
                    content_type,
                });
            }
            "userId" => {
                let text = read_text(field, "userId").await?;
                user_id = Some(
                    text.trim()
                        .parse::<i64>()
                        .map_err(|_| AppError::BadRequest("Invalid userId".to_string()))?,
                );
            }
            "isPasswordProtected" => {
                is_password_protected = read_text(field, "isPasswordProtected").await? == "true";
            }
            "password" => {
                let text = read_text(field, "password").await?;
                if !text.is_empty() {
                    password = Some(text);
                }
            }
            "hasExpiry" => {
                has_expiry = read_text(field, "hasExpiry").await? == "true";
            }
            "expiresAt" => {
                let text = read_text(field, "expiresAt").await?;
                if !text.is_empty() {
                    expires_at = Some(text);
                }
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    if files.is_empty() {
        return Err(AppError::BadRequest("No files uploaded".to_string()));
    }

    let user_id = user_id.ok_or_else(|| AppError::BadRequest("userId is required".to_string()))?;

    let file_ids = state
        .files
        .upload_batch(
            files,
            UploadOptions {
                user_id,
                is_password_protected,
                password,
                has_expiry,
                expires_at,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(UploadResponseDto { file_ids }),
            Some("Files uploaded successfully".to_string()),
            None,
        )),
    ))
}

async fn read_text(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read {} field: {}", name, e)))
}

/// Download a file's bytes
///
/// Served for both GET (password via query string) and POST (password via
/// JSON body). Counters move only after the transfer completes.
#[utoipa::path(
    get,
    path = "/api/files/download/{fileId}",
    tag = "files",
    params(
        ("fileId" = i64, Path, description = "File ID"),
        DownloadQuery
    ),
    responses(
        (status = 200, description = "File bytes"),
        (status = 401, description = "Password required"),
        (status = 403, description = "Incorrect password or inactive file"),
        (status = 404, description = "File or blob not found"),
        (status = 410, description = "File expired")
    )
)]
pub async fn download_file(
    State(state): State<FilesState>,
    Path(file_id): Path<i64>,
    Query(query): Query<DownloadQuery>,
    body: Option<AppJson<DownloadBody>>,
) -> Result<Response> {
    let password = query
        .password
        .or_else(|| body.and_then(|AppJson(b)| b.password));

    let DownloadGrant {
        record,
        reader,
        len,
    } = state
        .downloads
        .authorize(file_id, password.as_deref())
        .await?;

    // Completion hook: spawned so the counters outlive the response body.
    let downloads = Arc::clone(&state.downloads);
    let record_id = record.id;
    let owner = record.created_by;
    let on_complete = move || {
        tokio::spawn(async move {
            downloads.record_completed_download(record_id, owner).await;
        });
    };

    let stream = TransferStream::new(ReaderStream::new(reader), on_complete);

    let content_type = if record.content_type.is_empty() {
        "application/octet-stream".to_string()
    } else {
        record.content_type.clone()
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, len.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&record.name),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}

/// Build a safe `Content-Disposition` value; the filename is
/// percent-encoded so quotes and control bytes cannot break the header.
fn content_disposition_value(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", urlencoding::encode(filename))
}

/// Delete a file record and its stored bytes
#[utoipa::path(
    delete,
    path = "/api/files/{fileId}",
    tag = "files",
    params(
        ("fileId" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File deleted"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_file(
    user: AuthenticatedUser,
    State(state): State<FilesState>,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    state.files.delete(&user, file_id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("File deleted successfully".to_string()),
        None,
    )))
}

/// Administrative status override
#[utoipa::path(
    put,
    path = "/api/files/status/{fileId}",
    tag = "files",
    params(
        ("fileId" = i64, Path, description = "File ID")
    ),
    request_body = UpdateStatusDto,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<FileDetailsDto>),
        (status = 400, description = "Invalid status"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_status(
    user: AuthenticatedUser,
    State(state): State<FilesState>,
    Path(file_id): Path<i64>,
    AppJson(dto): AppJson<UpdateStatusDto>,
) -> Result<Json<ApiResponse<FileDetailsDto>>> {
    let updated = state.files.update_status(&user, file_id, &dto.status).await?;
    Ok(Json(ApiResponse::success(Some(updated), None, None)))
}

/// Set or replace a file's expiry
#[utoipa::path(
    put,
    path = "/api/files/expiry",
    tag = "files",
    request_body = UpdateExpiryDto,
    responses(
        (status = 200, description = "Expiry updated", body = ApiResponse<FileDetailsDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_expiry(
    user: AuthenticatedUser,
    State(state): State<FilesState>,
    AppJson(dto): AppJson<UpdateExpiryDto>,
) -> Result<Json<ApiResponse<FileDetailsDto>>> {
    let updated = state.files.update_expiry(&user, dto).await?;
    Ok(Json(ApiResponse::success(Some(updated), None, None)))
}

/// Set or replace a file's password
#[utoipa::path(
    put,
    path = "/api/files/password",
    tag = "files",
    request_body = UpdatePasswordDto,
    responses(
        (status = 200, description = "Password updated", body = ApiResponse<FileDetailsDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_password(
    user: AuthenticatedUser,
    State(state): State<FilesState>,
    AppJson(dto): AppJson<UpdatePasswordDto>,
) -> Result<Json<ApiResponse<FileDetailsDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let updated = state.files.update_password(&user, dto).await?;
    Ok(Json(ApiResponse::success(Some(updated), None, None)))
}

/// Search files by name
#[utoipa::path(
    get,
    path = "/api/files/search",
    tag = "files",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching files", body = ApiResponse<Vec<SharedFileDto>>)
    )
)]
pub async fn search_files(
    State(state): State<FilesState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<SharedFileDto>>>> {
    let results = state.files.search(&query.query).await?;
    Ok(Json(ApiResponse::success(Some(results), None, None)))
}

/// The authenticated user's files, newest first
#[utoipa::path(
    get,
    path = "/api/files/user-files",
    tag = "files",
    responses(
        (status = 200, description = "Owned files", body = ApiResponse<Vec<FileDetailsDto>>),
        (status = 401, description = "Authentication required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_user_files(
    user: AuthenticatedUser,
    State(state): State<FilesState>,
) -> Result<Json<ApiResponse<Vec<FileDetailsDto>>>> {
    let files = state.files.list_owned(user.user_id).await?;
    Ok(Json(ApiResponse::success(Some(files), None, None)))
}

/// Public listing of a user's files
#[utoipa::path(
    get,
    path = "/api/files/user/{userId}",
    tag = "files",
    params(
        ("userId" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's files", body = ApiResponse<Vec<SharedFileDto>>)
    )
)]
pub async fn list_files_by_user(
    State(state): State<FilesState>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<SharedFileDto>>>> {
    let files = state.files.list_by_user(user_id).await?;
    Ok(Json(ApiResponse::success(Some(files), None, None)))
}

/// Download counter for a file
#[utoipa::path(
    get,
    path = "/api/files/{fileId}/downloads",
    tag = "files",
    params(
        ("fileId" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "Download count", body = ApiResponse<DownloadCountDto>),
        (status = 404, description = "File not found")
    )
)]
pub async fn download_count(
    State(state): State<FilesState>,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<DownloadCountDto>>> {
    let count = state.files.download_count(file_id).await?;
    Ok(Json(ApiResponse::success(
        Some(DownloadCountDto { count }),
        None,
        None,
    )))
}

/// Owner view of a record for the share dialog
#[utoipa::path(
    post,
    path = "/api/files/share",
    tag = "files",
    request_body = ShareLinkDto,
    responses(
        (status = 200, description = "Share link", body = ApiResponse<FileDetailsDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn share_link(
    user: AuthenticatedUser,
    State(state): State<FilesState>,
    AppJson(dto): AppJson<ShareLinkDto>,
) -> Result<Json<ApiResponse<FileDetailsDto>>> {
    let details = state.files.share_link(&user, dto.file_id).await?;
    Ok(Json(ApiResponse::success(Some(details), None, None)))
}

/// Mail a share link to a recipient
#[utoipa::path(
    post,
    path = "/api/files/email",
    tag = "files",
    request_body = EmailShareDto,
    responses(
        (status = 200, description = "Mail sent"),
        (status = 400, description = "Invalid recipient"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "File not found"),
        (status = 502, description = "Mail transport failure")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn email_share(
    user: AuthenticatedUser,
    State(state): State<FilesState>,
    AppJson(dto): AppJson<EmailShareDto>,
) -> Result<Json<ApiResponse<()>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    state.files.email_share(&user, dto).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Email sent successfully".to_string()),
        None,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_encodes_unsafe_characters() {
        assert_eq!(
            content_disposition_value("my report.pdf"),
            "attachment; filename=\"my%20report.pdf\""
        );
        // Quotes cannot terminate the header value early.
        assert!(!content_disposition_value("evil\".pdf").contains("\"."));
    }
}
