use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::files::models::FileRecord;
use crate::shared::constants::DEFAULT_EXPIRY_HOURS;

/// Upload request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFormDto {
    /// The files to upload (repeated field, up to 5)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub files: String,
    /// Owner of the uploads
    #[schema(example = "1")]
    pub user_id: String,
    /// "true" to require a password for downloads
    pub is_password_protected: Option<String>,
    /// Plaintext password, hashed before persisting
    pub password: Option<String>,
    /// "true" to expire the share
    pub has_expiry: Option<String>,
    /// Absolute ISO timestamp, or hours from now
    pub expires_at: Option<String>,
}

/// One file pulled out of the upload form
pub struct UploadedFile {
    pub data: Vec<u8>,
    pub name: String,
    pub content_type: String,
}

/// Protection/expiry options accompanying an upload batch
pub struct UploadOptions {
    pub user_id: i64,
    pub is_password_protected: bool,
    pub password: Option<String>,
    pub has_expiry: bool,
    /// Raw `expiresAt` form value; parsed by [`parse_expiry_spec`].
    pub expires_at: Option<String>,
}

/// Response DTO for uploads
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponseDto {
    pub file_ids: Vec<i64>,
}

/// Public, redacted view of a shared file. Password hash and storage path
/// are excluded by construction.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SharedFileDto {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: i64,
    pub is_password_protected: bool,
    pub has_expiry: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: String,
    pub short_url: String,
    pub created_at: DateTime<Utc>,
    pub downloaded_content: i64,
}

impl From<FileRecord> for SharedFileDto {
    fn from(file: FileRecord) -> Self {
        Self {
            id: file.id,
            name: file.name,
            content_type: file.content_type,
            size: file.size,
            is_password_protected: file.is_password_protected,
            has_expiry: file.has_expiry,
            expires_at: file.expires_at,
            status: file.status,
            short_url: file.short_url,
            created_at: file.created_at,
            downloaded_content: file.downloaded_content,
        }
    }
}

/// Fuller view for owners and verified callers: includes the storage
/// locator, still never the password hash.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileDetailsDto {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: i64,
    pub path: String,
    pub is_password_protected: bool,
    pub has_expiry: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: String,
    pub short_url: String,
    pub short_code: String,
    pub created_at: DateTime<Utc>,
    pub downloaded_content: i64,
}

impl From<FileRecord> for FileDetailsDto {
    fn from(file: FileRecord) -> Self {
        Self {
            id: file.id,
            name: file.name,
            content_type: file.content_type,
            size: file.size,
            path: file.path,
            is_password_protected: file.is_password_protected,
            has_expiry: file.has_expiry,
            expires_at: file.expires_at,
            status: file.status,
            short_url: file.short_url,
            short_code: file.short_code,
            created_at: file.created_at,
            downloaded_content: file.downloaded_content,
        }
    }
}

/// Request DTO for password verification against a share
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPasswordDto {
    pub file_id: i64,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Request DTO for setting/replacing a file password
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordDto {
    pub file_id: i64,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Request DTO for setting/replacing a file expiry
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExpiryDto {
    pub file_id: i64,
    /// Absolute ISO timestamp, or hours from now; absent means the default
    /// window.
    pub expires_at: Option<String>,
}

/// Request DTO for the administrative status override
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusDto {
    pub status: String,
}

/// Request DTO for fetching a share link
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareLinkDto {
    pub file_id: i64,
}

/// Request DTO for mailing a share link
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailShareDto {
    pub file_id: i64,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Download password supplied via query string
#[derive(Debug, Deserialize, IntoParams)]
pub struct DownloadQuery {
    pub password: Option<String>,
}

/// Download password supplied via JSON body
#[derive(Debug, Deserialize, ToSchema)]
pub struct DownloadBody {
    pub password: Option<String>,
}

/// Search query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    pub query: String,
}

/// Response DTO for the download counter
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadCountDto {
    pub count: i64,
}

/// Resolve an `expiresAt` specification to a concrete timestamp.
///
/// Strings containing `T` parse as absolute timestamps (RFC 3339, or a naive
/// datetime taken as UTC); anything else parses as hours from now. Garbage
/// and absence fall back to the default window.
pub fn parse_expiry_spec(spec: Option<&str>) -> DateTime<Utc> {
    match spec {
        Some(s) if s.contains('T') => parse_absolute(s)
            .unwrap_or_else(|| Utc::now() + Duration::hours(DEFAULT_EXPIRY_HOURS)),
        Some(s) => {
            let hours = s.trim().parse::<i64>().unwrap_or(DEFAULT_EXPIRY_HOURS);
            Utc::now() + Duration::hours(hours)
        }
        None => Utc::now() + Duration::hours(DEFAULT_EXPIRY_HOURS),
    }
}

fn parse_absolute(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // datetime-local inputs come without a zone; take them as UTC.
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    None
}

/// Which per-user counter an uploaded MIME type feeds, if any.
pub fn counter_column_for_mime(content_type: &str) -> Option<&'static str> {
    if content_type.starts_with("image/") {
        Some("image_count")
    } else if content_type.starts_with("video/") {
        Some("video_count")
    } else if content_type.starts_with("application/") {
        Some("document_count")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expiry_rfc3339() {
        let parsed = parse_expiry_spec(Some("2030-01-02T03:04:05Z"));
        assert_eq!(parsed.to_rfc3339(), "2030-01-02T03:04:05+00:00");
    }

    #[test]
    fn test_parse_expiry_naive_datetime_local() {
        let parsed = parse_expiry_spec(Some("2030-01-02T03:04"));
        assert_eq!(parsed.to_rfc3339(), "2030-01-02T03:04:00+00:00");
    }

    #[test]
    fn test_parse_expiry_hours() {
        let before = Utc::now() + Duration::hours(24);
        let parsed = parse_expiry_spec(Some("24"));
        let after = Utc::now() + Duration::hours(24);
        assert!(parsed >= before && parsed <= after);
    }

    #[test]
    fn test_parse_expiry_garbage_defaults_to_a_week() {
        let parsed = parse_expiry_spec(Some("soon"));
        let expected = Utc::now() + Duration::hours(DEFAULT_EXPIRY_HOURS);
        assert!((parsed - expected).num_seconds().abs() < 5);
    }

    #[test]
    fn test_parse_expiry_absent_defaults_to_a_week() {
        let parsed = parse_expiry_spec(None);
        let expected = Utc::now() + Duration::hours(DEFAULT_EXPIRY_HOURS);
        assert!((parsed - expected).num_seconds().abs() < 5);
    }

    #[test]
    fn test_counter_column_for_mime() {
        assert_eq!(counter_column_for_mime("image/png"), Some("image_count"));
        assert_eq!(counter_column_for_mime("video/mp4"), Some("video_count"));
        assert_eq!(
            counter_column_for_mime("application/pdf"),
            Some("document_count")
        );
        assert_eq!(counter_column_for_mime("text/plain"), None);
    }

    #[test]
    fn test_shared_dto_has_no_sensitive_fields() {
        // Serialized output must never leak the hash or the storage locator.
        let record = FileRecord {
            id: 1,
            name: "report.pdf".to_string(),
            path: "report_abc123.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size: 2048,
            downloaded_content: 3,
            is_password_protected: true,
            password: Some("$argon2id$v=19$m=19456,t=2,p=1$...".to_string()),
            has_expiry: false,
            expires_at: None,
            status: "active".to_string(),
            short_code: "abc123".to_string(),
            short_url: "http://localhost:5173/f/abc123".to_string(),
            created_by: Some(1),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&SharedFileDto::from(record)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("report_abc123.pdf"));
        assert!(json.contains("\"isPasswordProtected\":true"));
        assert!(json.contains("\"type\":\"application/pdf\""));
    }
}
