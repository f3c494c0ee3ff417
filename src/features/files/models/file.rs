use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for shared files
#[derive(Debug, Clone, FromRow)]
pub struct FileRecord {
    pub id: i64,
    /// Original filename, kept for display and download headers.
    pub name: String,
    /// Opaque locator into the blob store.
    pub path: String,
    pub content_type: String,
    pub size: i64,
    pub downloaded_content: i64,
    pub is_password_protected: bool,
    /// Argon2 hash, present iff `is_password_protected`.
    pub password: Option<String>,
    pub has_expiry: bool,
    /// Present iff `has_expiry`.
    pub expires_at: Option<DateTime<Utc>>,
    /// "active" or "expired"; may lag behind `expires_at` until the lazy
    /// transition in the download gate catches up.
    pub status: String,
    pub short_code: String,
    pub short_url: String,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    /// Expiry is judged against the clock, not the stored status field.
    pub fn is_expired(&self) -> bool {
        self.has_expiry && self.expires_at.is_some_and(|t| t < Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(has_expiry: bool, expires_at: Option<DateTime<Utc>>) -> FileRecord {
        FileRecord {
            id: 1,
            name: "report.pdf".to_string(),
            path: "report_abc123.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size: 1024,
            downloaded_content: 0,
            is_password_protected: false,
            password: None,
            has_expiry,
            expires_at,
            status: "active".to_string(),
            short_code: "abc123".to_string(),
            short_url: "http://localhost:5173/f/abc123".to_string(),
            created_by: Some(1),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_expired_past_timestamp() {
        let r = record(true, Some(Utc::now() - Duration::seconds(1)));
        assert!(r.is_expired());
    }

    #[test]
    fn test_is_expired_future_timestamp() {
        let r = record(true, Some(Utc::now() + Duration::hours(1)));
        assert!(!r.is_expired());
    }

    #[test]
    fn test_is_expired_without_expiry() {
        assert!(!record(false, None).is_expired());
    }
}
