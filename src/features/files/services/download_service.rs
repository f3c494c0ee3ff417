use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::error::{AppError, Result};
use crate::features::files::models::FileRecord;
use crate::modules::storage::DiskStore;
use crate::shared::constants::STATUS_ACTIVE;
use crate::shared::password;

/// A download that has passed every gate: the record plus an open reader.
pub struct DownloadGrant {
    pub record: FileRecord,
    pub reader: tokio::fs::File,
    pub len: u64,
}

/// Authorizes downloads and applies their completion side effects.
pub struct DownloadService {
    pool: PgPool,
    store: Arc<DiskStore>,
}

impl DownloadService {
    pub fn new(pool: PgPool, store: Arc<DiskStore>) -> Self {
        Self { pool, store }
    }

    /// Run the download gate for a file.
    ///
    /// Checks, in order: record existence, expiry (judged against the clock,
    /// with the lazy active→expired transition persisted here), stored
    /// status, then the password. Only then is the blob opened.
    pub async fn authorize(
        &self,
        file_id: i64,
        supplied_password: Option<&str>,
    ) -> Result<DownloadGrant> {
        let record = sqlx::query_as::<_, FileRecord>("SELECT * FROM files WHERE id = $1")
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        // Expiry outranks the stored status: a record whose timestamp has
        // passed reports Gone even if nothing has updated the column yet.
        if record.is_expired() {
            sqlx::query("UPDATE files SET status = 'expired' WHERE id = $1")
                .bind(record.id)
                .execute(&self.pool)
                .await?;

            info!("File {} lazily transitioned to expired", record.id);
            return Err(AppError::Gone("This file has expired".to_string()));
        }

        if record.status != STATUS_ACTIVE {
            return Err(AppError::Forbidden(
                "This file is not available for download".to_string(),
            ));
        }

        if record.is_password_protected {
            let supplied = supplied_password
                .ok_or_else(|| AppError::Unauthorized("Password required".to_string()))?;

            let stored = record
                .password
                .as_deref()
                .ok_or_else(|| AppError::Internal("Password data missing".to_string()))?;

            let is_match = password::verify_password(supplied, stored)
                .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;

            if !is_match {
                return Err(AppError::Forbidden("Incorrect password".to_string()));
            }
        }

        // A valid record pointing at a missing blob is a data-integrity
        // fault; DiskStore reports it as "File not found on server".
        let (reader, len) = self.store.open(&record.path).await?;

        Ok(DownloadGrant {
            record,
            reader,
            len,
        })
    }

    /// Apply the counters for a fully completed transfer. Best-effort: a
    /// failure here loses a statistic, not the download.
    pub async fn record_completed_download(&self, file_id: i64, created_by: Option<i64>) {
        let result = sqlx::query(
            "UPDATE files SET downloaded_content = downloaded_content + 1 WHERE id = $1",
        )
        .bind(file_id)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!("Failed to bump download counter for file {}: {}", file_id, e);
            return;
        }

        if let Some(owner_id) = created_by {
            let result =
                sqlx::query("UPDATE users SET total_downloads = total_downloads + 1 WHERE id = $1")
                    .bind(owner_id)
                    .execute(&self.pool)
                    .await;

            if let Err(e) = result {
                warn!(
                    "Failed to bump total_downloads for user {}: {}",
                    owner_id, e
                );
            }
        }

        info!("Download completed for file {}", file_id);
    }
}
