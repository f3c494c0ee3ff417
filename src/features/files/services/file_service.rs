use rand::distr::Alphanumeric;
use rand::Rng;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::error::{AppError, Result};
use crate::features::auth::AuthenticatedUser;
use crate::features::files::dtos::{
    counter_column_for_mime, parse_expiry_spec, EmailShareDto, FileDetailsDto, SharedFileDto,
    UpdateExpiryDto, UpdatePasswordDto, UploadOptions, UploadedFile,
};
use crate::features::files::models::FileRecord;
use crate::modules::mailer::{ShareMail, ShareMailer};
use crate::modules::storage::DiskStore;
use crate::shared::constants::{SHARE_CODE_LEN, STATUS_ACTIVE, STATUS_EXPIRED};
use crate::shared::password;

/// How many times a colliding short code is regenerated before giving up.
const SHORT_CODE_ATTEMPTS: usize = 3;

/// Service for the file lifecycle: upload, mutation, listing, deletion.
pub struct FileService {
    pool: PgPool,
    store: Arc<DiskStore>,
    mailer: Arc<ShareMailer>,
    client_url: String,
}

impl FileService {
    pub fn new(
        pool: PgPool,
        store: Arc<DiskStore>,
        mailer: Arc<ShareMailer>,
        client_url: String,
    ) -> Self {
        Self {
            pool,
            store,
            mailer,
            client_url,
        }
    }

    /// Persist an upload batch and create one record per file.
    ///
    /// No transaction spans the batch: the first failure aborts the rest,
    /// and files already committed stay committed.
    pub async fn upload_batch(
        &self,
        files: Vec<UploadedFile>,
        opts: UploadOptions,
    ) -> Result<Vec<i64>> {
        let owner = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1")
            .bind(opts.user_id)
            .fetch_optional(&self.pool)
            .await?;

        if owner.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        // Hash once up front; a protected upload without a password would
        // break the password-iff-protected invariant.
        let password_hash = if opts.is_password_protected {
            let plaintext = opts.password.as_deref().ok_or_else(|| {
                AppError::Validation(
                    "Password is required when password protection is enabled".to_string(),
                )
            })?;
            Some(
                password::hash_password(plaintext)
                    .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?,
            )
        } else {
            None
        };

        let expires_at = opts
            .has_expiry
            .then(|| parse_expiry_spec(opts.expires_at.as_deref()));

        let mut file_ids = Vec::with_capacity(files.len());

        for file in files {
            let suffix = generate_code(6);
            let storage_name = DiskStore::storage_name(&file.name, &suffix);
            let locator = self.store.save(&storage_name, &file.data).await?;

            debug!(
                "Stored upload: name={}, locator={}, size={}",
                file.name,
                locator,
                file.data.len()
            );

            let record = self
                .insert_record(&file, &locator, &opts, password_hash.as_deref(), expires_at)
                .await?;

            self.bump_upload_stats(opts.user_id, &file.content_type)
                .await?;

            info!(
                "File uploaded: id={}, code={}, owner={}",
                record.id, record.short_code, opts.user_id
            );
            file_ids.push(record.id);
        }

        Ok(file_ids)
    }

    /// Insert a record, regenerating the short code on the (unlikely)
    /// unique-constraint collision.
    async fn insert_record(
        &self,
        file: &UploadedFile,
        locator: &str,
        opts: &UploadOptions,
        password_hash: Option<&str>,
        expires_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<FileRecord> {
        let mut attempts = 0;

        loop {
            let short_code = generate_code(SHARE_CODE_LEN);
            let short_url = format!("{}/f/{}", self.client_url, short_code);

            let result = sqlx::query_as::<_, FileRecord>(
                r#"
                INSERT INTO files
                    (name, path, content_type, size, is_password_protected, password,
                     has_expiry, expires_at, status, short_code, short_url, created_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'active', $9, $10, $11)
                RETURNING *
                "#,
            )
            .bind(&file.name)
            .bind(locator)
            .bind(&file.content_type)
            .bind(file.data.len() as i64)
            .bind(opts.is_password_protected)
            .bind(password_hash)
            .bind(opts.has_expiry)
            .bind(expires_at)
            .bind(&short_code)
            .bind(&short_url)
            .bind(opts.user_id)
            .fetch_one(&self.pool)
            .await;

            match result {
                Ok(record) => return Ok(record),
                Err(e) if is_unique_violation(&e) && attempts < SHORT_CODE_ATTEMPTS => {
                    attempts += 1;
                    debug!("Short code collision, regenerating (attempt {})", attempts);
                }
                Err(e) => return Err(AppError::Database(e)),
            }
        }
    }

    /// Atomic counter updates on the owner row; `col = col + 1` so
    /// concurrent uploads cannot lose increments.
    async fn bump_upload_stats(&self, user_id: i64, content_type: &str) -> Result<()> {
        let sql = match counter_column_for_mime(content_type) {
            Some(col) => format!(
                "UPDATE users SET total_uploads = total_uploads + 1, {col} = {col} + 1 WHERE id = $1"
            ),
            None => "UPDATE users SET total_uploads = total_uploads + 1 WHERE id = $1".to_string(),
        };

        sqlx::query(&sql).bind(user_id).execute(&self.pool).await?;
        Ok(())
    }

    /// The authenticated owner's files, newest first.
    pub async fn list_owned(&self, user_id: i64) -> Result<Vec<FileDetailsDto>> {
        let records = sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM files WHERE created_by = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(|r| r.into()).collect())
    }

    /// Public listing of a user's files, redacted view.
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<SharedFileDto>> {
        let records = sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM files WHERE created_by = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(|r| r.into()).collect())
    }

    /// Substring search over original filenames, redacted view.
    pub async fn search(&self, query: &str) -> Result<Vec<SharedFileDto>> {
        let pattern = format!("%{}%", query);
        let records = sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM files WHERE name ILIKE $1 ORDER BY created_at DESC",
        )
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(|r| r.into()).collect())
    }

    pub async fn download_count(&self, file_id: i64) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT downloaded_content FROM files WHERE id = $1")
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))
    }

    /// Delete a record and its blob. Blob removal is best-effort; a storage
    /// failure is logged and the row is removed anyway.
    pub async fn delete(&self, caller: &AuthenticatedUser, file_id: i64) -> Result<()> {
        let record = self.fetch_owned(caller, file_id).await?;

        if let Err(e) = self.store.delete(&record.path).await {
            warn!("Failed to delete blob {}: {}", record.path, e);
        }

        sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(file_id)
            .execute(&self.pool)
            .await?;

        info!("File deleted: id={}", file_id);
        Ok(())
    }

    /// Set or replace a file password; the record becomes protected.
    pub async fn update_password(
        &self,
        caller: &AuthenticatedUser,
        dto: UpdatePasswordDto,
    ) -> Result<FileDetailsDto> {
        self.fetch_owned(caller, dto.file_id).await?;

        let hash = password::hash_password(&dto.password)
            .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

        let record = sqlx::query_as::<_, FileRecord>(
            r#"
            UPDATE files
            SET is_password_protected = TRUE, password = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(dto.file_id)
        .bind(&hash)
        .fetch_one(&self.pool)
        .await?;

        info!("File password updated: id={}", record.id);
        Ok(record.into())
    }

    /// Set or replace a file expiry; the record gains an expiry window.
    pub async fn update_expiry(
        &self,
        caller: &AuthenticatedUser,
        dto: UpdateExpiryDto,
    ) -> Result<FileDetailsDto> {
        self.fetch_owned(caller, dto.file_id).await?;

        let expires_at = parse_expiry_spec(dto.expires_at.as_deref());

        let record = sqlx::query_as::<_, FileRecord>(
            r#"
            UPDATE files
            SET has_expiry = TRUE, expires_at = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(dto.file_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        info!("File expiry updated: id={}, expires_at={}", record.id, expires_at);
        Ok(record.into())
    }

    /// Administrative status override.
    pub async fn update_status(
        &self,
        caller: &AuthenticatedUser,
        file_id: i64,
        status: &str,
    ) -> Result<FileDetailsDto> {
        if status != STATUS_ACTIVE && status != STATUS_EXPIRED {
            return Err(AppError::Validation(format!(
                "Status must be '{}' or '{}'",
                STATUS_ACTIVE, STATUS_EXPIRED
            )));
        }

        self.fetch_owned(caller, file_id).await?;

        let record = sqlx::query_as::<_, FileRecord>(
            "UPDATE files SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(file_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        info!("File status updated: id={}, status={}", record.id, status);
        Ok(record.into())
    }

    /// Owner view of a record, for the share dialog.
    pub async fn share_link(
        &self,
        caller: &AuthenticatedUser,
        file_id: i64,
    ) -> Result<FileDetailsDto> {
        let record = self.fetch_owned(caller, file_id).await?;
        Ok(record.into())
    }

    /// Mail a share link to a recipient.
    pub async fn email_share(&self, caller: &AuthenticatedUser, dto: EmailShareDto) -> Result<()> {
        let record = self.fetch_owned(caller, dto.file_id).await?;

        let mail = ShareMail {
            file_name: record.name,
            size: record.size,
            short_url: record.short_url,
            expires_at: record.expires_at.filter(|_| record.has_expiry),
            is_password_protected: record.is_password_protected,
        };

        self.mailer.send_share_link(&dto.email, &mail).await
    }

    /// Fetch a record the caller owns, or fail with NotFound/Forbidden.
    async fn fetch_owned(
        &self,
        caller: &AuthenticatedUser,
        file_id: i64,
    ) -> Result<FileRecord> {
        let record = sqlx::query_as::<_, FileRecord>("SELECT * FROM files WHERE id = $1")
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        if record.created_by != Some(caller.user_id) {
            return Err(AppError::Forbidden(
                "You do not have permission to modify this file".to_string(),
            ));
        }

        Ok(record)
    }
}

/// Random code over [A-Za-z0-9]; used for share codes and storage suffixes.
fn generate_code(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code_length_and_charset() {
        let code = generate_code(SHARE_CODE_LEN);
        assert_eq!(code.len(), SHARE_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_code_is_random() {
        assert_ne!(generate_code(10), generate_code(10));
    }
}
