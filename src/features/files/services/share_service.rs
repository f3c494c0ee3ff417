use image::Luma;
use qrcode::QrCode;
use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::files::dtos::{FileDetailsDto, SharedFileDto, VerifyPasswordDto};
use crate::features::files::models::FileRecord;
use crate::shared::password;

/// Resolves public share codes and verifies share passwords.
pub struct ShareService {
    pool: PgPool,
}

impl ShareService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Map a short code to public file metadata.
    ///
    /// No side effects: counters only move on actual downloads.
    pub async fn resolve(&self, code: &str) -> Result<SharedFileDto> {
        let record = sqlx::query_as::<_, FileRecord>("SELECT * FROM files WHERE short_code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        if record.is_expired() {
            return Err(AppError::Gone("This file has expired".to_string()));
        }

        Ok(record.into())
    }

    /// Verify a password against a protected file and, on success, return
    /// the fuller detail view (including the storage locator).
    pub async fn verify_password(&self, dto: VerifyPasswordDto) -> Result<FileDetailsDto> {
        let record = sqlx::query_as::<_, FileRecord>("SELECT * FROM files WHERE id = $1")
            .bind(dto.file_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        if !record.is_password_protected {
            return Err(AppError::BadRequest(
                "File is not password protected".to_string(),
            ));
        }

        let stored = record
            .password
            .as_deref()
            .ok_or_else(|| AppError::Internal("Password data missing".to_string()))?;

        let is_match = password::verify_password(&dto.password, stored)
            .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;

        if !is_match {
            return Err(AppError::Forbidden("Incorrect password".to_string()));
        }

        Ok(record.into())
    }

    /// Render a PNG QR code for a file's share URL.
    pub async fn qr_png(&self, file_id: i64) -> Result<Vec<u8>> {
        let short_url =
            sqlx::query_scalar::<_, String>("SELECT short_url FROM files WHERE id = $1")
                .bind(file_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        render_qr_png(&short_url)
    }
}

fn render_qr_png(url: &str) -> Result<Vec<u8>> {
    let code = QrCode::new(url.as_bytes())
        .map_err(|e| AppError::Internal(format!("QR encode error: {}", e)))?;

    let img = code.render::<Luma<u8>>().min_dimensions(256, 256).build();

    let mut png = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| AppError::Internal(format!("PNG encode error: {}", e)))?;

    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_qr_png_magic_bytes() {
        let png = render_qr_png("http://localhost:5173/f/abc123").unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}
