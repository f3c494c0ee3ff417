use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::core::config::SmtpConfig;
use crate::core::error::{AppError, Result};

/// Contents of a share notification mail.
pub struct ShareMail {
    pub file_name: String,
    pub size: i64,
    pub short_url: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_password_protected: bool,
}

/// Sends share links over SMTP.
pub struct ShareMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl ShareMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AppError::Internal(format!("Failed to build SMTP transport: {}", e)))?
            .port(config.port);

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid SMTP_FROM address: {}", e)))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    pub async fn send_share_link(&self, to: &str, mail: &ShareMail) -> Result<()> {
        let recipient: Mailbox = to
            .parse()
            .map_err(|_| AppError::BadRequest(format!("Invalid recipient address: {}", to)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject("File Shared With You")
            .header(ContentType::TEXT_HTML)
            .body(render_body(mail))
            .map_err(|e| AppError::Internal(format!("Failed to build mail: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("Failed to send mail: {}", e)))?;

        info!("Share link mailed to {}", to);
        Ok(())
    }
}

fn render_body(mail: &ShareMail) -> String {
    let size_mb = mail.size as f64 / 1024.0 / 1024.0;

    let mut body = format!(
        "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\
         <h2>File Shared With You</h2>\
         <p>Someone shared a file with you using SafeDrop.</p>\
         <p><strong>File Name:</strong> {}</p>\
         <p><strong>Size:</strong> {:.2} MB</p>\
         <a href=\"{}\">Download File</a>",
        mail.file_name, size_mb, mail.short_url
    );

    if let Some(expires_at) = mail.expires_at {
        body.push_str(&format!(
            "<p style=\"margin-top: 20px; font-size: 12px; color: #666;\">\
             This link will expire on {}</p>",
            expires_at.format("%Y-%m-%d %H:%M UTC")
        ));
    }

    if mail.is_password_protected {
        body.push_str(
            "<p style=\"margin-top: 10px; font-size: 12px; color: #666;\">\
             This file is password protected. Please contact the sender for the password.</p>",
        );
    }

    body.push_str("</div>");
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_body_mentions_expiry_and_password() {
        let mail = ShareMail {
            file_name: "report.pdf".to_string(),
            size: 2 * 1024 * 1024,
            short_url: "http://localhost:5173/f/abc123".to_string(),
            expires_at: Some(Utc::now()),
            is_password_protected: true,
        };

        let body = render_body(&mail);
        assert!(body.contains("report.pdf"));
        assert!(body.contains("2.00 MB"));
        assert!(body.contains("http://localhost:5173/f/abc123"));
        assert!(body.contains("expire"));
        assert!(body.contains("password protected"));
    }

    #[test]
    fn test_render_body_plain_link() {
        let mail = ShareMail {
            file_name: "notes.txt".to_string(),
            size: 1024,
            short_url: "http://localhost:5173/f/xyz".to_string(),
            expires_at: None,
            is_password_protected: false,
        };

        let body = render_body(&mail);
        assert!(!body.contains("expire"));
        assert!(!body.contains("password protected"));
    }
}
