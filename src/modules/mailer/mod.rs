//! Outbound e-mail for share links

mod smtp_mailer;

pub use smtp_mailer::{ShareMail, ShareMailer};
