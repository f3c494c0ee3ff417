mod download_service;
mod file_service;
mod share_service;
mod transfer;

pub use download_service::{DownloadGrant, DownloadService};
pub use file_service::FileService;
pub use share_service::ShareService;
pub use transfer::TransferStream;
