use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::features::files::handlers::{file_handler, share_handler};
use crate::features::files::services::{DownloadService, FileService, ShareService};

/// Shared state for the files feature routers
#[derive(Clone)]
pub struct FilesState {
    pub files: Arc<FileService>,
    pub shares: Arc<ShareService>,
    pub downloads: Arc<DownloadService>,
}

/// Create routes for the files feature
///
/// Mutating routes enforce authentication through the `AuthenticatedUser`
/// extractor; sharing, download, and lookup routes are public.
pub fn routes(state: FilesState, max_upload_size: usize) -> Router {
    Router::new()
        .route(
            "/api/files/upload",
            // Allow body size up to the upload cap plus multipart overhead
            post(file_handler::upload_files)
                .layer(DefaultBodyLimit::max(max_upload_size + 1024 * 1024)),
        )
        .route(
            "/api/files/download/{file_id}",
            get(file_handler::download_file).post(file_handler::download_file),
        )
        .route("/api/files/search", get(file_handler::search_files))
        .route("/api/files/user-files", get(file_handler::list_user_files))
        .route(
            "/api/files/user/{user_id}",
            get(file_handler::list_files_by_user),
        )
        .route("/api/files/shared/{code}", get(share_handler::resolve_share))
        .route(
            "/api/files/verify-password",
            post(share_handler::verify_password),
        )
        .route("/api/files/share", post(file_handler::share_link))
        .route("/api/files/email", post(file_handler::email_share))
        .route("/api/files/status/{file_id}", put(file_handler::update_status))
        .route("/api/files/expiry", put(file_handler::update_expiry))
        .route("/api/files/password", put(file_handler::update_password))
        .route("/api/files/{file_id}/qr", get(share_handler::share_qr))
        .route(
            "/api/files/{file_id}/downloads",
            get(file_handler::download_count),
        )
        .route("/api/files/{file_id}", delete(file_handler::delete_file))
        .with_state(state)
}
