use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos as files_dtos;
use crate::features::files::handlers::{file_handler, share_handler};
use crate::features::users::dtos as users_dtos;
use crate::features::users::handlers::user_handler;
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Users
        user_handler::register,
        user_handler::login,
        user_handler::logout,
        user_handler::list_users,
        user_handler::get_user,
        user_handler::update_user,
        user_handler::delete_user,
        // Files
        file_handler::upload_files,
        file_handler::download_file,
        file_handler::delete_file,
        file_handler::update_status,
        file_handler::update_expiry,
        file_handler::update_password,
        file_handler::search_files,
        file_handler::list_user_files,
        file_handler::list_files_by_user,
        file_handler::download_count,
        file_handler::share_link,
        file_handler::email_share,
        // Shares
        share_handler::resolve_share,
        share_handler::verify_password,
        share_handler::share_qr,
    ),
    components(
        schemas(
            // Shared
            Meta,
            AuthenticatedUser,
            // Users
            users_dtos::RegisterUserDto,
            users_dtos::LoginDto,
            users_dtos::UpdateUserDto,
            users_dtos::UserResponseDto,
            users_dtos::AuthResponseDto,
            ApiResponse<users_dtos::AuthResponseDto>,
            ApiResponse<users_dtos::UserResponseDto>,
            ApiResponse<Vec<users_dtos::UserResponseDto>>,
            // Files
            files_dtos::UploadFormDto,
            files_dtos::UploadResponseDto,
            files_dtos::SharedFileDto,
            files_dtos::FileDetailsDto,
            files_dtos::VerifyPasswordDto,
            files_dtos::UpdatePasswordDto,
            files_dtos::UpdateExpiryDto,
            files_dtos::UpdateStatusDto,
            files_dtos::ShareLinkDto,
            files_dtos::EmailShareDto,
            files_dtos::DownloadBody,
            files_dtos::DownloadCountDto,
            ApiResponse<files_dtos::UploadResponseDto>,
            ApiResponse<files_dtos::SharedFileDto>,
            ApiResponse<Vec<files_dtos::SharedFileDto>>,
            ApiResponse<files_dtos::FileDetailsDto>,
            ApiResponse<Vec<files_dtos::FileDetailsDto>>,
            ApiResponse<files_dtos::DownloadCountDto>,
        )
    ),
    tags(
        (name = "users", description = "Accounts, sessions, and per-user statistics"),
        (name = "files", description = "File upload, download, and lifecycle management"),
        (name = "shares", description = "Public share link resolution"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "SafeDrop API",
        version = "0.1.0",
        description = "API documentation for SafeDrop",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
