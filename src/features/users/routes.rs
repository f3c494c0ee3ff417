use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::users::handlers;
use crate::features::users::services::UserService;

/// Create routes for the users feature
///
/// Update/delete enforce authentication through the `AuthenticatedUser`
/// extractor; register/login/lookup are public.
pub fn routes(service: Arc<UserService>) -> Router {
    Router::new()
        .route("/api/users/register", post(handlers::register))
        .route("/api/users/login", post(handlers::login))
        .route("/api/users/logout", get(handlers::logout))
        .route("/api/users/user", get(handlers::list_users))
        .route(
            "/api/users/user/{user_id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .with_state(service)
}
