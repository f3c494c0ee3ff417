use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identity attached to a request once its bearer token has been validated
/// and the user row confirmed to still exist.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub email: String,
}
