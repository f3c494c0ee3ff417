#[cfg(test)]
use crate::features::auth::AuthenticatedUser;

#[cfg(test)]
use axum::{extract::Request, middleware::Next, response::Response, Router};

#[cfg(test)]
#[allow(dead_code)]
pub fn create_test_user() -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: 1,
        email: "test@example.com".to_string(),
    }
}

#[cfg(test)]
#[allow(dead_code)]
async fn inject_test_user_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(create_test_user());
    next.run(request).await
}

#[cfg(test)]
#[allow(dead_code)]
pub fn with_test_auth(router: Router) -> Router {
    router.layer(axum::middleware::from_fn(inject_test_user_middleware))
}
