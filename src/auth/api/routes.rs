//! API route definitions

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::{handlers, middleware::require_bearer};
use crate::auth::AuthService;

/// Build the authentication routes
pub fn create_auth_routes(service: Arc<AuthService>) -> Router {
    // bearer token required
    let users = Router::new()
        .route("/users", get(handlers::list_users))
        .route("/users/:id", get(handlers::get_user))
        .route_layer(from_fn_with_state(service.clone(), require_bearer));

    Router::new()
        .route("/auth/request-otp", post(handlers::request_otp))
        .route("/auth/verify-otp", post(handlers::verify_otp))
        .route("/health", get(handlers::health_check))
        .merge(users)
        .with_state(service)
}
