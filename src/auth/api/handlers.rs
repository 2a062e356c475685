//! API request handlers

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Json, Path, Query, State,
    },
    http::StatusCode,
    Extension,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::auth::{errors::AuthError, types::*, validators::mask_phone, AuthService};

fn bad_body(rejection: JsonRejection) -> AuthError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AuthError::PayloadTooLarge;
    }
    AuthError::Validation(rejection.body_text())
}

/// POST /auth/request-otp
pub async fn request_otp(
    State(service): State<Arc<AuthService>>,
    payload: Result<Json<RequestOtpRequest>, JsonRejection>,
) -> Result<Json<OtpIssued>, AuthError> {
    let Json(req) = payload.map_err(bad_body)?;
    info!("API: otp requested for {}", mask_phone(&req.phone));
    let issued = service.request_otp(&req.phone).await?;
    Ok(Json(issued))
}

/// POST /auth/verify-otp
pub async fn verify_otp(
    State(service): State<Arc<AuthService>>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AuthError> {
    let Json(req) = payload.map_err(bad_body)?;
    info!("API: otp verification for {}", mask_phone(&req.phone));
    let response = service.verify_otp(&req.phone, &req.otp).await?;
    Ok(Json(response))
}

/// GET /users/:id
pub async fn get_user(
    State(service): State<Arc<AuthService>>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<UserRecord>, AuthError> {
    let Path(id) = id.map_err(|_| AuthError::Validation("invalid user id".to_string()))?;
    info!(caller = claims.sub, "API: get user {}", id);
    let user = service.get_user(id).await?;
    Ok(Json(user))
}

/// GET /users?page&limit&search
pub async fn list_users(
    State(service): State<Arc<AuthService>>,
    Extension(claims): Extension<Claims>,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<Json<UserListResponse>, AuthError> {
    let Query(query) = query.map_err(|e| AuthError::Validation(e.body_text()))?;
    info!(caller = claims.sub, "API: list users");
    let listing = service
        .list_users(query.page(), query.limit(), query.search.as_deref())
        .await?;
    Ok(Json(listing))
}

/// GET /health
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "time": chrono::Utc::now().to_rfc3339()
    }))
}
