//! Authentication data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User record as returned by the user directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Numeric user id
    pub id: u64,
    /// Phone number in E.164 format
    pub phone: String,
    /// Registration time
    pub registered_at: DateTime<Utc>,
}

/// Claims carried inside a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: u64,
    /// Phone number the code was verified for
    pub phone: String,
    /// Issued-at (unix seconds)
    pub iat: i64,
    /// Expires-at (unix seconds)
    pub exp: i64,
}

/// Outcome of a single rate limiter check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// `max - count`; negative once the caller is over the limit
    pub remaining: i64,
}

/// One page of users plus the unpaged total
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPage {
    pub users: Vec<UserRecord>,
    pub total: u64,
}

/// Request OTP body
#[derive(Debug, Deserialize)]
pub struct RequestOtpRequest {
    /// Phone number (E.164)
    pub phone: String,
}

/// Request OTP response. The code itself is delivered out of band.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct OtpIssued {
    pub message: String,
    /// Code lifetime in seconds
    pub expires_in: u64,
    /// Issuance attempts left in the current window
    pub remaining: i64,
}

/// Verify OTP body
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    /// Phone number (E.164)
    pub phone: String,
    /// The code received out of band
    pub otp: String,
}

/// Authentication response
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// Signed session token
    pub token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
    /// The authenticated user
    pub user: UserRecord,
}

/// Query string for the user listing. Paging values stay raw so junk falls back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
}

impl ListUsersQuery {
    pub fn page(&self) -> Option<i64> {
        self.page.as_deref().and_then(|p| p.trim().parse().ok())
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit.as_deref().and_then(|l| l.trim().parse().ok())
    }
}

/// Pagination block of the user listing
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

/// User listing response
#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub data: Vec<UserRecord>,
    pub pagination: Pagination,
}
