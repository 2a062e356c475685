//! Storage traits

use std::time::Duration;

use async_trait::async_trait;

use crate::auth::{
    errors::AuthError,
    types::{UserPage, UserRecord},
};

/// Phone number -> pending code, with expiry
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Store `code` for `phone`, replacing any previous code. Expires `ttl` from now.
    async fn set(&self, phone: &str, code: &str, ttl: Duration) -> Result<(), AuthError>;

    /// Live code for `phone`.
    ///
    /// Missing and expired records both yield `AuthError::OtpNotFoundOrExpired`.
    async fn get(&self, phone: &str) -> Result<String, AuthError>;

    /// Remove the record, reporting whether one was present. Missing keys are not an error.
    async fn delete(&self, phone: &str) -> Result<bool, AuthError>;
}

/// Counter-with-expiry primitive behind the rate limiter
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment the counter for `key` and return the new value.
    ///
    /// The first increment of a fresh counter starts a window of `window`; later
    /// increments leave the expiry untouched.
    async fn incr_in_window(&self, key: &str, window: Duration) -> Result<i64, AuthError>;

    /// Drop the counter immediately
    async fn reset(&self, key: &str) -> Result<(), AuthError>;
}

/// External user directory, keyed by phone number
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Existing user for `phone`, or a newly registered one
    async fn get_or_create(&self, phone: &str) -> Result<UserRecord, AuthError>;

    /// User by numeric id
    async fn get_by_id(&self, id: u64) -> Result<Option<UserRecord>, AuthError>;

    /// 1-based page of users ordered by id, optionally filtered by a phone substring
    async fn list(&self, page: u32, limit: u32, search: Option<&str>) -> Result<UserPage, AuthError>;
}
