//! Redis storage (shared across instances, native key expiry)

use std::time::Duration;

use async_trait::async_trait;
use fred::prelude::*;
use tracing::{info, warn};

use super::r#trait::{CounterStore, OtpStore};
use crate::auth::{config::RedisSettings, errors::AuthError};

const OTP_PREFIX: &str = "otp:";
const RATE_LIMIT_PREFIX: &str = "rl:";

/// Converts a `fred` error into the backend failure kind. The message is kept for logs only.
#[allow(clippy::needless_pass_by_value)]
fn from_redis_error(err: fred::error::Error) -> AuthError {
    AuthError::BackendUnavailable(format!("redis {:?}: {}", err.kind(), err))
}

/// Safely convert seconds to i64 for Redis expiration.
#[allow(clippy::cast_possible_wrap)]
fn seconds_to_i64(seconds: u64) -> i64 {
    seconds.min(i64::MAX as u64) as i64
}

/// `PX` value for a code lifetime; `None` when the record must not exist at all
fn code_ttl_millis(ttl: Duration) -> Option<i64> {
    let millis = seconds_to_i64(ttl.as_millis().min(u64::MAX as u128) as u64);
    (millis > 0).then_some(millis)
}

/// Seconds to `EXPIRE` a counter with after an increment, if any.
///
/// `ttl` is the key's remaining TTL, looked up only past the first hit. `-1` means the key
/// exists without expiry (a previous first hit died before `EXPIRE`).
fn window_to_apply(count: i64, ttl: Option<i64>, window: Duration) -> Option<i64> {
    let missing = count == 1 || ttl == Some(-1);
    missing.then(|| seconds_to_i64(window.as_secs().max(1)))
}

/// Connect a client with exponential reconnect
pub async fn connect(settings: &RedisSettings) -> Result<Client, AuthError> {
    let config = Config::from_url(&settings.connection_url())
        .map_err(|e| AuthError::Config(format!("invalid redis settings: {}", e)))?;

    let client = Client::new(
        config,
        None,
        None,
        Some(ReconnectPolicy::new_exponential(0, 1000, 30_000, 2)),
    );
    client.init().await.map_err(from_redis_error)?;

    info!(addr = %settings.addr, db = settings.database, "connected to redis");
    Ok(client)
}

/// OTP records as plain string keys with `PX` expiry
#[derive(Clone)]
pub struct RedisOtpStore {
    client: Client,
}

impl RedisOtpStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn key(phone: &str) -> String {
        format!("{}{}", OTP_PREFIX, phone)
    }
}

#[async_trait]
impl OtpStore for RedisOtpStore {
    async fn set(&self, phone: &str, code: &str, ttl: Duration) -> Result<(), AuthError> {
        let Some(millis) = code_ttl_millis(ttl) else {
            // a zero lifetime record is never live; make sure no older one survives
            return self.delete(phone).await.map(|_| ());
        };

        let key = Self::key(phone);
        self.client
            .set::<(), _, _>(&key, code, Some(Expiration::PX(millis)), None, false)
            .await
            .map_err(from_redis_error)
    }

    async fn get(&self, phone: &str) -> Result<String, AuthError> {
        let key = Self::key(phone);
        let value: Option<String> = self.client.get(&key).await.map_err(from_redis_error)?;
        value.ok_or(AuthError::OtpNotFoundOrExpired)
    }

    async fn delete(&self, phone: &str) -> Result<bool, AuthError> {
        let key = Self::key(phone);
        let removed: i64 = self.client.del(&key).await.map_err(from_redis_error)?;
        Ok(removed > 0)
    }
}

/// Rate limit counters: `INCR`, then `EXPIRE` on the first hit of a window
#[derive(Clone)]
pub struct RedisCounterStore {
    client: Client,
}

impl RedisCounterStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn key(key: &str) -> String {
        format!("{}{}", RATE_LIMIT_PREFIX, key)
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr_in_window(&self, key: &str, window: Duration) -> Result<i64, AuthError> {
        let key = Self::key(key);

        let count: i64 = self
            .client
            .incr_by(&key, 1)
            .await
            .map_err(from_redis_error)?;

        let ttl = if count == 1 {
            None
        } else {
            let ttl: i64 = self.client.ttl(&key).await.map_err(from_redis_error)?;
            if ttl == -1 {
                warn!("rate limit counter had no expiry, re-applying window");
            }
            Some(ttl)
        };

        if let Some(seconds) = window_to_apply(count, ttl, window) {
            // concurrent first hits may both land here
            let _: bool = self
                .client
                .expire(&key, seconds, None)
                .await
                .map_err(from_redis_error)?;
        }

        Ok(count)
    }

    async fn reset(&self, key: &str) -> Result<(), AuthError> {
        let key = Self::key(key);
        self.client
            .del::<(), _>(&key)
            .await
            .map_err(from_redis_error)
    }
}
