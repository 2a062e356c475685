//! Per-phone fixed-window rate limiting
//!
//! The window opens on the first request after the previous one closed and is never
//! extended by later requests, so a burst across a window boundary is possible.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::auth::{
    errors::AuthError, storage::CounterStore, types::RateDecision, validators::mask_phone,
};

/// Rate limiter configuration
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Requests allowed per window
    pub max: i64,
    /// Window length
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max: 3,
            window: Duration::from_secs(10 * 60),
        }
    }
}

/// Fixed-window limiter over a shared counter store
#[derive(Clone)]
pub struct RateLimiter {
    counters: Arc<dyn CounterStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(counters: Arc<dyn CounterStore>, config: RateLimitConfig) -> Self {
        Self { counters, config }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Count one attempt for `phone` and decide whether it may proceed.
    ///
    /// Backend failures are returned as errors, not turned into a decision.
    pub async fn allow(&self, phone: &str) -> Result<RateDecision, AuthError> {
        let count = self
            .counters
            .incr_in_window(phone, self.config.window)
            .await?;

        let decision = RateDecision {
            allowed: count <= self.config.max,
            remaining: self.config.max - count,
        };

        if !decision.allowed {
            warn!(
                phone = %mask_phone(phone),
                count,
                max = self.config.max,
                "otp rate limit exceeded"
            );
        }
        Ok(decision)
    }

    /// Clear the counter for `phone` (administrative override)
    pub async fn reset(&self, phone: &str) -> Result<(), AuthError> {
        self.counters.reset(phone).await?;
        info!(phone = %mask_phone(phone), "rate limit reset");
        Ok(())
    }
}
