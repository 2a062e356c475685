//! Authentication service (facade)
//!
//! Composes the rate limiter, code generator, OTP store, user directory and token issuer
//! into the request-OTP and verify-OTP flows.

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use subtle::ConstantTimeEq;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::{
    config::{AuthConfig, StoreBackend},
    core::{generate_code, RateLimitConfig, RateLimiter, TokenService},
    delivery::{ConsoleDelivery, OtpDelivery},
    errors::AuthError,
    storage::{
        redis, CounterStore, MemoryCounterStore, MemoryOtpStore, OtpStore, RedisCounterStore,
        RedisOtpStore, SqliteUserDirectory, UserDirectory,
    },
    types::*,
    validators::{mask_phone, validate_code, validate_phone},
};

/// Default page size for user listings
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Largest page size a caller may request
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Storage and delivery collaborators
pub struct Backends {
    pub otp_store: Arc<dyn OtpStore>,
    pub counters: Arc<dyn CounterStore>,
    pub users: Arc<dyn UserDirectory>,
    pub delivery: Arc<dyn OtpDelivery>,
    /// Present for the in-process backend, whose maps need an occasional sweep
    memory: Option<(Arc<MemoryOtpStore>, Arc<MemoryCounterStore>)>,
}

impl Backends {
    /// In-process stores around the given directory and delivery channel
    pub fn in_memory(users: Arc<dyn UserDirectory>, delivery: Arc<dyn OtpDelivery>) -> Self {
        let otp_store = Arc::new(MemoryOtpStore::new());
        let counters = Arc::new(MemoryCounterStore::new());
        Self {
            otp_store: otp_store.clone(),
            counters: counters.clone(),
            users,
            delivery,
            memory: Some((otp_store, counters)),
        }
    }

    /// Build the backends named by `config`
    pub async fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let users: Arc<dyn UserDirectory> =
            Arc::new(SqliteUserDirectory::connect(&config.database_url).await?);
        let delivery: Arc<dyn OtpDelivery> = Arc::new(ConsoleDelivery);

        match config.store_backend {
            StoreBackend::Memory => {
                warn!("using in-process OTP store; not safe for multi-instance deployments");
                Ok(Self::in_memory(users, delivery))
            }
            StoreBackend::Redis => {
                let client = redis::connect(&config.redis).await?;
                Ok(Self {
                    otp_store: Arc::new(RedisOtpStore::new(client.clone())),
                    counters: Arc::new(RedisCounterStore::new(client)),
                    users,
                    delivery,
                    memory: None,
                })
            }
        }
    }

    /// Periodically drop expired in-process records. `None` for backends with native expiry.
    pub fn spawn_sweeper(&self, every: Duration) -> Option<JoinHandle<()>> {
        let (otp_store, counters) = self.memory.clone()?;
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let removed = otp_store.purge_expired() + counters.purge_expired();
                if removed > 0 {
                    debug!(removed, "swept expired in-memory entries");
                }
            }
        }))
    }
}

/// Authentication service
pub struct AuthService {
    otp_store: Arc<dyn OtpStore>,
    rate_limiter: RateLimiter,
    users: Arc<dyn UserDirectory>,
    delivery: Arc<dyn OtpDelivery>,
    token_service: TokenService,
    otp_length: usize,
    otp_ttl: Duration,
    token_ttl: Duration,
}

impl AuthService {
    /// Create the service
    ///
    /// # Errors
    /// `AuthError::Config` for invalid settings, `AuthError::Signing` for a bad secret.
    pub fn new(config: &AuthConfig, backends: Backends) -> Result<Self, AuthError> {
        config.validate()?;

        let token_service = TokenService::new(config.jwt_secret.expose_secret().clone())?;
        let rate_limiter = RateLimiter::new(
            backends.counters,
            RateLimitConfig {
                max: config.rate_limit_max,
                window: config.rate_limit_window,
            },
        );

        Ok(Self {
            otp_store: backends.otp_store,
            rate_limiter,
            users: backends.users,
            delivery: backends.delivery,
            token_service,
            otp_length: config.otp_length,
            otp_ttl: config.otp_ttl,
            token_ttl: config.token_ttl,
        })
    }

    /// Issue a fresh code for `phone`, replacing any pending one.
    ///
    /// The code goes out through the delivery channel only.
    pub async fn request_otp(&self, phone: &str) -> Result<OtpIssued, AuthError> {
        validate_phone(phone)?;

        let decision = self.rate_limiter.allow(phone).await?;
        if !decision.allowed {
            return Err(AuthError::RateLimited {
                remaining: decision.remaining,
            });
        }

        let code = generate_code(self.otp_length);
        self.otp_store.set(phone, &code, self.otp_ttl).await?;
        self.delivery.deliver(phone, &code).await;

        info!(phone = %mask_phone(phone), remaining = decision.remaining, "otp issued");
        Ok(OtpIssued {
            message: "OTP sent".to_string(),
            expires_in: self.otp_ttl.as_secs(),
            remaining: decision.remaining,
        })
    }

    /// Check `code` for `phone` and exchange it for a session token.
    ///
    /// A wrong code leaves the pending one in place. A matching code is consumed before the
    /// user lookup, so a later failure means the caller must request a new code.
    pub async fn verify_otp(&self, phone: &str, code: &str) -> Result<AuthResponse, AuthError> {
        validate_phone(phone)?;
        validate_code(code, self.otp_length)?;

        let stored = self.otp_store.get(phone).await?;
        if !bool::from(stored.as_bytes().ct_eq(code.as_bytes())) {
            debug!(phone = %mask_phone(phone), "otp mismatch");
            return Err(AuthError::OtpNotFoundOrExpired);
        }

        // only the request whose delete removed the record may continue
        if !self.otp_store.delete(phone).await? {
            return Err(AuthError::OtpNotFoundOrExpired);
        }

        let user = self.users.get_or_create(phone).await?;
        let token = self
            .token_service
            .issue_token(user.id, &user.phone, self.token_ttl)?;

        info!(user_id = user.id, "otp verified");
        Ok(AuthResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.token_ttl.as_secs(),
            user,
        })
    }

    /// Validate a bearer token
    pub fn authenticate(&self, token: &str) -> Result<Claims, AuthError> {
        self.token_service.verify(token)
    }

    /// Mint a token for an existing user (operator tooling)
    pub async fn issue_token_for(&self, user_id: u64) -> Result<String, AuthError> {
        let user = self.get_user(user_id).await?;
        self.token_service
            .issue_token(user.id, &user.phone, self.token_ttl)
    }

    /// Look up one user
    pub async fn get_user(&self, id: u64) -> Result<UserRecord, AuthError> {
        self.users
            .get_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Page through users. Out-of-range paging values are normalised, not rejected.
    pub async fn list_users(
        &self,
        page: Option<i64>,
        limit: Option<i64>,
        search: Option<&str>,
    ) -> Result<UserListResponse, AuthError> {
        let page = page
            .filter(|p| *p >= 1)
            .map_or(1, |p| p.min(u32::MAX as i64) as u32);
        let limit = limit
            .filter(|l| *l >= 1)
            .map_or(DEFAULT_PAGE_LIMIT, |l| l.min(MAX_PAGE_LIMIT as i64) as u32);
        let search = search.map(str::trim).filter(|s| !s.is_empty());

        let result = self.users.list(page, limit, search).await?;
        Ok(UserListResponse {
            data: result.users,
            pagination: Pagination {
                page,
                limit,
                total: result.total,
            },
        })
    }

    /// Clear the issuance counter for `phone`
    pub async fn reset_rate_limit(&self, phone: &str) -> Result<(), AuthError> {
        validate_phone(phone)?;
        self.rate_limiter.reset(phone).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::MemoryUserDirectory;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    const SECRET: &str = "unit-signing-key-0123456789abcdefghij";
    const PHONE: &str = "+14165551234";

    #[derive(Default)]
    struct Inbox(Mutex<HashMap<String, String>>);

    #[async_trait]
    impl OtpDelivery for Inbox {
        async fn deliver(&self, phone: &str, code: &str) {
            self.0.lock().insert(phone.to_string(), code.to_string());
        }
    }

    impl Inbox {
        fn code_for(&self, phone: &str) -> String {
            self.0.lock().get(phone).cloned().expect("code delivered")
        }
    }

    fn service() -> (AuthService, Arc<Inbox>) {
        let inbox = Arc::new(Inbox::default());
        let backends = Backends::in_memory(Arc::new(MemoryUserDirectory::new()), inbox.clone());
        let service = AuthService::new(&AuthConfig::with_secret(SECRET), backends).unwrap();
        (service, inbox)
    }

    #[tokio::test]
    async fn test_request_then_verify() {
        let (service, inbox) = service();
        let issued = service.request_otp(PHONE).await.unwrap();
        assert_eq!(issued.expires_in, 120);
        assert_eq!(issued.remaining, 2);

        let code = inbox.code_for(PHONE);
        assert_eq!(code.len(), 6);

        let auth = service.verify_otp(PHONE, &code).await.unwrap();
        assert_eq!(auth.user.phone, PHONE);
        assert_eq!(auth.expires_in, 1800);

        let claims = service.authenticate(&auth.token).unwrap();
        assert_eq!(claims.sub, auth.user.id);
        assert_eq!(claims.phone, PHONE);
    }

    #[tokio::test]
    async fn test_malformed_input_rejected() {
        let (service, _) = service();
        assert!(matches!(
            service.request_otp("4165551234").await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            service.verify_otp(PHONE, "12ab56").await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_rate_limited_request_carries_remaining() {
        let (service, _) = service();
        for _ in 0..3 {
            service.request_otp(PHONE).await.unwrap();
        }
        match service.request_otp(PHONE).await {
            Err(AuthError::RateLimited { remaining }) => assert_eq!(remaining, -1),
            other => panic!("expected rate limit, got {:?}", other.map(|_| ())),
        }

        service.reset_rate_limit(PHONE).await.unwrap();
        assert_eq!(service.request_otp(PHONE).await.unwrap().remaining, 2);
    }

    #[tokio::test]
    async fn test_list_users_normalises_paging() {
        let (service, inbox) = service();
        service.request_otp(PHONE).await.unwrap();
        service.verify_otp(PHONE, &inbox.code_for(PHONE)).await.unwrap();

        let listing = service.list_users(Some(0), Some(-5), Some("  ")).await.unwrap();
        assert_eq!(listing.pagination, Pagination { page: 1, limit: 10, total: 1 });

        let listing = service.list_users(None, Some(1_000), None).await.unwrap();
        assert_eq!(listing.pagination.limit, MAX_PAGE_LIMIT);
    }

    #[test]
    fn test_unusable_lifetime_rejected_at_construction() {
        let mut config = AuthConfig::with_secret(SECRET);
        config.otp_ttl = Duration::from_secs(u64::MAX);
        let backends = Backends::in_memory(
            Arc::new(MemoryUserDirectory::new()),
            Arc::new(Inbox::default()),
        );
        assert!(matches!(
            AuthService::new(&config, backends),
            Err(AuthError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let (service, _) = service();
        assert!(matches!(service.get_user(404).await, Err(AuthError::UserNotFound)));
    }
}
