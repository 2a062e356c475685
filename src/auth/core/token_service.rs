//! Session token issuance and verification

use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use tracing::debug;
use zeroize::Zeroizing;

use crate::auth::{config::MIN_SECRET_LEN, errors::AuthError, types::Claims};

/// Mints and checks HS256-signed session tokens. Stateless: no session table backs them.
pub struct TokenService {
    /// Signing secret (zeroized on drop)
    secret: Zeroizing<String>,
}

impl TokenService {
    /// Create a token service
    ///
    /// # Errors
    /// `AuthError::Signing` if the secret is shorter than 32 characters.
    pub fn new(secret: impl Into<String>) -> Result<Self, AuthError> {
        let secret = Zeroizing::new(secret.into());
        if secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::Signing(format!(
                "signing secret must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }
        Ok(Self { secret })
    }

    /// Issue a token for `user_id` valid for `ttl` from now
    pub fn issue_token(&self, user_id: u64, phone: &str, ttl: Duration) -> Result<String, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let ttl_secs = i64::try_from(ttl.as_secs())
            .map_err(|_| AuthError::Signing("token ttl out of range".to_string()))?;

        let claims = Claims {
            sub: user_id,
            phone: phone.to_string(),
            iat: now,
            exp: now.saturating_add(ttl_secs),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Signing(e.to_string()))?;

        debug!("session token issued");
        Ok(token)
    }

    /// Check signature and expiry, returning the embedded claims
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }
}
