//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use phone_otp_auth::auth::{
    storage::MemoryUserDirectory, AuthConfig, AuthService, Backends, OtpDelivery, UserDirectory,
};

pub const SECRET: &str = "integration-signing-key-0123456789abcdef";
pub const PHONE: &str = "+14165551234";

/// Delivery channel that keeps every code it was asked to send
#[derive(Default)]
pub struct Inbox {
    codes: Mutex<HashMap<String, Vec<String>>>,
}

#[async_trait]
impl OtpDelivery for Inbox {
    async fn deliver(&self, phone: &str, code: &str) {
        self.codes
            .lock()
            .entry(phone.to_string())
            .or_default()
            .push(code.to_string());
    }
}

impl Inbox {
    /// Most recent code sent to `phone`
    pub fn latest(&self, phone: &str) -> String {
        self.codes
            .lock()
            .get(phone)
            .and_then(|codes| codes.last().cloned())
            .expect("a code was delivered")
    }

    pub fn count(&self, phone: &str) -> usize {
        self.codes.lock().get(phone).map_or(0, Vec::len)
    }
}

pub fn test_config() -> AuthConfig {
    AuthConfig::with_secret(SECRET)
}

pub fn service_with(config: &AuthConfig, users: Arc<dyn UserDirectory>) -> (Arc<AuthService>, Arc<Inbox>) {
    let inbox = Arc::new(Inbox::default());
    let backends = Backends::in_memory(users, inbox.clone());
    let service = AuthService::new(config, backends).expect("valid test config");
    (Arc::new(service), inbox)
}

pub fn memory_service() -> (Arc<AuthService>, Arc<Inbox>) {
    service_with(&test_config(), Arc::new(MemoryUserDirectory::new()))
}

/// A code of the right shape that differs from `code`
pub fn wrong_code(code: &str) -> String {
    code.chars()
        .map(|c| if c == '9' { '0' } else { char::from(c as u8 + 1) })
        .collect()
}
