//! Core business logic

pub mod otp_generator;
pub mod rate_limiter;
pub mod token_service;

pub use otp_generator::generate_code;
pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use token_service::TokenService;
