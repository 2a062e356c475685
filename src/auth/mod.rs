//! Phone-number authentication with one-time codes
//!
//! ## Layout
//!
//! ```text
//! auth/
//! ├── types.rs          # request/response and record types
//! ├── errors.rs         # AuthError and its HTTP mapping
//! ├── config.rs         # environment configuration
//! ├── validators.rs     # phone/code validation, masking
//! ├── delivery.rs       # out-of-band code delivery
//! ├── service.rs        # AuthService facade, backend wiring
//! ├── core/             # generation, rate limiting, tokens
//! │   ├── otp_generator.rs
//! │   ├── rate_limiter.rs
//! │   └── token_service.rs
//! ├── storage/          # store traits and backends
//! │   ├── trait.rs
//! │   ├── memory.rs
//! │   ├── redis.rs
//! │   └── sqlite.rs
//! └── api/              # HTTP routes, handlers, bearer middleware
//! ```
//!
//! Requests flow API → service → storage. Every backend sits behind a
//! trait so the service can be wired to memory, Redis or SQLite.

pub mod api;
pub mod config;
pub mod core;
pub mod delivery;
pub mod errors;
pub mod service;
pub mod storage;
pub mod types;
pub mod validators;

pub use api::create_auth_routes;
pub use config::{AuthConfig, StoreBackend};
pub use delivery::{ConsoleDelivery, OtpDelivery};
pub use errors::AuthError;
pub use service::{AuthService, Backends};
pub use storage::{CounterStore, OtpStore, UserDirectory};
pub use types::{AuthResponse, Claims, OtpIssued, UserRecord};
