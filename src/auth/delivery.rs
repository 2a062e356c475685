//! Out-of-band code delivery

use async_trait::async_trait;
use tracing::info;

use crate::auth::validators::mask_phone;

/// Channel that gets a freshly issued code to the phone's owner.
///
/// Best effort: delivery problems are the channel's to log, never the caller's to handle.
#[async_trait]
pub trait OtpDelivery: Send + Sync {
    async fn deliver(&self, phone: &str, code: &str);
}

/// Writes the code to the service log in place of an SMS gateway
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleDelivery;

#[async_trait]
impl OtpDelivery for ConsoleDelivery {
    async fn deliver(&self, phone: &str, code: &str) {
        info!(target: "otp_delivery", phone = %mask_phone(phone), code, "OTP generated");
    }
}
