//! Input validation and log redaction helpers
//!
//! Shape checks run before any store is touched.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::auth::errors::AuthError;

static E164: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+[1-9][0-9]{1,14}$").expect("valid regex"));

/// Validate an E.164 phone number (`+` followed by up to 15 digits)
pub fn validate_phone(phone: &str) -> Result<(), AuthError> {
    if E164.is_match(phone) {
        Ok(())
    } else {
        Err(AuthError::Validation(
            "phone must be in E.164 format, e.g. +14165551234".to_string(),
        ))
    }
}

/// Validate a submitted code: exactly `length` ASCII digits
pub fn validate_code(code: &str, length: usize) -> Result<(), AuthError> {
    if code.len() == length && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AuthError::Validation(format!("otp must be {} digits", length)))
    }
}

/// Mask a phone number for logs: `+14165551234` -> `+1****34`
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}****{}", head, tail)
}
