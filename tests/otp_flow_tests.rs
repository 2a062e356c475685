//! End-to-end OTP flows through AuthService with in-process backends

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use phone_otp_auth::auth::{storage::MemoryUserDirectory, AuthError};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_code_is_single_use() {
    let (service, inbox) = memory_service();
    service.request_otp(PHONE).await.unwrap();
    let code = inbox.latest(PHONE);

    let first = service.verify_otp(PHONE, &code).await.unwrap();
    assert_eq!(first.token_type, "Bearer");

    let second = service.verify_otp(PHONE, &code).await;
    assert!(matches!(second, Err(AuthError::OtpNotFoundOrExpired)));
}

#[tokio::test]
async fn test_verify_without_request_fails() {
    let (service, _) = memory_service();
    let result = service.verify_otp(PHONE, "123456").await;
    assert!(matches!(result, Err(AuthError::OtpNotFoundOrExpired)));
}

#[tokio::test(start_paused = true)]
async fn test_code_expires_after_ttl() {
    let (service, inbox) = memory_service();
    service.request_otp(PHONE).await.unwrap();
    let code = inbox.latest(PHONE);

    tokio::time::advance(Duration::from_secs(121)).await;

    let result = service.verify_otp(PHONE, &code).await;
    assert!(matches!(result, Err(AuthError::OtpNotFoundOrExpired)));
}

#[tokio::test(start_paused = true)]
async fn test_code_valid_until_ttl() {
    let (service, inbox) = memory_service();
    service.request_otp(PHONE).await.unwrap();
    let code = inbox.latest(PHONE);

    tokio::time::advance(Duration::from_secs(119)).await;

    assert!(service.verify_otp(PHONE, &code).await.is_ok());
}

#[tokio::test]
async fn test_zero_ttl_code_is_never_valid() {
    let mut config = test_config();
    config.otp_ttl = Duration::ZERO;
    let (service, inbox) = service_with(&config, Arc::new(MemoryUserDirectory::new()));

    service.request_otp(PHONE).await.unwrap();
    let result = service.verify_otp(PHONE, &inbox.latest(PHONE)).await;
    assert!(matches!(result, Err(AuthError::OtpNotFoundOrExpired)));
}

#[tokio::test]
async fn test_request_beyond_limit_is_blocked_without_delivery() {
    let (service, inbox) = memory_service();

    let remaining: Vec<i64> = {
        let mut out = Vec::new();
        for _ in 0..3 {
            out.push(service.request_otp(PHONE).await.unwrap().remaining);
        }
        out
    };
    assert_eq!(remaining, vec![2, 1, 0]);

    let blocked = service.request_otp(PHONE).await;
    assert!(matches!(blocked, Err(AuthError::RateLimited { remaining: -1 })));
    assert_eq!(inbox.count(PHONE), 3);

    // other numbers are unaffected
    assert_eq!(service.request_otp("+447700900123").await.unwrap().remaining, 2);
}

#[tokio::test]
async fn test_reset_restores_full_allowance() {
    let (service, _) = memory_service();
    for _ in 0..3 {
        service.request_otp(PHONE).await.unwrap();
    }
    assert!(service.request_otp(PHONE).await.is_err());

    service.reset_rate_limit(PHONE).await.unwrap();
    assert_eq!(service.request_otp(PHONE).await.unwrap().remaining, 2);
}

#[tokio::test(start_paused = true)]
async fn test_limit_window_rolls_over() {
    let (service, _) = memory_service();
    for _ in 0..3 {
        service.request_otp(PHONE).await.unwrap();
    }
    assert!(service.request_otp(PHONE).await.is_err());

    tokio::time::advance(Duration::from_secs(601)).await;

    assert_eq!(service.request_otp(PHONE).await.unwrap().remaining, 2);
}

#[tokio::test]
async fn test_wrong_codes_do_not_consume_pending_code() {
    let (service, inbox) = memory_service();
    service.request_otp(PHONE).await.unwrap();
    let code = inbox.latest(PHONE);
    let wrong = wrong_code(&code);

    for _ in 0..3 {
        let result = service.verify_otp(PHONE, &wrong).await;
        assert!(matches!(result, Err(AuthError::OtpNotFoundOrExpired)));
    }

    assert!(service.verify_otp(PHONE, &code).await.is_ok());
}

#[tokio::test]
async fn test_new_request_replaces_pending_code() {
    let (service, inbox) = memory_service();
    service.request_otp(PHONE).await.unwrap();
    let first = inbox.latest(PHONE);
    service.request_otp(PHONE).await.unwrap();
    let second = inbox.latest(PHONE);

    if first != second {
        let stale = service.verify_otp(PHONE, &first).await;
        assert!(matches!(stale, Err(AuthError::OtpNotFoundOrExpired)));
    }
    assert!(service.verify_otp(PHONE, &second).await.is_ok());
}

#[tokio::test]
async fn test_concurrent_verification_succeeds_once() {
    let (service, inbox) = memory_service();
    service.request_otp(PHONE).await.unwrap();
    let code = inbox.latest(PHONE);

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let service = service.clone();
            let code = code.clone();
            tokio::spawn(async move { service.verify_otp(PHONE, &code).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(AuthError::OtpNotFoundOrExpired) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }
    assert_eq!(successes, 1);
}

#[tokio::test]
async fn test_returning_user_keeps_id() {
    let (service, inbox) = memory_service();

    service.request_otp(PHONE).await.unwrap();
    let first = service.verify_otp(PHONE, &inbox.latest(PHONE)).await.unwrap();

    service.request_otp(PHONE).await.unwrap();
    let second = service.verify_otp(PHONE, &inbox.latest(PHONE)).await.unwrap();

    assert_eq!(first.user.id, second.user.id);
    assert_eq!(first.user.registered_at, second.user.registered_at);
}

#[tokio::test]
async fn test_operator_token_for_known_user() {
    let (service, inbox) = memory_service();
    service.request_otp(PHONE).await.unwrap();
    let auth = service.verify_otp(PHONE, &inbox.latest(PHONE)).await.unwrap();

    let token = service.issue_token_for(auth.user.id).await.unwrap();
    let claims = service.authenticate(&token).unwrap();
    assert_eq!(claims.sub, auth.user.id);
    assert_eq!(claims.phone, PHONE);

    assert!(matches!(
        service.issue_token_for(auth.user.id + 100).await,
        Err(AuthError::UserNotFound)
    ));
}
