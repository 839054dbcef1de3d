//! Unit tests for domain error types

use sg_shared::errors::{error_codes, IntoErrorResponse};

use crate::errors::{DomainError, StoreError, TokenError};

#[test]
fn test_reuse_and_invalid_refresh_are_indistinguishable() {
    let reuse = DomainError::ReuseDetected.to_error_response();
    let invalid = DomainError::InvalidRefresh.to_error_response();

    assert_eq!(reuse.status, 401);
    assert_eq!(reuse.status, invalid.status);
    assert_eq!(reuse.error, error_codes::TOKEN_INVALID);
    assert_eq!(reuse.error, invalid.error);
    assert_eq!(reuse.message, invalid.message);
}

#[test]
fn test_store_unavailable_is_retryable_503() {
    let error = DomainError::StateStoreUnavailable;
    assert_eq!(error.http_status(), 503);
    assert_eq!(error.error_code(), error_codes::SERVICE_UNAVAILABLE);

    let response = error.to_error_response();
    assert!(response.retryable);
}

#[test]
fn test_config_error_is_500_and_hides_details() {
    let error = DomainError::Config {
        message: "JWT secret is not configured".to_string(),
    };
    assert_eq!(error.http_status(), 500);

    let response = error.to_error_response();
    assert_eq!(response.error, error_codes::CONFIGURATION_ERROR);
    assert!(!response.message.contains("secret"));
    assert!(!response.retryable);
}

#[test]
fn test_bridged_errors() {
    let token: DomainError = TokenError::InvalidToken.into();
    assert_eq!(token.http_status(), 401);
    assert_eq!(token.to_string(), "Invalid token");

    let store: DomainError = StoreError::unavailable("connection refused").into();
    assert_eq!(store.error_code(), error_codes::SERVICE_UNAVAILABLE);
    assert!(store.to_string().contains("connection refused"));
}

#[test]
fn test_authentication_failed_maps_to_unauthorized() {
    let response = DomainError::AuthenticationFailed.to_error_response();
    assert_eq!(response.status, 401);
    assert_eq!(response.error, error_codes::UNAUTHORIZED);
}
