use strum::IntoEnumIterator;

use super::*;

#[test]
fn test_values_are_unique() {
    let mut values: Vec<i32> = StatusCode::iter().map(|c| c as i32).collect();
    values.sort_unstable();
    let before = values.len();
    values.dedup();
    assert_eq!(values.len(), before, "duplicate status code value");
}

#[test]
fn test_every_code_sits_in_its_category_range() {
    for code in StatusCode::iter() {
        let range = code.category().value_range();
        assert!(
            range.contains(&(code as i32)),
            "{} = {} outside {:?}",
            code.name(),
            code as i32,
            range
        );
    }
}

#[test]
fn test_is_success() {
    assert!(StatusCode::is_success(0));
    assert!(!StatusCode::is_success(StatusCode::Unknown as i32));
}

#[test]
fn test_from_i32_roundtrip() {
    for code in StatusCode::iter() {
        assert_eq!(StatusCode::from_i32(code as i32), Some(code));
    }
    assert_eq!(StatusCode::from_i32(99_999), None);
}

#[test]
fn test_name_and_display_agree() {
    assert_eq!(StatusCode::TransportError.name(), "TransportError");
    assert_eq!(
        format!("{}", StatusCode::TokenCountingFailure),
        StatusCode::TokenCountingFailure.name()
    );
}

#[test]
fn test_retry_classification() {
    // Transient conditions a fresh call can clear.
    assert!(StatusCode::TransportError.is_retryable());
    assert!(StatusCode::ServiceUnavailable.is_retryable());
    assert!(StatusCode::StreamInvalid.is_retryable());
    assert!(StatusCode::TokenCountingFailure.is_retryable());
    assert!(StatusCode::RateLimited.is_retryable());
    assert!(StatusCode::Timeout.is_retryable());

    // Conditions that need a different request or user action.
    assert!(!StatusCode::InvalidArguments.is_retryable());
    assert!(!StatusCode::InvalidConfig.is_retryable());
    assert!(!StatusCode::ContextWindowExceeded.is_retryable());
    assert!(!StatusCode::CompressionFailed.is_retryable());
    assert!(!StatusCode::Cancelled.is_retryable());
}

#[test]
fn test_log_classification() {
    // Unexpected failures go to the error log.
    assert!(StatusCode::Unknown.should_log_error());
    assert!(StatusCode::Internal.should_log_error());
    assert!(StatusCode::ModelError.should_log_error());
    assert!(StatusCode::StreamInvalid.should_log_error());

    // Caller mistakes do not.
    assert!(!StatusCode::InvalidArguments.should_log_error());
    assert!(!StatusCode::Cancelled.should_log_error());
}
