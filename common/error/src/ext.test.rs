use super::*;

#[test]
fn test_plain_error_carries_its_code() {
    let err = PlainError::new("retain fraction out of range", StatusCode::InvalidArguments);
    assert_eq!(err.status_code(), StatusCode::InvalidArguments);
    assert_eq!(err.to_string(), "retain fraction out of range");
    assert!(!err.is_retryable());
    assert!(!err.should_log_error());
}

#[test]
fn test_retryability_follows_the_table() {
    assert!(PlainError::new("reset", StatusCode::TransportError).is_retryable());
    assert!(!PlainError::new("too big", StatusCode::ContextWindowExceeded).is_retryable());
}

#[test]
fn test_output_msg_masks_logged_errors() {
    let err = PlainError::new("stack details the user must not see", StatusCode::Internal);
    assert_eq!(err.output_msg(), "Internal error: 1001");

    let err = PlainError::new("retain fraction must be in (0, 1)", StatusCode::InvalidArguments);
    assert_eq!(err.output_msg(), "retain fraction must be in (0, 1)");
}

#[test]
fn test_boxed_preserves_the_source_chain() {
    use std::error::Error;

    let inner = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset");
    let wrapped = boxed(inner, StatusCode::TransportError);

    assert_eq!(wrapped.status_code(), StatusCode::TransportError);
    assert_eq!(wrapped.to_string(), "connection reset");
    assert!(wrapped.source().is_some());
}

#[test]
fn test_as_any_downcast() {
    let err = PlainError::new("x", StatusCode::Unknown);
    let any = err.as_any();
    assert!(any.downcast_ref::<PlainError>().is_some());
}
