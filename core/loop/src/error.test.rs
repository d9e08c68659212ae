use lumen_error::ErrorExt;
use lumen_error::StatusCode;

use super::*;

#[test]
fn test_display_messages() {
    let err = loop_error::InvalidRetainFractionSnafu { fraction: 1.5 }.build();
    assert_eq!(
        err.to_string(),
        "Retain fraction 1.5 is out of range, must be in (0, 1)"
    );

    let err = LoopError::transport("connection reset");
    assert_eq!(err.to_string(), "Model transport failed: connection reset");
}

#[test]
fn test_status_codes() {
    let err = loop_error::InvalidRetainFractionSnafu { fraction: 0.0 }.build();
    assert_eq!(err.status_code(), StatusCode::InvalidArguments);

    assert_eq!(
        LoopError::transport("x").status_code(),
        StatusCode::TransportError
    );
    assert_eq!(
        LoopError::token_counting("x").status_code(),
        StatusCode::TokenCountingFailure
    );
    assert_eq!(LoopError::routing("x").status_code(), StatusCode::ModelError);
    assert_eq!(
        loop_error::EmptySummarySnafu.build().status_code(),
        StatusCode::CompressionFailed
    );
}

#[test]
fn test_retryability_follows_status_code() {
    assert!(LoopError::transport("x").is_retryable());
    assert!(!LoopError::routing("x").is_retryable());

    let err = loop_error::InvalidConfigSnafu {
        reason: "bad".to_string(),
    }
    .build();
    assert!(!err.is_retryable());
}
