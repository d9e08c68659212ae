use super::*;

#[test]
fn test_compression_config_default() {
    let config = CompressionConfig::default();
    assert_eq!(
        config.context_percentage_threshold,
        DEFAULT_CONTEXT_PERCENTAGE_THRESHOLD
    );
    assert_eq!(config.retain_fraction, DEFAULT_RETAIN_FRACTION);
    assert!(config.validate().is_ok());
}

#[test]
fn test_trigger_tokens() {
    let config = CompressionConfig::default();
    assert_eq!(config.trigger_tokens(1000), 700);
    assert_eq!(config.trigger_tokens(200_000), 140_000);
}

#[test]
fn test_validate_rejects_bad_threshold() {
    let config = CompressionConfig {
        context_percentage_threshold: 1.5,
        ..Default::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_bad_retain_fraction() {
    for bad in [0.0, 1.0, -0.1, 2.0] {
        let config = CompressionConfig {
            retain_fraction: bad,
            ..Default::default()
        };
        assert!(config.validate().is_err(), "expected rejection of {bad}");
    }
}

#[test]
fn test_status_as_str() {
    assert_eq!(CompressionStatus::Compressed.as_str(), "compressed");
    assert_eq!(CompressionStatus::Noop.as_str(), "noop");
    assert_eq!(CompressionStatus::FailedInflated.as_str(), "failed_inflated");
    assert_eq!(
        CompressionStatus::FailedTokenError.as_str(),
        "failed_token_error"
    );
}

#[test]
fn test_outcome_constructors() {
    let outcome = CompressionOutcome::noop(700);
    assert_eq!(outcome.status, CompressionStatus::Noop);
    assert_eq!(outcome.original_token_count, 700);
    assert_eq!(outcome.new_token_count, 700);

    let outcome = CompressionOutcome::compressed(1000, 300);
    assert_eq!(outcome.status, CompressionStatus::Compressed);
    assert_eq!(outcome.original_token_count, 1000);
    assert_eq!(outcome.new_token_count, 300);

    let outcome = CompressionOutcome::failed_inflated(100, 5000);
    assert_eq!(outcome.status, CompressionStatus::FailedInflated);
    assert_eq!(outcome.new_token_count, 5000);

    let outcome = CompressionOutcome::failed_token_error(100);
    assert_eq!(outcome.status, CompressionStatus::FailedTokenError);
    assert_eq!(outcome.new_token_count, 0);
}

#[test]
fn test_outcome_serde_roundtrip() {
    let outcome = CompressionOutcome::compressed(1000, 300);
    let json = serde_json::to_string(&outcome).unwrap();
    assert!(json.contains("\"status\":\"compressed\""));
    let parsed: CompressionOutcome = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, outcome);
}
