use super::*;

#[test]
fn test_session_config_default() {
    let config = SessionConfig::default();
    assert!(config.max_session_turns.is_none());
    assert!(config.fallback_model.is_none());
    assert_eq!(config.invalid_stream_retries, DEFAULT_INVALID_STREAM_RETRIES);
    assert!(!config.continue_on_inconclusive);
    assert_eq!(
        config.overflow_safety_margin,
        DEFAULT_OVERFLOW_SAFETY_MARGIN
    );
    assert!(config.validate().is_ok());
}

#[test]
fn test_bounded_turns_clamps_to_hard_cap() {
    let config = SessionConfig::default();
    assert_eq!(config.bounded_turns(10), 10);
    assert_eq!(config.bounded_turns(100), MAX_RECURSION_TURNS);
    assert_eq!(config.bounded_turns(1_000_000), MAX_RECURSION_TURNS);
    assert_eq!(config.bounded_turns(-5), 0);
}

#[test]
fn test_validate_rejects_non_positive_max_turns() {
    let config = SessionConfig {
        max_session_turns: Some(0),
        ..Default::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_negative_retries() {
    let config = SessionConfig {
        invalid_stream_retries: -1,
        ..Default::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_serde_defaults_fill_missing_fields() {
    let config: SessionConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, SessionConfig::default());

    let config: SessionConfig =
        serde_json::from_str(r#"{"max_session_turns": 5, "fallback_model": "genai/gemini-2.5-flash"}"#)
            .unwrap();
    assert_eq!(config.max_session_turns, Some(5));
    assert_eq!(
        config.fallback_model.as_deref(),
        Some("genai/gemini-2.5-flash")
    );
    assert_eq!(config.invalid_stream_retries, 1);
}
