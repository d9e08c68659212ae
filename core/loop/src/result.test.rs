use lumen_protocol::FunctionCall;
use lumen_protocol::TokenUsage;
use serde_json::json;

use super::*;

#[test]
fn test_done_carries_pending_calls() {
    let call = FunctionCall {
        call_id: "call-1".to_string(),
        name: "read_file".to_string(),
        args: json!({"path": "a.rs"}),
    };
    let result = SessionResult::done(2, TokenUsage::new(10, 5), "text".to_string(), vec![call]);

    assert_eq!(result.stop_reason, StopReason::Done);
    assert_eq!(result.turns_completed, 2);
    assert!(result.has_pending_calls());
}

#[test]
fn test_error_result() {
    let result = SessionResult::error(1, TokenUsage::default(), "boom");
    assert_eq!(
        result.stop_reason,
        StopReason::Error {
            message: "boom".to_string()
        }
    );
    assert!(!result.has_pending_calls());
    assert!(result.final_text.is_empty());
}

#[test]
fn test_limit_results() {
    let result = SessionResult::max_session_turns(5, TokenUsage::default());
    assert_eq!(result.stop_reason, StopReason::MaxSessionTurns);

    let result = SessionResult::max_recursion_turns(100, TokenUsage::default());
    assert_eq!(result.stop_reason, StopReason::MaxRecursionTurns);
    assert_eq!(result.turns_completed, 100);
}

#[test]
fn test_cancelled_keeps_partial_text() {
    let result = SessionResult::cancelled(1, TokenUsage::new(4, 2), "partial".to_string());
    assert_eq!(result.stop_reason, StopReason::Cancelled);
    assert_eq!(result.final_text, "partial");
}

#[test]
fn test_stop_reason_serde() {
    let reason = StopReason::Error {
        message: "x".to_string(),
    };
    let json = serde_json::to_string(&reason).unwrap();
    let back: StopReason = serde_json::from_str(&json).unwrap();
    assert_eq!(back, reason);
}
