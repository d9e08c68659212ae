use super::*;
use serde_json::json;

#[test]
fn test_token_usage() {
    let usage = TokenUsage::new(100, 50);
    assert_eq!(usage.input_tokens, 100i64);
    assert_eq!(usage.output_tokens, 50i64);
    assert_eq!(usage.total(), 150i64);
}

#[test]
fn test_token_usage_add() {
    let mut usage = TokenUsage::new(100, 50);
    usage.add(&TokenUsage::new(10, 5));
    assert_eq!(usage.input_tokens, 110);
    assert_eq!(usage.output_tokens, 55);
}

#[test]
fn test_turn_event_serde_tags() {
    let event = TurnEvent::Content {
        text: "hello".to_string(),
    };
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("\"type\":\"content\""));

    let event = TurnEvent::InvalidStream;
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("invalid_stream"));
}

#[test]
fn test_session_event_overflow_roundtrip() {
    let event = SessionEvent::ContextWindowWillOverflow {
        estimated_request_token_count: 100,
        remaining_token_count: 100,
    };

    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("context_window_will_overflow"));

    let parsed: SessionEvent = serde_json::from_str(&json).unwrap();
    match parsed {
        SessionEvent::ContextWindowWillOverflow {
            estimated_request_token_count,
            remaining_token_count,
        } => {
            assert_eq!(estimated_request_token_count, 100);
            assert_eq!(remaining_token_count, 100);
        }
        _ => panic!("Wrong event type"),
    }
}

#[test]
fn test_chat_compressed_event() {
    let event = SessionEvent::ChatCompressed {
        outcome: crate::CompressionOutcome::compressed(1000, 300),
    };
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("chat_compressed"));
    assert!(json.contains("\"original_token_count\":1000"));
    assert!(json.contains("\"new_token_count\":300"));
}

#[test]
fn test_function_call_request_event() {
    let event = SessionEvent::FunctionCallRequest {
        call: FunctionCall {
            call_id: "call-7".to_string(),
            name: "grep".to_string(),
            args: json!({"pattern": "fn main"}),
        },
    };
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("function_call_request"));

    let parsed: SessionEvent = serde_json::from_str(&json).unwrap();
    match parsed {
        SessionEvent::FunctionCallRequest { call } => {
            assert_eq!(call.call_id, "call-7");
            assert_eq!(call.name, "grep");
        }
        _ => panic!("Wrong event type"),
    }
}

#[test]
fn test_session_error_transport() {
    let error = SessionError::transport("connection reset");
    assert_eq!(error.code, "TransportError");
    assert!(error.recoverable);
    assert_eq!(error.message, "connection reset");
}
