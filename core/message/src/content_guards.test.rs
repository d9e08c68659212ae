use lumen_protocol::Content;
use lumen_protocol::FunctionCall;
use lumen_protocol::FunctionResponse;
use lumen_protocol::Part;
use lumen_protocol::Role;
use serde_json::json;

use super::*;

fn function_response_content() -> Content {
    Content::new(
        Role::User,
        vec![Part::FunctionResponse(FunctionResponse {
            call_id: "call-1".to_string(),
            name: "read_file".to_string(),
            response: json!({"content": "fn main() {}"}),
        })],
    )
}

fn function_call_content() -> Content {
    Content::new(
        Role::Model,
        vec![Part::FunctionCall(FunctionCall {
            call_id: "call-1".to_string(),
            name: "read_file".to_string(),
            args: json!({"path": "src/main.rs"}),
        })],
    )
}

#[test]
fn test_plain_user_message_is_valid_split() {
    assert!(is_valid_split_content(&Content::user_text("hello")));
}

#[test]
fn test_model_message_is_not_valid_split() {
    assert!(!is_valid_split_content(&Content::model_text("hi")));
}

#[test]
fn test_function_response_is_not_valid_split() {
    assert!(!is_valid_split_content(&function_response_content()));
}

#[test]
fn test_pending_function_call() {
    let history = vec![Content::user_text("run it"), function_call_content()];
    assert!(has_pending_function_call(&history));

    let history = vec![
        Content::user_text("run it"),
        function_call_content(),
        function_response_content(),
    ];
    assert!(!has_pending_function_call(&history));

    assert!(!has_pending_function_call(&[]));
}

#[test]
fn test_serialized_size_is_nonzero() {
    let content = Content::user_text("hello");
    let size = serialized_size(&content);
    assert!(size > "hello".len());
}

#[test]
fn test_estimate_matches_serialized_bytes() {
    let history = vec![Content::user_text("hello"), Content::model_text("world")];
    let bytes: usize = history.iter().map(serialized_size).sum();
    assert_eq!(estimate_request_tokens(&history), (bytes / 4) as i64);
}

#[test]
fn test_estimate_empty_history() {
    assert_eq!(estimate_request_tokens(&[]), 0);
}
