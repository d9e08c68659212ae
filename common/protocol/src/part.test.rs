use super::*;
use serde_json::json;

#[test]
fn test_role_as_str() {
    assert_eq!(Role::User.as_str(), "user");
    assert_eq!(Role::Model.as_str(), "model");
}

#[test]
fn test_part_text() {
    let part = Part::text("hello");
    assert!(!part.is_function_call());
    assert!(!part.is_function_response());
    match part {
        Part::Text { text } => assert_eq!(text, "hello"),
        _ => panic!("Wrong part type"),
    }
}

#[test]
fn test_part_serde_tags() {
    let part = Part::text("hi");
    let json = serde_json::to_string(&part).unwrap();
    assert!(json.contains("\"type\":\"text\""));

    let call = Part::FunctionCall(FunctionCall {
        call_id: "call-1".to_string(),
        name: "read_file".to_string(),
        args: json!({"path": "/tmp/a"}),
    });
    let json = serde_json::to_string(&call).unwrap();
    assert!(json.contains("\"type\":\"function_call\""));
    assert!(json.contains("read_file"));

    let parsed: Part = serde_json::from_str(&json).unwrap();
    assert!(parsed.is_function_call());
}

#[test]
fn test_function_response_roundtrip() {
    let part = Part::FunctionResponse(FunctionResponse {
        call_id: "call-1".to_string(),
        name: "read_file".to_string(),
        response: json!({"content": "ok"}),
    });
    let json = serde_json::to_string(&part).unwrap();
    assert!(json.contains("\"type\":\"function_response\""));
    let parsed: Part = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, part);
}

#[test]
fn test_content_user_text() {
    let content = Content::user_text("do something");
    assert!(content.is_user());
    assert_eq!(content.text(), "do something");
    assert!(!content.has_function_response());
    assert!(!content.has_function_call());
}

#[test]
fn test_content_has_function_response() {
    let content = Content::new(
        Role::User,
        vec![Part::FunctionResponse(FunctionResponse {
            call_id: "c".to_string(),
            name: "bash".to_string(),
            response: json!("output"),
        })],
    );
    assert!(content.has_function_response());
}

#[test]
fn test_content_text_concatenates_text_parts() {
    let content = Content::new(
        Role::Model,
        vec![
            Part::text("a"),
            Part::FunctionCall(FunctionCall {
                call_id: "c".to_string(),
                name: "bash".to_string(),
                args: json!({}),
            }),
            Part::text("b"),
        ],
    );
    assert_eq!(content.text(), "ab");
}
