use lumen_protocol::Content;
use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_starts_empty() {
    let session = InMemoryChatSession::new();
    assert!(session.is_empty());
    assert!(session.get_history().is_empty());
}

#[test]
fn test_add_and_get() {
    let mut session = InMemoryChatSession::new();
    session.add_history(Content::user_text("hello"));
    session.add_history(Content::model_text("hi"));

    let history = session.get_history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].text(), "hello");
    assert_eq!(history[1].text(), "hi");
}

#[test]
fn test_set_replaces_everything() {
    let mut session = InMemoryChatSession::with_history(vec![
        Content::user_text("a"),
        Content::model_text("b"),
        Content::user_text("c"),
    ]);
    assert_eq!(session.len(), 3);

    session.set_history(vec![Content::user_text("summary")]);
    assert_eq!(session.len(), 1);
    assert_eq!(session.get_history()[0].text(), "summary");
}
