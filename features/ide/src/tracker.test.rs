use lumen_protocol::Part;

use super::*;
use crate::snapshot::ActiveFile;
use crate::snapshot::CursorPosition;

fn editing(path: &str, line: u32) -> IdeSnapshot {
    IdeSnapshot {
        active_file: Some(ActiveFile {
            path: path.to_string(),
            cursor: Some(CursorPosition { line, character: 1 }),
            selected_text: None,
        }),
        other_open_files: vec!["notes.md".to_string()],
    }
}

fn text_of(part: &Part) -> &str {
    match part {
        Part::Text { text } => text,
        _ => panic!("expected a text part"),
    }
}

#[test]
fn test_pending_tool_call_suppresses_message() {
    let mut tracker = EditorContextTracker::new();
    tracker.update_snapshot(editing("src/main.rs", 1));

    assert!(tracker.compute_context_message(true, true).is_none());
}

#[test]
fn test_first_message_is_full_snapshot() {
    let mut tracker = EditorContextTracker::new();
    tracker.update_snapshot(editing("src/main.rs", 5));

    let part = tracker.compute_context_message(false, false).unwrap();
    let text = text_of(&part);
    assert!(text.contains("src/main.rs"));
    assert!(text.contains("notes.md"));
    assert!(text.contains("editor state, for context"));
}

#[test]
fn test_empty_editor_sends_nothing() {
    let mut tracker = EditorContextTracker::new();
    assert!(tracker.compute_context_message(true, false).is_none());
}

#[test]
fn test_unchanged_state_sends_nothing() {
    let mut tracker = EditorContextTracker::new();
    tracker.update_snapshot(editing("src/main.rs", 5));
    assert!(tracker.compute_context_message(false, false).is_some());

    // Same state again, no message and no state change.
    assert!(tracker.compute_context_message(false, false).is_none());
}

#[test]
fn test_cursor_move_produces_delta() {
    let mut tracker = EditorContextTracker::new();
    tracker.update_snapshot(editing("src/main.rs", 5));
    tracker.compute_context_message(false, false).unwrap();

    tracker.update_snapshot(editing("src/main.rs", 42));
    let part = tracker.compute_context_message(false, false).unwrap();
    let text = text_of(&part);
    assert!(text.contains("editor state changed"));
    assert!(text.contains("line 42"));
}

#[test]
fn test_active_file_change_produces_delta() {
    let mut tracker = EditorContextTracker::new();
    tracker.update_snapshot(editing("src/main.rs", 5));
    tracker.compute_context_message(false, false).unwrap();

    tracker.update_snapshot(editing("src/parser.rs", 1));
    let part = tracker.compute_context_message(false, false).unwrap();
    let text = text_of(&part);
    assert!(text.contains("Active file is now src/parser.rs"));
    assert!(text.contains("Closed files: src/main.rs"));
    assert!(text.contains("Opened files: src/parser.rs"));
}

#[test]
fn test_selection_change_produces_delta() {
    let mut tracker = EditorContextTracker::new();
    let mut snapshot = editing("src/main.rs", 5);
    tracker.update_snapshot(snapshot.clone());
    tracker.compute_context_message(false, false).unwrap();

    if let Some(active) = &mut snapshot.active_file {
        active.selected_text = Some("let x = 1;".to_string());
    }
    tracker.update_snapshot(snapshot);
    let part = tracker.compute_context_message(false, false).unwrap();
    assert!(text_of(&part).contains("let x = 1;"));
}

#[test]
fn test_empty_transcript_forces_full_resend() {
    let mut tracker = EditorContextTracker::new();
    tracker.update_snapshot(editing("src/main.rs", 5));
    tracker.compute_context_message(false, false).unwrap();

    // History was cleared; the stored snapshot must be discarded even
    // though nothing in the editor changed.
    let part = tracker.compute_context_message(true, false).unwrap();
    assert!(text_of(&part).contains("editor state, for context"));
}
