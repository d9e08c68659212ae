use pretty_assertions::assert_eq;

use super::*;

fn snapshot() -> IdeSnapshot {
    IdeSnapshot {
        active_file: Some(ActiveFile {
            path: "src/main.rs".to_string(),
            cursor: Some(CursorPosition {
                line: 10,
                character: 4,
            }),
            selected_text: Some("fn main".to_string()),
        }),
        other_open_files: vec!["src/lib.rs".to_string(), "Cargo.toml".to_string()],
    }
}

#[test]
fn test_is_empty() {
    assert!(IdeSnapshot::default().is_empty());
    assert!(!snapshot().is_empty());
}

#[test]
fn test_open_paths_active_first() {
    let snapshot = snapshot();
    let paths = snapshot.open_paths();
    assert_eq!(paths, vec!["src/main.rs", "src/lib.rs", "Cargo.toml"]);
}

#[test]
fn test_serde_omits_absent_fields() {
    let snapshot = IdeSnapshot {
        active_file: Some(ActiveFile {
            path: "a.rs".to_string(),
            cursor: None,
            selected_text: None,
        }),
        other_open_files: Vec::new(),
    };
    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(!json.contains("cursor"));
    assert!(!json.contains("selected_text"));

    let back: IdeSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snapshot);
}
