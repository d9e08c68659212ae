//! Editor state snapshots.

use serde::Deserialize;
use serde::Serialize;

/// A cursor position within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
    /// 1-indexed line.
    pub line: u32,
    /// 1-indexed character within the line.
    pub character: u32,
}

/// The file the user is looking at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveFile {
    /// Workspace-relative or absolute path.
    pub path: String,
    /// Cursor position, when the editor reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<CursorPosition>,
    /// Selected text, when a selection exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
}

/// What the editor looks like at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeSnapshot {
    /// The focused file, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_file: Option<ActiveFile>,
    /// Other open files, in the editor's tab order.
    #[serde(default)]
    pub other_open_files: Vec<String>,
}

impl IdeSnapshot {
    /// Whether the snapshot carries any information at all.
    pub fn is_empty(&self) -> bool {
        self.active_file.is_none() && self.other_open_files.is_empty()
    }

    /// Every file path open in the editor, active file first.
    pub fn open_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = Vec::with_capacity(self.other_open_files.len() + 1);
        if let Some(active) = &self.active_file {
            paths.push(&active.path);
        }
        paths.extend(self.other_open_files.iter().map(String::as_str));
        paths
    }
}

#[cfg(test)]
#[path = "snapshot.test.rs"]
mod tests;
