//! Editor context message computation.

use lumen_loop::ContextInjector;
use lumen_protocol::Part;
use tracing::debug;

use crate::snapshot::IdeSnapshot;

/// Computes editor context messages for the session loop.
///
/// The tracker remembers the last snapshot it handed out so later
/// messages can be structural deltas instead of full resends. The
/// remembered snapshot is discarded when the transcript empties, which
/// forces the next message to be a full snapshot again.
#[derive(Debug, Default)]
pub struct EditorContextTracker {
    current: IdeSnapshot,
    last_sent: Option<IdeSnapshot>,
}

impl EditorContextTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest editor state reported by the IDE integration.
    pub fn update_snapshot(&mut self, snapshot: IdeSnapshot) {
        self.current = snapshot;
    }

    /// The latest editor state.
    pub fn current_snapshot(&self) -> &IdeSnapshot {
        &self.current
    }

    /// Compute the context part to attach to the next user request.
    ///
    /// Returns nothing while a tool call is outstanding (the next
    /// request must lead with the tool response), a full JSON snapshot
    /// when none was sent yet or the transcript was reset, and a delta
    /// when the editor state changed since the last send. An unchanged
    /// state produces nothing and leaves the stored snapshot alone.
    pub fn compute_context_message(
        &mut self,
        transcript_is_empty: bool,
        has_pending_tool_call: bool,
    ) -> Option<Part> {
        if has_pending_tool_call {
            return None;
        }

        if transcript_is_empty {
            self.last_sent = None;
        }

        let Some(last) = &self.last_sent else {
            if self.current.is_empty() {
                return None;
            }
            return self.full_snapshot_message();
        };

        let delta = describe_delta(last, &self.current);
        if delta.is_empty() {
            return None;
        }

        debug!(changes = delta.len(), "Editor context changed");
        self.last_sent = Some(self.current.clone());
        Some(Part::text(format!(
            "The user's editor state changed:\n{}",
            delta.join("\n")
        )))
    }

    fn full_snapshot_message(&mut self) -> Option<Part> {
        let json = serde_json::to_string_pretty(&self.current).ok()?;
        self.last_sent = Some(self.current.clone());
        Some(Part::text(format!(
            "The user's editor state, for context:\n{json}"
        )))
    }
}

impl ContextInjector for EditorContextTracker {
    fn context_message(&mut self, transcript_is_empty: bool) -> Option<Part> {
        // The session loop only asks when no tool call is pending.
        self.compute_context_message(transcript_is_empty, false)
    }
}

/// Describe the structural differences between two snapshots, one line
/// per change. An empty result means nothing changed.
fn describe_delta(last: &IdeSnapshot, current: &IdeSnapshot) -> Vec<String> {
    let mut changes = Vec::new();

    let last_open = last.open_paths();
    let current_open = current.open_paths();

    let closed: Vec<&str> = last_open
        .iter()
        .filter(|p| !current_open.contains(p))
        .copied()
        .collect();
    if !closed.is_empty() {
        changes.push(format!("Closed files: {}", closed.join(", ")));
    }

    let opened: Vec<&str> = current_open
        .iter()
        .filter(|p| !last_open.contains(p))
        .copied()
        .collect();
    if !opened.is_empty() {
        changes.push(format!("Opened files: {}", opened.join(", ")));
    }

    match (&last.active_file, &current.active_file) {
        (Some(prev), Some(cur)) if prev.path == cur.path => {
            if prev.cursor != cur.cursor {
                if let Some(cursor) = &cur.cursor {
                    changes.push(format!(
                        "Cursor in {} moved to line {}, character {}",
                        cur.path, cursor.line, cursor.character
                    ));
                }
            }
            if prev.selected_text != cur.selected_text {
                match &cur.selected_text {
                    Some(text) => changes.push(format!(
                        "Selection in {} is now: {text}",
                        cur.path
                    )),
                    None => changes.push(format!("Selection in {} was cleared", cur.path)),
                }
            }
        }
        (Some(_), Some(cur)) => {
            changes.push(format!("Active file is now {}", cur.path));
        }
        (None, Some(cur)) => {
            changes.push(format!("Active file is now {}", cur.path));
        }
        (Some(_), None) => {
            changes.push("No file is active".to_string());
        }
        (None, None) => {}
    }

    changes
}

#[cfg(test)]
#[path = "tracker.test.rs"]
mod tests;
