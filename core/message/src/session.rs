//! Chat transcript storage.

use lumen_protocol::Content;

/// Owned view of a chat transcript.
///
/// The session loop reads the full history when building requests,
/// appends completed turns, and swaps the whole transcript when
/// compression succeeds.
pub trait ChatSession: Send {
    /// Snapshot of the current transcript, oldest first.
    fn get_history(&self) -> Vec<Content>;

    /// Replace the entire transcript.
    fn set_history(&mut self, history: Vec<Content>);

    /// Append one item to the transcript.
    fn add_history(&mut self, content: Content);

    /// Whether the transcript holds no items.
    fn is_empty(&self) -> bool {
        self.get_history().is_empty()
    }
}

/// In-memory transcript backed by a `Vec`.
#[derive(Debug, Default, Clone)]
pub struct InMemoryChatSession {
    history: Vec<Content>,
}

impl InMemoryChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing transcript.
    pub fn with_history(history: Vec<Content>) -> Self {
        Self { history }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }
}

impl ChatSession for InMemoryChatSession {
    fn get_history(&self) -> Vec<Content> {
        self.history.clone()
    }

    fn set_history(&mut self, history: Vec<Content>) {
        self.history = history;
    }

    fn add_history(&mut self, content: Content) {
        self.history.push(content);
    }

    fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

#[cfg(test)]
#[path = "session.test.rs"]
mod tests;
