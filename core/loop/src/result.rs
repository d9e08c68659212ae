use lumen_protocol::FunctionCall;
use lumen_protocol::TokenUsage;
use serde::Deserialize;
use serde::Serialize;

/// Describes why a session run stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StopReason {
    /// The model finished and the next-speaker check handed control back
    /// to the user, or a pending tool call awaits resolution.
    Done,

    /// The configured per-session turn limit was reached.
    MaxSessionTurns,

    /// The continuation recursion budget was exhausted.
    MaxRecursionTurns,

    /// The loop detector aborted the run.
    LoopDetected,

    /// The run terminated due to an error.
    Error {
        /// Human-readable error description.
        message: String,
    },

    /// The caller cancelled the run.
    Cancelled,
}

/// Aggregate result of a completed session run.
///
/// Carries the final turn's output so the caller can inspect pending
/// tool calls and decide whether to re-invoke with their responses.
#[derive(Debug, Clone)]
pub struct SessionResult {
    /// The reason the run stopped.
    pub stop_reason: StopReason,

    /// Total number of turns completed across the run.
    pub turns_completed: i32,

    /// Estimated cumulative token usage.
    pub usage: TokenUsage,

    /// Text produced by the final turn.
    pub final_text: String,

    /// Tool calls the final turn left unresolved.
    pub pending_calls: Vec<FunctionCall>,
}

impl SessionResult {
    /// Create a result for a normally completed run.
    pub fn done(
        turns: i32,
        usage: TokenUsage,
        final_text: String,
        pending_calls: Vec<FunctionCall>,
    ) -> Self {
        Self {
            stop_reason: StopReason::Done,
            turns_completed: turns,
            usage,
            final_text,
            pending_calls,
        }
    }

    /// Create a result for the session turn limit.
    pub fn max_session_turns(turns: i32, usage: TokenUsage) -> Self {
        Self {
            stop_reason: StopReason::MaxSessionTurns,
            turns_completed: turns,
            usage,
            final_text: String::new(),
            pending_calls: Vec::new(),
        }
    }

    /// Create a result for an exhausted recursion budget.
    pub fn max_recursion_turns(turns: i32, usage: TokenUsage) -> Self {
        Self {
            stop_reason: StopReason::MaxRecursionTurns,
            turns_completed: turns,
            usage,
            final_text: String::new(),
            pending_calls: Vec::new(),
        }
    }

    /// Create a result for a detected repetition loop.
    pub fn loop_detected(turns: i32, usage: TokenUsage) -> Self {
        Self {
            stop_reason: StopReason::LoopDetected,
            turns_completed: turns,
            usage,
            final_text: String::new(),
            pending_calls: Vec::new(),
        }
    }

    /// Create a result for an error.
    pub fn error(turns: i32, usage: TokenUsage, message: impl Into<String>) -> Self {
        Self {
            stop_reason: StopReason::Error {
                message: message.into(),
            },
            turns_completed: turns,
            usage,
            final_text: String::new(),
            pending_calls: Vec::new(),
        }
    }

    /// Create a result for caller cancellation.
    pub fn cancelled(turns: i32, usage: TokenUsage, final_text: String) -> Self {
        Self {
            stop_reason: StopReason::Cancelled,
            turns_completed: turns,
            usage,
            final_text,
            pending_calls: Vec::new(),
        }
    }

    /// Whether the final turn left tool calls awaiting resolution.
    pub fn has_pending_calls(&self) -> bool {
        !self.pending_calls.is_empty()
    }
}

#[cfg(test)]
#[path = "result.test.rs"]
mod tests;
