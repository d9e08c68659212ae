//! Event types emitted by the session orchestrator.
//!
//! These events allow consumers to observe the progress of a session without
//! being coupled to implementation details.

use serde::Deserialize;
use serde::Serialize;

use crate::compression::CompressionOutcome;
use crate::part::FunctionCall;

/// Events produced by the model transport for a single turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Text content from the model.
    Content {
        /// The text.
        text: String,
    },
    /// Thinking content (for models that support thinking).
    Thought {
        /// The thought text.
        text: String,
    },
    /// The model requested a tool call.
    FunctionCallRequest {
        /// The requested call.
        call: FunctionCall,
    },
    /// The underlying call failed.
    Error {
        /// Error message from the transport.
        message: String,
    },
    /// The stream ended malformed or truncated; a fresh call may succeed.
    InvalidStream,
}

/// Events emitted to the orchestrator's caller.
///
/// Turn-level events are forwarded from the transport as they arrive;
/// session-level events report orchestration decisions (compression,
/// overflow refusals, loop detection, turn limits).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    // ========== Turn Lifecycle ==========
    /// A new turn has started.
    TurnStarted {
        /// Unique identifier for this turn.
        turn_id: String,
        /// Turn number within the session (1-indexed).
        turn_number: i32,
    },
    /// A turn has completed.
    TurnCompleted {
        /// Unique identifier for this turn.
        turn_id: String,
        /// Token usage for this turn.
        usage: TokenUsage,
    },

    // ========== Content Streaming ==========
    /// Text content from the model.
    Content {
        /// The text.
        text: String,
    },
    /// Thinking content from the model.
    Thought {
        /// The thought text.
        text: String,
    },
    /// The model requested a tool call.
    FunctionCallRequest {
        /// The requested call.
        call: FunctionCall,
    },

    // ========== Orchestration ==========
    /// History was compressed before this turn.
    ///
    /// Emitted only for a successful compression; skipped and failed
    /// attempts are not surfaced as events.
    ChatCompressed {
        /// The compression outcome.
        outcome: CompressionOutcome,
    },
    /// The next request would not fit the model's remaining context budget.
    ///
    /// The model was not invoked.
    ContextWindowWillOverflow {
        /// Estimated token size of the request.
        estimated_request_token_count: i32,
        /// Tokens remaining in the model's context budget.
        remaining_token_count: i32,
    },
    /// The configured session turn limit was reached.
    MaxSessionTurns,
    /// Degenerate repetition was detected and the turn was aborted.
    LoopDetected,
    /// A malformed stream was observed (after retries were exhausted).
    InvalidStream,

    // ========== Errors ==========
    /// The turn ended with an error.
    Error {
        /// The error.
        error: SessionError,
    },
}

/// Token usage information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens used.
    #[serde(default)]
    pub input_tokens: i64,
    /// Output tokens used.
    #[serde(default)]
    pub output_tokens: i64,
}

impl TokenUsage {
    /// Create a new TokenUsage.
    pub fn new(input_tokens: i64, output_tokens: i64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Get total tokens used.
    pub fn total(&self) -> i64 {
        self.input_tokens + self.output_tokens
    }

    /// Add another usage record into this one.
    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// An error surfaced to the caller as a terminal event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionError {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Whether the session remains usable for the next call.
    #[serde(default)]
    pub recoverable: bool,
}

impl SessionError {
    /// Create a recoverable transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: "TransportError".to_string(),
            message: message.into(),
            recoverable: true,
        }
    }

    /// Create a recoverable model/routing error.
    pub fn model(message: impl Into<String>) -> Self {
        Self {
            code: "ModelError".to_string(),
            message: message.into(),
            recoverable: true,
        }
    }
}

#[cfg(test)]
#[path = "event.test.rs"]
mod tests;
