//! Collaborator contracts consumed by the session orchestrator.
//!
//! The orchestrator is deliberately ignorant of providers, routing
//! policies, and repetition heuristics; each concern is injected
//! through one of these traits.

use async_trait::async_trait;
use lumen_protocol::Content;
use lumen_protocol::TurnEvent;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Streaming access to a model provider.
#[async_trait]
pub trait ModelTransport: Send + Sync {
    /// Start one model turn.
    ///
    /// Events arrive on the returned channel in the order the provider
    /// produced them; the channel closes when the call completes or the
    /// token is cancelled. A stream is not restartable, a retry needs a
    /// fresh call.
    async fn stream_turn(
        &self,
        model: &str,
        request: Vec<Content>,
        cancel_token: CancellationToken,
    ) -> Result<mpsc::Receiver<TurnEvent>>;
}

/// Token accounting for a transcript against a specific model.
#[async_trait]
pub trait TokenCounter: Send + Sync {
    /// Count the prompt tokens `contents` would occupy for `model`.
    async fn count_tokens(&self, model: &str, contents: &[Content]) -> Result<i64>;
}

/// Picks a model for the first turn of a prompt sequence.
#[async_trait]
pub trait ModelRouter: Send + Sync {
    /// Choose a model for the given prompt sequence and transcript.
    async fn route(&self, prompt_id: &str, history: &[Content]) -> Result<RoutingDecision>;
}

/// A routing choice with its rationale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// The chosen model.
    pub model: String,
    /// Why the router picked it.
    pub reason: String,
}

impl RoutingDecision {
    pub fn new(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            reason: reason.into(),
        }
    }
}

/// Detects degenerate repetition in model output.
///
/// Both methods are synchronous; the orchestrator calls them inline
/// while consuming the stream, so implementations must be cheap.
pub trait LoopDetector: Send {
    /// Pre-turn check against accumulated history.
    ///
    /// Returns `true` when the session is already looping and the turn
    /// should not start.
    fn turn_started(&mut self) -> bool;

    /// Mid-stream check; returns `true` when the event completes a
    /// repetition pattern and the turn should be aborted.
    fn add_and_check(&mut self, event: &TurnEvent) -> bool;

    /// Clear accumulated state for a new prompt sequence.
    fn reset(&mut self);
}

/// Decides whether the model should keep talking after a completed turn.
#[async_trait]
pub trait NextSpeakerChecker: Send + Sync {
    /// Inspect the transcript and name the next speaker.
    ///
    /// `None` means the heuristic could not decide.
    async fn check(&self, history: &[Content]) -> Result<Option<NextSpeakerDecision>>;
}

/// Who should produce the next message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextSpeaker {
    User,
    Model,
}

/// A next-speaker verdict with its rationale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextSpeakerDecision {
    /// Who talks next.
    pub next_speaker: NextSpeaker,
    /// Why the heuristic decided so.
    pub reasoning: String,
}

/// Supplies an out-of-band context part to prepend to a user request.
///
/// Implemented by the editor-context tracker; the orchestrator only
/// asks when no tool call is pending.
pub trait ContextInjector: Send {
    /// Compute the context part for the next request, if any.
    fn context_message(&mut self, transcript_is_empty: bool) -> Option<lumen_protocol::Part>;
}
