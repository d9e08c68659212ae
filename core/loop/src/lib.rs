//! Session loop driver for multi-turn conversations with LLM providers.
//!
//! The [`SessionOrchestrator`] runs a bounded turn loop over an injected
//! model transport: it compresses the transcript when it nears the
//! context limit, refuses requests that would overflow, keeps model
//! selection sticky per prompt sequence, aborts on detected repetition,
//! and recurses with a synthetic continuation when a heuristic says the
//! model should keep going.

mod compression;
mod driver;
pub mod error;
mod result;
mod sequence;
mod traits;

pub use compression::{CompressionState, HistoryCompressor, find_split_point};
pub use driver::{SessionOrchestrator, SessionOrchestratorBuilder};
pub use error::{LoopError, Result};
pub use result::{SessionResult, StopReason};
pub use sequence::SequenceState;
pub use traits::{
    ContextInjector, LoopDetector, ModelRouter, ModelTransport, NextSpeaker, NextSpeakerChecker,
    NextSpeakerDecision, RoutingDecision, TokenCounter,
};

// Re-export the protocol types callers need to drive a session.
pub use lumen_protocol::{
    CompressionConfig, CompressionOutcome, CompressionStatus, Content, Part, Role, SessionConfig,
    SessionEvent, TurnEvent,
};
