//! Protocol types for the lumen session orchestrator.
//!
//! This crate provides the foundational types shared across the lumen
//! ecosystem:
//! - Transcript content and part unions
//! - Turn/session event enums
//! - Compression outcome and configuration
//! - Session configuration and model token limits

pub mod compression;
pub mod event;
pub mod model;
pub mod part;
pub mod session_config;

pub use compression::CompressionConfig;
pub use compression::CompressionOutcome;
pub use compression::CompressionStatus;
pub use event::SessionError;
pub use event::SessionEvent;
pub use event::TokenUsage;
pub use event::TurnEvent;
pub use model::DEFAULT_TOKEN_LIMIT;
pub use model::ModelSpec;
pub use model::TokenLimitTable;
pub use part::Content;
pub use part::FunctionCall;
pub use part::FunctionResponse;
pub use part::Part;
pub use part::Role;
pub use session_config::MAX_RECURSION_TURNS;
pub use session_config::SessionConfig;
