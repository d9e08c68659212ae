//! Transcript storage and message construction.
//!
//! This crate owns the chat transcript abstraction used by the session
//! loop: the [`ChatSession`] trait with an in-memory implementation,
//! factory functions for the synthetic messages the loop injects, and
//! guards for inspecting transcript content.

pub mod content_guards;
pub mod factory;
pub mod session;

pub use content_guards::estimate_request_tokens;
pub use content_guards::has_pending_function_call;
pub use content_guards::is_valid_split_content;
pub use content_guards::serialized_size;
pub use factory::continuation_message;
pub use factory::environment_priming_pair;
pub use factory::summary_pair;
pub use session::ChatSession;
pub use session::InMemoryChatSession;
