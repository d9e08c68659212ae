//! Configuration for the session orchestrator turn loop.

use serde::Deserialize;
use serde::Serialize;

/// Hard cap on continuation recursions for a single top-level call.
///
/// Independent of any caller-supplied turn budget; callers cannot raise it.
pub const MAX_RECURSION_TURNS: i32 = 100;

/// Safety margin applied to the remaining context budget before a turn.
pub const DEFAULT_OVERFLOW_SAFETY_MARGIN: f64 = 0.95;

/// Automatic retries for a malformed response stream.
pub const DEFAULT_INVALID_STREAM_RETRIES: i32 = 1;

/// Configuration for the session orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum number of turns before the session stops accepting work.
    ///
    /// `None` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_session_turns: Option<i32>,

    /// Model used while the session is in fallback mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_model: Option<String>,

    /// Automatic retries when the transport reports a malformed stream.
    #[serde(default = "default_invalid_stream_retries")]
    pub invalid_stream_retries: i32,

    /// Continue with a synthetic message when the next-speaker check is
    /// inconclusive.
    #[serde(default)]
    pub continue_on_inconclusive: bool,

    /// Fraction of the remaining context budget a request may fill before
    /// the turn is refused.
    #[serde(default = "default_overflow_safety_margin")]
    pub overflow_safety_margin: f64,
}

fn default_invalid_stream_retries() -> i32 {
    DEFAULT_INVALID_STREAM_RETRIES
}

fn default_overflow_safety_margin() -> f64 {
    DEFAULT_OVERFLOW_SAFETY_MARGIN
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_session_turns: None,
            fallback_model: None,
            invalid_stream_retries: default_invalid_stream_retries(),
            continue_on_inconclusive: false,
            overflow_safety_margin: default_overflow_safety_margin(),
        }
    }
}

impl SessionConfig {
    /// Clamp a caller-supplied turn budget to the hard recursion cap.
    pub fn bounded_turns(&self, requested: i32) -> i32 {
        requested.clamp(0, MAX_RECURSION_TURNS)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(max) = self.max_session_turns {
            if max <= 0 {
                return Err(format!("max_session_turns must be positive, got {max}"));
            }
        }
        if self.invalid_stream_retries < 0 {
            return Err(format!(
                "invalid_stream_retries must be non-negative, got {}",
                self.invalid_stream_retries
            ));
        }
        if !(0.0..=1.0).contains(&self.overflow_safety_margin) {
            return Err(format!(
                "overflow_safety_margin must be in [0.0, 1.0], got {}",
                self.overflow_safety_margin
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "session_config.test.rs"]
mod tests;
