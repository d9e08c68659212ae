//! History compression outcome and configuration.
//!
//! Compression replaces the oldest portion of a transcript with a model
//! generated summary once the token count crosses a fraction of the model's
//! context budget. All threshold constants are configurable through
//! [`CompressionConfig`].

use serde::Deserialize;
use serde::Serialize;

/// Fraction of the model's context budget at which compression triggers.
pub const DEFAULT_CONTEXT_PERCENTAGE_THRESHOLD: f64 = 0.7;

/// Fraction of the transcript retained verbatim after compression.
pub const DEFAULT_RETAIN_FRACTION: f64 = 0.3;

/// How a compression attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionStatus {
    /// The transcript was replaced with a summary plus retained tail.
    Compressed,
    /// Nothing was done (below threshold, empty history, or sticky failure).
    Noop,
    /// The summarized transcript counted larger than the original.
    FailedInflated,
    /// Token counting failed; the transcript was left untouched.
    FailedTokenError,
}

impl CompressionStatus {
    /// Get the status as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionStatus::Compressed => "compressed",
            CompressionStatus::Noop => "noop",
            CompressionStatus::FailedInflated => "failed_inflated",
            CompressionStatus::FailedTokenError => "failed_token_error",
        }
    }
}

impl std::fmt::Display for CompressionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one compression attempt. Never mutated after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionOutcome {
    /// How the attempt ended.
    pub status: CompressionStatus,
    /// Token count before the attempt.
    pub original_token_count: i32,
    /// Token count after the attempt (meaning depends on status).
    pub new_token_count: i32,
}

impl CompressionOutcome {
    /// A successful compression with before/after counts.
    pub fn compressed(original_token_count: i32, new_token_count: i32) -> Self {
        Self {
            status: CompressionStatus::Compressed,
            original_token_count,
            new_token_count,
        }
    }

    /// Nothing was done; both counts carry the current token count.
    pub fn noop(token_count: i32) -> Self {
        Self {
            status: CompressionStatus::Noop,
            original_token_count: token_count,
            new_token_count: token_count,
        }
    }

    /// The candidate transcript counted larger than the original.
    pub fn failed_inflated(original_token_count: i32, new_token_count: i32) -> Self {
        Self {
            status: CompressionStatus::FailedInflated,
            original_token_count,
            new_token_count,
        }
    }

    /// Token counting failed.
    pub fn failed_token_error(original_token_count: i32) -> Self {
        Self {
            status: CompressionStatus::FailedTokenError,
            original_token_count,
            new_token_count: 0,
        }
    }
}

/// Configuration for history compression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Context usage ratio (0.0 - 1.0) at which compression triggers.
    #[serde(default = "default_context_percentage_threshold")]
    pub context_percentage_threshold: f64,

    /// Fraction (0.0 - 1.0, exclusive) of the transcript retained verbatim.
    #[serde(default = "default_retain_fraction")]
    pub retain_fraction: f64,
}

fn default_context_percentage_threshold() -> f64 {
    DEFAULT_CONTEXT_PERCENTAGE_THRESHOLD
}

fn default_retain_fraction() -> f64 {
    DEFAULT_RETAIN_FRACTION
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            context_percentage_threshold: default_context_percentage_threshold(),
            retain_fraction: default_retain_fraction(),
        }
    }
}

impl CompressionConfig {
    /// Token count at which compression triggers for the given model limit.
    pub fn trigger_tokens(&self, model_limit: i64) -> i64 {
        (self.context_percentage_threshold * model_limit as f64) as i64
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.context_percentage_threshold) {
            return Err(format!(
                "context_percentage_threshold must be in [0.0, 1.0], got {}",
                self.context_percentage_threshold
            ));
        }
        if self.retain_fraction <= 0.0 || self.retain_fraction >= 1.0 {
            return Err(format!(
                "retain_fraction must be in (0.0, 1.0), got {}",
                self.retain_fraction
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "compression.test.rs"]
mod tests;
