//! Error types for the session loop.

use lumen_error::ErrorExt;
use lumen_error::Location;
use lumen_error::StatusCode;
use snafu::Snafu;

/// Session loop errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module)]
pub enum LoopError {
    /// Retain fraction outside the open interval (0, 1).
    #[snafu(display("Retain fraction {fraction} is out of range, must be in (0, 1)"))]
    InvalidRetainFraction {
        fraction: f64,
        #[snafu(implicit)]
        location: Location,
    },

    /// Session configuration failed validation.
    #[snafu(display("Invalid session config: {reason}"))]
    InvalidConfig {
        reason: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// The model transport failed to start or service a turn.
    #[snafu(display("Model transport failed: {message}"))]
    Transport {
        message: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// The token counting backend failed.
    #[snafu(display("Token counting failed: {message}"))]
    TokenCounting {
        message: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// The model router failed to pick a model.
    #[snafu(display("Model routing failed: {message}"))]
    Routing {
        message: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// The summary turn for compression produced no text.
    #[snafu(display("Compression summary request produced no content"))]
    EmptySummary {
        #[snafu(implicit)]
        location: Location,
    },
}

impl LoopError {
    /// Wrap a transport failure message.
    pub fn transport(message: impl Into<String>) -> Self {
        loop_error::TransportSnafu {
            message: message.into(),
        }
        .build()
    }

    /// Wrap a token counting failure message.
    pub fn token_counting(message: impl Into<String>) -> Self {
        loop_error::TokenCountingSnafu {
            message: message.into(),
        }
        .build()
    }

    /// Wrap a routing failure message.
    pub fn routing(message: impl Into<String>) -> Self {
        loop_error::RoutingSnafu {
            message: message.into(),
        }
        .build()
    }
}

impl ErrorExt for LoopError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRetainFraction { .. } | Self::InvalidConfig { .. } => {
                StatusCode::InvalidArguments
            }
            Self::Transport { .. } => StatusCode::TransportError,
            Self::TokenCounting { .. } => StatusCode::TokenCountingFailure,
            Self::Routing { .. } => StatusCode::ModelError,
            Self::EmptySummary { .. } => StatusCode::CompressionFailed,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub type Result<T, E = LoopError> = std::result::Result<T, E>;

#[cfg(test)]
#[path = "error.test.rs"]
mod tests;
