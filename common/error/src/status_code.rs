//! Workspace-wide status codes.
//!
//! A status code is a five digit value XX_YYY: the leading pair selects
//! a category block, the trailing triple the code inside it. Every code
//! carries retry and logging metadata so callers can classify a failure
//! without matching on the concrete error type that produced it.
//!
//! Blocks in use: 00 success, 01 common, 02 input, 04 network,
//! 10 config, 11 model, 12 resource limits.

use strum::AsRefStr;
use strum::EnumIter;
use strum::FromRepr;

/// Behavior attached to a status code.
#[derive(Debug, Clone, Copy)]
pub struct StatusMeta {
    pub retryable: bool,
    pub log_error: bool,
    pub category: StatusCategory,
}

/// The category block a code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    /// 00_xxx.
    Success,
    /// 01_xxx, internal and uncategorized failures.
    Common,
    /// 02_xxx, caller-supplied input.
    Input,
    /// 04_xxx, transport and connectivity.
    Network,
    /// 10_xxx, configuration.
    Config,
    /// 11_xxx, model selection, streaming, and token accounting.
    Model,
    /// 12_xxx, rate and resource limits.
    Resource,
}

impl StatusCategory {
    /// The XX_YYY range this block occupies.
    pub const fn value_range(&self) -> std::ops::Range<i32> {
        match self {
            Self::Success => 0..1_000,
            Self::Common => 01_000..02_000,
            Self::Input => 02_000..03_000,
            Self::Network => 04_000..05_000,
            Self::Config => 10_000..11_000,
            Self::Model => 11_000..12_000,
            Self::Resource => 12_000..13_000,
        }
    }
}

macro_rules! status_code_table {
    ($(
        $category:ident {
            $(
                $(#[$doc:meta])*
                $name:ident = $value:literal, retry = $retry:literal, log = $log:literal;
            )+
        }
    )+) => {
        /// Five digit status codes, grouped by category block.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumIter, FromRepr)]
        #[repr(i32)]
        pub enum StatusCode {
            $($(
                $(#[$doc])*
                $name = $value,
            )+)+
        }

        impl StatusCode {
            /// Metadata for this code.
            pub const fn meta(&self) -> StatusMeta {
                match self {
                    $($(
                        Self::$name => StatusMeta {
                            retryable: $retry,
                            log_error: $log,
                            category: StatusCategory::$category,
                        },
                    )+)+
                }
            }

            /// The variant name as written.
            pub const fn name(&self) -> &'static str {
                match self {
                    $($(Self::$name => stringify!($name),)+)+
                }
            }
        }
    };
}

status_code_table! {
    Success {
        /// The operation completed.
        Success = 00_000, retry = false, log = false;
    }
    Common {
        /// Unclassified failure.
        Unknown = 01_000, retry = false, log = true;
        /// A bug, not an environment problem.
        Internal = 01_001, retry = true, log = true;
        /// The operation was cancelled by its caller.
        Cancelled = 01_002, retry = false, log = false;
    }
    Input {
        /// An argument failed validation.
        InvalidArguments = 02_000, retry = false, log = false;
        /// A payload could not be parsed.
        ParseError = 02_001, retry = false, log = false;
    }
    Network {
        /// The model transport failed.
        TransportError = 04_000, retry = true, log = false;
        /// The provider endpoint is unreachable.
        ServiceUnavailable = 04_001, retry = true, log = false;
    }
    Config {
        /// Configuration failed validation.
        InvalidConfig = 10_000, retry = false, log = false;
    }
    Model {
        /// No such model.
        ModelNotFound = 11_000, retry = false, log = false;
        /// The request does not fit the model's context window.
        ContextWindowExceeded = 11_001, retry = false, log = false;
        /// The response stream was malformed or truncated.
        StreamInvalid = 11_002, retry = true, log = true;
        /// The model, or its router, returned an error.
        ModelError = 11_003, retry = false, log = true;
        /// The token counting backend failed.
        TokenCountingFailure = 11_004, retry = true, log = false;
        /// Transcript compression failed.
        CompressionFailed = 11_005, retry = false, log = false;
    }
    Resource {
        /// The provider rate limited the request.
        RateLimited = 12_000, retry = true, log = false;
        /// The request took too long.
        Timeout = 12_001, retry = true, log = false;
    }
}

impl StatusCode {
    /// Returns true if `code` is the success value.
    pub fn is_success(code: i32) -> bool {
        Self::Success as i32 == code
    }

    /// Whether the operation that produced this code may be retried.
    pub const fn is_retryable(&self) -> bool {
        self.meta().retryable
    }

    /// Whether this code should be logged at error level.
    pub const fn should_log_error(&self) -> bool {
        self.meta().log_error
    }

    /// The category block this code belongs to.
    pub const fn category(&self) -> StatusCategory {
        self.meta().category
    }

    /// Look a code up by its numeric value.
    pub fn from_i32(value: i32) -> Option<Self> {
        Self::from_repr(value)
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
#[path = "status_code.test.rs"]
mod tests;
