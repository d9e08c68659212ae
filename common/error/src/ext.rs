//! Extension trait connecting error types to the status code table.

use std::any::Any;

use crate::status_code::StatusCode;

/// Extension trait implemented by every crate-level error enum.
pub trait ErrorExt: std::error::Error {
    /// The status code this error maps to.
    fn status_code(&self) -> StatusCode;

    /// Downcast support for error inspection across crate boundaries.
    fn as_any(&self) -> &dyn Any;

    /// Whether the operation that produced this error may be retried.
    fn is_retryable(&self) -> bool {
        self.status_code().is_retryable()
    }

    /// Whether this error should be logged at error level.
    fn should_log_error(&self) -> bool {
        self.status_code().should_log_error()
    }

    /// Message safe to surface to the end user.
    ///
    /// Errors flagged `log_error` are internal; their details go to the log
    /// and the user sees only the numeric code.
    fn output_msg(&self) -> String {
        let code = self.status_code();
        if code.should_log_error() {
            format!("Internal error: {}", code as i32)
        } else {
            self.to_string()
        }
    }
}

/// A minimal error carrying just a message and a status code.
#[derive(Debug)]
pub struct PlainError {
    msg: String,
    code: StatusCode,
}

impl PlainError {
    pub fn new(msg: impl Into<String>, code: StatusCode) -> Self {
        Self {
            msg: msg.into(),
            code,
        }
    }
}

impl std::fmt::Display for PlainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl std::error::Error for PlainError {}

impl ErrorExt for PlainError {
    fn status_code(&self) -> StatusCode {
        self.code
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An external error wrapped with a status code.
#[derive(Debug)]
pub struct BoxedError {
    source: Box<dyn std::error::Error + Send + Sync>,
    code: StatusCode,
}

impl std::fmt::Display for BoxedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl std::error::Error for BoxedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl ErrorExt for BoxedError {
    fn status_code(&self) -> StatusCode {
        self.code
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Wrap an external error with a status code.
pub fn boxed<E>(source: E, code: StatusCode) -> BoxedError
where
    E: std::error::Error + Send + Sync + 'static,
{
    BoxedError {
        source: Box::new(source),
        code,
    }
}

#[cfg(test)]
#[path = "ext.test.rs"]
mod tests;
