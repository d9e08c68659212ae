//! Transcript content types.
//!
//! A transcript is an ordered sequence of [`Content`] items, each carrying an
//! ordered sequence of [`Part`]s. These types mirror the wire shape of the
//! model API closely enough that a serialized `Content` is a usable proxy for
//! its token cost.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Who produced a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The user (including synthetic continuation messages and tool results).
    User,
    /// The model.
    Model,
}

impl Role {
    /// Get the role as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Identifier correlating this call with its response.
    pub call_id: String,
    /// Tool name.
    pub name: String,
    /// Tool arguments (JSON).
    #[serde(default)]
    pub args: Value,
}

/// The response to a previously requested function call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    /// Identifier of the call this responds to.
    pub call_id: String,
    /// Tool name.
    pub name: String,
    /// Tool output (JSON).
    #[serde(default)]
    pub response: Value,
}

/// One part of a content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// A function call requested by the model.
    FunctionCall(FunctionCall),
    /// The response to a function call, carried on the next user item.
    FunctionResponse(FunctionResponse),
    /// A reference to a file injected as context.
    FileReference {
        /// Path of the referenced file.
        path: String,
    },
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    /// Returns true if this part is a function call.
    pub fn is_function_call(&self) -> bool {
        matches!(self, Part::FunctionCall(_))
    }

    /// Returns true if this part is a function response.
    pub fn is_function_response(&self) -> bool {
        matches!(self, Part::FunctionResponse(_))
    }
}

/// One item of a transcript: a role plus its ordered parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Who produced this item.
    pub role: Role,
    /// The ordered parts.
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a content item.
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    /// Create a user item with a single text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    /// Create a model item with a single text part.
    pub fn model_text(text: impl Into<String>) -> Self {
        Self::new(Role::Model, vec![Part::text(text)])
    }

    /// Returns true if this item was produced by the user.
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Returns true if any part is a function response.
    pub fn has_function_response(&self) -> bool {
        self.parts.iter().any(Part::is_function_response)
    }

    /// Returns true if any part is a function call.
    pub fn has_function_call(&self) -> bool {
        self.parts.iter().any(Part::is_function_call)
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "part.test.rs"]
mod tests;
