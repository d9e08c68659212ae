//! Guards and measurements over transcript content.
//!
//! These utilities classify transcript items for the compression split
//! search and estimate request sizes for the overflow guard.

use lumen_protocol::Content;

/// Bytes of serialized JSON assumed to correspond to one token.
pub const BYTES_PER_TOKEN: usize = 4;

/// Check whether a transcript item is a safe place to start the
/// retained tail of a compressed history.
///
/// Splitting is only allowed at a user item that carries no function
/// response, so a tool call and its response are never separated.
pub fn is_valid_split_content(content: &Content) -> bool {
    content.is_user() && !content.has_function_response()
}

/// Check whether the last transcript item left a function call
/// unanswered.
pub fn has_pending_function_call(history: &[Content]) -> bool {
    history.last().is_some_and(Content::has_function_call)
}

/// Serialized size of a single transcript item in bytes.
///
/// Items that fail to serialize count as zero; they contribute nothing
/// to the split-point walk.
pub fn serialized_size(content: &Content) -> usize {
    serde_json::to_string(content).map_or(0, |s| s.len())
}

/// Cheap local token estimate for a prospective request.
///
/// Uses the serialized byte size divided by [`BYTES_PER_TOKEN`]. This
/// deliberately avoids a model call so the overflow guard adds no
/// latency.
pub fn estimate_request_tokens(contents: &[Content]) -> i64 {
    let bytes: usize = contents.iter().map(serialized_size).sum();
    (bytes / BYTES_PER_TOKEN) as i64
}

#[cfg(test)]
#[path = "content_guards.test.rs"]
mod tests;
