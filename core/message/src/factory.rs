//! Factory functions for the synthetic messages the session loop
//! injects into the transcript.

use lumen_protocol::Content;

/// Instruction sent to the model when the next-speaker heuristic says
/// the model should keep going.
pub const CONTINUATION_PROMPT: &str = "Please continue.";

const PRIMING_PROMPT: &str = "The conversation so far has been summarized to free up \
context. Treat the following summary as the authoritative record of prior work and \
continue from where it left off.";

const PRIMING_ACK: &str = "Understood. I will treat the summary as the prior \
conversation and continue from there.";

const SUMMARY_ACK: &str = "Got it. Resuming from the summarized state.";

/// Create the synthetic user message used to drive a continuation turn.
pub fn continuation_message() -> Content {
    Content::user_text(CONTINUATION_PROMPT)
}

/// Create the environment-priming pair placed at the head of a
/// compressed transcript.
pub fn environment_priming_pair() -> [Content; 2] {
    [Content::user_text(PRIMING_PROMPT), Content::model_text(PRIMING_ACK)]
}

/// Create the summary pair that replaces the compressed head of the
/// transcript.
pub fn summary_pair(summary: impl Into<String>) -> [Content; 2] {
    let wrapped = format!(
        "<compaction_summary>\n{}\n</compaction_summary>",
        summary.into()
    );
    [Content::user_text(wrapped), Content::model_text(SUMMARY_ACK)]
}

#[cfg(test)]
#[path = "factory.test.rs"]
mod tests;
