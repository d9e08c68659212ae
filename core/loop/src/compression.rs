//! Transcript compression.
//!
//! When a transcript approaches the model's context limit, the head of
//! the history is replaced by a model-written summary while a recent
//! tail is retained verbatim. The split between head and tail is chosen
//! so that a tool call and its response are never separated.

use lumen_message::ChatSession;
use lumen_message::content_guards::is_valid_split_content;
use lumen_message::content_guards::serialized_size;
use lumen_message::factory::environment_priming_pair;
use lumen_message::factory::summary_pair;
use lumen_protocol::CompressionConfig;
use lumen_protocol::CompressionOutcome;
use lumen_protocol::Content;
use lumen_protocol::TurnEvent;
use snafu::ensure;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::Result;
use crate::error::loop_error;
use crate::traits::ModelTransport;
use crate::traits::TokenCounter;

/// Instructions for the summary turn that replaces the dropped head.
const SUMMARY_INSTRUCTIONS: &str = "Summarize the conversation above for your own \
future reference. Capture the user's goals, decisions made, work completed, open \
tasks, and any file paths or identifiers that later turns will need. Reply with \
the summary only.";

/// Mutable compression bookkeeping owned by the session.
#[derive(Debug, Default, Clone)]
pub struct CompressionState {
    /// Set after a non-forced attempt inflated the transcript; further
    /// non-forced attempts are skipped until a forced one succeeds.
    pub sticky_failure: bool,
    /// Prompt token count reported by the most recent successful
    /// compression or completed turn.
    pub last_prompt_tokens: i64,
}

/// Find the index where the retained tail of a compressed transcript
/// starts.
///
/// Walks the transcript accumulating serialized byte sizes and picks
/// the first item at or past `1 - retain_fraction` of the total that is
/// a safe boundary (a user item carrying no function response). If no
/// safe boundary exists at or past that point, the last safe boundary
/// before it is used. An index of 0 means nothing can be dropped.
pub fn find_split_point(history: &[Content], retain_fraction: f64) -> Result<usize> {
    ensure!(
        retain_fraction > 0.0 && retain_fraction < 1.0,
        loop_error::InvalidRetainFractionSnafu {
            fraction: retain_fraction
        }
    );

    if history.len() <= 1 {
        return Ok(0);
    }

    let sizes: Vec<usize> = history.iter().map(serialized_size).collect();
    let total: usize = sizes.iter().sum();
    let target = total as f64 * (1.0 - retain_fraction);

    let mut preceding_bytes = 0usize;
    let mut threshold_index = history.len();
    for (i, size) in sizes.iter().enumerate() {
        if preceding_bytes as f64 >= target {
            threshold_index = i;
            break;
        }
        preceding_bytes += size;
    }

    // First safe boundary at or past the threshold.
    for (i, content) in history.iter().enumerate().skip(threshold_index) {
        if is_valid_split_content(content) {
            return Ok(i);
        }
    }

    // None past the threshold, fall back to the last one before it.
    let before = history[..threshold_index.min(history.len())]
        .iter()
        .rposition(is_valid_split_content);

    Ok(before.unwrap_or(0))
}

/// Compresses transcripts via a model-written summary.
pub struct HistoryCompressor {
    transport: Arc<dyn ModelTransport>,
    token_counter: Arc<dyn TokenCounter>,
    config: CompressionConfig,
}

impl HistoryCompressor {
    pub fn new(
        transport: Arc<dyn ModelTransport>,
        token_counter: Arc<dyn TokenCounter>,
        config: CompressionConfig,
    ) -> Self {
        Self {
            transport,
            token_counter,
            config,
        }
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Attempt to compress the session transcript.
    ///
    /// Policy:
    /// - Non-forced attempts are skipped outright while the sticky
    ///   failure flag is set, and skipped with the current count while
    ///   the transcript is below the configured threshold.
    /// - The transcript is replaced only when the new count actually
    ///   shrank (or `force` is set). An inflated result sets the sticky
    ///   failure flag and leaves the transcript untouched.
    /// - Token counting failures report `FailedTokenError` and leave the
    ///   transcript untouched.
    pub async fn try_compress(
        &self,
        session: &mut dyn ChatSession,
        model: &str,
        model_limit: i64,
        force: bool,
        state: &mut CompressionState,
        cancel_token: &CancellationToken,
    ) -> Result<CompressionOutcome> {
        if state.sticky_failure && !force {
            debug!("Skipping compression, previous attempt failed");
            return Ok(CompressionOutcome::noop(0));
        }

        let history = session.get_history();
        if history.is_empty() {
            return Ok(CompressionOutcome::noop(0));
        }

        let original_count = match self.token_counter.count_tokens(model, &history).await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "Token counting failed before compression");
                return Ok(CompressionOutcome::failed_token_error(0));
            }
        };

        let trigger = self.config.trigger_tokens(model_limit);
        if !force && original_count <= trigger {
            debug!(original_count, trigger, "Below compression threshold");
            return Ok(CompressionOutcome::noop(original_count as i32));
        }

        let split = find_split_point(&history, self.config.retain_fraction)?;
        if split == 0 {
            debug!("No safe split point, nothing to drop");
            return Ok(CompressionOutcome::noop(original_count as i32));
        }

        let (head, tail) = history.split_at(split);
        let summary = self.summarize(model, head, cancel_token).await?;

        let mut replacement: Vec<Content> = Vec::with_capacity(tail.len() + 4);
        replacement.extend(environment_priming_pair());
        replacement.extend(summary_pair(summary));
        replacement.extend_from_slice(tail);

        let new_count = match self.token_counter.count_tokens(model, &replacement).await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "Token counting failed on compressed transcript");
                return Ok(CompressionOutcome::failed_token_error(original_count as i32));
            }
        };

        if !force && new_count >= original_count {
            warn!(
                original_count,
                new_count, "Compression inflated the transcript, keeping original"
            );
            state.sticky_failure = true;
            return Ok(CompressionOutcome::failed_inflated(
                original_count as i32,
                new_count as i32,
            ));
        }

        session.set_history(replacement);
        state.sticky_failure = false;
        state.last_prompt_tokens = new_count;

        info!(original_count, new_count, split, "Compressed transcript");
        Ok(CompressionOutcome::compressed(
            original_count as i32,
            new_count as i32,
        ))
    }

    /// Ask the model for a summary of the dropped head.
    async fn summarize(
        &self,
        model: &str,
        head: &[Content],
        cancel_token: &CancellationToken,
    ) -> Result<String> {
        let mut request: Vec<Content> = head.to_vec();
        request.push(Content::user_text(SUMMARY_INSTRUCTIONS));

        let mut rx = self
            .transport
            .stream_turn(model, request, cancel_token.child_token())
            .await?;

        let mut summary = String::new();
        while let Some(event) = rx.recv().await {
            match event {
                TurnEvent::Content { text } => summary.push_str(&text),
                TurnEvent::Error { message } => {
                    return loop_error::TransportSnafu { message }.fail();
                }
                _ => {}
            }
        }

        ensure!(!summary.trim().is_empty(), loop_error::EmptySummarySnafu);
        Ok(summary)
    }
}

#[cfg(test)]
#[path = "compression.test.rs"]
mod tests;
