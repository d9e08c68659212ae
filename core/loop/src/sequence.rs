//! Per-sequence model selection state.

use lumen_protocol::Content;
use tracing::debug;

use crate::error::Result;
use crate::traits::ModelRouter;

/// Sticky model state for one logical prompt sequence.
///
/// The router runs at most once per sequence; its choice (or the
/// fallback model, when fallback mode was active at sequence start) is
/// reused for every subsequent turn of the sequence, even if fallback
/// mode toggles mid-flight. A new prompt id starts a fresh sequence.
pub struct SequenceState {
    prompt_id: String,
    use_fallback: bool,
    resolved_model: Option<String>,
}

impl SequenceState {
    /// Start a new sequence, capturing the fallback flag as observed now.
    pub fn new(prompt_id: impl Into<String>, use_fallback: bool) -> Self {
        Self {
            prompt_id: prompt_id.into(),
            use_fallback,
            resolved_model: None,
        }
    }

    /// The prompt id this sequence is bound to.
    pub fn prompt_id(&self) -> &str {
        &self.prompt_id
    }

    /// Whether this sequence runs on the fallback model.
    pub fn in_fallback_mode(&self) -> bool {
        self.use_fallback
    }

    /// Resolve the model for the next turn of this sequence.
    ///
    /// The first call routes (or picks the fallback model); later calls
    /// return the sticky choice without touching the router.
    pub async fn resolve_model(
        &mut self,
        router: &dyn ModelRouter,
        fallback_model: Option<&str>,
        history: &[Content],
    ) -> Result<String> {
        if let Some(model) = &self.resolved_model {
            return Ok(model.clone());
        }

        let model = match (self.use_fallback, fallback_model) {
            (true, Some(fallback)) => {
                debug!(
                    prompt_id = %self.prompt_id,
                    model = fallback,
                    "Fallback mode active, skipping router"
                );
                fallback.to_string()
            }
            _ => {
                let decision = router.route(&self.prompt_id, history).await?;
                debug!(
                    prompt_id = %self.prompt_id,
                    model = %decision.model,
                    reason = %decision.reason,
                    "Router selected model"
                );
                decision.model
            }
        };

        self.resolved_model = Some(model.clone());
        Ok(model)
    }
}

#[cfg(test)]
#[path = "sequence.test.rs"]
mod tests;
