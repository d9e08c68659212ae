use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use lumen_protocol::Content;

use super::*;
use crate::traits::RoutingDecision;

#[derive(Default)]
struct CountingRouter {
    calls: AtomicUsize,
}

#[async_trait]
impl ModelRouter for CountingRouter {
    async fn route(&self, _prompt_id: &str, _history: &[Content]) -> Result<RoutingDecision> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RoutingDecision::new("anthropic/claude-opus-4", "default"))
    }
}

#[tokio::test]
async fn test_router_called_once_per_sequence() {
    let router = CountingRouter::default();
    let mut seq = SequenceState::new("prompt-1", false);

    let first = seq.resolve_model(&router, None, &[]).await.unwrap();
    let second = seq.resolve_model(&router, None, &[]).await.unwrap();

    assert_eq!(first, "anthropic/claude-opus-4");
    assert_eq!(second, first);
    assert_eq!(router.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fallback_mode_skips_router() {
    let router = CountingRouter::default();
    let mut seq = SequenceState::new("prompt-1", true);

    let model = seq
        .resolve_model(&router, Some("genai/gemini-2.5-flash"), &[])
        .await
        .unwrap();

    assert_eq!(model, "genai/gemini-2.5-flash");
    assert!(seq.in_fallback_mode());
    assert_eq!(router.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_fallback_mode_without_fallback_model_routes() {
    let router = CountingRouter::default();
    let mut seq = SequenceState::new("prompt-1", true);

    let model = seq.resolve_model(&router, None, &[]).await.unwrap();

    assert_eq!(model, "anthropic/claude-opus-4");
    assert_eq!(router.calls.load(Ordering::SeqCst), 1);
}
