use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use lumen_protocol::FunctionResponse;
use serde_json::json;

use super::*;
use crate::error::Result;
use crate::result::StopReason;
use crate::traits::NextSpeakerDecision;
use crate::traits::RoutingDecision;

// ---------- mock collaborators ----------

#[derive(Default)]
struct MockTransport {
    scripts: Mutex<VecDeque<Vec<TurnEvent>>>,
    default_events: Vec<TurnEvent>,
    fail_first: AtomicUsize,
    calls: AtomicUsize,
    models: Mutex<Vec<String>>,
}

impl MockTransport {
    fn scripted(scripts: Vec<Vec<TurnEvent>>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            default_events: vec![TurnEvent::Content {
                text: "ok".to_string(),
            }],
            ..Default::default()
        })
    }

    /// The first `failures` calls return `Err`, later ones follow the script.
    fn failing_then(failures: usize, scripts: Vec<Vec<TurnEvent>>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            default_events: vec![TurnEvent::Content {
                text: "ok".to_string(),
            }],
            fail_first: AtomicUsize::new(failures),
            ..Default::default()
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn models(&self) -> Vec<String> {
        self.models.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelTransport for MockTransport {
    async fn stream_turn(
        &self,
        model: &str,
        _request: Vec<Content>,
        _cancel_token: CancellationToken,
    ) -> Result<mpsc::Receiver<TurnEvent>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.models.lock().unwrap().push(model.to_string());
        if self.fail_first.load(Ordering::SeqCst) > 0 {
            self.fail_first.fetch_sub(1, Ordering::SeqCst);
            return Err(crate::LoopError::transport("summary backend offline"));
        }
        let events = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_events.clone());
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            let _ = tx.send(event).await;
        }
        Ok(rx)
    }
}

struct FixedCounter {
    tokens: i64,
    script: Mutex<VecDeque<i64>>,
    calls: AtomicUsize,
}

impl FixedCounter {
    fn new(tokens: i64) -> Arc<Self> {
        Arc::new(Self {
            tokens,
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Scripted counts are consumed first, then `fallback` repeats.
    fn scripted(script: Vec<i64>, fallback: i64) -> Arc<Self> {
        Arc::new(Self {
            tokens: fallback,
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenCounter for FixedCounter {
    async fn count_tokens(&self, _model: &str, _contents: &[Content]) -> Result<i64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.tokens))
    }
}

struct MockRouter {
    model: String,
    calls: AtomicUsize,
}

impl MockRouter {
    fn new(model: &str) -> Arc<Self> {
        Arc::new(Self {
            model: model.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelRouter for MockRouter {
    async fn route(&self, _prompt_id: &str, _history: &[Content]) -> Result<RoutingDecision> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RoutingDecision::new(self.model.clone(), "mock"))
    }
}

#[derive(Default)]
struct MockDetector {
    trip_on_start: bool,
    trip_after: Option<usize>,
    cancel_after: Option<(usize, CancellationToken)>,
    seen: usize,
}

impl LoopDetector for MockDetector {
    fn turn_started(&mut self) -> bool {
        self.trip_on_start
    }

    fn add_and_check(&mut self, _event: &TurnEvent) -> bool {
        self.seen += 1;
        if let Some((n, token)) = &self.cancel_after {
            if self.seen >= *n {
                token.cancel();
            }
        }
        self.trip_after.is_some_and(|n| self.seen >= n)
    }

    fn reset(&mut self) {
        self.seen = 0;
    }
}

struct FailingRouter;

#[async_trait]
impl ModelRouter for FailingRouter {
    async fn route(&self, _prompt_id: &str, _history: &[Content]) -> Result<RoutingDecision> {
        Err(crate::LoopError::routing("no provider configured"))
    }
}

/// Simulates the caller cancelling while the transport call is in flight.
struct CancelOnCallTransport {
    caller: CancellationToken,
}

#[async_trait]
impl ModelTransport for CancelOnCallTransport {
    async fn stream_turn(
        &self,
        _model: &str,
        _request: Vec<Content>,
        _cancel_token: CancellationToken,
    ) -> Result<mpsc::Receiver<TurnEvent>> {
        self.caller.cancel();
        Err(crate::LoopError::transport("interrupted"))
    }
}

#[derive(Default)]
struct MockNextSpeaker {
    script: Mutex<VecDeque<Option<NextSpeakerDecision>>>,
    calls: AtomicUsize,
}

impl MockNextSpeaker {
    fn model_then_user() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(
                vec![
                    Some(NextSpeakerDecision {
                        next_speaker: NextSpeaker::Model,
                        reasoning: "unfinished".to_string(),
                    }),
                    Some(NextSpeakerDecision {
                        next_speaker: NextSpeaker::User,
                        reasoning: "done".to_string(),
                    }),
                ]
                .into(),
            ),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NextSpeakerChecker for MockNextSpeaker {
    async fn check(&self, _history: &[Content]) -> Result<Option<NextSpeakerDecision>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.script.lock().unwrap().pop_front().flatten())
    }
}

struct MockInjector {
    part: Option<Part>,
}

impl ContextInjector for MockInjector {
    fn context_message(&mut self, _transcript_is_empty: bool) -> Option<Part> {
        self.part.take()
    }
}

struct Harness {
    orchestrator: SessionOrchestrator,
    events: mpsc::Receiver<SessionEvent>,
}

impl Harness {
    fn drain_events(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

fn harness(
    transport: Arc<MockTransport>,
    counter: Arc<FixedCounter>,
    router: Arc<MockRouter>,
    speaker: Arc<MockNextSpeaker>,
    detector: MockDetector,
    config: SessionConfig,
) -> Harness {
    let (tx, rx) = mpsc::channel(1024);
    let orchestrator = SessionOrchestrator::builder()
        .transport(transport)
        .token_counter(counter)
        .router(router)
        .loop_detector(Box::new(detector))
        .next_speaker(speaker)
        .config(config)
        .event_tx(tx)
        .build();
    Harness {
        orchestrator,
        events: rx,
    }
}

fn text_request(text: &str) -> Vec<Part> {
    vec![Part::Text {
        text: text.to_string(),
    }]
}

fn content_events(texts: &[&str]) -> Vec<TurnEvent> {
    texts
        .iter()
        .map(|t| TurnEvent::Content {
            text: (*t).to_string(),
        })
        .collect()
}

// ---------- tests ----------

#[tokio::test]
async fn test_single_turn_done() {
    let transport = MockTransport::scripted(vec![content_events(&["Hello, ", "world"])]);
    let speaker = Arc::new(MockNextSpeaker::default());
    let mut h = harness(
        transport.clone(),
        FixedCounter::new(100),
        MockRouter::new("anthropic/claude-opus-4"),
        speaker,
        MockDetector::default(),
        SessionConfig::default(),
    );

    let result = h
        .orchestrator
        .send_message_stream(text_request("hi"), "p1", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.stop_reason, StopReason::Done);
    assert_eq!(result.turns_completed, 1);
    assert_eq!(result.final_text, "Hello, world");
    assert!(!result.has_pending_calls());

    let history = h.orchestrator.history();
    assert_eq!(history.len(), 2);
    assert!(history[0].is_user());
    assert_eq!(history[1].text(), "Hello, world");

    let events = h.drain_events();
    assert!(matches!(events[0], SessionEvent::TurnStarted { turn_number: 1, .. }));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SessionEvent::Content { text } if text == "Hello, "))
    );
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SessionEvent::TurnCompleted { .. }))
    );
}

#[tokio::test]
async fn test_continuation_recursion() {
    let transport =
        MockTransport::scripted(vec![content_events(&["part one"]), content_events(&["part two"])]);
    let speaker = MockNextSpeaker::model_then_user();
    let mut h = harness(
        transport.clone(),
        FixedCounter::new(100),
        MockRouter::new("anthropic/claude-opus-4"),
        speaker.clone(),
        MockDetector::default(),
        SessionConfig::default(),
    );

    let result = h
        .orchestrator
        .send_message_stream(text_request("go"), "p1", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.stop_reason, StopReason::Done);
    assert_eq!(result.turns_completed, 2);
    assert_eq!(result.final_text, "part two");
    assert_eq!(transport.calls(), 2);
    assert_eq!(speaker.calls(), 2);

    let history = h.orchestrator.history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[2].text(), "Please continue.");
}

#[tokio::test]
async fn test_pending_tool_call_stops_leg() {
    let call = FunctionCall {
        call_id: "c1".to_string(),
        name: "read_file".to_string(),
        args: json!({"path": "src/lib.rs"}),
    };
    let transport = MockTransport::scripted(vec![vec![
        TurnEvent::Content {
            text: "Let me look.".to_string(),
        },
        TurnEvent::FunctionCallRequest { call: call.clone() },
    ]]);
    let speaker = Arc::new(MockNextSpeaker::default());
    let mut h = harness(
        transport,
        FixedCounter::new(100),
        MockRouter::new("anthropic/claude-opus-4"),
        speaker.clone(),
        MockDetector::default(),
        SessionConfig::default(),
    );

    let result = h
        .orchestrator
        .send_message_stream(text_request("read it"), "p1", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.stop_reason, StopReason::Done);
    assert_eq!(result.pending_calls, vec![call]);
    // The caller resolves tool calls; no continuation check happens.
    assert_eq!(speaker.calls(), 0);

    let history = h.orchestrator.history();
    assert!(history[1].has_function_call());
}

#[tokio::test]
async fn test_tool_continuation_skips_compression() {
    let transport = MockTransport::scripted(vec![content_events(&["thanks"])]);
    let counter = FixedCounter::new(100);
    let speaker = Arc::new(MockNextSpeaker::default());
    let mut h = harness(
        transport,
        counter.clone(),
        MockRouter::new("anthropic/claude-opus-4"),
        speaker,
        MockDetector::default(),
        SessionConfig::default(),
    );

    let request = vec![Part::FunctionResponse(FunctionResponse {
        call_id: "c1".to_string(),
        name: "read_file".to_string(),
        response: json!({"content": "fn main() {}"}),
    })];
    let result = h
        .orchestrator
        .send_message_stream(request, "p1", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.stop_reason, StopReason::Done);
    assert_eq!(counter.calls(), 0);
}

#[tokio::test]
async fn test_error_event_terminates_without_next_speaker() {
    let transport = MockTransport::scripted(vec![vec![
        TurnEvent::Content {
            text: "partial".to_string(),
        },
        TurnEvent::Error {
            message: "quota exhausted".to_string(),
        },
    ]]);
    let speaker = Arc::new(MockNextSpeaker::default());
    let mut h = harness(
        transport,
        FixedCounter::new(100),
        MockRouter::new("anthropic/claude-opus-4"),
        speaker.clone(),
        MockDetector::default(),
        SessionConfig::default(),
    );

    let result = h
        .orchestrator
        .send_message_stream(text_request("hi"), "p1", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        result.stop_reason,
        StopReason::Error {
            message: "quota exhausted".to_string()
        }
    );
    assert_eq!(speaker.calls(), 0);

    let events = h.drain_events();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SessionEvent::Error { error } if error.message == "quota exhausted"))
    );
}

#[tokio::test]
async fn test_invalid_stream_retries_once() {
    let transport = MockTransport::scripted(vec![
        vec![TurnEvent::InvalidStream],
        content_events(&["recovered"]),
    ]);
    let speaker = Arc::new(MockNextSpeaker::default());
    let mut h = harness(
        transport.clone(),
        FixedCounter::new(100),
        MockRouter::new("anthropic/claude-opus-4"),
        speaker,
        MockDetector::default(),
        SessionConfig::default(),
    );

    let result = h
        .orchestrator
        .send_message_stream(text_request("hi"), "p1", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.stop_reason, StopReason::Done);
    assert_eq!(result.final_text, "recovered");
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_second_invalid_stream_is_terminal() {
    let transport = MockTransport::scripted(vec![
        vec![TurnEvent::InvalidStream],
        vec![TurnEvent::InvalidStream],
        content_events(&["never reached"]),
    ]);
    let speaker = Arc::new(MockNextSpeaker::default());
    let mut h = harness(
        transport.clone(),
        FixedCounter::new(100),
        MockRouter::new("anthropic/claude-opus-4"),
        speaker,
        MockDetector::default(),
        SessionConfig::default(),
    );

    let result = h
        .orchestrator
        .send_message_stream(text_request("hi"), "p1", CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(result.stop_reason, StopReason::Error { .. }));
    assert_eq!(transport.calls(), 2);

    let events = h.drain_events();
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::InvalidStream))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_max_session_turns() {
    let transport = MockTransport::scripted(vec![content_events(&["one"])]);
    let speaker = MockNextSpeaker::model_then_user();
    let config = SessionConfig {
        max_session_turns: Some(1),
        ..Default::default()
    };
    let mut h = harness(
        transport.clone(),
        FixedCounter::new(100),
        MockRouter::new("anthropic/claude-opus-4"),
        speaker,
        MockDetector::default(),
        config,
    );

    let result = h
        .orchestrator
        .send_message_stream(text_request("go"), "p1", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.stop_reason, StopReason::MaxSessionTurns);
    assert_eq!(result.turns_completed, 1);
    assert_eq!(transport.calls(), 1);

    let events = h.drain_events();
    assert!(events.iter().any(|e| matches!(e, SessionEvent::MaxSessionTurns)));
}

#[tokio::test]
async fn test_recursion_hard_cap() {
    // Transport answers every turn, the heuristic never concludes, and
    // the config says keep going: only the hard cap stops the run.
    let transport = MockTransport::scripted(vec![]);
    let speaker = Arc::new(MockNextSpeaker::default());
    let config = SessionConfig {
        continue_on_inconclusive: true,
        ..Default::default()
    };
    let mut h = harness(
        transport.clone(),
        FixedCounter::new(100),
        MockRouter::new("anthropic/claude-opus-4"),
        speaker,
        MockDetector::default(),
        config,
    );

    let result = h
        .orchestrator
        .send_message_stream_with_budget(
            text_request("go"),
            "p1",
            CancellationToken::new(),
            1_000_000,
        )
        .await
        .unwrap();

    assert_eq!(result.stop_reason, StopReason::MaxRecursionTurns);
    assert_eq!(transport.calls(), 100);
}

#[tokio::test]
async fn test_model_stickiness_per_prompt_id() {
    let transport = MockTransport::scripted(vec![]);
    let router = MockRouter::new("anthropic/claude-opus-4");
    let speaker = Arc::new(MockNextSpeaker::default());
    let mut h = harness(
        transport,
        FixedCounter::new(100),
        router.clone(),
        speaker,
        MockDetector::default(),
        SessionConfig::default(),
    );

    for _ in 0..2 {
        h.orchestrator
            .send_message_stream(text_request("hi"), "p1", CancellationToken::new())
            .await
            .unwrap();
    }
    assert_eq!(router.calls(), 1);

    h.orchestrator
        .send_message_stream(text_request("hi"), "p2", CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(router.calls(), 2);
}

#[tokio::test]
async fn test_fallback_mode_uses_fallback_model() {
    let transport = MockTransport::scripted(vec![]);
    let router = MockRouter::new("anthropic/claude-opus-4");
    let speaker = Arc::new(MockNextSpeaker::default());
    let config = SessionConfig {
        fallback_model: Some("genai/gemini-2.5-flash".to_string()),
        ..Default::default()
    };
    let mut h = harness(
        transport.clone(),
        FixedCounter::new(100),
        router.clone(),
        speaker,
        MockDetector::default(),
        config,
    );

    h.orchestrator.set_fallback_mode(true);
    h.orchestrator
        .send_message_stream(text_request("hi"), "p1", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(router.calls(), 0);
    assert_eq!(transport.models(), vec!["genai/gemini-2.5-flash".to_string()]);
}

#[tokio::test]
async fn test_overflow_guard_refuses_without_model_call() {
    let transport = MockTransport::scripted(vec![]);
    let router = MockRouter::new("tiny");
    let speaker = Arc::new(MockNextSpeaker::default());
    let (tx, rx) = mpsc::channel(64);
    let orchestrator = SessionOrchestrator::builder()
        .transport(transport.clone())
        .token_counter(FixedCounter::new(600))
        .router(router)
        .loop_detector(Box::new(MockDetector::default()))
        .next_speaker(speaker)
        .token_limits(TokenLimitTable::with_entries(
            vec![("tiny".to_string(), 1000)],
            1000,
        ))
        .event_tx(tx)
        .build();
    let mut h = Harness {
        orchestrator,
        events: rx,
    };

    h.orchestrator.compression_state_mut().last_prompt_tokens = 900;

    let big_request = "y".repeat(500);
    let result = h
        .orchestrator
        .send_message_stream(text_request(&big_request), "p1", CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(result.stop_reason, StopReason::Error { .. }));
    assert_eq!(transport.calls(), 0);

    let events = h.drain_events();
    let overflow = events.iter().find_map(|e| match e {
        SessionEvent::ContextWindowWillOverflow {
            estimated_request_token_count,
            remaining_token_count,
        } => Some((*estimated_request_token_count, *remaining_token_count)),
        _ => None,
    });
    let (estimated, remaining) = overflow.expect("overflow event not emitted");
    assert_eq!(remaining, 100);
    assert!(estimated > 95, "estimated {estimated} should exceed margin");
}

#[tokio::test]
async fn test_loop_detected_mid_stream() {
    let transport = MockTransport::scripted(vec![content_events(&["a", "b", "c", "d", "e"])]);
    let detector = MockDetector {
        trip_after: Some(3),
        ..Default::default()
    };
    let speaker = Arc::new(MockNextSpeaker::default());
    let mut h = harness(
        transport,
        FixedCounter::new(100),
        MockRouter::new("anthropic/claude-opus-4"),
        speaker,
        detector,
        SessionConfig::default(),
    );

    let result = h
        .orchestrator
        .send_message_stream(text_request("hi"), "p1", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.stop_reason, StopReason::LoopDetected);

    let events = h.drain_events();
    assert!(events.iter().any(|e| matches!(e, SessionEvent::LoopDetected)));
    // Only the events before the trip were forwarded.
    let forwarded = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::Content { .. }))
        .count();
    assert_eq!(forwarded, 2);
}

#[tokio::test]
async fn test_loop_detected_before_turn() {
    let transport = MockTransport::scripted(vec![]);
    let detector = MockDetector {
        trip_on_start: true,
        ..Default::default()
    };
    let speaker = Arc::new(MockNextSpeaker::default());
    let mut h = harness(
        transport.clone(),
        FixedCounter::new(100),
        MockRouter::new("anthropic/claude-opus-4"),
        speaker,
        detector,
        SessionConfig::default(),
    );

    let result = h
        .orchestrator
        .send_message_stream(text_request("hi"), "p1", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.stop_reason, StopReason::LoopDetected);
    assert_eq!(transport.calls(), 0);

    // A refused turn never started, so nothing was consumed or announced.
    assert_eq!(h.orchestrator.session_turns(), 0);
    let events = h.drain_events();
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, SessionEvent::TurnStarted { .. }))
    );
}

#[tokio::test]
async fn test_pre_cancelled_token() {
    let transport = MockTransport::scripted(vec![]);
    let speaker = Arc::new(MockNextSpeaker::default());
    let mut h = harness(
        transport.clone(),
        FixedCounter::new(100),
        MockRouter::new("anthropic/claude-opus-4"),
        speaker,
        MockDetector::default(),
        SessionConfig::default(),
    );

    let token = CancellationToken::new();
    token.cancel();
    let result = h
        .orchestrator
        .send_message_stream(text_request("hi"), "p1", token)
        .await
        .unwrap();

    assert_eq!(result.stop_reason, StopReason::Cancelled);
    assert_eq!(transport.calls(), 0);
    assert!(h.orchestrator.history().is_empty());
}

#[tokio::test]
async fn test_cancel_mid_stream_keeps_streamed_events() {
    let transport = MockTransport::scripted(vec![content_events(&["a", "b", "c", "d", "e"])]);
    let caller = CancellationToken::new();
    let detector = MockDetector {
        cancel_after: Some((3, caller.clone())),
        ..Default::default()
    };
    let speaker = Arc::new(MockNextSpeaker::default());
    let mut h = harness(
        transport,
        FixedCounter::new(100),
        MockRouter::new("anthropic/claude-opus-4"),
        speaker.clone(),
        detector,
        SessionConfig::default(),
    );

    let result = h
        .orchestrator
        .send_message_stream(text_request("hi"), "p1", caller)
        .await
        .unwrap();

    assert_eq!(result.stop_reason, StopReason::Cancelled);
    assert_eq!(result.final_text, "abc");
    assert_eq!(speaker.calls(), 0);

    // Everything streamed before the cancellation was delivered and kept.
    let events = h.drain_events();
    let forwarded = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::Content { .. }))
        .count();
    assert_eq!(forwarded, 3);
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, SessionEvent::TurnCompleted { .. }))
    );
    assert_eq!(h.orchestrator.history()[1].text(), "abc");
}

#[tokio::test]
async fn test_cancel_during_summary_returns_cancelled() {
    let caller = CancellationToken::new();
    let transport = Arc::new(CancelOnCallTransport {
        caller: caller.clone(),
    });
    let speaker = Arc::new(MockNextSpeaker::default());
    let (tx, rx) = mpsc::channel(64);
    let orchestrator = SessionOrchestrator::builder()
        .transport(transport)
        .token_counter(FixedCounter::new(900))
        .router(MockRouter::new("tiny"))
        .loop_detector(Box::new(MockDetector::default()))
        .next_speaker(speaker)
        .token_limits(TokenLimitTable::with_entries(
            vec![("tiny".to_string(), 1000)],
            1000,
        ))
        .event_tx(tx)
        .build();
    let mut h = Harness {
        orchestrator,
        events: rx,
    };

    h.orchestrator.set_history(vec![
        Content::user_text("old question"),
        Content::model_text("old answer"),
        Content::user_text("newer question"),
        Content::model_text("newer answer"),
    ]);

    let result = h
        .orchestrator
        .send_message_stream(text_request("next"), "p1", caller)
        .await
        .unwrap();

    assert_eq!(result.stop_reason, StopReason::Cancelled);
    assert_eq!(h.orchestrator.history().len(), 4);
}

#[tokio::test]
async fn test_summary_failure_degrades_to_uncompressed_turn() {
    // The summary call fails; the turn still runs on the intact transcript.
    let transport = MockTransport::failing_then(1, vec![content_events(&["answer"])]);
    let speaker = Arc::new(MockNextSpeaker::default());
    let (tx, rx) = mpsc::channel(64);
    let orchestrator = SessionOrchestrator::builder()
        .transport(transport.clone())
        .token_counter(FixedCounter::new(900))
        .router(MockRouter::new("tiny"))
        .loop_detector(Box::new(MockDetector::default()))
        .next_speaker(speaker)
        .token_limits(TokenLimitTable::with_entries(
            vec![("tiny".to_string(), 1000)],
            1000,
        ))
        .event_tx(tx)
        .build();
    let mut h = Harness {
        orchestrator,
        events: rx,
    };

    let seed = vec![
        Content::user_text("old question"),
        Content::model_text("old answer"),
        Content::user_text("newer question"),
        Content::model_text("newer answer"),
    ];
    h.orchestrator.set_history(seed.clone());

    let result = h
        .orchestrator
        .send_message_stream(text_request("next"), "p1", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.stop_reason, StopReason::Done);
    assert_eq!(result.final_text, "answer");
    assert_eq!(transport.calls(), 2);

    // The seed transcript survived untouched ahead of the new exchange.
    let history = h.orchestrator.history();
    assert_eq!(&history[..4], &seed[..]);

    let events = h.drain_events();
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, SessionEvent::ChatCompressed { .. }))
    );
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::Error { .. })));
}

#[tokio::test]
async fn test_routing_failure_surfaces_as_error_result() {
    let transport = MockTransport::scripted(vec![]);
    let speaker = Arc::new(MockNextSpeaker::default());
    let (tx, rx) = mpsc::channel(64);
    let orchestrator = SessionOrchestrator::builder()
        .transport(transport.clone())
        .token_counter(FixedCounter::new(100))
        .router(Arc::new(FailingRouter))
        .loop_detector(Box::new(MockDetector::default()))
        .next_speaker(speaker)
        .event_tx(tx)
        .build();
    let mut h = Harness {
        orchestrator,
        events: rx,
    };

    let result = h
        .orchestrator
        .send_message_stream(text_request("hi"), "p1", CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(result.stop_reason, StopReason::Error { .. }));
    assert_eq!(transport.calls(), 0);

    let events = h.drain_events();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SessionEvent::Error { error } if error.code == "ModelError"))
    );
}

#[tokio::test]
async fn test_compression_event_emitted_during_run() {
    // First transport call serves the summary turn, second the real one.
    let transport = MockTransport::scripted(vec![
        content_events(&["summary of earlier work"]),
        content_events(&["done"]),
    ]);
    let router = MockRouter::new("tiny");
    let speaker = Arc::new(MockNextSpeaker::default());
    let (tx, rx) = mpsc::channel(64);
    let orchestrator = SessionOrchestrator::builder()
        .transport(transport.clone())
        .token_counter(FixedCounter::scripted(vec![900, 300], 100))
        .router(router)
        .loop_detector(Box::new(MockDetector::default()))
        .next_speaker(speaker)
        .token_limits(TokenLimitTable::with_entries(
            vec![("tiny".to_string(), 1000)],
            1000,
        ))
        .event_tx(tx)
        .build();
    let mut h = Harness {
        orchestrator,
        events: rx,
    };

    h.orchestrator.set_history(vec![
        Content::user_text("old question"),
        Content::model_text("old answer"),
        Content::user_text("newer question"),
        Content::model_text("newer answer"),
    ]);

    let result = h
        .orchestrator
        .send_message_stream(text_request("next"), "p1", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.stop_reason, StopReason::Done);
    assert_eq!(transport.calls(), 2);

    let events = h.drain_events();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SessionEvent::ChatCompressed { .. }))
    );
    assert!(h.orchestrator.history()[0].text().contains("summarized"));
}

#[tokio::test]
async fn test_editor_context_injected_into_request() {
    let transport = MockTransport::scripted(vec![]);
    let speaker = Arc::new(MockNextSpeaker::default());
    let (tx, rx) = mpsc::channel(64);
    let orchestrator = SessionOrchestrator::builder()
        .transport(transport)
        .token_counter(FixedCounter::new(100))
        .router(MockRouter::new("anthropic/claude-opus-4"))
        .loop_detector(Box::new(MockDetector::default()))
        .next_speaker(speaker)
        .context_injector(Box::new(MockInjector {
            part: Some(Part::Text {
                text: "[editor: main.rs open]".to_string(),
            }),
        }))
        .event_tx(tx)
        .build();
    let mut h = Harness {
        orchestrator,
        events: rx,
    };

    h.orchestrator
        .send_message_stream(text_request("hi"), "p1", CancellationToken::new())
        .await
        .unwrap();

    let history = h.orchestrator.history();
    assert_eq!(history[0].parts.len(), 2);
    assert!(matches!(
        &history[0].parts[0],
        Part::Text { text } if text.starts_with("[editor:")
    ));
}

#[tokio::test]
async fn test_manual_force_compress() {
    let transport = MockTransport::scripted(vec![content_events(&["short summary"])]);
    let speaker = Arc::new(MockNextSpeaker::default());
    let mut h = harness(
        transport,
        FixedCounter::new(50),
        MockRouter::new("anthropic/claude-opus-4"),
        speaker,
        MockDetector::default(),
        SessionConfig::default(),
    );

    h.orchestrator.set_history(vec![
        Content::user_text("a"),
        Content::model_text("b"),
        Content::user_text("c"),
        Content::model_text("d"),
    ]);

    // Well below threshold, but force bypasses it.
    let outcome = h
        .orchestrator
        .try_compress("p1", true, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, CompressionStatus::Compressed);
    let events = h.drain_events();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SessionEvent::ChatCompressed { .. }))
    );
}
