use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use lumen_message::InMemoryChatSession;
use lumen_protocol::CompressionStatus;
use lumen_protocol::FunctionResponse;
use lumen_protocol::Part;
use lumen_protocol::Role;
use serde_json::json;
use tokio::sync::mpsc;

use super::*;

fn user(text: &str) -> Content {
    Content::user_text(text)
}

fn model(text: &str) -> Content {
    Content::model_text(text)
}

fn function_response() -> Content {
    Content::new(
        Role::User,
        vec![Part::FunctionResponse(FunctionResponse {
            call_id: "c1".to_string(),
            name: "grep".to_string(),
            response: json!({"ok": true}),
        })],
    )
}

// ---------- find_split_point ----------

#[test]
fn test_split_rejects_bad_fractions() {
    let history = vec![user("a"), model("b")];
    for bad in [0.0, 1.0, -0.5, 2.0] {
        assert!(find_split_point(&history, bad).is_err(), "accepted {bad}");
    }
}

#[test]
fn test_split_empty_and_single() {
    assert_eq!(find_split_point(&[], 0.3).unwrap(), 0);
    assert_eq!(find_split_point(&[user("only")], 0.3).unwrap(), 0);
}

#[test]
fn test_split_skips_dangling_function_response() {
    let pad = "x".repeat(80);
    let history = vec![
        user(&pad),
        model(&pad),
        user(&pad),
        model(&pad),
        user(&pad),
        model(&pad),
        user(&pad),
        model(&pad),
        function_response(),
        model(&pad),
        user(&pad),
    ];

    let split = find_split_point(&history, 0.3).unwrap();
    assert_eq!(split, 10);
}

#[test]
fn test_split_never_starts_tail_after_function_call() {
    let histories = vec![
        vec![user("a"), model("b"), user("c"), model("d"), user("e")],
        vec![
            user("a"),
            model("b"),
            function_response(),
            model("c"),
            user("d"),
            model("e"),
        ],
    ];
    for history in histories {
        for fraction in [0.1, 0.3, 0.5, 0.9] {
            let split = find_split_point(&history, fraction).unwrap();
            if split > 0 {
                assert!(
                    !history[split - 1].has_function_call(),
                    "tail at {split} starts mid tool exchange"
                );
                assert!(is_valid_split_content(&history[split]));
            }
        }
    }
}

#[test]
fn test_split_falls_back_before_threshold() {
    // Everything after the threshold is model output; the last user
    // item before it must win.
    let pad = "x".repeat(80);
    let history = vec![
        user(&pad),
        user(&pad),
        model(&pad),
        model(&pad),
        model(&pad),
        model(&pad),
    ];
    let split = find_split_point(&history, 0.3).unwrap();
    assert_eq!(split, 1);
}

// ---------- try_compress ----------

struct ScriptedTransport {
    summary: String,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    fn new(summary: &str) -> Self {
        Self {
            summary: summary.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ModelTransport for ScriptedTransport {
    async fn stream_turn(
        &self,
        _model: &str,
        _request: Vec<Content>,
        _cancel_token: CancellationToken,
    ) -> Result<mpsc::Receiver<TurnEvent>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(2);
        let _ = tx
            .send(TurnEvent::Content {
                text: self.summary.clone(),
            })
            .await;
        Ok(rx)
    }
}

enum Count {
    Tokens(i64),
    Fail,
}

struct ScriptedCounter {
    script: Mutex<VecDeque<Count>>,
    calls: AtomicUsize,
}

impl ScriptedCounter {
    fn new(script: Vec<Count>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenCounter for ScriptedCounter {
    async fn count_tokens(&self, _model: &str, _contents: &[Content]) -> Result<i64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(Count::Tokens(n)) => Ok(n),
            Some(Count::Fail) => Err(crate::LoopError::token_counting("backend unavailable")),
            None => Ok(0),
        }
    }
}

fn compressor(transport: Arc<ScriptedTransport>, counter: Arc<ScriptedCounter>) -> HistoryCompressor {
    HistoryCompressor::new(transport, counter, CompressionConfig::default())
}

fn four_turn_session() -> InMemoryChatSession {
    InMemoryChatSession::with_history(vec![
        user("first question"),
        model("first answer"),
        user("second question"),
        model("second answer"),
    ])
}

#[tokio::test]
async fn test_noop_below_threshold() {
    let transport = Arc::new(ScriptedTransport::new("summary"));
    let counter = Arc::new(ScriptedCounter::new(vec![Count::Tokens(700)]));
    let compressor = compressor(transport.clone(), counter);

    let mut session = four_turn_session();
    let mut state = CompressionState::default();
    let outcome = compressor
        .try_compress(
            &mut session,
            "m",
            1000,
            false,
            &mut state,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, CompressionStatus::Noop);
    assert_eq!(outcome.original_token_count, 700);
    assert_eq!(outcome.new_token_count, 700);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    assert_eq!(session.len(), 4);
}

#[tokio::test]
async fn test_sticky_failure_skips_without_counting() {
    let transport = Arc::new(ScriptedTransport::new("summary"));
    let counter = Arc::new(ScriptedCounter::new(vec![Count::Tokens(9000)]));
    let compressor = compressor(transport.clone(), counter.clone());

    let mut session = four_turn_session();
    let mut state = CompressionState {
        sticky_failure: true,
        ..Default::default()
    };
    let outcome = compressor
        .try_compress(
            &mut session,
            "m",
            1000,
            false,
            &mut state,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, CompressionStatus::Noop);
    assert_eq!(outcome.original_token_count, 0);
    assert_eq!(outcome.new_token_count, 0);
    assert_eq!(counter.calls(), 0);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_compressed_replaces_history() {
    let transport = Arc::new(ScriptedTransport::new("what happened so far"));
    let counter = Arc::new(ScriptedCounter::new(vec![
        Count::Tokens(1000),
        Count::Tokens(300),
    ]));
    let compressor = compressor(transport, counter);

    let mut session = four_turn_session();
    let mut state = CompressionState::default();
    let outcome = compressor
        .try_compress(
            &mut session,
            "m",
            1000,
            false,
            &mut state,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, CompressionStatus::Compressed);
    assert_eq!(outcome.original_token_count, 1000);
    assert_eq!(outcome.new_token_count, 300);
    assert_eq!(state.last_prompt_tokens, 300);
    assert!(!state.sticky_failure);

    let history = session.get_history();
    // Priming pair, summary pair, then the retained tail.
    assert!(history.len() >= 5);
    assert!(history[2].text().contains("what happened so far"));
    assert!(history[2].text().contains("<compaction_summary>"));
}

#[tokio::test]
async fn test_inflated_result_is_sticky_and_leaves_history() {
    let transport = Arc::new(ScriptedTransport::new("a very verbose summary"));
    let counter = Arc::new(ScriptedCounter::new(vec![
        Count::Tokens(100),
        Count::Tokens(5000),
    ]));
    let compressor = compressor(transport, counter.clone());

    let mut session = four_turn_session();
    let before = session.get_history();
    let mut state = CompressionState::default();
    let outcome = compressor
        .try_compress(
            &mut session,
            "m",
            100,
            false,
            &mut state,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, CompressionStatus::FailedInflated);
    assert_eq!(outcome.original_token_count, 100);
    assert_eq!(outcome.new_token_count, 5000);
    assert!(state.sticky_failure);
    assert_eq!(session.get_history(), before);

    // A non-forced retry is skipped entirely.
    let skipped = compressor
        .try_compress(
            &mut session,
            "m",
            100,
            false,
            &mut state,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(skipped.status, CompressionStatus::Noop);
    assert_eq!(skipped.original_token_count, 0);
    assert_eq!(counter.calls(), 2);
}

#[tokio::test]
async fn test_force_compresses_despite_inflation() {
    let transport = Arc::new(ScriptedTransport::new("summary"));
    let counter = Arc::new(ScriptedCounter::new(vec![
        Count::Tokens(100),
        Count::Tokens(5000),
    ]));
    let compressor = compressor(transport, counter);

    let mut session = four_turn_session();
    let mut state = CompressionState {
        sticky_failure: true,
        ..Default::default()
    };
    let outcome = compressor
        .try_compress(
            &mut session,
            "m",
            100,
            true,
            &mut state,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, CompressionStatus::Compressed);
    assert_eq!(outcome.new_token_count, 5000);
    assert!(!state.sticky_failure);
    assert!(session.get_history()[0].text().contains("summarized"));
}

#[tokio::test]
async fn test_token_failure_leaves_history() {
    let transport = Arc::new(ScriptedTransport::new("summary"));
    let counter = Arc::new(ScriptedCounter::new(vec![Count::Fail]));
    let compressor = compressor(transport, counter);

    let mut session = four_turn_session();
    let before = session.get_history();
    let mut state = CompressionState::default();
    let outcome = compressor
        .try_compress(
            &mut session,
            "m",
            1000,
            false,
            &mut state,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, CompressionStatus::FailedTokenError);
    assert_eq!(session.get_history(), before);
    assert!(!state.sticky_failure);
}

#[tokio::test]
async fn test_token_failure_on_replacement_count() {
    let transport = Arc::new(ScriptedTransport::new("summary"));
    let counter = Arc::new(ScriptedCounter::new(vec![Count::Tokens(1000), Count::Fail]));
    let compressor = compressor(transport, counter);

    let mut session = four_turn_session();
    let before = session.get_history();
    let mut state = CompressionState::default();
    let outcome = compressor
        .try_compress(
            &mut session,
            "m",
            1000,
            false,
            &mut state,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, CompressionStatus::FailedTokenError);
    assert_eq!(outcome.original_token_count, 1000);
    assert_eq!(outcome.new_token_count, 0);
    assert_eq!(session.get_history(), before);
}
