//! Session orchestrator - the core turn loop.

use std::sync::Arc;

use lumen_message::ChatSession;
use lumen_message::InMemoryChatSession;
use lumen_message::content_guards::estimate_request_tokens;
use lumen_message::content_guards::has_pending_function_call;
use lumen_message::factory::continuation_message;
use lumen_protocol::CompressionConfig;
use lumen_protocol::CompressionOutcome;
use lumen_protocol::CompressionStatus;
use lumen_protocol::Content;
use lumen_protocol::FunctionCall;
use lumen_protocol::MAX_RECURSION_TURNS;
use lumen_protocol::Part;
use lumen_protocol::Role;
use lumen_protocol::SessionConfig;
use lumen_protocol::SessionError;
use lumen_protocol::SessionEvent;
use lumen_protocol::TokenLimitTable;
use lumen_protocol::TokenUsage;
use lumen_protocol::TurnEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::compression::CompressionState;
use crate::compression::HistoryCompressor;
use crate::error::Result;
use crate::error::loop_error;
use crate::result::SessionResult;
use crate::sequence::SequenceState;
use crate::traits::ContextInjector;
use crate::traits::LoopDetector;
use crate::traits::ModelRouter;
use crate::traits::ModelTransport;
use crate::traits::NextSpeaker;
use crate::traits::NextSpeakerChecker;
use crate::traits::TokenCounter;

/// What one model turn produced.
#[derive(Debug, Default)]
struct TurnOutcome {
    text: String,
    parts: Vec<Part>,
    pending_calls: Vec<FunctionCall>,
    error: Option<String>,
    invalid_stream: bool,
    loop_detected: bool,
    cancelled: bool,
}

/// Drives multi-turn sessions against a model transport.
///
/// The orchestrator owns the transcript and all per-session state:
/// sticky model selection, compression bookkeeping, turn counters. One
/// orchestrator serves one logical session; concurrent sessions get
/// independent instances.
pub struct SessionOrchestrator {
    // Collaborators
    transport: Arc<dyn ModelTransport>,
    token_counter: Arc<dyn TokenCounter>,
    router: Arc<dyn ModelRouter>,
    loop_detector: Box<dyn LoopDetector>,
    next_speaker: Arc<dyn NextSpeakerChecker>,
    context_injector: Option<Box<dyn ContextInjector>>,

    // Conversation state
    session: Box<dyn ChatSession>,
    compressor: HistoryCompressor,

    // Config
    config: SessionConfig,
    token_limits: TokenLimitTable,

    // Event channel
    event_tx: mpsc::Sender<SessionEvent>,

    // State tracking
    sequence: Option<SequenceState>,
    compression_state: CompressionState,
    fallback_mode: bool,
    session_turns: i32,
    usage: TokenUsage,
}

/// Builder for constructing a [`SessionOrchestrator`].
pub struct SessionOrchestratorBuilder {
    transport: Option<Arc<dyn ModelTransport>>,
    token_counter: Option<Arc<dyn TokenCounter>>,
    router: Option<Arc<dyn ModelRouter>>,
    loop_detector: Option<Box<dyn LoopDetector>>,
    next_speaker: Option<Arc<dyn NextSpeakerChecker>>,
    context_injector: Option<Box<dyn ContextInjector>>,
    session: Option<Box<dyn ChatSession>>,
    config: SessionConfig,
    compression_config: CompressionConfig,
    token_limits: TokenLimitTable,
    event_tx: Option<mpsc::Sender<SessionEvent>>,
}

impl SessionOrchestratorBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            transport: None,
            token_counter: None,
            router: None,
            loop_detector: None,
            next_speaker: None,
            context_injector: None,
            session: None,
            config: SessionConfig::default(),
            compression_config: CompressionConfig::default(),
            token_limits: TokenLimitTable::default(),
            event_tx: None,
        }
    }

    pub fn transport(mut self, transport: Arc<dyn ModelTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.token_counter = Some(counter);
        self
    }

    pub fn router(mut self, router: Arc<dyn ModelRouter>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn loop_detector(mut self, detector: Box<dyn LoopDetector>) -> Self {
        self.loop_detector = Some(detector);
        self
    }

    pub fn next_speaker(mut self, checker: Arc<dyn NextSpeakerChecker>) -> Self {
        self.next_speaker = Some(checker);
        self
    }

    pub fn context_injector(mut self, injector: Box<dyn ContextInjector>) -> Self {
        self.context_injector = Some(injector);
        self
    }

    pub fn session(mut self, session: Box<dyn ChatSession>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn compression_config(mut self, config: CompressionConfig) -> Self {
        self.compression_config = config;
        self
    }

    pub fn token_limits(mut self, limits: TokenLimitTable) -> Self {
        self.token_limits = limits;
        self
    }

    pub fn event_tx(mut self, tx: mpsc::Sender<SessionEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Build the [`SessionOrchestrator`].
    ///
    /// # Panics
    /// Panics if required fields (`transport`, `token_counter`, `router`,
    /// `loop_detector`, `next_speaker`, `event_tx`) have not been set.
    pub fn build(self) -> SessionOrchestrator {
        let transport = self.transport.expect("transport is required");
        let token_counter = self.token_counter.expect("token_counter is required");
        let compressor = HistoryCompressor::new(
            transport.clone(),
            token_counter.clone(),
            self.compression_config,
        );

        SessionOrchestrator {
            transport,
            token_counter,
            router: self.router.expect("router is required"),
            loop_detector: self.loop_detector.expect("loop_detector is required"),
            next_speaker: self.next_speaker.expect("next_speaker is required"),
            context_injector: self.context_injector,
            session: self
                .session
                .unwrap_or_else(|| Box::new(InMemoryChatSession::new())),
            compressor,
            config: self.config,
            token_limits: self.token_limits,
            event_tx: self.event_tx.expect("event_tx is required"),
            sequence: None,
            compression_state: CompressionState::default(),
            fallback_mode: false,
            session_turns: 0,
            usage: TokenUsage::default(),
        }
    }
}

impl Default for SessionOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionOrchestrator {
    /// Create a builder for constructing an orchestrator.
    pub fn builder() -> SessionOrchestratorBuilder {
        SessionOrchestratorBuilder::new()
    }

    /// Snapshot of the current transcript.
    pub fn history(&self) -> Vec<Content> {
        self.session.get_history()
    }

    /// Replace the transcript wholesale.
    pub fn set_history(&mut self, history: Vec<Content>) {
        self.session.set_history(history);
    }

    /// Append one item to the transcript.
    pub fn add_history(&mut self, content: Content) {
        self.session.add_history(content);
    }

    /// Number of turns completed in this session so far.
    pub fn session_turns(&self) -> i32 {
        self.session_turns
    }

    /// Whether fallback mode is engaged.
    pub fn fallback_mode(&self) -> bool {
        self.fallback_mode
    }

    /// Engage or clear fallback mode.
    ///
    /// Takes effect at the start of the next prompt sequence; an
    /// in-flight sequence keeps the model it started with.
    pub fn set_fallback_mode(&mut self, enabled: bool) {
        self.fallback_mode = enabled;
    }

    /// Mutable access to compression bookkeeping.
    pub fn compression_state_mut(&mut self) -> &mut CompressionState {
        &mut self.compression_state
    }

    /// Run the session loop for one user request, streaming events to
    /// the configured channel until the loop stops.
    pub async fn send_message_stream(
        &mut self,
        request: Vec<Part>,
        prompt_id: &str,
        cancel_token: CancellationToken,
    ) -> Result<SessionResult> {
        self.send_message_stream_with_budget(request, prompt_id, cancel_token, MAX_RECURSION_TURNS)
            .await
    }

    /// Like [`send_message_stream`](Self::send_message_stream) with an
    /// explicit continuation budget. The budget is clamped to the hard
    /// recursion cap regardless of the value passed.
    pub async fn send_message_stream_with_budget(
        &mut self,
        request: Vec<Part>,
        prompt_id: &str,
        cancel_token: CancellationToken,
        turn_budget: i32,
    ) -> Result<SessionResult> {
        if let Err(reason) = self.config.validate() {
            return loop_error::InvalidConfigSnafu { reason }.fail();
        }

        let remaining = self.config.bounded_turns(turn_budget);
        info!(prompt_id, remaining, "Starting session run");
        self.run_leg(request, prompt_id, cancel_token, remaining)
            .await
    }

    /// Attempt transcript compression outside the turn loop (e.g. an
    /// explicit user command). `force` bypasses the threshold check and
    /// the sticky failure flag, and commits the result even if inflated.
    pub async fn try_compress(
        &mut self,
        prompt_id: &str,
        force: bool,
        cancel_token: CancellationToken,
    ) -> Result<CompressionOutcome> {
        let model = self.resolve_model(prompt_id).await?;
        let model_limit = self.token_limits.limit(&model);

        let outcome = self
            .compressor
            .try_compress(
                self.session.as_mut(),
                &model,
                model_limit,
                force,
                &mut self.compression_state,
                &cancel_token,
            )
            .await?;

        if outcome.status == CompressionStatus::Compressed {
            self.emit(SessionEvent::ChatCompressed {
                outcome: outcome.clone(),
            })
            .await;
        }
        Ok(outcome)
    }

    /// One leg of the turn loop; recurses for continuations.
    async fn run_leg(
        &mut self,
        request: Vec<Part>,
        prompt_id: &str,
        cancel_token: CancellationToken,
        remaining_turns: i32,
    ) -> Result<SessionResult> {
        // ── STEP 1: Cancellation and turn limits ──
        if cancel_token.is_cancelled() {
            return Ok(SessionResult::cancelled(
                self.session_turns,
                self.usage.clone(),
                String::new(),
            ));
        }

        if let Some(max) = self.config.max_session_turns {
            if self.session_turns >= max {
                warn!(max, "Session turn limit reached");
                self.emit(SessionEvent::MaxSessionTurns).await;
                return Ok(SessionResult::max_session_turns(
                    self.session_turns,
                    self.usage.clone(),
                ));
            }
        }

        // The recursion budget is the backstop against runaway
        // continuation chains; it exhausts silently.
        if remaining_turns <= 0 {
            debug!("Continuation budget exhausted");
            return Ok(SessionResult::max_recursion_turns(
                self.session_turns,
                self.usage.clone(),
            ));
        }

        // ── STEP 2: Resolve the model for this sequence ──
        let continuation = request.iter().any(|p| p.is_function_response());
        let model = match self.resolve_model(prompt_id).await {
            Ok(model) => model,
            Err(e) => {
                warn!(error = %e, "Model routing failed");
                self.emit(SessionEvent::Error {
                    error: SessionError::model(e.to_string()),
                })
                .await;
                return Ok(SessionResult::error(
                    self.session_turns,
                    self.usage.clone(),
                    e.to_string(),
                ));
            }
        };
        let model_limit = self.token_limits.limit(&model);

        // ── STEP 3: Compression (skipped while a tool exchange is in flight) ──
        if !continuation {
            match self
                .compressor
                .try_compress(
                    self.session.as_mut(),
                    &model,
                    model_limit,
                    false,
                    &mut self.compression_state,
                    &cancel_token,
                )
                .await
            {
                Ok(outcome) => {
                    if outcome.status == CompressionStatus::Compressed {
                        self.emit(SessionEvent::ChatCompressed { outcome }).await;
                    }
                }
                Err(e) if cancel_token.is_cancelled() => {
                    debug!(error = %e, "Compression aborted by cancellation");
                    return Ok(SessionResult::cancelled(
                        self.session_turns,
                        self.usage.clone(),
                        String::new(),
                    ));
                }
                // A failed summary call leaves the transcript intact, so
                // the turn can proceed uncompressed.
                Err(e) => {
                    warn!(error = %e, "Compression attempt failed, proceeding uncompressed");
                }
            }
        }

        // ── STEP 4: Context window overflow guard ──
        let request_content = Content::new(Role::User, request.clone());
        let estimated = estimate_request_tokens(std::slice::from_ref(&request_content));
        let remaining_budget = model_limit - self.compression_state.last_prompt_tokens;
        if estimated as f64 > remaining_budget as f64 * self.config.overflow_safety_margin {
            warn!(
                estimated,
                remaining_budget, "Request would overflow the context window"
            );
            self.emit(SessionEvent::ContextWindowWillOverflow {
                estimated_request_token_count: estimated as i32,
                remaining_token_count: remaining_budget as i32,
            })
            .await;
            return Ok(SessionResult::error(
                self.session_turns,
                self.usage.clone(),
                format!(
                    "Request of ~{estimated} tokens exceeds the remaining context budget of {remaining_budget}"
                ),
            ));
        }

        // ── STEP 5: Editor context injection ──
        let mut parts = request;
        if !continuation && !has_pending_function_call(&self.session.get_history()) {
            let transcript_empty = self.session.is_empty();
            if let Some(injector) = &mut self.context_injector {
                if let Some(part) = injector.context_message(transcript_empty) {
                    parts.insert(0, part);
                }
            }
        }

        // ── STEP 6: Record the request ──
        self.session.add_history(Content::new(Role::User, parts));
        let request_contents = self.session.get_history();

        // ── STEP 7: Pre-turn repetition check ──
        // A turn refused here never started, so it does not count
        // against the session turn limit.
        if self.loop_detector.turn_started() {
            warn!("Loop detected before turn start");
            self.emit(SessionEvent::LoopDetected).await;
            return Ok(SessionResult::loop_detected(
                self.session_turns,
                self.usage.clone(),
            ));
        }

        // ── STEP 8: Start the turn and stream it, retrying bounded on invalid streams ──
        self.session_turns += 1;
        let turn_id = uuid::Uuid::new_v4().to_string();
        self.emit(SessionEvent::TurnStarted {
            turn_id: turn_id.clone(),
            turn_number: self.session_turns,
        })
        .await;

        let retries = self.config.invalid_stream_retries.max(0);
        let mut attempt = 0;
        let outcome = loop {
            let outcome = match self
                .run_model_turn(&model, request_contents.clone(), &cancel_token)
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.emit(SessionEvent::Error {
                        error: SessionError::transport(e.to_string()),
                    })
                    .await;
                    return Ok(SessionResult::error(
                        self.session_turns,
                        self.usage.clone(),
                        e.to_string(),
                    ));
                }
            };

            let retryable = outcome.invalid_stream
                && outcome.error.is_none()
                && !outcome.cancelled
                && !outcome.loop_detected;
            if retryable && attempt < retries {
                attempt += 1;
                warn!(attempt, retries, "Invalid stream, retrying turn");
                continue;
            }
            break outcome;
        };

        // ── STEP 9: Record the response ──
        let turn_usage = TokenUsage::new(
            estimate_request_tokens(&request_contents),
            (outcome.text.len() / 4) as i64,
        );
        self.usage.add(&turn_usage);

        if !outcome.parts.is_empty() {
            self.session
                .add_history(Content::new(Role::Model, outcome.parts.clone()));
        }
        self.compression_state.last_prompt_tokens =
            estimate_request_tokens(&self.session.get_history());

        // ── STEP 10: Terminal outcomes ──
        if outcome.cancelled {
            info!(turn_id, "Turn cancelled by caller");
            return Ok(SessionResult::cancelled(
                self.session_turns,
                self.usage.clone(),
                outcome.text,
            ));
        }

        if outcome.loop_detected {
            self.emit(SessionEvent::LoopDetected).await;
            return Ok(SessionResult::loop_detected(
                self.session_turns,
                self.usage.clone(),
            ));
        }

        if let Some(message) = outcome.error {
            // The Error event was already forwarded mid-stream; the
            // next-speaker check is skipped on error.
            return Ok(SessionResult::error(
                self.session_turns,
                self.usage.clone(),
                message,
            ));
        }

        if outcome.invalid_stream {
            self.emit(SessionEvent::InvalidStream).await;
            return Ok(SessionResult::error(
                self.session_turns,
                self.usage.clone(),
                "Model stream remained invalid after retries",
            ));
        }

        self.emit(SessionEvent::TurnCompleted {
            turn_id,
            usage: turn_usage,
        })
        .await;

        // ── STEP 11: Pending tool calls end this leg ──
        if !outcome.pending_calls.is_empty() {
            return Ok(SessionResult::done(
                self.session_turns,
                self.usage.clone(),
                outcome.text,
                outcome.pending_calls,
            ));
        }

        // ── STEP 12: Ask who speaks next, recurse on "model" ──
        let history = self.session.get_history();
        let should_continue = match self.next_speaker.check(&history).await {
            Ok(Some(decision)) => {
                debug!(
                    next_speaker = ?decision.next_speaker,
                    reasoning = %decision.reasoning,
                    "Next-speaker verdict"
                );
                decision.next_speaker == NextSpeaker::Model
            }
            Ok(None) => self.config.continue_on_inconclusive,
            Err(e) => {
                debug!(error = %e, "Next-speaker check failed, stopping");
                false
            }
        };

        if should_continue {
            let continuation_request = continuation_message().parts;
            return Box::pin(self.run_leg(
                continuation_request,
                prompt_id,
                cancel_token,
                remaining_turns - 1,
            ))
            .await;
        }

        Ok(SessionResult::done(
            self.session_turns,
            self.usage.clone(),
            outcome.text,
            Vec::new(),
        ))
    }

    /// Stream one model turn and collect its events.
    ///
    /// The turn runs under a child token so a detected loop aborts only
    /// the in-flight call; cancelling the caller's token propagates to
    /// the child.
    async fn run_model_turn(
        &mut self,
        model: &str,
        request: Vec<Content>,
        cancel_token: &CancellationToken,
    ) -> Result<TurnOutcome> {
        let child = cancel_token.child_token();
        let mut rx = self
            .transport
            .stream_turn(model, request, child.clone())
            .await?;

        let mut outcome = TurnOutcome::default();
        loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    child.cancel();
                    outcome.cancelled = true;
                    break;
                }
                event = rx.recv() => {
                    let Some(event) = event else {
                        break;
                    };

                    if self.loop_detector.add_and_check(&event) {
                        child.cancel();
                        outcome.loop_detected = true;
                        break;
                    }

                    match &event {
                        TurnEvent::Content { text } => {
                            outcome.text.push_str(text);
                        }
                        TurnEvent::FunctionCallRequest { call } => {
                            outcome.pending_calls.push(call.clone());
                            outcome.parts.push(Part::FunctionCall(call.clone()));
                        }
                        TurnEvent::Error { message } => {
                            outcome.error = Some(message.clone());
                        }
                        TurnEvent::InvalidStream => {
                            outcome.invalid_stream = true;
                        }
                        TurnEvent::Thought { .. } => {}
                    }

                    self.forward(event).await;
                }
            }
        }

        if !outcome.text.is_empty() {
            outcome.parts.insert(
                0,
                Part::Text {
                    text: outcome.text.clone(),
                },
            );
        }
        Ok(outcome)
    }

    /// Map a transport event onto the caller-facing event stream.
    async fn forward(&self, event: TurnEvent) {
        let mapped = match event {
            TurnEvent::Content { text } => SessionEvent::Content { text },
            TurnEvent::Thought { text } => SessionEvent::Thought { text },
            TurnEvent::FunctionCallRequest { call } => SessionEvent::FunctionCallRequest { call },
            TurnEvent::Error { message } => SessionEvent::Error {
                error: SessionError::transport(message),
            },
            // Surfaced only once retries are exhausted.
            TurnEvent::InvalidStream => return,
        };
        self.emit(mapped).await;
    }

    /// Resolve the sticky model for the given prompt sequence.
    async fn resolve_model(&mut self, prompt_id: &str) -> Result<String> {
        let mut sequence = match self.sequence.take() {
            Some(seq) if seq.prompt_id() == prompt_id => seq,
            _ => {
                self.loop_detector.reset();
                SequenceState::new(prompt_id, self.fallback_mode)
            }
        };

        let history = self.session.get_history();
        let model = sequence
            .resolve_model(
                self.router.as_ref(),
                self.config.fallback_model.as_deref(),
                &history,
            )
            .await;
        self.sequence = Some(sequence);
        model
    }

    /// Send an event, ignoring a dropped receiver.
    async fn emit(&self, event: SessionEvent) {
        if self.event_tx.send(event).await.is_err() {
            debug!("Event receiver dropped");
        }
    }
}

#[cfg(test)]
#[path = "driver.test.rs"]
mod tests;
