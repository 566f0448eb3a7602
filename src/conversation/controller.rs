//! The conversation state machine.
//!
//! Reconciles capture notifications, a single in-flight network
//! exchange, and playback into an append-only conversation log. All
//! transitions happen on one logical thread (the event loop in
//! [`ConversationController::run`]); correctness rests on ordering and
//! idempotence, not locks:
//!
//! - the log is appended strictly in controller-event order, never by
//!   request completion time;
//! - at most one request is in flight, and a new utterance cannot start
//!   while one is;
//! - a reset advances the conversation epoch, so a resolution that
//!   races the cancellation is recognized as stale and dropped.

use crate::capability::CapabilityReport;
use crate::client::{OutboundPrompt, Reply, ResponseClient, ResponseFailure};
use crate::config::Settings;
use crate::conversation::messages::{ControllerEvent, Message};
use crate::conversation::state::ConversationState;
use crate::error::{LarkError, Result};
use crate::events::EngineEvent;
use crate::speech::{CaptureEvent, SpeechInput, SpeechOutput, VoiceSettings};
use crate::voices::VoiceCatalog;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What the user hears when the exchange fails, whatever the reason.
pub const FALLBACK_RESPONSE: &str = "Failed to get the response, please try again.";

/// Controller phase.
///
/// `Idle` is only reachable when there is no pending capture, no live
/// partial transcript, and no in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing happening; capture may be started.
    Idle,
    /// The capture adapter is recording an utterance.
    Listening,
    /// An utterance is being finalized or its request is in flight.
    Processing,
}

/// Cancellation handle and issuing epoch of the outstanding request.
struct InFlightRequest {
    cancel: CancellationToken,
    epoch: u64,
}

/// Cloneable sender half for feeding the controller event loop.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl ControllerHandle {
    fn send(&self, event: ControllerEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| LarkError::Channel("controller event loop is gone".to_owned()))
    }

    /// Deliver a capture notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller loop has shut down.
    pub fn capture_event(&self, event: CaptureEvent) -> Result<()> {
        self.send(ControllerEvent::Capture(event))
    }

    /// Toggle capture (mic button press).
    ///
    /// # Errors
    ///
    /// Returns an error if the controller loop has shut down.
    pub fn toggle_capture(&self) -> Result<()> {
        self.send(ControllerEvent::ToggleCapture)
    }

    /// Speak a logged message again.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller loop has shut down.
    pub fn replay(&self, text: impl Into<String>) -> Result<()> {
        self.send(ControllerEvent::Replay { text: text.into() })
    }

    /// Reset the conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller loop has shut down.
    pub fn reset(&self) -> Result<()> {
        self.send(ControllerEvent::Reset)
    }

    /// Stop the controller event loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller loop has already shut down.
    pub fn shutdown(&self) -> Result<()> {
        self.send(ControllerEvent::Shutdown)
    }
}

/// Central orchestrator for one voice conversation.
pub struct ConversationController {
    settings: Settings,
    client: ResponseClient,
    input: Arc<dyn SpeechInput>,
    output: Arc<dyn SpeechOutput>,
    state: ConversationState,
    phase: Phase,
    in_flight: Option<InFlightRequest>,
    events_tx: mpsc::UnboundedSender<ControllerEvent>,
    events_rx: mpsc::UnboundedReceiver<ControllerEvent>,
    engine_tx: Option<broadcast::Sender<EngineEvent>>,
}

impl ConversationController {
    /// Create a controller over the given collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`LarkError::Capability`] if the report is missing a
    /// required capability; the controller is never partially
    /// constructed in a degraded mode.
    pub fn new(
        settings: Settings,
        capabilities: &CapabilityReport,
        client: ResponseClient,
        input: Arc<dyn SpeechInput>,
        output: Arc<dyn SpeechOutput>,
    ) -> Result<Self> {
        capabilities.ensure()?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Ok(Self {
            settings,
            client,
            input,
            output,
            state: ConversationState::new(),
            phase: Phase::Idle,
            in_flight: None,
            events_tx,
            events_rx,
            engine_tx: None,
        })
    }

    /// Attach an engine event broadcaster for UI/observability.
    #[must_use]
    pub fn with_engine_events(mut self, tx: broadcast::Sender<EngineEvent>) -> Self {
        self.engine_tx = Some(tx);
        self
    }

    /// A handle for feeding events into the controller loop.
    #[must_use]
    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle {
            tx: self.events_tx.clone(),
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The ordered conversation log, for rendering.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        self.state.messages()
    }

    /// Index of the "active" log entry for UI highlighting.
    ///
    /// In `Idle` the last entry; in `Processing` the prompt whose reply
    /// is pending; in `Listening` nothing committed is active (the live
    /// transcript is rendered separately).
    #[must_use]
    pub fn active_index(&self) -> Option<usize> {
        let last = self.state.messages().len().checked_sub(1)?;
        match self.phase {
            Phase::Idle => Some(last),
            Phase::Listening => None,
            Phase::Processing => self.state.awaiting_response().then_some(last),
        }
    }

    /// Replace the settings snapshot used for the endpoint and voice.
    pub fn update_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    /// Read access to the current settings snapshot.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Fill an empty voice preference with the platform default voice.
    ///
    /// A voice the user already picked is kept.
    pub fn adopt_default_voice(&mut self, catalog: &VoiceCatalog) {
        if !self.settings.voice_id.is_empty() {
            return;
        }
        if let Some(voice) = catalog.default_voice() {
            info!("adopting platform default voice: {}", voice.id);
            self.settings.voice_id = voice.id.clone();
        }
    }

    /// Pump the event loop until [`ControllerHandle::shutdown`].
    ///
    /// # Errors
    ///
    /// Currently infallible at the loop level; the signature leaves
    /// room for fatal collaborator errors.
    pub async fn run(mut self) -> Result<()> {
        info!("conversation controller running");
        while let Some(event) = self.events_rx.recv().await {
            match event {
                ControllerEvent::Capture(capture) => self.on_capture_event(&capture),
                ControllerEvent::ResponseResolved { epoch, result } => {
                    self.on_response_resolved(epoch, result);
                }
                ControllerEvent::ToggleCapture => {
                    if let Err(e) = self.start_or_stop_capture() {
                        warn!("capture toggle failed: {e}");
                    }
                }
                ControllerEvent::Replay { text } => self.speak(&text),
                ControllerEvent::Reset => self.reset(),
                ControllerEvent::Shutdown => break,
            }
        }
        info!("conversation controller stopped");
        Ok(())
    }

    /// Apply one capture notification.
    ///
    /// Idempotent: the same notification delivered twice leaves the
    /// same phase and the same log as delivering it once.
    pub fn on_capture_event(&mut self, event: &CaptureEvent) {
        let next = self.next_phase(event);
        self.set_phase(next);

        // Finalization happens at most once per utterance: entering
        // Processing arms it, and the in-flight slot disarms it until
        // the resolution returns the phase to Idle.
        if self.phase == Phase::Processing && self.in_flight.is_none() {
            let text = event.final_transcript.trim();
            if !text.is_empty() {
                self.finalize_utterance(text.to_owned());
            }
        }
    }

    fn next_phase(&self, event: &CaptureEvent) -> Phase {
        if self.phase == Phase::Processing {
            // Only a response resolution or a reset leaves Processing;
            // capture notifications in this phase are noise (the host
            // disables capture while a request is pending).
            return Phase::Processing;
        }
        if event.listening {
            return Phase::Listening;
        }
        if self.phase == Phase::Listening
            && (!event.live_transcript.trim().is_empty()
                || !event.final_transcript.trim().is_empty())
        {
            // The adapter stopped but an utterance exists (possibly
            // still being finalized); do not fall back to Idle and
            // lose it.
            return Phase::Processing;
        }
        Phase::Idle
    }

    /// Commit the finalized utterance and issue its request.
    fn finalize_utterance(&mut self, text: String) {
        info!("utterance finalized ({} chars)", text.len());
        let prompt = OutboundPrompt {
            text: text.clone(),
            parent_message_id: self.state.thread_token().map(str::to_owned),
        };
        self.state.push_prompt(text.clone());
        self.emit(EngineEvent::MessageAppended(Message::prompt(text)));

        let cancel = CancellationToken::new();
        let epoch = self.state.epoch();
        self.in_flight = Some(InFlightRequest {
            cancel: cancel.clone(),
            epoch,
        });

        let client = self.client.clone();
        let endpoint = self.settings.endpoint();
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = client.send(&endpoint, &prompt, cancel).await;
            // The loop may already be gone on shutdown; nothing to do.
            let _ = events_tx.send(ControllerEvent::ResponseResolved { epoch, result });
        });
    }

    /// Apply the resolution of a request issued under `epoch`.
    pub fn on_response_resolved(
        &mut self,
        epoch: u64,
        result: std::result::Result<Reply, ResponseFailure>,
    ) {
        if epoch != self.state.epoch() {
            debug!(
                "dropping resolution from stale epoch {epoch} (current {})",
                self.state.epoch()
            );
            return;
        }
        if self.in_flight.take().is_none() {
            debug!("dropping duplicate resolution");
            return;
        }

        let text = match result {
            Ok(reply) => {
                self.state.set_thread_token(reply.message_id);
                reply.answer
            }
            Err(failure) => {
                warn!("exchange failed: {failure}");
                FALLBACK_RESPONSE.to_owned()
            }
        };
        self.state.push_response(text.clone());
        self.emit(EngineEvent::MessageAppended(Message::response(text.clone())));
        self.speak(&text);
        self.set_phase(Phase::Idle);
    }

    /// Reset the conversation.
    ///
    /// Atomic from any observer's point of view: the in-flight request
    /// is cancelled and its epoch invalidated, the log and thread token
    /// are cleared, playback is forced idle, and capture is stopped,
    /// all before the next event is processed.
    pub fn reset(&mut self) {
        info!("conversation reset");
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.cancel.cancel();
        }
        self.state.clear();
        self.output.idle();
        self.input.stop();
        self.set_phase(Phase::Idle);
        self.emit(EngineEvent::ConversationCleared);
    }

    /// Toggle capture per the current phase: start it when `Idle`, stop
    /// it when `Listening`, ignore the press while `Processing`.
    ///
    /// # Errors
    ///
    /// Returns an error if the capture adapter fails to start.
    pub fn start_or_stop_capture(&mut self) -> Result<()> {
        match self.phase {
            Phase::Idle => self.input.start(),
            Phase::Listening => {
                self.input.stop();
                Ok(())
            }
            Phase::Processing => Ok(()),
        }
    }

    /// Speak `text` with the current voice settings snapshot.
    pub fn speak(&self, text: &str) {
        let voice = VoiceSettings {
            voice_id: self.settings.voice_id.clone(),
            rate: self.settings.rate,
        };
        self.output.speak(text, &voice);
        self.emit(EngineEvent::Spoken {
            text: text.to_owned(),
        });
    }

    fn set_phase(&mut self, phase: Phase) {
        if phase == self.phase {
            return;
        }
        debug!("phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        self.emit(EngineEvent::PhaseChanged(phase));
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(tx) = &self.engine_tx {
            // Nobody listening is fine.
            let _ = tx.send(event);
        }
    }
}
