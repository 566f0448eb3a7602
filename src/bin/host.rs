//! Headless line-mode host for the conversation engine.
//!
//! Stands in for a real speech front end: each stdin line is treated as
//! one finalized utterance, and replies are "spoken" to stdout. Useful
//! for exercising the engine against a live endpoint without any
//! platform speech stack.
//!
//! Commands: `/reset` clears the conversation, `/quit` exits.

use lark::{
    CapabilityReport, CaptureEvent, ConversationController, EngineEvent, Phase, ResponseClient,
    Settings, SpeechInput, SpeechOutput, VoiceSettings,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Capture adapter driven by stdin instead of a microphone.
struct LineCapture {
    listening: AtomicBool,
}

impl SpeechInput for LineCapture {
    fn is_available(&self) -> bool {
        true
    }

    fn microphone_available(&self) -> bool {
        true
    }

    fn start(&self) -> lark::Result<()> {
        self.listening.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }
}

/// Synthesis adapter that prints instead of speaking.
struct ConsoleSpeaker;

impl SpeechOutput for ConsoleSpeaker {
    fn is_available(&self) -> bool {
        true
    }

    fn speak(&self, text: &str, voice: &VoiceSettings) {
        debug!("speaking at rate {}", voice.rate);
        println!("lark> {text}");
    }

    fn idle(&self) {
        debug!("playback idled");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lark=warn")),
        )
        .init();

    let config_path = Settings::default_config_path();
    let settings = if config_path.is_file() {
        Settings::from_file(&config_path)?
    } else {
        Settings::default()
    };
    info!("using endpoint {}", settings.endpoint());

    let input = Arc::new(LineCapture {
        listening: AtomicBool::new(false),
    });
    let output = Arc::new(ConsoleSpeaker);
    let capabilities = CapabilityReport::probe(input.as_ref(), output.as_ref());
    capabilities.ensure()?;

    let (engine_tx, mut engine_rx) = broadcast::channel::<EngineEvent>(64);
    let controller = ConversationController::new(
        settings,
        &capabilities,
        ResponseClient::new(),
        input as Arc<dyn SpeechInput>,
        output as Arc<dyn SpeechOutput>,
    )?
    .with_engine_events(engine_tx);
    let handle = controller.handle();
    let loop_task = tokio::spawn(controller.run());

    println!("lark line-mode host: type an utterance, /reset, or /quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => {}
            "/quit" => break,
            "/reset" => handle.reset()?,
            utterance => {
                handle.capture_event(CaptureEvent {
                    listening: true,
                    live_transcript: utterance.to_owned(),
                    final_transcript: String::new(),
                })?;
                handle.capture_event(CaptureEvent {
                    listening: false,
                    live_transcript: utterance.to_owned(),
                    final_transcript: utterance.to_owned(),
                })?;

                // Block the prompt until the reply has been spoken.
                while let Ok(event) = engine_rx.recv().await {
                    if matches!(event, EngineEvent::PhaseChanged(Phase::Idle)) {
                        break;
                    }
                }
            }
        }
    }

    handle.shutdown()?;
    loop_task.await??;
    Ok(())
}
