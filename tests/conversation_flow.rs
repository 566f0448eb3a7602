//! End-to-end engine tests: capture events in, endpoint exchange,
//! spoken reply out — driven through the controller event loop the way
//! a host shell drives it.

use lark::{
    CapabilityReport, CaptureEvent, ControllerHandle, ConversationController, EngineEvent, Message,
    Phase, ResponseClient, Role, Settings, SpeechInput, SpeechOutput, VoiceSettings,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct StubInput {
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl StubInput {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        })
    }
}

impl SpeechInput for StubInput {
    fn is_available(&self) -> bool {
        true
    }
    fn microphone_available(&self) -> bool {
        true
    }
    fn start(&self) -> lark::Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

struct RecordingSpeaker {
    spoken: Mutex<Vec<(String, VoiceSettings)>>,
}

impl RecordingSpeaker {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            spoken: Mutex::new(Vec::new()),
        })
    }

    fn spoken_texts(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }
}

impl SpeechOutput for RecordingSpeaker {
    fn is_available(&self) -> bool {
        true
    }
    fn speak(&self, text: &str, voice: &VoiceSettings) {
        self.spoken
            .lock()
            .unwrap()
            .push((text.to_owned(), voice.clone()));
    }
    fn idle(&self) {}
}

/// Split a mock server URI back into the host/port pair settings hold.
fn settings_for(uri: &str) -> Settings {
    let (host, port) = uri.rsplit_once(':').expect("mock uri has a port");
    Settings {
        host: host.to_owned(),
        port: port.parse().expect("numeric port"),
        voice_id: "samantha".to_owned(),
        rate: 1.0,
    }
}

struct Engine {
    handle: ControllerHandle,
    events: broadcast::Receiver<EngineEvent>,
    input: Arc<StubInput>,
    speaker: Arc<RecordingSpeaker>,
}

fn start_engine(settings: Settings) -> Engine {
    let input = StubInput::new();
    let speaker = RecordingSpeaker::new();
    let capabilities = CapabilityReport {
        speech_capture: true,
        microphone: true,
        speech_output: true,
    };
    let (engine_tx, events) = broadcast::channel(64);
    let controller = ConversationController::new(
        settings,
        &capabilities,
        ResponseClient::new(),
        Arc::clone(&input) as Arc<dyn SpeechInput>,
        Arc::clone(&speaker) as Arc<dyn SpeechOutput>,
    )
    .expect("capabilities are complete")
    .with_engine_events(engine_tx);
    let handle = controller.handle();
    tokio::spawn(controller.run());

    Engine {
        handle,
        events,
        input,
        speaker,
    }
}

impl Engine {
    fn utter(&self, text: &str) {
        self.handle
            .capture_event(CaptureEvent {
                listening: true,
                live_transcript: text.to_owned(),
                final_transcript: String::new(),
            })
            .expect("loop alive");
        self.handle
            .capture_event(CaptureEvent {
                listening: false,
                live_transcript: text.to_owned(),
                final_transcript: text.to_owned(),
            })
            .expect("loop alive");
    }

    async fn next_event(&mut self) -> EngineEvent {
        tokio::time::timeout(Duration::from_secs(10), self.events.recv())
            .await
            .expect("engine event within deadline")
            .expect("event channel alive")
    }

    /// Collect committed messages until the controller settles back to
    /// Idle.
    async fn drain_turn(&mut self) -> Vec<Message> {
        let mut committed = Vec::new();
        loop {
            match self.next_event().await {
                EngineEvent::MessageAppended(message) => committed.push(message),
                EngineEvent::PhaseChanged(Phase::Idle) => return committed,
                _ => {}
            }
        }
    }
}

#[tokio::test]
async fn exchange_commits_prompt_and_reply_in_order() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chatgpt/messages"))
        .and(body_json(json!({ "text": "hello" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "answer": "hi there", "messageId": "m1" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut engine = start_engine(settings_for(&mock_server.uri()));
    engine.utter("hello");

    let committed = engine.drain_turn().await;
    assert_eq!(
        committed,
        vec![Message::prompt("hello"), Message::response("hi there")]
    );
    assert_eq!(engine.speaker.spoken_texts(), vec!["hi there".to_owned()]);
}

#[tokio::test]
async fn follow_up_utterance_links_to_the_thread() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chatgpt/messages"))
        .and(body_json(json!({ "text": "hello" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "answer": "hi there", "messageId": "m1" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    // The second request must carry the token from the first reply.
    Mock::given(method("POST"))
        .and(path("/chatgpt/messages"))
        .and(body_json(json!({ "text": "again", "parentMessageId": "m1" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "answer": "still here", "messageId": "m2" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut engine = start_engine(settings_for(&mock_server.uri()));
    engine.utter("hello");
    engine.drain_turn().await;

    engine.utter("again");
    let committed = engine.drain_turn().await;
    assert_eq!(
        committed,
        vec![Message::prompt("again"), Message::response("still here")]
    );
}

#[tokio::test]
async fn endpoint_failure_speaks_fallback_and_starts_no_thread() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chatgpt/messages"))
        .and(body_json(json!({ "text": "hello" })))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;
    // No thread was opened, so the retry must not carry a token.
    Mock::given(method("POST"))
        .and(path("/chatgpt/messages"))
        .and(body_json(json!({ "text": "hello again" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "answer": "recovered", "messageId": "m9" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut engine = start_engine(settings_for(&mock_server.uri()));
    engine.utter("hello");

    let committed = engine.drain_turn().await;
    assert_eq!(committed[0], Message::prompt("hello"));
    assert_eq!(committed[1].role, Role::Response);
    assert_eq!(committed[1].text, lark::FALLBACK_RESPONSE);
    assert_eq!(
        engine.speaker.spoken_texts(),
        vec![lark::FALLBACK_RESPONSE.to_owned()]
    );

    engine.utter("hello again");
    let committed = engine.drain_turn().await;
    assert_eq!(committed[1], Message::response("recovered"));
}

#[tokio::test]
async fn reset_drops_the_late_resolution() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chatgpt/messages"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "answer": "too late", "messageId": "m1" }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let mut engine = start_engine(settings_for(&mock_server.uri()));
    engine.utter("hello");

    // Wait until the prompt is committed (request in flight), then pull
    // the rug out.
    loop {
        if let EngineEvent::MessageAppended(message) = engine.next_event().await {
            assert_eq!(message.role, Role::Prompt);
            break;
        }
    }
    engine.handle.reset().expect("loop alive");
    loop {
        if matches!(engine.next_event().await, EngineEvent::ConversationCleared) {
            break;
        }
    }
    assert_eq!(engine.input.stops.load(Ordering::SeqCst), 1);

    // Give the delayed response ample time to arrive and be discarded.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(engine.speaker.spoken_texts().is_empty());
    while let Ok(event) = engine.events.try_recv() {
        assert!(
            !matches!(event, EngineEvent::MessageAppended(_)),
            "no message may be committed after a reset"
        );
    }
}

#[tokio::test]
async fn toggle_and_replay_reach_the_adapters() {
    let mock_server = MockServer::start().await;
    let mut engine = start_engine(settings_for(&mock_server.uri()));

    engine.handle.toggle_capture().expect("loop alive");
    engine.handle.replay("hi there").expect("loop alive");
    loop {
        if matches!(engine.next_event().await, EngineEvent::Spoken { .. }) {
            break;
        }
    }
    assert_eq!(engine.input.starts.load(Ordering::SeqCst), 1);
    assert_eq!(engine.speaker.spoken_texts(), vec!["hi there".to_owned()]);

    // Replay snapshots the voice settings the engine currently holds.
    let spoken = engine.speaker.spoken.lock().unwrap();
    assert_eq!(spoken[0].1.voice_id, "samantha");
}
