//! Collaborator seams for the host platform's speech capabilities.
//!
//! The engine neither captures nor synthesizes audio itself. The host
//! shell implements these traits over whatever the platform exposes
//! (native speech frameworks, a browser bridge, a test fake) and feeds
//! capture notifications into the controller as [`CaptureEvent`]s.

use crate::error::Result;

/// One notification from the speech capture adapter.
///
/// Adapters may fire duplicate notifications and may report
/// `listening = false` before a final transcript exists; the controller
/// is written to tolerate both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureEvent {
    /// Whether the adapter is currently capturing audio.
    pub listening: bool,
    /// Live (interim) transcript of the in-progress utterance.
    pub live_transcript: String,
    /// Finalized transcript, empty until the adapter commits one.
    pub final_transcript: String,
}

/// Voice parameters snapshotted at the moment a reply is spoken.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    /// Synthesis voice identifier; empty means the platform default.
    pub voice_id: String,
    /// Playback rate multiplier.
    pub rate: f32,
}

/// Continuous speech-to-text capture, owned by the host.
pub trait SpeechInput: Send + Sync {
    /// Whether the host supports speech capture at all.
    fn is_available(&self) -> bool;

    /// Whether microphone access has been granted.
    fn microphone_available(&self) -> bool;

    /// Begin capturing.
    ///
    /// # Errors
    ///
    /// Returns an error if the capture stream cannot be started.
    fn start(&self) -> Result<()>;

    /// Stop capturing. Must be safe to call when not capturing.
    fn stop(&self);
}

/// Speech synthesis output, owned by the host.
///
/// Commands are fire-and-forget: the adapter queues and plays audio on
/// its own schedule, and `idle` discards anything queued or playing.
pub trait SpeechOutput: Send + Sync {
    /// Whether the host supports speech synthesis at all.
    fn is_available(&self) -> bool;

    /// Speak `text` with the given voice parameters.
    fn speak(&self, text: &str, voice: &VoiceSettings);

    /// Force playback idle, cancelling anything queued or in progress.
    fn idle(&self);
}
