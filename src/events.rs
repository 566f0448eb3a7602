//! Events emitted by the controller for UI and observability.
//!
//! Intentionally lightweight so the controller can emit without
//! blocking its event loop; frontends subscribe via a broadcast
//! channel and render from these instead of polling state.

use crate::conversation::{Message, Phase};

/// What the conversation engine is doing "right now".
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The controller moved to a new phase.
    PhaseChanged(Phase),
    /// A message was committed to the conversation log.
    MessageAppended(Message),
    /// A reply (or replayed message) was handed to speech output.
    Spoken {
        /// The text being spoken.
        text: String,
    },
    /// The conversation was reset: log, thread token, and playback all
    /// cleared.
    ConversationCleared,
}
