//! Message types for the conversation log and controller event loop.

use crate::client::{Reply, ResponseFailure};
use crate::speech::CaptureEvent;

/// Who produced a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A finalized user utterance.
    Prompt,
    /// The assistant's reply (or the fallback text on failure).
    Response,
}

/// One committed entry in the conversation log.
///
/// Immutable once appended; ordering is the log's insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Who produced this entry.
    pub role: Role,
    /// The entry text.
    pub text: String,
}

impl Message {
    /// A prompt entry.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            role: Role::Prompt,
            text: text.into(),
        }
    }

    /// A response entry.
    pub fn response(text: impl Into<String>) -> Self {
        Self {
            role: Role::Response,
            text: text.into(),
        }
    }
}

/// Inputs consumed by the controller event loop.
#[derive(Debug)]
pub enum ControllerEvent {
    /// Notification from the speech capture adapter.
    Capture(CaptureEvent),
    /// The in-flight request resolved.
    ///
    /// `epoch` is the conversation epoch the request was issued under;
    /// resolutions stamped with a stale epoch are discarded.
    ResponseResolved {
        /// Epoch at issue time.
        epoch: u64,
        /// The reply payload or categorized failure.
        result: Result<Reply, ResponseFailure>,
    },
    /// User toggled capture (mic button).
    ToggleCapture,
    /// User asked for a logged message to be spoken again.
    Replay {
        /// Text to speak.
        text: String,
    },
    /// User reset the conversation.
    Reset,
    /// Stop the event loop.
    Shutdown,
}
