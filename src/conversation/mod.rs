//! The conversation orchestration engine.
//!
//! [`ConversationController`] reconciles racy input sources
//! (speech-capture notifications, a single in-flight network exchange,
//! and playback commands) into a consistent, append-only
//! [`ConversationState`].

pub mod controller;
pub mod messages;
pub mod state;

pub use controller::{ControllerHandle, ConversationController, Phase};
pub use messages::{ControllerEvent, Message, Role};
pub use state::ConversationState;
