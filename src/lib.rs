//! Lark: voice-driven conversational assistant engine.
//!
//! Captures spoken input through a host-provided adapter, forwards each
//! finalized utterance to a remote chat endpoint, and speaks the reply
//! back.
//!
//! # Architecture
//!
//! The core is a finite-state controller reconciling racy inputs into
//! an append-only conversation history:
//! - **Speech adapters**: host-implemented capture/synthesis seams
//!   ([`speech`])
//! - **Controller**: the Idle/Listening/Processing state machine
//!   ([`conversation`])
//! - **Response client**: one cancellable request per utterance
//!   ([`client`])
//! - **Voice catalog**: synthesis voice enumeration and grouping
//!   ([`voices`])
//!
//! Rendering, settings UI, and the speech primitives themselves live in
//! the host; the engine only exposes its log, phase, and events.

pub mod capability;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod speech;
pub mod voices;

pub use capability::CapabilityReport;
pub use client::{Reply, ResponseClient, ResponseFailure};
pub use config::Settings;
pub use conversation::controller::FALLBACK_RESPONSE;
pub use conversation::{
    ControllerHandle, ConversationController, ConversationState, Message, Phase, Role,
};
pub use error::{LarkError, Result};
pub use events::EngineEvent;
pub use speech::{CaptureEvent, SpeechInput, SpeechOutput, VoiceSettings};
pub use voices::{Voice, VoiceCatalog, VoicePlatform};
