//! Append-only conversation state.

use crate::conversation::messages::{Message, Role};

/// The conversation log, thread-continuation token, and epoch.
///
/// Owned exclusively by the controller; collaborators observe it
/// through snapshots and events, never mutate it.
#[derive(Debug, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    thread_token: Option<String>,
    /// Monotonic counter invalidating stale asynchronous results.
    /// Incremented only by [`clear`](Self::clear).
    epoch: u64,
}

impl ConversationState {
    /// Fresh, empty state at epoch zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The ordered message log.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Thread token from the most recent successful reply, if any.
    #[must_use]
    pub fn thread_token(&self) -> Option<&str> {
        self.thread_token.as_deref()
    }

    /// The current conversation epoch.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Append a prompt entry.
    pub fn push_prompt(&mut self, text: impl Into<String>) {
        self.messages.push(Message::prompt(text));
    }

    /// Append a response entry.
    pub fn push_response(&mut self, text: impl Into<String>) {
        self.messages.push(Message::response(text));
    }

    /// Record the thread token carried by a successful reply.
    pub fn set_thread_token(&mut self, token: impl Into<String>) {
        self.thread_token = Some(token.into());
    }

    /// Clear log and token, advancing the epoch so any still-pending
    /// asynchronous result is recognizably stale.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.thread_token = None;
        self.epoch += 1;
    }

    /// Whether the log's last entry is a prompt still awaiting its
    /// response.
    #[must_use]
    pub fn awaiting_response(&self) -> bool {
        matches!(
            self.messages.last(),
            Some(message) if message.role == Role::Prompt
        )
    }
}
