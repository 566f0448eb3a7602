//! Remote chat endpoint client.
//!
//! One request per finalized utterance: `POST {endpoint}/chatgpt/messages`
//! with the utterance text and, when a thread is already open, the
//! `parentMessageId` linking it to the previous turn. The client is
//! stateless and call-scoped; the controller owns the
//! one-request-in-flight invariant and the cancellation handle.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Why an exchange with the endpoint failed.
///
/// All kinds collapse to the same fallback reply for the user, but they
/// stay distinguishable for logging and tests.
#[derive(Debug, thiserror::Error)]
pub enum ResponseFailure {
    /// Endpoint unreachable, connection dropped, or request cancelled.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Endpoint answered with a non-success status.
    #[error("protocol failure: status {status}")]
    Protocol {
        /// The HTTP status code received.
        status: u16,
    },

    /// Response body was not the expected payload shape.
    #[error("decode failure: {0}")]
    Decode(String),
}

/// Request body for one conversation turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundPrompt {
    /// The finalized utterance text.
    pub text: String,
    /// Thread token from the previous successful reply, omitted on the
    /// first turn of a conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_message_id: Option<String>,
}

/// Successful reply payload.
///
/// `message_id` becomes the conversation's next thread token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    /// The assistant's answer text.
    pub answer: String,
    /// Server-issued identifier for this turn.
    pub message_id: String,
}

/// HTTP client for the chat endpoint.
#[derive(Debug, Clone, Default)]
pub struct ResponseClient {
    http: reqwest::Client,
}

impl ResponseClient {
    /// Create a new client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Send one prompt and await the reply.
    ///
    /// Cancelling `cancel` resolves the call with a
    /// [`ResponseFailure::Transport`]; the transport-level abort is
    /// best-effort and the caller must still guard against a late
    /// resolution racing the cancellation.
    ///
    /// # Errors
    ///
    /// Returns the failure kind: `Transport` for connection errors and
    /// cancellation, `Protocol` for non-success statuses, `Decode` for
    /// a malformed payload.
    pub async fn send(
        &self,
        endpoint: &str,
        prompt: &OutboundPrompt,
        cancel: CancellationToken,
    ) -> Result<Reply, ResponseFailure> {
        let url = format!("{endpoint}/chatgpt/messages");
        debug!("sending prompt to {url}");

        let request = self.http.post(&url).json(prompt).send();
        let response = tokio::select! {
            () = cancel.cancelled() => {
                return Err(ResponseFailure::Transport("request cancelled".to_owned()));
            }
            result = request => {
                result.map_err(|e| ResponseFailure::Transport(e.to_string()))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ResponseFailure::Protocol {
                status: status.as_u16(),
            });
        }

        let body = tokio::select! {
            () = cancel.cancelled() => {
                return Err(ResponseFailure::Transport("request cancelled".to_owned()));
            }
            result = response.json::<Reply>() => {
                result.map_err(|e| ResponseFailure::Decode(e.to_string()))?
            }
        };

        Ok(body)
    }
}
