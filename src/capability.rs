//! Host capability probing.
//!
//! A conversation cannot run without speech capture, microphone access,
//! and speech synthesis. The host probes its adapters once, before the
//! controller is constructed; a missing capability is fatal rather than
//! a degraded mode.

use crate::error::{LarkError, Result};
use crate::speech::{SpeechInput, SpeechOutput};

/// Result of probing the host's speech capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityReport {
    /// Host supports continuous speech capture.
    pub speech_capture: bool,
    /// Microphone permission is granted.
    pub microphone: bool,
    /// Host supports speech synthesis.
    pub speech_output: bool,
}

impl CapabilityReport {
    /// Probe the given adapters.
    pub fn probe(input: &dyn SpeechInput, output: &dyn SpeechOutput) -> Self {
        Self {
            speech_capture: input.is_available(),
            microphone: input.microphone_available(),
            speech_output: output.is_available(),
        }
    }

    /// Fail with the first missing capability, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LarkError::Capability`] naming the missing capability.
    pub fn ensure(&self) -> Result<()> {
        if !self.speech_capture {
            return Err(LarkError::Capability(
                "host does not support speech recognition".to_owned(),
            ));
        }
        if !self.microphone {
            return Err(LarkError::Capability(
                "microphone permission is not granted".to_owned(),
            ));
        }
        if !self.speech_output {
            return Err(LarkError::Capability(
                "host does not support speech synthesis".to_owned(),
            ));
        }
        Ok(())
    }
}
