//! Synthesis voice enumeration and grouping.
//!
//! Voice lists may arrive empty on first query and populate later:
//! some platforms only deliver them asynchronously, and some never
//! notify at all. The catalog hides that behind a bounded poll: it
//! retries until a non-empty list arrives or a fixed deadline passes,
//! and once a stable list is obtained it never polls again.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Poll interval while waiting for the platform to deliver voices.
const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// How long to keep polling before giving up on this refresh.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Locale → group label table for English voices.
///
/// Voices with locales outside this table are dropped from the grouping
/// (they remain selectable by id). The `en-US` label spelling is
/// historical and load-bearing: stored settings reference it.
const ENGLISH_LOCALE_LABELS: [(&str, &str); 7] = [
    ("en-AU", "English (Australia)"),
    ("en-CA", "English (Canada)"),
    ("en-GB", "English (United Kingdom)"),
    ("en-IE", "English (Ireland)"),
    ("en-IN", "English (India)"),
    ("en-NZ", "English (New Zealand)"),
    ("en-US", "English (United State)"),
];

/// One synthesis voice as reported by the host platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Stable identifier used in settings and when speaking.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// BCP 47 locale tag, e.g. `en-US`.
    pub locale: String,
    /// Whether synthesis runs locally (no network round trip).
    pub local_service: bool,
    /// Whether the platform flags this voice as its default.
    pub is_default: bool,
}

/// Host platform voice enumeration.
///
/// Implementations return whatever the platform currently reports,
/// including an empty list while voices are still loading.
#[async_trait]
pub trait VoicePlatform: Send + Sync {
    /// Current snapshot of available voices.
    async fn voices(&self) -> Vec<Voice>;
}

/// Cached catalog of available synthesis voices.
pub struct VoiceCatalog {
    platform: Arc<dyn VoicePlatform>,
    voices: Vec<Voice>,
    settled: bool,
}

impl VoiceCatalog {
    /// Create an empty catalog over the given platform.
    pub fn new(platform: Arc<dyn VoicePlatform>) -> Self {
        Self {
            platform,
            voices: Vec::new(),
            settled: false,
        }
    }

    /// Re-read the platform's voices, polling until a non-empty list
    /// arrives or the deadline passes.
    ///
    /// Safe to call repeatedly: once a stable list is obtained, later
    /// calls return it without touching the platform again.
    pub async fn refresh(&mut self) -> &[Voice] {
        if self.settled {
            return &self.voices;
        }

        let deadline = Instant::now() + SETTLE_TIMEOUT;
        loop {
            let voices = self.platform.voices().await;
            if !voices.is_empty() {
                debug!("voice catalog settled with {} voices", voices.len());
                self.voices = voices;
                self.settled = true;
                break;
            }
            if Instant::now() >= deadline {
                warn!(
                    "no voices after {}s; giving up until the next refresh",
                    SETTLE_TIMEOUT.as_secs()
                );
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        &self.voices
    }

    /// The current voice list (possibly empty if never settled).
    #[must_use]
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// The platform-flagged default English voice, if any.
    ///
    /// No fallback guess is made when the platform marks no default.
    #[must_use]
    pub fn default_voice(&self) -> Option<&Voice> {
        self.voices
            .iter()
            .find(|voice| voice.is_default && voice.locale.starts_with("en-"))
    }

    /// Local-service English voices bucketed by locale group label.
    ///
    /// Rebuilt on each call; the result never aliases catalog internals
    /// mutably and is safe to hold across refreshes.
    #[must_use]
    pub fn grouped_english_voices(&self) -> BTreeMap<&'static str, Vec<&Voice>> {
        let mut groups: BTreeMap<&'static str, Vec<&Voice>> = BTreeMap::new();
        for voice in &self.voices {
            if !voice.local_service || !voice.locale.starts_with("en-") {
                continue;
            }
            let Some(label) = locale_label(&voice.locale) else {
                continue;
            };
            groups.entry(label).or_default().push(voice);
        }
        groups
    }
}

fn locale_label(locale: &str) -> Option<&'static str> {
    ENGLISH_LOCALE_LABELS
        .iter()
        .find(|(code, _)| *code == locale)
        .map(|(_, label)| *label)
}
