use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use voicepay_core::types::PaymentIntent;

/// How long the transcript must stay quiet before an attempt finalizes.
pub const DEFAULT_SILENCE_WINDOW: Duration = Duration::from_millis(3500);
pub const DEFAULT_LOCALE: &str = "en-IN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub locale: String,
    pub silence_window: Duration,
    /// Capacity of the live-transcript channel; updates beyond it are
    /// dropped rather than stalling the driver.
    pub live_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.into(),
            silence_window: DEFAULT_SILENCE_WINDOW,
            live_buffer: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Listening,
    AwaitingSilence,
    Finalizing,
    Done,
    Failed,
}

/// Stable error codes surfaced to callers. Callers branch on the variant,
/// never on message text; `Display` carries the user-facing phrasing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No streaming recognizer capability in this runtime. Fatal for the
    /// session; the only recovery is a different input mode.
    #[error("speech recognition is not available on this device")]
    Unsupported,

    #[error("microphone permission was denied")]
    PermissionDenied,

    /// Recoverable by retrying a fresh attempt.
    #[error("no speech was detected")]
    NoSpeechDetected,

    /// Any other recognizer-raised code, carried verbatim.
    #[error("speech recognizer failed: {0}")]
    RecognizerTransport(String),

    /// Finalize ran but the parser produced neither amount nor payee.
    #[error("could not understand the command, please rephrase")]
    ParseAmbiguous,
}

pub fn classify_recognizer_error(code: &str) -> SessionError {
    match code {
        "not-allowed" | "service-not-allowed" => SessionError::PermissionDenied,
        "no-speech" => SessionError::NoSpeechDetected,
        other => SessionError::RecognizerTransport(other.to_string()),
    }
}

/// Non-terminal progress update: the transcript as heard so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveTranscript {
    pub committed: String,
    pub partial: String,
}

impl LiveTranscript {
    pub fn combined(&self) -> String {
        let c = self.committed.trim();
        let p = self.partial.trim();
        if c.is_empty() {
            return p.to_string();
        }
        if p.is_empty() {
            return c.to_string();
        }
        format!("{c} {p}")
    }
}

pub type AttemptOutcome = Result<PaymentIntent, SessionError>;
