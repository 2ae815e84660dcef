use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One incremental update from a streaming speech recognizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TranscriptEvent {
    /// Tentative text; replaced wholesale by the next interim update.
    Interim { text: String },
    /// Committed text; appended to the attempt's final transcript.
    Final { text: String },
    /// The provider stopped streaming on its own (e.g. provider timeout).
    StreamEnded,
    /// A provider-raised error code, e.g. "not-allowed" or "no-speech".
    RecognizerError { code: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
}

/// Abstract streaming-recognizer capability.
///
/// The session never talks to a concrete speech backend; it consumes
/// `TranscriptEvent`s from whatever implements this trait.
#[async_trait]
pub trait StreamingRecognizer: Send + Sync {
    /// Whether the runtime has a streaming recognizer at all.
    fn is_supported(&self) -> bool;

    /// Best-effort permission probe. Implementations without a permission
    /// API must return `Prompt`, never block.
    async fn query_permission(&self) -> PermissionState;

    /// Starts streaming for one attempt. No event may be delivered before
    /// this resolves, so the caller's permission gate always completes
    /// first.
    async fn begin(&self, locale: &str) -> anyhow::Result<mpsc::Receiver<TranscriptEvent>>;

    /// Stops streaming. Idempotent; callable at any time.
    async fn end(&self);
}
