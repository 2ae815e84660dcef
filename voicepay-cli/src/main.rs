use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use voicepay_core::command::CommandParser;
use voicepay_core::lexicon::Lexicon;
use voicepay_engine::engine::{RecognizerHandle, TranscriptSession};
use voicepay_engine::session::SessionConfig;
use voicepay_engine::traits::{PermissionState, StreamingRecognizer, TranscriptEvent};

/// Replays a phrase word by word, the way a live recognizer would: growing
/// interim updates, then one committed segment.
struct ScriptedRecognizer {
    phrase: String,
}

#[async_trait::async_trait]
impl StreamingRecognizer for ScriptedRecognizer {
    fn is_supported(&self) -> bool {
        true
    }

    async fn query_permission(&self) -> PermissionState {
        PermissionState::Granted
    }

    async fn begin(&self, locale: &str) -> anyhow::Result<mpsc::Receiver<TranscriptEvent>> {
        log::debug!("scripted recognizer streaming ({locale})");
        let (tx, rx) = mpsc::channel(16);
        let phrase = self.phrase.clone();
        tokio::spawn(async move {
            let mut spoken = String::new();
            for word in phrase.split_whitespace() {
                if !spoken.is_empty() {
                    spoken.push(' ');
                }
                spoken.push_str(word);
                if tx
                    .send(TranscriptEvent::Interim {
                        text: spoken.clone(),
                    })
                    .await
                    .is_err()
                {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(180)).await;
            }
            let _ = tx.send(TranscriptEvent::Final { text: phrase }).await;
        });
        Ok(rx)
    }

    async fn end(&self) {}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let phrase = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let phrase = if phrase.trim().is_empty() {
        "Pay ₹400 to Prashant".to_string()
    } else {
        phrase
    };

    let parser = Arc::new(CommandParser::new(Lexicon::default())?);
    let recognizer = Arc::new(ScriptedRecognizer { phrase });
    let session = TranscriptSession::new(
        RecognizerHandle::new(recognizer),
        parser,
        SessionConfig {
            // Short window so the demo doesn't sit through a real pause.
            silence_window: Duration::from_millis(600),
            ..Default::default()
        },
    );

    let mut attempt = session.start().await?;
    while let Some(update) = attempt.live.recv().await {
        println!("[listening] {}", update.combined());
    }

    match attempt.wait().await {
        Some(Ok(intent)) => {
            println!("pay {} to {} (heard: {:?})", intent.amount, intent.payee, intent.raw_text);
        }
        Some(Err(e)) => println!("failed: {e}"),
        None => println!("aborted"),
    }

    Ok(())
}
