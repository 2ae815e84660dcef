use crate::session::{
    AttemptOutcome, LiveTranscript, SessionConfig, SessionError, SessionState,
    classify_recognizer_error,
};
use crate::traits::{PermissionState, StreamingRecognizer, TranscriptEvent};
use futures_util::future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Sleep;
use voicepay_core::command::CommandParser;
use voicepay_core::types::SessionId;

/// A streaming recognizer plus its single-attempt arm slot.
///
/// Arming is scoped to the recognizer, not to any one session: clones
/// share the slot, so however many sessions are built over the same
/// handle, only one attempt may stream against the recognizer at a time.
#[derive(Clone)]
pub struct RecognizerHandle {
    inner: Arc<dyn StreamingRecognizer>,
    armed: Arc<AtomicBool>,
}

impl RecognizerHandle {
    pub fn new(recognizer: Arc<dyn StreamingRecognizer>) -> Self {
        Self {
            inner: recognizer,
            armed: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// One listening session against a streaming recognizer.
///
/// A session may run any number of attempts over its lifetime (permission
/// is probed per `start`, prompted at most once by the backend); the arm
/// slot lives on the [`RecognizerHandle`].
pub struct TranscriptSession {
    recognizer: RecognizerHandle,
    parser: Arc<CommandParser>,
    cfg: SessionConfig,
}

enum AttemptCmd {
    Stop,
}

/// Cloneable stop handle for a running attempt.
#[derive(Clone)]
pub struct AttemptHandle {
    cmd_tx: mpsc::Sender<AttemptCmd>,
}

impl AttemptHandle {
    /// Silently aborts the attempt: no outcome is ever dispatched, pending
    /// timers are cleared, the recognizer is stopped. Safe to call from any
    /// state, including after the attempt already finished (no-op then).
    pub async fn stop(&self) {
        let _ = self.cmd_tx.send(AttemptCmd::Stop).await;
    }
}

/// A running attempt: live transcript updates plus exactly one terminal
/// outcome. The outcome channel is a oneshot, so at-most-once dispatch is
/// a property of the types, not of a runtime flag.
pub struct Attempt {
    pub session_id: SessionId,
    pub live: mpsc::Receiver<LiveTranscript>,
    pub outcome: oneshot::Receiver<AttemptOutcome>,
    handle: AttemptHandle,
}

impl Attempt {
    pub fn handle(&self) -> AttemptHandle {
        self.handle.clone()
    }

    pub async fn stop(&self) {
        self.handle.stop().await;
    }

    /// Resolves the terminal outcome. `None` means the attempt was stopped
    /// before anything was dispatched.
    pub async fn wait(self) -> Option<AttemptOutcome> {
        self.outcome.await.ok()
    }
}

impl TranscriptSession {
    pub fn new(recognizer: RecognizerHandle, parser: Arc<CommandParser>, cfg: SessionConfig) -> Self {
        Self {
            recognizer,
            parser,
            cfg,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer.inner.is_supported()
    }

    /// Begins one listening attempt.
    ///
    /// Fails fast (before any streaming starts) when the capability is
    /// missing, permission is already denied, or another attempt is still
    /// armed against this recognizer.
    pub async fn start(&self) -> Result<Attempt, SessionError> {
        if !self.recognizer.inner.is_supported() {
            return Err(SessionError::Unsupported);
        }

        if self.recognizer.inner.query_permission().await == PermissionState::Denied {
            return Err(SessionError::PermissionDenied);
        }

        if self
            .recognizer
            .armed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SessionError::RecognizerTransport("recognizer-busy".into()));
        }
        let armed = ArmGuard(Arc::clone(&self.recognizer.armed));

        let events = match self.recognizer.inner.begin(&self.cfg.locale).await {
            Ok(rx) => rx,
            Err(e) => return Err(SessionError::RecognizerTransport(e.to_string())),
        };

        let session_id = SessionId::new();
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (live_tx, live_rx) = mpsc::channel(self.cfg.live_buffer);
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let driver = AttemptDriver {
            session_id,
            recognizer: Arc::clone(&self.recognizer.inner),
            parser: Arc::clone(&self.parser),
            silence_window: self.cfg.silence_window,
            _armed: armed,
        };
        tokio::spawn(driver.run(events, cmd_rx, live_tx, outcome_tx));

        Ok(Attempt {
            session_id,
            live: live_rx,
            outcome: outcome_rx,
            handle: AttemptHandle { cmd_tx },
        })
    }
}

// Releases the one-armed-attempt slot when the driver task exits, however
// it exits.
struct ArmGuard(Arc<AtomicBool>);

impl Drop for ArmGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct AttemptDriver {
    session_id: SessionId,
    recognizer: Arc<dyn StreamingRecognizer>,
    parser: Arc<CommandParser>,
    silence_window: std::time::Duration,
    _armed: ArmGuard,
}

impl AttemptDriver {
    /// Single task per attempt: transcript events, timer expiry and stop
    /// requests are serialized here, so session state needs no locking.
    async fn run(
        self,
        mut events: mpsc::Receiver<TranscriptEvent>,
        mut cmd_rx: mpsc::Receiver<AttemptCmd>,
        live_tx: mpsc::Sender<LiveTranscript>,
        outcome_tx: oneshot::Sender<AttemptOutcome>,
    ) {
        let id = self.session_id;
        let mut state = SessionState::Listening;
        let mut final_transcript = String::new();
        let mut interim = String::new();
        let mut silence: Option<Pin<Box<Sleep>>> = None;

        log::debug!("session {id}: listening");

        let outcome = loop {
            tokio::select! {
                biased;

                cmd = cmd_rx.recv() => {
                    // Explicit stop, or every handle dropped: silent abort
                    // either way. The unsent oneshot is the no-dispatch
                    // guarantee.
                    let _ = cmd;
                    log::debug!("session {id}: stopped by caller in state {state:?}");
                    self.recognizer.end().await;
                    return;
                }

                _ = async {
                    if let Some(s) = silence.as_mut() {
                        s.as_mut().await
                    } else {
                        future::pending::<()>().await
                    }
                } => {
                    silence = None;
                    if final_transcript.trim().is_empty() {
                        // Interim chatter that never committed; keep listening.
                        continue;
                    }
                    state = SessionState::Finalizing;
                    log::debug!("session {id}: {state:?} (silence window elapsed)");
                    self.recognizer.end().await;
                    break finalize(&self.parser, &final_transcript);
                }

                ev = events.recv() => match ev {
                    Some(TranscriptEvent::Interim { text }) => {
                        interim = text;

                        let update = LiveTranscript {
                            committed: final_transcript.clone(),
                            partial: interim.clone(),
                        };
                        if live_tx.try_send(update).is_err() {
                            log::warn!("session {id}: live receiver lagging, dropped update");
                        }

                        silence = if !interim.trim().is_empty() {
                            state = SessionState::Listening;
                            Some(Box::pin(tokio::time::sleep(self.silence_window)))
                        } else if !final_transcript.trim().is_empty() {
                            state = SessionState::AwaitingSilence;
                            Some(Box::pin(tokio::time::sleep(self.silence_window)))
                        } else {
                            None
                        };
                    }
                    Some(TranscriptEvent::Final { text }) => {
                        final_transcript.push_str(&text);
                        final_transcript.push(' ');
                        interim.clear();
                        // A committed segment with no further interim
                        // activity must still finalize.
                        state = SessionState::AwaitingSilence;
                        silence = Some(Box::pin(tokio::time::sleep(self.silence_window)));
                    }
                    Some(TranscriptEvent::StreamEnded) | None => {
                        // Provider closed the stream before our silence
                        // window fired.
                        state = SessionState::Finalizing;
                        log::debug!("session {id}: {state:?} (stream ended)");
                        if final_transcript.trim().is_empty() {
                            break Err(SessionError::NoSpeechDetected);
                        }
                        break finalize(&self.parser, &final_transcript);
                    }
                    Some(TranscriptEvent::RecognizerError { code }) => {
                        log::debug!("session {id}: recognizer error {code:?} in state {state:?}");
                        self.recognizer.end().await;
                        break Err(classify_recognizer_error(&code));
                    }
                }
            }
        };

        let state = if outcome.is_ok() {
            SessionState::Done
        } else {
            SessionState::Failed
        };
        log::debug!("session {id}: {state:?}");
        let _ = outcome_tx.send(outcome);
    }
}

fn finalize(parser: &CommandParser, final_transcript: &str) -> AttemptOutcome {
    let parsed = parser.parse(final_transcript.trim());
    parsed.into_intent().ok_or(SessionError::ParseAmbiguous)
}
