use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::mpsc;
use voicepay_core::command::CommandParser;
use voicepay_core::lexicon::Lexicon;
use voicepay_engine::engine::{RecognizerHandle, TranscriptSession};
use voicepay_engine::session::{SessionConfig, SessionError};
use voicepay_engine::traits::{PermissionState, StreamingRecognizer, TranscriptEvent};

#[derive(Clone)]
enum Step {
    Emit(TranscriptEvent),
    Wait(Duration),
}

fn interim(text: &str) -> Step {
    Step::Emit(TranscriptEvent::Interim { text: text.into() })
}

fn committed(text: &str) -> Step {
    Step::Emit(TranscriptEvent::Final { text: text.into() })
}

fn ended() -> Step {
    Step::Emit(TranscriptEvent::StreamEnded)
}

// The emitter drops its sender once the script runs out, which the driver
// reads as stream end. Scripts that must leave the stream open (so only
// the silence timer or a stop can finalize) end with this.
fn hold_open() -> Step {
    Step::Wait(Duration::from_secs(600))
}

fn error(code: &str) -> Step {
    Step::Emit(TranscriptEvent::RecognizerError { code: code.into() })
}

/// Replays canned transcript events, one script per `begin` call.
struct ScriptedRecognizer {
    supported: bool,
    permission: PermissionState,
    scripts: StdMutex<VecDeque<Vec<Step>>>,
    end_calls: AtomicUsize,
}

impl ScriptedRecognizer {
    fn new(script: Vec<Step>) -> Arc<Self> {
        Self::with_scripts(vec![script])
    }

    fn with_scripts(scripts: Vec<Vec<Step>>) -> Arc<Self> {
        Arc::new(Self {
            supported: true,
            permission: PermissionState::Granted,
            scripts: StdMutex::new(scripts.into()),
            end_calls: AtomicUsize::new(0),
        })
    }

    fn unsupported() -> Arc<Self> {
        Arc::new(Self {
            supported: false,
            permission: PermissionState::Prompt,
            scripts: StdMutex::new(VecDeque::new()),
            end_calls: AtomicUsize::new(0),
        })
    }

    fn denied() -> Arc<Self> {
        Arc::new(Self {
            supported: true,
            permission: PermissionState::Denied,
            scripts: StdMutex::new(VecDeque::new()),
            end_calls: AtomicUsize::new(0),
        })
    }

    fn end_calls(&self) -> usize {
        self.end_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StreamingRecognizer for ScriptedRecognizer {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn query_permission(&self) -> PermissionState {
        self.permission
    }

    async fn begin(&self, _locale: &str) -> anyhow::Result<mpsc::Receiver<TranscriptEvent>> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            for step in script {
                match step {
                    Step::Emit(ev) => {
                        if tx.send(ev).await.is_err() {
                            return;
                        }
                    }
                    Step::Wait(d) => tokio::time::sleep(d).await,
                }
            }
        });
        Ok(rx)
    }

    async fn end(&self) {
        self.end_calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn session_with(recognizer: Arc<ScriptedRecognizer>, silence_window: Duration) -> TranscriptSession {
    let parser = Arc::new(CommandParser::new(Lexicon::default()).expect("default lexicon"));
    TranscriptSession::new(
        RecognizerHandle::new(recognizer),
        parser,
        SessionConfig {
            silence_window,
            ..Default::default()
        },
    )
}

const SILENCE: Duration = Duration::from_millis(3500);

#[tokio::test(start_paused = true)]
async fn silence_window_dispatches_one_intent() {
    let recognizer = ScriptedRecognizer::new(vec![
        interim("pay"),
        Step::Wait(Duration::from_millis(300)),
        interim("pay ₹400 to"),
        Step::Wait(Duration::from_millis(300)),
        interim("pay ₹400 to prashant"),
        committed("Pay ₹400 to Prashant"),
        hold_open(),
    ]);
    let session = session_with(Arc::clone(&recognizer), SILENCE);

    let started = tokio::time::Instant::now();
    let mut attempt = session.start().await.expect("start");

    let mut seen = Vec::new();
    while let Some(update) = attempt.live.recv().await {
        seen.push(update.combined());
    }
    assert_eq!(seen, vec!["pay", "pay ₹400 to", "pay ₹400 to prashant"]);

    let intent = attempt.wait().await.expect("outcome").expect("intent");
    assert_eq!(intent.amount, "400");
    assert_eq!(intent.payee, "Prashant");
    assert_eq!(intent.raw_text, "Pay ₹400 to Prashant");

    // Each interim restarted the window, so finalize can only have fired
    // a full window after the last activity.
    assert!(started.elapsed() >= Duration::from_millis(600) + SILENCE);
    assert!(recognizer.end_calls() >= 1);
}

#[tokio::test(start_paused = true)]
async fn stream_ended_finalizes_before_silence_window() {
    let recognizer = ScriptedRecognizer::new(vec![committed("Abheek ko 80 bhejo"), ended()]);
    let session = session_with(recognizer, SILENCE);

    let started = tokio::time::Instant::now();
    let attempt = session.start().await.expect("start");
    let intent = attempt.wait().await.expect("outcome").expect("intent");

    assert_eq!(intent.amount, "80");
    assert_eq!(intent.payee, "Abheek");
    assert!(started.elapsed() < SILENCE);
}

#[tokio::test(start_paused = true)]
async fn stream_ended_without_speech_is_no_speech() {
    let recognizer = ScriptedRecognizer::new(vec![ended()]);
    let session = session_with(recognizer, SILENCE);

    let attempt = session.start().await.expect("start");
    assert_eq!(
        attempt.wait().await.expect("outcome"),
        Err(SessionError::NoSpeechDetected)
    );
}

#[tokio::test(start_paused = true)]
async fn closed_event_stream_counts_as_stream_end() {
    // Emitter drops the sender without an explicit StreamEnded.
    let recognizer = ScriptedRecognizer::new(vec![]);
    let session = session_with(recognizer, SILENCE);

    let attempt = session.start().await.expect("start");
    assert_eq!(
        attempt.wait().await.expect("outcome"),
        Err(SessionError::NoSpeechDetected)
    );
}

#[tokio::test(start_paused = true)]
async fn ambiguous_transcript_is_a_distinct_error() {
    let recognizer = ScriptedRecognizer::new(vec![committed("hello there"), ended()]);
    let session = session_with(recognizer, SILENCE);

    let attempt = session.start().await.expect("start");
    assert_eq!(
        attempt.wait().await.expect("outcome"),
        Err(SessionError::ParseAmbiguous)
    );
}

#[tokio::test(start_paused = true)]
async fn not_allowed_wins_over_accumulated_transcript() {
    let recognizer = ScriptedRecognizer::new(vec![
        interim("pay 100 to rahul"),
        committed("pay 100 to rahul"),
        error("not-allowed"),
    ]);
    let session = session_with(recognizer, SILENCE);

    let attempt = session.start().await.expect("start");
    assert_eq!(
        attempt.wait().await.expect("outcome"),
        Err(SessionError::PermissionDenied)
    );
}

#[tokio::test(start_paused = true)]
async fn transport_errors_carry_the_provider_code() {
    let recognizer = ScriptedRecognizer::new(vec![error("network")]);
    let session = session_with(recognizer, SILENCE);

    let attempt = session.start().await.expect("start");
    assert_eq!(
        attempt.wait().await.expect("outcome"),
        Err(SessionError::RecognizerTransport("network".into()))
    );
}

#[tokio::test]
async fn unsupported_runtime_fails_fast() {
    let recognizer = ScriptedRecognizer::unsupported();
    let session = session_with(Arc::clone(&recognizer), SILENCE);

    assert!(!session.is_supported());
    assert_eq!(session.start().await.err(), Some(SessionError::Unsupported));
    assert_eq!(recognizer.end_calls(), 0);
}

#[tokio::test]
async fn denied_permission_fails_before_streaming() {
    let recognizer = ScriptedRecognizer::denied();
    let session = session_with(Arc::clone(&recognizer), SILENCE);

    assert_eq!(
        session.start().await.err(),
        Some(SessionError::PermissionDenied)
    );
    assert_eq!(recognizer.end_calls(), 0);
}

#[tokio::test]
async fn stop_aborts_without_any_dispatch() {
    let recognizer = ScriptedRecognizer::new(vec![
        interim("pay 100 to rahul"),
        committed("pay 100 to rahul"),
        hold_open(),
    ]);
    let session = session_with(Arc::clone(&recognizer), Duration::from_secs(5));

    let mut attempt = session.start().await.expect("start");

    // Make sure the driver has consumed transcript events before stopping.
    let update = attempt.live.recv().await.expect("live update");
    assert_eq!(update.combined(), "pay 100 to rahul");

    attempt.stop().await;
    assert_eq!(attempt.wait().await, None);
    assert!(recognizer.end_calls() >= 1);
}

#[tokio::test(start_paused = true)]
async fn stop_after_terminal_outcome_is_a_noop() {
    let recognizer = ScriptedRecognizer::new(vec![committed("pay 50 to anu"), ended()]);
    let session = session_with(recognizer, SILENCE);

    let attempt = session.start().await.expect("start");
    let handle = attempt.handle();
    assert!(attempt.wait().await.expect("outcome").is_ok());

    // The driver is gone; stopping again must be a silent no-op.
    handle.stop().await;
    handle.stop().await;
}

#[tokio::test]
async fn second_start_while_armed_reports_busy() {
    let recognizer = ScriptedRecognizer::new(vec![
        interim("pay"),
        Step::Wait(Duration::from_secs(60)),
    ]);
    let session = session_with(recognizer, Duration::from_secs(5));

    let attempt = session.start().await.expect("start");
    assert_eq!(
        session.start().await.err(),
        Some(SessionError::RecognizerTransport("recognizer-busy".into()))
    );

    attempt.stop().await;
}

#[tokio::test]
async fn sessions_sharing_a_recognizer_share_the_arm_slot() {
    let recognizer = ScriptedRecognizer::new(vec![interim("pay"), hold_open()]);
    let handle = RecognizerHandle::new(recognizer);
    let parser = Arc::new(CommandParser::new(Lexicon::default()).expect("default lexicon"));
    let cfg = SessionConfig {
        silence_window: Duration::from_secs(5),
        ..Default::default()
    };

    let first = TranscriptSession::new(handle.clone(), Arc::clone(&parser), cfg.clone());
    let second = TranscriptSession::new(handle, parser, cfg);

    // Arming lives on the shared handle, so a second session cannot stream
    // against the same recognizer while the first attempt is running.
    let attempt = first.start().await.expect("start");
    assert_eq!(
        second.start().await.err(),
        Some(SessionError::RecognizerTransport("recognizer-busy".into()))
    );

    attempt.stop().await;
}

#[tokio::test(start_paused = true)]
async fn transcript_does_not_leak_across_attempts() {
    let recognizer = ScriptedRecognizer::with_scripts(vec![
        vec![committed("Pay 100 to Rahul"), ended()],
        vec![committed("hello there"), ended()],
    ]);
    let session = session_with(recognizer, SILENCE);

    let first = session.start().await.expect("start");
    let intent = first.wait().await.expect("outcome").expect("intent");
    assert_eq!(intent.raw_text, "Pay 100 to Rahul");

    // A leaked buffer would make the second transcript parseable.
    let second = session.start().await.expect("restart");
    assert_eq!(
        second.wait().await.expect("outcome"),
        Err(SessionError::ParseAmbiguous)
    );
}
