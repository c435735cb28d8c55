//! Turn flow integration tests
//!
//! These tests drive a full `TurnController` the way a surface does: submit,
//! poll on a fixed period, tick timers, and read back the messages. They cover:
//! - The end-to-end mood sequence for one turn
//! - The single-flight guard (busy and empty input)
//! - Fallback substitution on failure and timeout
//! - Cancellation and stale replies
//! - The intro wave and greeting
//! - TOML configuration feeding the controller

use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use milo_conductor::config::load_config_with_env;
use milo_conductor::controller::{STATUS_CANCELLED, STATUS_INTRO_READY, STATUS_READY};
use milo_conductor::{
    ChatMessage, ConductorMessage, ControllerConfig, ConversationClient, ExchangeError, Mood,
    RejectReason, Session, SpeechNotifier, SubmitOutcome, SurfaceEvent, TurnController, TurnId,
    TurnPhase,
};

const FALLBACK: &str = "(Sorry, there was a problem. Please try again.)";
const GREETING: &str = "Hello! I'm Milo, your Windows 98 style assistant.";

// =============================================================================
// Test doubles
// =============================================================================

/// What the scripted client does on its next call
enum Step {
    Reply(&'static str),
    Fail,
    Hang,
}

/// Conversation client that plays back a script
struct ScriptedClient {
    script: Mutex<VecDeque<Step>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedClient {
    fn new(steps: Vec<Step>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = Self {
            script: Mutex::new(steps.into()),
            calls: Arc::clone(&calls),
        };
        (client, calls)
    }
}

#[async_trait]
impl ConversationClient for ScriptedClient {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn exchange(&self, _session: &Session, _text: &str) -> Result<String, ExchangeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().pop_front().unwrap_or(Step::Fail);
        match step {
            Step::Reply(reply) => Ok(reply.to_string()),
            Step::Fail => Err(ExchangeError::Api {
                status: 429,
                message: "quota exceeded".to_string(),
            }),
            Step::Hang => std::future::pending().await,
        }
    }
}

/// Speech notifier that remembers what it was asked to say
#[derive(Default)]
struct RecordingSpeech {
    spoken: Mutex<Vec<String>>,
}

impl RecordingSpeech {
    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }
}

impl SpeechNotifier for RecordingSpeech {
    fn notify(&self, text: &str) {
        self.spoken.lock().push(text.to_string());
    }
}

struct Fixture {
    ctrl: TurnController<ScriptedClient>,
    rx: mpsc::UnboundedReceiver<ConductorMessage>,
    calls: Arc<AtomicUsize>,
    speech: Arc<RecordingSpeech>,
    session: Arc<Session>,
    /// Every mood message seen so far, starting from neutral
    moods: Vec<Mood>,
}

impl Fixture {
    fn new(steps: Vec<Step>) -> Self {
        Self::with_config(steps, ControllerConfig::default())
    }

    fn with_config(steps: Vec<Step>, config: ControllerConfig) -> Self {
        let (client, calls) = ScriptedClient::new(steps);
        let speech = Arc::new(RecordingSpeech::default());
        let session = Arc::new(Session::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let ctrl = TurnController::new(
            client,
            Arc::clone(&session),
            Arc::clone(&speech) as Arc<dyn SpeechNotifier>,
            config,
            Handle::current(),
            tx,
        )
        .with_seed(42);

        Self {
            ctrl,
            rx,
            calls,
            speech,
            session,
            moods: vec![Mood::Neutral],
        }
    }

    /// Collect pending surface messages, recording mood changes
    fn messages(&mut self) -> Vec<ConductorMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            if let ConductorMessage::Mood { mood } = msg {
                self.moods.push(mood);
            }
            out.push(msg);
        }
        out
    }

    /// Poll every 100 ms of controller time until a reply is delivered
    async fn poll_until_delivered(&mut self, start: Instant) -> Instant {
        let mut now = start;
        for _ in 0..400 {
            if self.ctrl.poll(now) > 0 {
                return now;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            now += Duration::from_millis(100);
        }
        panic!("no reply was delivered");
    }
}

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn test_hello_mood_sequence_end_to_end() {
    let mut f = Fixture::new(vec![Step::Reply("Hi! How can I help?")]);
    let t0 = Instant::now();

    let outcome = f.ctrl.submit("Hello", t0);
    assert_eq!(outcome, SubmitOutcome::Accepted(TurnId(1)));

    // Input cleared immediately after submit
    assert_eq!(f.messages().first(), Some(&ConductorMessage::ClearInput));
    assert!(f.ctrl.is_pending());
    assert_eq!(f.ctrl.pending_since(), Some(t0));
    // History is only written once the reply is shown
    assert!(f.session.is_empty());

    let delivered_at = f.poll_until_delivered(t0).await;
    let msgs = f.messages();
    assert_eq!(msgs[0], ConductorMessage::response("Hi! How can I help?"));
    assert_eq!(msgs[2], ConductorMessage::status(STATUS_READY));
    assert!(!f.ctrl.is_pending());
    assert_eq!(f.ctrl.pending_since(), None);

    // Nothing else arrives on later polls
    assert_eq!(f.ctrl.poll(delivered_at + Duration::from_millis(100)), 0);

    f.ctrl.tick(delivered_at + Duration::from_millis(1500));
    f.messages();

    assert_eq!(
        f.moods,
        vec![Mood::Neutral, Mood::Thinking, Mood::Happy, Mood::Neutral]
    );
    assert_eq!(f.ctrl.phase(), TurnPhase::Idle);
    assert_eq!(f.calls.load(Ordering::SeqCst), 1);
    assert_eq!(f.speech.spoken(), vec!["Hi! How can I help?".to_string()]);
    assert_eq!(
        f.session.history(),
        vec![
            ChatMessage::user("Hello"),
            ChatMessage::model("Hi! How can I help?")
        ]
    );
}

#[tokio::test]
async fn test_turns_can_follow_each_other() {
    let mut f = Fixture::new(vec![Step::Reply("one"), Step::Reply("two")]);
    let t0 = Instant::now();

    f.ctrl.submit("first", t0);
    let t1 = f.poll_until_delivered(t0).await;
    assert_eq!(
        f.ctrl.submit("second", t1),
        SubmitOutcome::Accepted(TurnId(2))
    );
    f.poll_until_delivered(t1).await;

    assert_eq!(f.calls.load(Ordering::SeqCst), 2);
    assert_eq!(f.session.len(), 4);
}

// =============================================================================
// Single-flight guard
// =============================================================================

#[tokio::test]
async fn test_busy_submit_is_a_noop() {
    let mut f = Fixture::new(vec![Step::Reply("done")]);
    let t0 = Instant::now();

    f.ctrl.submit("first", t0);
    f.messages();

    for text in ["second", "third"] {
        assert_eq!(
            f.ctrl.submit(text, t0),
            SubmitOutcome::Rejected(RejectReason::Busy)
        );
    }
    // Input not cleared, no status, no mood change
    assert!(f.messages().is_empty());

    f.poll_until_delivered(t0).await;
    assert_eq!(f.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_blank_input_never_starts_a_turn() {
    let mut f = Fixture::new(vec![]);
    let t0 = Instant::now();

    for text in ["", "   ", "\t\n"] {
        f.ctrl.handle_event(SurfaceEvent::submit(text), t0);
        assert_eq!(
            f.ctrl.submit(text, t0),
            SubmitOutcome::Rejected(RejectReason::Empty)
        );
    }

    assert!(f.messages().is_empty());
    assert!(!f.ctrl.is_pending());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(f.calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_failure_delivers_fallback_verbatim() {
    let mut f = Fixture::new(vec![Step::Fail]);
    let t0 = Instant::now();

    f.ctrl.submit("Hello", t0);
    let delivered_at = f.poll_until_delivered(t0).await;
    let msgs = f.messages();
    assert_eq!(msgs[3], ConductorMessage::response(FALLBACK));

    f.ctrl.tick(delivered_at + Duration::from_millis(1500));
    f.messages();
    assert_eq!(
        f.moods,
        vec![Mood::Neutral, Mood::Thinking, Mood::Happy, Mood::Neutral]
    );
    // Failed exchanges leave no history behind
    assert!(f.session.is_empty());
    assert_eq!(f.speech.spoken(), vec![FALLBACK.to_string()]);
}

#[tokio::test]
async fn test_hung_exchange_times_out_with_fallback() {
    let config = ControllerConfig {
        reply_timeout: Some(Duration::from_millis(50)),
        ..ControllerConfig::default()
    };
    let mut f = Fixture::with_config(vec![Step::Hang, Step::Reply("after")], config);
    let t0 = Instant::now();

    f.ctrl.submit("Hello", t0);
    let t1 = f.poll_until_delivered(t0).await;
    assert!(f
        .messages()
        .contains(&ConductorMessage::response(FALLBACK)));

    // The guard is released, so the next turn goes through
    assert!(f.ctrl.submit("again", t1).is_accepted());
    f.poll_until_delivered(t1).await;
    assert!(f.messages().contains(&ConductorMessage::response("after")));
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_cancel_releases_pending_turn() {
    let mut f = Fixture::new(vec![Step::Hang, Step::Reply("fresh")]);
    let t0 = Instant::now();

    f.ctrl.submit("Hello", t0);
    f.messages();

    f.ctrl.handle_event(SurfaceEvent::Cancel, t0 + Duration::from_millis(200));
    assert!(!f.ctrl.is_pending());
    assert_eq!(f.ctrl.mood(), Mood::Neutral);
    assert_eq!(
        f.messages(),
        vec![
            ConductorMessage::Mood {
                mood: Mood::Neutral
            },
            ConductorMessage::status(STATUS_CANCELLED),
        ]
    );

    // Nothing arrives for the cancelled turn
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(f.ctrl.poll(t0 + Duration::from_millis(300)), 0);

    let t1 = t0 + Duration::from_millis(400);
    assert_eq!(f.ctrl.submit("again", t1), SubmitOutcome::Accepted(TurnId(2)));
    f.poll_until_delivered(t1).await;
    assert!(f.messages().contains(&ConductorMessage::response("fresh")));
}

#[tokio::test]
async fn test_cancelled_reply_never_enters_history() {
    let mut f = Fixture::new(vec![Step::Reply("secret reply"), Step::Reply("fresh")]);
    let t0 = Instant::now();

    f.ctrl.submit("hello", t0);
    // Let the exchange finish and post before the cancel
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(f.ctrl.cancel(t0 + Duration::from_millis(50)));
    assert_eq!(f.ctrl.poll(t0 + Duration::from_millis(100)), 0);
    assert!(f.session.is_empty());

    let t1 = t0 + Duration::from_millis(200);
    f.ctrl.submit("again", t1);
    f.poll_until_delivered(t1).await;
    assert_eq!(
        f.session.history(),
        vec![ChatMessage::user("again"), ChatMessage::model("fresh")]
    );
}

// =============================================================================
// Intro
// =============================================================================

#[tokio::test]
async fn test_intro_wave_then_greeting() {
    let mut f = Fixture::new(vec![]);
    let t0 = Instant::now();
    f.ctrl.start(t0);
    f.messages();

    // Wave starts 240 ms in and takes 7 cadences to finish
    f.ctrl.tick(t0 + Duration::from_millis(239));
    assert!(!f.ctrl.avatar().is_waving());
    f.ctrl.tick(t0 + Duration::from_millis(240));
    assert!(f.ctrl.avatar().is_waving());
    assert!(f.messages().is_empty());

    let finished = t0 + Duration::from_millis(240 + 1050);
    f.ctrl.tick(finished);
    assert_eq!(
        f.messages(),
        vec![
            ConductorMessage::response(GREETING),
            ConductorMessage::Mood { mood: Mood::Happy },
            ConductorMessage::status(STATUS_INTRO_READY),
        ]
    );
    assert_eq!(f.speech.spoken(), vec![GREETING.to_string()]);

    f.ctrl.tick(finished + Duration::from_millis(1799));
    assert_eq!(f.ctrl.mood(), Mood::Happy);
    f.ctrl.tick(finished + Duration::from_millis(1800));
    assert_eq!(f.ctrl.mood(), Mood::Neutral);
}

#[tokio::test]
async fn test_early_reply_does_not_cut_greeting_dwell_short() {
    let mut f = Fixture::new(vec![Step::Reply("quick answer")]);
    let t0 = Instant::now();
    f.ctrl.start(t0);
    f.ctrl.submit("quick question", t0 + Duration::from_millis(100));

    // Delivered at +200 ms, so its settle is due at +1700 ms
    let delivered_at = t0 + Duration::from_millis(200);
    let mut delivered = 0;
    for _ in 0..200 {
        tokio::time::sleep(Duration::from_millis(5)).await;
        delivered = f.ctrl.poll(delivered_at);
        if delivered > 0 {
            break;
        }
    }
    assert_eq!(delivered, 1);

    // Greeting lands at +1290 ms and owns the happy face for 1800 ms
    f.ctrl.tick(t0 + Duration::from_millis(240));
    let greeted = t0 + Duration::from_millis(240 + 1050);
    f.ctrl.tick(greeted);
    assert!(f
        .messages()
        .contains(&ConductorMessage::status(STATUS_INTRO_READY)));

    f.ctrl.tick(t0 + Duration::from_millis(1700));
    assert_eq!(f.ctrl.mood(), Mood::Happy);
    f.ctrl.tick(greeted + Duration::from_millis(1799));
    assert_eq!(f.ctrl.mood(), Mood::Happy);
    f.ctrl.tick(greeted + Duration::from_millis(1800));
    assert_eq!(f.ctrl.mood(), Mood::Neutral);
}

#[tokio::test]
async fn test_greeting_keeps_thinking_face_while_pending() {
    let mut f = Fixture::new(vec![Step::Hang]);
    let t0 = Instant::now();
    f.ctrl.start(t0);
    f.ctrl.submit("quick question", t0 + Duration::from_millis(100));
    f.messages();

    f.ctrl.tick(t0 + Duration::from_millis(240));
    f.ctrl.tick(t0 + Duration::from_millis(2000));
    assert_eq!(f.messages(), vec![ConductorMessage::response(GREETING)]);
    assert_eq!(f.ctrl.mood(), Mood::Thinking);
    assert!(f.ctrl.is_pending());
}

// =============================================================================
// Configuration
// =============================================================================

#[tokio::test]
async fn test_toml_configuration_drives_controller() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(
        br#"
[timing]
mood_dwell_ms = 500

[messages]
fallback = "Oops."
"#,
    )
    .unwrap();
    let config = load_config_with_env(Some(file.path().to_path_buf()), |_| None).unwrap();

    let mut f = Fixture::with_config(vec![Step::Fail], ControllerConfig::from(&config));
    let t0 = Instant::now();
    f.ctrl.submit("Hello", t0);
    let delivered_at = f.poll_until_delivered(t0).await;
    assert!(f.messages().contains(&ConductorMessage::response("Oops.")));

    f.ctrl.tick(delivered_at + Duration::from_millis(500));
    assert_eq!(f.ctrl.mood(), Mood::Neutral);
}

#[tokio::test]
async fn test_quit_aborts_pending_turn() {
    let mut f = Fixture::new(vec![Step::Hang]);
    let t0 = Instant::now();
    f.ctrl.submit("Hello", t0);
    f.messages();

    f.ctrl.handle_event(SurfaceEvent::Quit, t0);
    assert_eq!(f.messages(), vec![ConductorMessage::Quit]);
    assert!(!f.ctrl.is_pending());
}
