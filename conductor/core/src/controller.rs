//! Turn Controller - The Orchestration Core
//!
//! The controller sits between the UI surface, the conversation service, the
//! avatar and the speech output. It enforces one rule above all: at most one
//! turn is in flight. A second submit while a reply is pending is rejected,
//! not queued.
//!
//! # Lifecycle of a Turn
//!
//! ```text
//!  Idle ──submit──▶ Awaiting ──reply drained──▶ Delivered ──dwell──▶ Idle
//!  (neutral)        (thinking)                  (happy)              (neutral)
//! ```
//!
//! # Driving the Controller
//!
//! The controller never reads a clock and never blocks. The owning loop
//! calls [`TurnController::poll`] on a fixed period to drain the reply
//! mailbox, and [`TurnController::tick`] every frame to run timers and
//! animations. Both take `now` explicitly.
//!
//! Exchanges run as tokio tasks on the runtime handed to
//! [`TurnController::new`]. Each one is bounded by the configured reply
//! timeout and can be abandoned with [`TurnController::cancel`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::avatar::{Avatar, AvatarEvent, Mood};
use crate::backend::ConversationClient;
use crate::config::{MessagesConfig, MiloConfig, TimingConfig};
use crate::events::SurfaceEvent;
use crate::mailbox::{Mailbox, MailboxSender, Reply, ReplyOutcome};
use crate::messages::{ConductorMessage, TurnId};
use crate::session::Session;
use crate::speech::SpeechNotifier;
use crate::timeline::Timeline;

/// Status shown while the intro is still pending
pub const STATUS_STARTING: &str = "Starting...";
/// Status shown while a reply is pending
pub const STATUS_THINKING: &str = "Milo is thinking...";
/// Status shown after a reply is delivered
pub const STATUS_READY: &str = "Ready.";
/// Status shown after the greeting
pub const STATUS_INTRO_READY: &str = "Ready for your input.";
/// Status shown after a pending turn is abandoned
pub const STATUS_CANCELLED: &str = "Cancelled.";

/// Controller configuration
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ControllerConfig {
    /// Timers and animation cadences
    pub timing: TimingConfig,
    /// Greeting and fallback text
    pub messages: MessagesConfig,
    /// Abandon a reply after this long (None = wait forever)
    pub reply_timeout: Option<Duration>,
}

impl From<&MiloConfig> for ControllerConfig {
    fn from(config: &MiloConfig) -> Self {
        Self {
            timing: config.timing.clone(),
            messages: config.messages.clone(),
            reply_timeout: config.conversation.reply_timeout,
        }
    }
}

/// Why a submit was turned away
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// Nothing but whitespace
    Empty,
    /// A turn is already pending
    Busy,
}

/// Result of [`TurnController::submit`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The turn started
    Accepted(TurnId),
    /// Nothing happened
    Rejected(RejectReason),
}

impl SubmitOutcome {
    /// Whether the turn started
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// Where the controller is in the turn lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnPhase {
    /// Nothing pending, neutral face
    Idle,
    /// A reply is pending, thinking face
    Awaiting,
    /// A reply was just shown, happy face until the dwell elapses
    Delivered,
}

/// Deferred work on the controller's timeline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Deferred {
    /// Begin the intro wave
    IntroWave,
    /// Return to neutral unless a newer turn started since scheduling
    SettleMood { generation: u64 },
}

#[derive(Debug)]
struct PendingTurn {
    id: TurnId,
    started: Instant,
    task: JoinHandle<()>,
}

/// Single-flight turn controller
pub struct TurnController<C: ConversationClient + 'static> {
    client: Arc<C>,
    session: Arc<Session>,
    speech: Arc<dyn SpeechNotifier>,
    config: ControllerConfig,
    runtime: Handle,
    /// Channel to the UI surface
    tx: mpsc::UnboundedSender<ConductorMessage>,
    mailbox: Mailbox,
    mailbox_tx: MailboxSender,
    avatar: Avatar,
    rng: StdRng,
    timeline: Timeline<Deferred>,
    pending: Option<PendingTurn>,
    phase: TurnPhase,
    last_turn: u64,
    /// Bumped on every accepted turn, cancel and greeting; stale settles compare against it
    generation: u64,
    intro_waving: bool,
}

impl<C: ConversationClient + 'static> TurnController<C> {
    /// Create a controller
    ///
    /// Exchange and speech tasks are spawned on `runtime`.
    pub fn new(
        client: C,
        session: Arc<Session>,
        speech: Arc<dyn SpeechNotifier>,
        config: ControllerConfig,
        runtime: Handle,
        tx: mpsc::UnboundedSender<ConductorMessage>,
    ) -> Self {
        let (mailbox_tx, mailbox) = Mailbox::channel();
        let avatar = Avatar::new(config.timing.blink(), config.timing.wave());

        Self {
            client: Arc::new(client),
            session,
            speech,
            config,
            runtime,
            tx,
            mailbox,
            mailbox_tx,
            avatar,
            rng: StdRng::from_entropy(),
            timeline: Timeline::new(),
            pending: None,
            phase: TurnPhase::Idle,
            last_turn: 0,
            generation: 0,
            intro_waving: false,
        }
    }

    /// Replace the blink randomness with a seeded source
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current mood
    #[must_use]
    pub fn mood(&self) -> Mood {
        self.avatar.mood()
    }

    /// Current lifecycle phase
    #[must_use]
    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Whether a reply is pending
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The pending turn, if any
    #[must_use]
    pub fn pending_turn(&self) -> Option<TurnId> {
        self.pending.as_ref().map(|p| p.id)
    }

    /// When the pending turn was accepted
    #[must_use]
    pub fn pending_since(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.started)
    }

    /// Avatar state for rendering
    #[must_use]
    pub fn avatar(&self) -> &Avatar {
        &self.avatar
    }

    /// The conversation session
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Configuration in effect
    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Earliest instant at which [`TurnController::tick`] has work to do
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.timeline.next_deadline(), self.avatar.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start blinking and schedule the intro wave
    pub fn start(&mut self, now: Instant) {
        self.send(ConductorMessage::status(STATUS_STARTING));
        self.avatar.start_blinking(now, &mut self.rng);
        self.timeline
            .schedule(now + self.config.timing.intro_delay, Deferred::IntroWave);
        tracing::info!(
            session = %self.session.id(),
            client = self.client.name(),
            "Turn controller started"
        );
    }

    /// Dispatch a surface event
    pub fn handle_event(&mut self, event: SurfaceEvent, now: Instant) {
        match event {
            SurfaceEvent::Submit { text } => {
                self.submit(&text, now);
            }
            SurfaceEvent::Cancel => {
                self.cancel(now);
            }
            SurfaceEvent::Quit => self.shutdown(),
        }
    }

    /// Try to start a turn with `text`
    ///
    /// Whitespace-only input and input arriving while a turn is pending are
    /// rejected without any visible effect.
    pub fn submit(&mut self, text: &str, now: Instant) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!("Ignoring empty submit");
            return SubmitOutcome::Rejected(RejectReason::Empty);
        }
        if let Some(pending) = &self.pending {
            tracing::debug!(pending = %pending.id, "Ignoring submit while a turn is pending");
            return SubmitOutcome::Rejected(RejectReason::Busy);
        }

        self.last_turn += 1;
        let turn = TurnId(self.last_turn);
        self.generation += 1;

        self.send(ConductorMessage::ClearInput);
        self.send(ConductorMessage::status(STATUS_THINKING));
        self.set_mood(Mood::Thinking);
        self.phase = TurnPhase::Awaiting;

        let task = self.spawn_exchange(turn, text.to_string());
        self.pending = Some(PendingTurn {
            id: turn,
            started: now,
            task,
        });

        tracing::info!(turn = %turn, chars = text.chars().count(), "Turn accepted");
        SubmitOutcome::Accepted(turn)
    }

    /// Abandon the pending turn, if any
    ///
    /// Returns `false` when nothing was pending. A reply that still arrives
    /// for the abandoned turn is discarded.
    pub fn cancel(&mut self, now: Instant) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        pending.task.abort();
        self.generation += 1;
        self.set_mood(Mood::Neutral);
        self.phase = TurnPhase::Idle;
        self.send(ConductorMessage::status(STATUS_CANCELLED));
        tracing::info!(
            turn = %pending.id,
            waited = ?now.saturating_duration_since(pending.started),
            "Turn cancelled"
        );
        true
    }

    /// Abort any pending turn and tell the surface to close
    pub fn shutdown(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
            tracing::debug!(turn = %pending.id, "Aborted pending turn on shutdown");
        }
        self.timeline.clear();
        self.send(ConductorMessage::Quit);
    }

    // ========================================================================
    // Driving
    // ========================================================================

    /// Drain the reply mailbox and deliver what is there
    ///
    /// Returns how many replies were delivered. Never blocks.
    pub fn poll(&mut self, now: Instant) -> usize {
        let mut delivered = 0;
        for reply in self.mailbox.drain() {
            if self.pending_turn() == Some(reply.turn) {
                self.deliver(reply, now);
                delivered += 1;
            } else {
                tracing::debug!(turn = %reply.turn, "Discarding reply for abandoned turn");
            }
        }
        delivered
    }

    /// Run due timers and advance the avatar
    ///
    /// Returns `true` if anything visible changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;

        for (at, deferred) in self.timeline.drain_due(now) {
            match deferred {
                Deferred::IntroWave => {
                    self.intro_waving = self.avatar.start_wave(at);
                }
                Deferred::SettleMood { generation } => {
                    if generation == self.generation && self.pending.is_none() {
                        changed |= self.set_mood(Mood::Neutral);
                        self.phase = TurnPhase::Idle;
                    }
                }
            }
        }

        for event in self.avatar.tick(now, &mut self.rng) {
            changed = true;
            if event == AvatarEvent::WaveFinished && self.intro_waving {
                self.intro_waving = false;
                self.greet(now);
            }
        }

        changed
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn spawn_exchange(&self, turn: TurnId, prompt: String) -> JoinHandle<()> {
        let client = Arc::clone(&self.client);
        let session = Arc::clone(&self.session);
        let mailbox = self.mailbox_tx.clone();
        let fallback = self.config.messages.fallback.clone();
        let reply_timeout = self.config.reply_timeout;

        self.runtime.spawn(async move {
            let exchange = client.exchange(&session, &prompt);
            let result = match reply_timeout {
                Some(limit) => tokio::time::timeout(limit, exchange).await,
                None => Ok(exchange.await),
            };

            let (text, outcome) = match result {
                Ok(Ok(reply)) => (reply, ReplyOutcome::Answered),
                Ok(Err(e)) => {
                    tracing::warn!(
                        turn = %turn,
                        client = client.name(),
                        error = %e,
                        "Exchange failed, using fallback"
                    );
                    (fallback, ReplyOutcome::Fallback)
                }
                Err(_) => {
                    tracing::warn!(
                        turn = %turn,
                        client = client.name(),
                        timeout = ?reply_timeout,
                        "Exchange timed out, using fallback"
                    );
                    (fallback, ReplyOutcome::TimedOut)
                }
            };

            mailbox.post(Reply {
                turn,
                prompt,
                text,
                outcome,
            });
        })
    }

    fn deliver(&mut self, reply: Reply, now: Instant) {
        let waited = self
            .pending
            .as_ref()
            .map(|p| now.saturating_duration_since(p.started));
        tracing::info!(turn = %reply.turn, outcome = ?reply.outcome, ?waited, "Delivering reply");

        if reply.outcome == ReplyOutcome::Answered {
            self.session.record_exchange(reply.prompt, reply.text.clone());
        }

        self.send(ConductorMessage::response(reply.text.clone()));
        self.set_mood(Mood::Happy);
        self.send(ConductorMessage::status(STATUS_READY));
        self.pending = None;
        self.phase = TurnPhase::Delivered;
        self.speech.notify(&reply.text);
        self.schedule_settle(now + self.config.timing.mood_dwell);
    }

    fn greet(&mut self, now: Instant) {
        let greeting = self.config.messages.greeting.clone();
        self.send(ConductorMessage::response(greeting.clone()));
        self.speech.notify(&greeting);

        if self.pending.is_some() {
            tracing::debug!("Turn pending during greeting, keeping thinking face");
            return;
        }

        self.set_mood(Mood::Happy);
        self.send(ConductorMessage::status(STATUS_INTRO_READY));
        self.phase = TurnPhase::Delivered;
        // Supersede any settle still queued from an earlier delivery.
        self.generation += 1;
        self.schedule_settle(now + self.config.timing.intro_dwell);
    }

    fn schedule_settle(&mut self, at: Instant) {
        let generation = self.generation;
        self.timeline.schedule(at, Deferred::SettleMood { generation });
    }

    /// Change the face, telling the surface only when it actually changed
    fn set_mood(&mut self, mood: Mood) -> bool {
        if !self.avatar.set_expression(mood) {
            return false;
        }
        tracing::debug!(mood = %mood, "Mood changed");
        self.send(ConductorMessage::Mood { mood });
        true
    }

    fn send(&self, msg: ConductorMessage) {
        if self.tx.send(msg).is_err() {
            tracing::debug!("Surface channel closed, dropping message");
        }
    }
}
