//! Conductor Client
//!
//! Thin wrapper around the turn controller for the terminal window. The
//! controller is embedded directly (no network); this client owns the
//! receiving end of its message channel.
//!
//! # Architecture
//!
//! The TUI is a "thin client" with no turn-taking logic of its own:
//! 1. Convert key presses to `SurfaceEvent`s
//! 2. Hand them to the controller
//! 3. Drive the controller's poll and timer hooks from the event loop
//! 4. Render display state from the `ConductorMessage`s it emits

use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use milo_conductor::{
    speech, Avatar, ConductorMessage, ControllerConfig, ConversationClient, GeminiClient,
    MiloConfig, Session, SubmitOutcome, SurfaceEvent, TurnController,
};

/// Client for the embedded turn controller
pub struct ConductorClient<C: ConversationClient + 'static> {
    /// The embedded controller
    controller: TurnController<C>,
    /// Receiver for messages from the controller
    rx: mpsc::UnboundedReceiver<ConductorMessage>,
}

impl ConductorClient<GeminiClient> {
    /// Build the production client from loaded configuration
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn from_config(config: &MiloConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = GeminiClient::from_config(&config.conversation);
        let speech = speech::from_config(&config.speech);
        let controller = TurnController::new(
            client,
            Arc::new(Session::new()),
            speech,
            ControllerConfig::from(config),
            Handle::current(),
            tx,
        );
        Self { controller, rx }
    }
}

impl<C: ConversationClient + 'static> ConductorClient<C> {
    /// Wrap an existing controller and its message receiver
    pub fn new(
        controller: TurnController<C>,
        rx: mpsc::UnboundedReceiver<ConductorMessage>,
    ) -> Self {
        Self { controller, rx }
    }

    /// Start blinking and schedule the intro
    pub fn start(&mut self, now: Instant) {
        self.controller.start(now);
    }

    /// Send the user's input as a new turn
    pub fn submit(&mut self, text: &str, now: Instant) -> SubmitOutcome {
        self.controller.submit(text, now)
    }

    /// Abandon the pending turn, if any
    pub fn cancel(&mut self, now: Instant) -> bool {
        self.controller.cancel(now)
    }

    /// Notify the controller that the user wants to quit
    pub fn request_quit(&mut self, now: Instant) {
        self.controller.handle_event(SurfaceEvent::Quit, now);
    }

    /// Deliver any finished reply (call on every poll interval)
    pub fn poll(&mut self, now: Instant) -> usize {
        self.controller.poll(now)
    }

    /// Run due timers and animations; returns whether the avatar changed
    pub fn tick(&mut self, now: Instant) -> bool {
        self.controller.tick(now)
    }

    /// Receive all pending messages from the controller (non-blocking)
    pub fn recv_all(&mut self) -> Vec<ConductorMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Avatar geometry to paint
    pub fn avatar(&self) -> &Avatar {
        self.controller.avatar()
    }

    /// Whether a reply is outstanding
    pub fn is_pending(&self) -> bool {
        self.controller.is_pending()
    }

    /// Controller settings in effect
    pub fn config(&self) -> &ControllerConfig {
        self.controller.config()
    }
}
