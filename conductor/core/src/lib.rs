//! Milo Conductor - Headless Turn-Taking Core
//!
//! This crate holds everything Milo does that is not drawing: the
//! single-flight turn controller, the avatar state machine, the
//! conversation client, speech output and configuration. It has no
//! dependency on any terminal or GUI toolkit; the `milo-tui` crate is just
//! one surface driving it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         UI Surface                            │
//! │             (ratatui window, or a test harness)               │
//! └───────────────┬──────────────────────────────▲───────────────┘
//!                 │ SurfaceEvent                 │ ConductorMessage
//!                 │ poll(now) / tick(now)        │
//! ┌───────────────▼──────────────────────────────┴───────────────┐
//! │                      TurnController                           │
//! │  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌───────────────┐ │
//! │  │  Avatar  │  │ Timeline │  │ Mailbox  │◀─│ exchange task │ │
//! │  │  State   │  │(deferred)│  │ (mpsc)   │  │ (one per turn)│ │
//! │  └──────────┘  └──────────┘  └──────────┘  └───────┬───────┘ │
//! │                                                     │         │
//! │  ┌──────────────────┐          ┌────────────────────▼───────┐ │
//! │  │  SpeechNotifier  │          │ ConversationClient+Session │ │
//! │  └──────────────────┘          └────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`TurnController`]: owns the one-turn-at-a-time rule and sequences
//!   mood, response, status and speech
//! - [`Avatar`]: mood, blink loop, wave gesture and the shapes to paint
//! - [`ConversationClient`]: the remote chat capability ([`GeminiClient`])
//! - [`SpeechNotifier`]: fire-and-forget speech ([`SystemSpeech`])
//! - [`ConductorMessage`] / [`SurfaceEvent`]: the surface protocol
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Instant;
//! use milo_conductor::{config, speech, ControllerConfig, GeminiClient, Session, TurnController};
//! use tokio::sync::mpsc;
//!
//! let cfg = config::load_config()?;
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let mut controller = TurnController::new(
//!     GeminiClient::from_config(&cfg.conversation),
//!     Arc::new(Session::new()),
//!     speech::from_config(&cfg.speech),
//!     ControllerConfig::from(&cfg),
//!     tokio::runtime::Handle::current(),
//!     tx,
//! );
//!
//! controller.start(Instant::now());
//! loop {
//!     controller.poll(Instant::now());
//!     controller.tick(Instant::now());
//!     while let Ok(msg) = rx.try_recv() {
//!         // render
//!     }
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`avatar`]: moods, expressions, blink and wave
//! - [`backend`]: conversation client trait and the Gemini client
//! - [`config`]: TOML + environment configuration
//! - [`controller`]: the turn controller
//! - [`events`]: events from the surface
//! - [`mailbox`]: reply hand-off from exchange tasks
//! - [`messages`]: messages to the surface
//! - [`session`]: conversation history
//! - [`speech`]: speech output
//! - [`timeline`]: deferred actions keyed by deadline

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod avatar;
pub mod backend;
pub mod config;
pub mod controller;
pub mod events;
pub mod mailbox;
pub mod messages;
pub mod session;
pub mod speech;
pub mod timeline;

// Re-exports for convenience
pub use avatar::{Avatar, AvatarEvent, Mood};
pub use backend::{ConversationClient, ExchangeError, GeminiClient};
pub use config::{load_config, ConfigError, MiloConfig};
pub use controller::{ControllerConfig, RejectReason, SubmitOutcome, TurnController, TurnPhase};
pub use events::SurfaceEvent;
pub use mailbox::{Reply, ReplyOutcome};
pub use messages::{ConductorMessage, SessionId, TurnId};
pub use session::{ChatMessage, ChatRole, Session};
pub use speech::{SilentSpeech, SpeechNotifier, SystemSpeech};
pub use timeline::Timeline;
