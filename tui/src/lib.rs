//! Milo TUI - Terminal window for Milo
//!
//! A full-screen, Windows 98 styled terminal window: Milo's avatar canvas on
//! top, the response box below it, then the input line and a status bar.
//!
//! # Architecture
//!
//! - **App**: event loop and layout, a thin client over the controller
//! - **ConductorClient**: owns the embedded `TurnController` and its channel
//! - **Display**: state derived from controller messages
//! - **Avatar**: paints the controller's shapes onto a Braille canvas
//! - **Theme**: the Windows 98 palette

pub mod app;
pub mod avatar;
pub mod conductor_client;
pub mod display;
pub mod theme;

pub use app::App;
pub use conductor_client::ConductorClient;
pub use display::DisplayState;
