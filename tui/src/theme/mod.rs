//! Theme and Colors
//!
//! The Windows 98 palette: grey window chrome, a pale sky canvas for Milo,
//! white text boxes with navy text.

use milo_conductor::avatar::Rgb;
use ratatui::style::{Color, Modifier, Style};

// ============================================================================
// Window chrome
// ============================================================================

/// Button face grey (window background, status bar)
pub const FACE: Color = Color::Rgb(0xC0, 0xC0, 0xC0);

/// Title bar navy
pub const TITLE_BAR: Color = Color::Rgb(0x00, 0x00, 0x80);

/// Title bar text
pub const TITLE_TEXT: Color = Color::Rgb(0xFF, 0xFF, 0xFF);

/// Sunken border shadow
pub const SHADOW: Color = Color::Rgb(0x80, 0x80, 0x80);

// ============================================================================
// Content areas
// ============================================================================

/// Avatar canvas background
pub const CANVAS: Color = Color::Rgb(0xE8, 0xF1, 0xFA);

/// Response label background
pub const LABEL: Color = Color::Rgb(0xF7, 0xF9, 0xFC);

/// Text box background
pub const TEXT_BOX: Color = Color::Rgb(0xFF, 0xFF, 0xFF);

/// Body text
pub const TEXT: Color = Color::Rgb(0x10, 0x20, 0x40);

/// Send button face
pub const BUTTON: Color = Color::Rgb(0xDB, 0xDF, 0xEA);

/// Status bar text
pub const STATUS_TEXT: Color = Color::Rgb(0x00, 0x00, 0x00);

/// Convert an avatar color to a terminal color
#[must_use]
pub fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

/// Style for the window title
#[must_use]
pub fn title_style() -> Style {
    Style::default()
        .fg(TITLE_TEXT)
        .bg(TITLE_BAR)
        .add_modifier(Modifier::BOLD)
}

/// Style for sunken content boxes
#[must_use]
pub fn box_style() -> Style {
    Style::default().fg(TEXT).bg(TEXT_BOX)
}

/// Style for box borders
#[must_use]
pub fn border_style() -> Style {
    Style::default().fg(SHADOW).bg(FACE)
}
