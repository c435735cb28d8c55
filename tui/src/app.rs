//! Main Application
//!
//! The App struct manages the window lifecycle as a thin display client:
//! - Event loop (keyboard, mailbox poll, animation frames)
//! - ConductorClient for turn-taking
//! - DisplayState for rendering
//!
//! The App:
//! 1. Converts key presses to controller calls
//! 2. Drives the controller's poll and tick hooks on timers
//! 3. Receives ConductorMessages and updates DisplayState
//! 4. Renders based on DisplayState and the avatar geometry

use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use tokio::time::MissedTickBehavior;

use milo_conductor::ConversationClient;

use crate::avatar::AvatarCanvas;
use crate::conductor_client::ConductorClient;
use crate::display::DisplayState;
use crate::theme;

/// Window title
pub const TITLE: &str = "Milo - Windows 98 2.5D AI Assistant";

/// Caption above the response box
pub const RESPONSE_LABEL: &str = "Milo's Response:";

/// Label drawn beside the input box
pub const SEND_HINT: &str = "[ Send ]";

/// Animation frame period (~30 FPS)
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Response box height including borders
const RESPONSE_HEIGHT: u16 = 6;

/// Input row height including borders
const INPUT_HEIGHT: u16 = 3;

/// Main application state
pub struct App<C: ConversationClient + 'static> {
    /// Is the app still running?
    running: bool,
    /// Client for the embedded controller
    conductor: ConductorClient<C>,
    /// Display state derived from ConductorMessages
    display: DisplayState,
}

impl<C: ConversationClient + 'static> App<C> {
    /// Create a new App around a controller client
    pub fn new(conductor: ConductorClient<C>) -> Self {
        Self {
            running: true,
            conductor,
            display: DisplayState::new(),
        }
    }

    /// Whether the event loop should keep going
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current display state
    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    /// The embedded controller client
    pub fn conductor(&self) -> &ConductorClient<C> {
        &self.conductor
    }

    /// Start the controller and apply its first messages
    pub fn start(&mut self, now: Instant) {
        self.conductor.start(now);
        self.process_conductor_messages();
    }

    /// Main event loop
    ///
    /// # Errors
    ///
    /// Returns an error if drawing to the terminal fails.
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        let mut event_stream = EventStream::new();

        let mut poll = tokio::time::interval(self.conductor.config().timing.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut frame = tokio::time::interval(FRAME_INTERVAL);
        frame.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.start(Instant::now());
        terminal.draw(|f| self.draw(f))?;

        while self.running {
            tokio::select! {
                biased;

                // Terminal events - highest priority
                maybe_event = event_stream.next() => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            self.handle_key(key, Instant::now());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!("Terminal event error: {}", e);
                        }
                        None => {
                            tracing::info!("Terminal event stream closed");
                            self.conductor.request_quit(Instant::now());
                            self.process_conductor_messages();
                        }
                    }
                }

                // Mailbox poll
                _ = poll.tick() => self.poll(Instant::now()),

                // Timers and animation
                _ = frame.tick() => self.tick(Instant::now()),
            }

            terminal.draw(|f| self.draw(f))?;
        }

        Ok(())
    }

    /// Deliver a finished reply, if any
    pub fn poll(&mut self, now: Instant) {
        self.conductor.poll(now);
        self.process_conductor_messages();
    }

    /// Advance timers and animations
    pub fn tick(&mut self, now: Instant) {
        self.conductor.tick(now);
        self.process_conductor_messages();
    }

    /// Apply every pending controller message
    pub fn process_conductor_messages(&mut self) {
        for msg in self.conductor.recv_all() {
            self.display.apply_message(msg);
        }
        if self.display.quit {
            self.running = false;
        }
    }

    /// Handle a key press
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c' | 'q') if ctrl => {
                self.conductor.request_quit(now);
            }
            KeyCode::Enter => {
                let outcome = self.conductor.submit(&self.display.input, now);
                tracing::debug!(?outcome, "Submit");
            }
            KeyCode::Esc => {
                self.conductor.cancel(now);
            }
            KeyCode::Char(c) if !ctrl => self.display.push_char(c),
            KeyCode::Backspace => self.display.backspace(),
            _ => {}
        }
        self.process_conductor_messages();
    }

    /// Render the whole window
    pub fn draw(&self, frame: &mut Frame) {
        let window = Block::default()
            .borders(Borders::ALL)
            .border_style(theme::border_style())
            .title(Line::from(Span::styled(format!(" {TITLE} "), theme::title_style())))
            .style(Style::default().bg(theme::FACE).fg(theme::TEXT));
        let inner = window.inner(frame.area());
        frame.render_widget(window, frame.area());

        let [avatar_area, label_area, response_area, input_area, status_area] =
            Layout::vertical([
                Constraint::Min(6),
                Constraint::Length(1),
                Constraint::Length(RESPONSE_HEIGHT),
                Constraint::Length(INPUT_HEIGHT),
                Constraint::Length(1),
            ])
            .areas(inner);

        let shapes = self.conductor.avatar().shapes();
        frame.render_widget(
            AvatarCanvas::new(&shapes).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(theme::border_style()),
            ),
            avatar_area,
        );

        frame.render_widget(
            Paragraph::new(RESPONSE_LABEL).style(Style::default().fg(theme::TEXT).bg(theme::LABEL)),
            label_area,
        );

        frame.render_widget(
            Paragraph::new(self.display.response.as_str())
                .wrap(Wrap { trim: false })
                .style(theme::box_style())
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(theme::border_style()),
                ),
            response_area,
        );

        let [input_box, send_area] =
            Layout::horizontal([Constraint::Min(10), Constraint::Length(10)]).areas(input_area);
        frame.render_widget(
            Paragraph::new(self.display.input.as_str())
                .style(theme::box_style())
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(theme::SHADOW).bg(theme::CANVAS)),
                ),
            input_box,
        );
        frame.render_widget(
            Paragraph::new(vec![Line::default(), Line::from(SEND_HINT)])
                .centered()
                .style(Style::default().fg(theme::STATUS_TEXT).bg(theme::BUTTON)),
            send_area,
        );

        frame.render_widget(
            Paragraph::new(self.display.status.as_str())
                .style(Style::default().fg(theme::STATUS_TEXT).bg(theme::FACE)),
            status_area,
        );
    }
}
