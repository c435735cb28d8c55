//! Milo Entry Point
//!
//! Opens the Milo window in the terminal and runs until the user quits.
//!
//! Configuration comes from `milo.toml` (or `MILO_CONFIG`), `.env` files and
//! the environment. Logs go to the file named by `MILO_LOG_FILE`, filtered
//! by `RUST_LOG`.

use std::fs::File;
use std::io::{self, IsTerminal};
use std::panic;
use std::sync::Mutex;

use anyhow::Context;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use milo_conductor::config::{load_config, load_dotenv};
use milo_tui::{App, ConductorClient};

const DEFAULT_LOG_FILTER: &str = "milo=info,milo_conductor=info,milo_tui=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    init_logging()?;

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: milo requires a terminal (TTY)");
        eprintln!();
        eprintln!("This usually means stdin or stdout is piped, or you are");
        eprintln!("connected over SSH without -t.");
        std::process::exit(1);
    }

    let config = load_config().context("failed to load configuration")?;
    tracing::info!(
        model = %config.conversation.model,
        config_file = ?config.config_file_path,
        "Starting Milo"
    );

    // Restore the terminal before printing a panic
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut app = App::new(ConductorClient::from_config(&config));
    let result = app.run(&mut terminal).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Install the tracing subscriber
///
/// The terminal belongs to the window, so logs are only written when
/// `MILO_LOG_FILE` names a file.
fn init_logging() -> anyhow::Result<()> {
    let Some(path) = std::env::var_os("MILO_LOG_FILE") else {
        return Ok(());
    };
    let file = File::create(&path)
        .with_context(|| format!("failed to create log file {}", path.to_string_lossy()))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();
    Ok(())
}
