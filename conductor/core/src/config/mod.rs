//! TOML Configuration File Support
//!
//! Centralized configuration loading for Milo, from an optional TOML file at
//! `~/.config/milo/milo.toml` plus environment variables.
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. Environment variables (including `.env` files)
//! 2. TOML configuration file
//! 3. Default values
//!
//! A missing file is not an error. A missing API key is not an error either:
//! Milo still starts, and every reply becomes the fallback message.
//!
//! # Example Configuration
//!
//! ```toml
//! [conversation]
//! model = "gemini-2.0-flash"
//! reply_timeout_secs = 60
//!
//! [timing]
//! poll_interval_ms = 100
//! mood_dwell_ms = 1500
//! blink_min_ms = 2100
//! blink_max_ms = 4400
//!
//! [speech]
//! enabled = true
//! rate = 155
//! volume = 0.88
//!
//! [messages]
//! fallback = "(Sorry, there was a problem. Please try again.)"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::avatar::{BlinkTiming, WaveTiming};
use crate::backend::{DEFAULT_BASE_URL, DEFAULT_MODEL};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Conversation service settings
#[derive(Clone, Debug, PartialEq)]
pub struct ConversationConfig {
    /// API key (None = every exchange fails with the fallback message)
    pub api_key: Option<String>,
    /// Model name
    pub model: String,
    /// Service root URL
    pub base_url: String,
    /// Optional system instruction sent with every request
    pub system_instruction: Option<String>,
    /// Abandon a reply after this long (None = wait forever)
    pub reply_timeout: Option<Duration>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            system_instruction: None,
            reply_timeout: Some(Duration::from_secs(60)),
        }
    }
}

/// Timers and animation cadences
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimingConfig {
    /// Mailbox poll period
    pub poll_interval: Duration,
    /// How long the happy face lingers after a reply
    pub mood_dwell: Duration,
    /// Delay before the intro wave
    pub intro_delay: Duration,
    /// How long the happy face lingers after the greeting
    pub intro_dwell: Duration,
    /// Shortest gap between blinks
    pub blink_min: Duration,
    /// Longest gap between blinks
    pub blink_max: Duration,
    /// How long the eyes stay shut
    pub blink_closed: Duration,
    /// Time between wave keyframes
    pub wave_cadence: Duration,
    /// Number of wave keyframes
    pub wave_steps: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            mood_dwell: Duration::from_millis(1500),
            intro_delay: Duration::from_millis(240),
            intro_dwell: Duration::from_millis(1800),
            blink_min: Duration::from_millis(2100),
            blink_max: Duration::from_millis(4400),
            blink_closed: Duration::from_millis(120),
            wave_cadence: Duration::from_millis(150),
            wave_steps: 8,
        }
    }
}

impl TimingConfig {
    /// Blink parameters for the avatar
    #[must_use]
    pub fn blink(&self) -> BlinkTiming {
        BlinkTiming {
            interval_min: self.blink_min,
            interval_max: self.blink_max,
            closed_for: self.blink_closed,
        }
    }

    /// Wave parameters for the avatar
    #[must_use]
    pub fn wave(&self) -> WaveTiming {
        WaveTiming {
            cadence: self.wave_cadence,
            steps: self.wave_steps,
        }
    }
}

/// Speech output settings
#[derive(Clone, Debug, PartialEq)]
pub struct SpeechConfig {
    /// Whether replies are spoken
    pub enabled: bool,
    /// Words per minute
    pub rate: u32,
    /// Volume, 0.0 to 1.0
    pub volume: f32,
    /// Voice name (None = platform default)
    pub voice: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate: 155,
            volume: 0.88,
            voice: None,
        }
    }
}

/// User-visible strings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessagesConfig {
    /// Shown and spoken after the intro wave
    pub greeting: String,
    /// Shown and spoken when a reply could not be obtained
    pub fallback: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            greeting: "Hello! I'm Milo, your Windows 98 style assistant.".to_string(),
            fallback: "(Sorry, there was a problem. Please try again.)".to_string(),
        }
    }
}

/// Complete Milo configuration
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MiloConfig {
    /// `[conversation]`
    pub conversation: ConversationConfig,
    /// `[timing]`
    pub timing: TimingConfig,
    /// `[speech]`
    pub speech: SpeechConfig,
    /// `[messages]`
    pub messages: MessagesConfig,
    /// File the configuration was read from, if any
    pub config_file_path: Option<PathBuf>,
}

impl MiloConfig {
    /// Check cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timing;
        if t.poll_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "timing.poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if t.blink_min <= t.blink_closed {
            return Err(ConfigError::ValidationError(format!(
                "timing.blink_min_ms ({}) must exceed timing.blink_closed_ms ({})",
                t.blink_min.as_millis(),
                t.blink_closed.as_millis()
            )));
        }
        if t.blink_max < t.blink_min {
            return Err(ConfigError::ValidationError(format!(
                "timing.blink_max_ms ({}) must be at least timing.blink_min_ms ({})",
                t.blink_max.as_millis(),
                t.blink_min.as_millis()
            )));
        }
        if t.wave_steps < 1 {
            return Err(ConfigError::ValidationError(
                "timing.wave_steps must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.speech.volume) {
            return Err(ConfigError::ValidationError(format!(
                "speech.volume ({}) must be between 0.0 and 1.0",
                self.speech.volume
            )));
        }
        Ok(())
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[conversation]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationToml {
    /// API key (prefer the environment)
    pub api_key: Option<String>,
    /// Model name
    pub model: Option<String>,
    /// Service root URL
    pub base_url: Option<String>,
    /// System instruction
    pub system_instruction: Option<String>,
    /// Reply timeout in seconds (0 = no timeout)
    pub reply_timeout_secs: Option<u64>,
}

/// `[timing]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingToml {
    /// Mailbox poll period
    pub poll_interval_ms: Option<u64>,
    /// Happy-face dwell after a reply
    pub mood_dwell_ms: Option<u64>,
    /// Delay before the intro wave
    pub intro_delay_ms: Option<u64>,
    /// Happy-face dwell after the greeting
    pub intro_dwell_ms: Option<u64>,
    /// Shortest gap between blinks
    pub blink_min_ms: Option<u64>,
    /// Longest gap between blinks
    pub blink_max_ms: Option<u64>,
    /// Eyes-shut duration
    pub blink_closed_ms: Option<u64>,
    /// Time between wave keyframes
    pub wave_cadence_ms: Option<u64>,
    /// Number of wave keyframes
    pub wave_steps: Option<usize>,
}

/// `[speech]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechToml {
    /// Whether replies are spoken
    pub enabled: Option<bool>,
    /// Words per minute
    pub rate: Option<u32>,
    /// Volume, 0.0 to 1.0
    pub volume: Option<f32>,
    /// Voice name
    pub voice: Option<String>,
}

/// `[messages]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesToml {
    /// Greeting after the intro wave
    pub greeting: Option<String>,
    /// Text shown when a reply fails
    pub fallback: Option<String>,
}

/// Root of `milo.toml`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MiloToml {
    /// `[conversation]`
    pub conversation: ConversationToml,
    /// `[timing]`
    pub timing: TimingToml,
    /// `[speech]`
    pub speech: SpeechToml,
    /// `[messages]`
    pub messages: MessagesToml,
}

// =============================================================================
// Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/milo/milo.toml` or the platform equivalent.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("milo").join("milo.toml"))
}

/// Load `.env` files, executable directory first, then the working directory
///
/// Values already present in the environment are never overwritten, so the
/// first file to define a key wins. Missing files are ignored.
pub fn load_dotenv() {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf));

    if let Some(dir) = exe_dir {
        let path = dir.join(".env");
        if dotenvy::from_path(&path).is_ok() {
            tracing::debug!(path = %path.display(), "Loaded .env");
        }
    }
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }
}

/// Load configuration from all sources with proper priority
///
/// `MILO_CONFIG` overrides the file location.
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read, parsed or
/// validated. A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<MiloConfig, ConfigError> {
    let path = std::env::var_os("MILO_CONFIG")
        .map(PathBuf::from)
        .or_else(default_config_path);
    load_config_from_path(path)
}

/// Load configuration from a specific path, then apply the process environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed, or
/// if the merged configuration is invalid.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<MiloConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration using `env` as the environment lookup
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<MiloConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = MiloConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: MiloToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);
    config.validate()?;

    if config.conversation.api_key.is_none() {
        tracing::warn!("No API key found (set GOOGLE_API_KEY); replies will fall back");
    }

    Ok(config)
}

fn millis(ms: Option<u64>) -> Option<Duration> {
    ms.map(Duration::from_millis)
}

fn timeout_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut MiloConfig, toml: &MiloToml) {
    let conv = &toml.conversation;
    if conv.api_key.is_some() {
        config.conversation.api_key = conv.api_key.clone();
    }
    if let Some(model) = &conv.model {
        config.conversation.model = model.clone();
    }
    if let Some(url) = &conv.base_url {
        config.conversation.base_url = url.clone();
    }
    if conv.system_instruction.is_some() {
        config.conversation.system_instruction = conv.system_instruction.clone();
    }
    if let Some(secs) = conv.reply_timeout_secs {
        config.conversation.reply_timeout = timeout_secs(secs);
    }

    let t = &toml.timing;
    let timing = &mut config.timing;
    timing.poll_interval = millis(t.poll_interval_ms).unwrap_or(timing.poll_interval);
    timing.mood_dwell = millis(t.mood_dwell_ms).unwrap_or(timing.mood_dwell);
    timing.intro_delay = millis(t.intro_delay_ms).unwrap_or(timing.intro_delay);
    timing.intro_dwell = millis(t.intro_dwell_ms).unwrap_or(timing.intro_dwell);
    timing.blink_min = millis(t.blink_min_ms).unwrap_or(timing.blink_min);
    timing.blink_max = millis(t.blink_max_ms).unwrap_or(timing.blink_max);
    timing.blink_closed = millis(t.blink_closed_ms).unwrap_or(timing.blink_closed);
    timing.wave_cadence = millis(t.wave_cadence_ms).unwrap_or(timing.wave_cadence);
    if let Some(steps) = t.wave_steps {
        timing.wave_steps = steps;
    }

    let s = &toml.speech;
    if let Some(enabled) = s.enabled {
        config.speech.enabled = enabled;
    }
    if let Some(rate) = s.rate {
        config.speech.rate = rate;
    }
    if let Some(volume) = s.volume {
        config.speech.volume = volume;
    }
    if s.voice.is_some() {
        config.speech.voice = s.voice.clone();
    }

    if let Some(greeting) = &toml.messages.greeting {
        config.messages.greeting = greeting.clone();
    }
    if let Some(fallback) = &toml.messages.fallback {
        config.messages.fallback = fallback.clone();
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut MiloConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = non_empty("GOOGLE_API_KEY").or_else(|| non_empty("GEMINI_API_KEY")) {
        config.conversation.api_key = Some(key);
    }
    if let Some(model) = non_empty("MILO_MODEL") {
        config.conversation.model = model;
    }
    if let Some(timeout) = non_empty("MILO_REPLY_TIMEOUT_SECS") {
        match timeout.trim().parse::<u64>() {
            Ok(secs) => config.conversation.reply_timeout = timeout_secs(secs),
            Err(_) => tracing::warn!(value = %timeout, "Ignoring invalid MILO_REPLY_TIMEOUT_SECS"),
        }
    }
    if let Some(enabled) = non_empty("MILO_SPEECH") {
        let enabled = enabled.trim();
        config.speech.enabled = enabled != "0" && !enabled.eq_ignore_ascii_case("false");
    }
    if let Some(voice) = non_empty("MILO_VOICE") {
        config.speech.voice = Some(voice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn toml_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    // =========================================================================
    // Defaults
    // =========================================================================

    #[test]
    fn test_default_config() {
        let config = MiloConfig::default();

        assert_eq!(config.conversation.model, "gemini-2.0-flash");
        assert_eq!(config.conversation.reply_timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.timing.poll_interval, Duration::from_millis(100));
        assert_eq!(config.timing.mood_dwell, Duration::from_millis(1500));
        assert_eq!(config.timing.wave_steps, 8);
        assert_eq!(config.speech.rate, 155);
        assert_eq!(
            config.messages.fallback,
            "(Sorry, there was a problem. Please try again.)"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(p) = default_config_path() {
            assert!(p.ends_with("milo/milo.toml"));
        }
    }

    // =========================================================================
    // TOML Parsing
    // =========================================================================

    #[test]
    fn test_parse_partial_toml() {
        let file = toml_file(
            r#"
[conversation]
model = "gemini-1.5-pro"
reply_timeout_secs = 0

[timing]
mood_dwell_ms = 900
wave_steps = 4

[speech]
enabled = false
"#,
        );

        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        assert_eq!(config.conversation.model, "gemini-1.5-pro");
        assert_eq!(config.conversation.reply_timeout, None);
        assert_eq!(config.timing.mood_dwell, Duration::from_millis(900));
        assert_eq!(config.timing.wave_steps, 4);
        // Untouched fields keep their defaults
        assert_eq!(config.timing.intro_delay, Duration::from_millis(240));
        assert!(!config.speech.enabled);
        assert_eq!(config.config_file_path, Some(file.path().to_path_buf()));
    }

    #[test]
    fn test_parse_empty_toml() {
        let file = toml_file("");
        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        assert_eq!(config.timing, TimingConfig::default());
    }

    #[test]
    fn test_missing_file_graceful() {
        let path = PathBuf::from("/nonexistent/path/milo.toml");
        let config = load_config_with_env(Some(path), no_env).unwrap();
        assert_eq!(config.config_file_path, None);
        assert_eq!(config.conversation.api_key, None);
    }

    #[test]
    fn test_malformed_toml_error() {
        let file = toml_file("[timing\nmood_dwell_ms = \"soon\"\n");
        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn test_blink_closed_must_be_shorter_than_cycle() {
        let file = toml_file("[timing]\nblink_min_ms = 100\nblink_closed_ms = 100\n");
        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        match result {
            Err(ConfigError::ValidationError(msg)) => assert!(msg.contains("blink_min_ms")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_wave_steps_rejected() {
        let mut config = MiloConfig::default();
        config.timing.wave_steps = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    // =========================================================================
    // Priority Ordering
    // =========================================================================

    #[test]
    fn test_env_overrides_file() {
        let file = toml_file(
            r#"
[conversation]
model = "file-model"
api_key = "file-key"
"#,
        );
        let env = env_from(&[
            ("MILO_MODEL", "env-model"),
            ("GEMINI_API_KEY", "env-key"),
            ("MILO_REPLY_TIMEOUT_SECS", "15"),
            ("MILO_SPEECH", "false"),
            ("MILO_VOICE", "en-gb"),
        ]);

        let config = load_config_with_env(Some(file.path().to_path_buf()), env).unwrap();
        assert_eq!(config.conversation.model, "env-model");
        assert_eq!(config.conversation.api_key.as_deref(), Some("env-key"));
        assert_eq!(config.conversation.reply_timeout, Some(Duration::from_secs(15)));
        assert!(!config.speech.enabled);
        assert_eq!(config.speech.voice.as_deref(), Some("en-gb"));
    }

    #[test]
    fn test_google_key_preferred_over_gemini_key() {
        let env = env_from(&[("GOOGLE_API_KEY", "g"), ("GEMINI_API_KEY", "m")]);
        let config = load_config_with_env(None, env).unwrap();
        assert_eq!(config.conversation.api_key.as_deref(), Some("g"));
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let env = env_from(&[("GOOGLE_API_KEY", "  "), ("MILO_REPLY_TIMEOUT_SECS", "soon")]);
        let config = load_config_with_env(None, env).unwrap();
        assert_eq!(config.conversation.api_key, None);
        assert_eq!(config.conversation.reply_timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_zero_timeout_disables() {
        let env = env_from(&[("MILO_REPLY_TIMEOUT_SECS", "0")]);
        let config = load_config_with_env(None, env).unwrap();
        assert_eq!(config.conversation.reply_timeout, None);
    }

    #[test]
    fn test_timing_conversions() {
        let timing = TimingConfig::default();
        assert_eq!(timing.blink(), BlinkTiming::default());
        assert_eq!(timing.wave(), WaveTiming::default());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::ValidationError("bad".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: bad");
    }
}
