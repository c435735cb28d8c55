//! Speech Output
//!
//! Fire-and-forget text-to-speech. The controller calls
//! [`SpeechNotifier::notify`] and moves on; the utterance runs on its own
//! task and any failure stays inside this module.
//!
//! [`SystemSpeech`] shells out to the platform's speech tool:
//!
//! | Platform | Command |
//! |----------|---------|
//! | macOS    | `say -r <wpm> [-v voice] -f -` (text on stdin) |
//! | Linux    | `espeak-ng -s <wpm> -a <amplitude> [-v voice]` |
//! | Windows  | PowerShell `System.Speech`, text on stdin |
//!
//! Utterances queue behind each other so two replies are never spoken at
//! the same time.

use std::process::Stdio;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Mutex;

use crate::config::SpeechConfig;

/// Speech output capability
pub trait SpeechNotifier: Send + Sync {
    /// Speak `text` without blocking the caller
    fn notify(&self, text: &str);
}

/// Speech disabled
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentSpeech;

impl SpeechNotifier for SilentSpeech {
    fn notify(&self, _text: &str) {}
}

/// Target platform for command construction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    /// `say`
    MacOs,
    /// `espeak-ng`
    Linux,
    /// PowerShell + System.Speech
    Windows,
}

impl Platform {
    /// Platform this binary was built for
    #[must_use]
    pub fn current() -> Option<Self> {
        if cfg!(target_os = "macos") {
            Some(Self::MacOs)
        } else if cfg!(target_os = "windows") {
            Some(Self::Windows)
        } else if cfg!(unix) {
            Some(Self::Linux)
        } else {
            None
        }
    }
}

/// A fully resolved speech command
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeechCommand {
    /// Executable name
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Text fed on stdin, if the tool reads it from there
    pub stdin: Option<String>,
}

impl SpeechCommand {
    /// Build the command that speaks `text` on `platform`
    #[must_use]
    pub fn build(platform: Platform, config: &SpeechConfig, text: &str) -> Self {
        match platform {
            Platform::MacOs => {
                let mut args = vec!["-r".to_string(), config.rate.to_string()];
                if let Some(voice) = &config.voice {
                    args.extend(["-v".to_string(), voice.clone()]);
                }
                // Text as an argument would be parsed as options when it starts with '-'.
                args.extend(["-f".to_string(), "-".to_string()]);
                Self {
                    program: "say".to_string(),
                    args,
                    stdin: Some(text.to_string()),
                }
            }
            Platform::Linux => {
                let amplitude = (config.volume.clamp(0.0, 1.0) * 100.0).round() as u32;
                let mut args = vec![
                    "-s".to_string(),
                    config.rate.to_string(),
                    "-a".to_string(),
                    amplitude.to_string(),
                ];
                if let Some(voice) = &config.voice {
                    args.extend(["-v".to_string(), voice.clone()]);
                }
                args.push("--".to_string());
                args.push(text.to_string());
                Self {
                    program: "espeak-ng".to_string(),
                    args,
                    stdin: None,
                }
            }
            Platform::Windows => Self {
                program: "powershell".to_string(),
                args: vec![
                    "-NoProfile".to_string(),
                    "-NonInteractive".to_string(),
                    "-Command".to_string(),
                    windows_script(config),
                ],
                stdin: Some(text.to_string()),
            },
        }
    }
}

/// Map words-per-minute to the SAPI -10..=10 rate scale (200 wpm = 0)
fn sapi_rate(wpm: u32) -> i32 {
    ((i64::from(wpm) - 200) / 20).clamp(-10, 10) as i32
}

fn windows_script(config: &SpeechConfig) -> String {
    let volume = (config.volume.clamp(0.0, 1.0) * 100.0).round() as u32;
    let select = match &config.voice {
        Some(voice) => format!("$s.SelectVoice('{}');", voice.replace('\'', "''")),
        // Second installed voice, like the desktop default
        None => "$v = $s.GetInstalledVoices(); \
                 if ($v.Count -gt 1) { $s.SelectVoice($v[1].VoiceInfo.Name) };"
            .to_string(),
    };
    format!(
        "Add-Type -AssemblyName System.Speech; \
         $s = New-Object System.Speech.Synthesis.SpeechSynthesizer; \
         {select} $s.Rate = {rate}; $s.Volume = {volume}; \
         $s.Speak([Console]::In.ReadToEnd())",
        rate = sapi_rate(config.rate),
    )
}

/// Platform text-to-speech through an external command
#[derive(Clone, Debug)]
pub struct SystemSpeech {
    config: SpeechConfig,
    platform: Platform,
    queue: Arc<Mutex<()>>,
}

impl SystemSpeech {
    /// Create a notifier for the current platform
    ///
    /// Returns `None` on platforms without a known speech tool.
    #[must_use]
    pub fn new(config: SpeechConfig) -> Option<Self> {
        Platform::current().map(|platform| Self {
            config,
            platform,
            queue: Arc::new(Mutex::new(())),
        })
    }

    async fn speak(command: SpeechCommand) -> std::io::Result<()> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        if let (Some(text), Some(mut stdin)) = (command.stdin, child.stdin.take()) {
            stdin.write_all(text.as_bytes()).await?;
            // Close stdin so the script sees EOF
            drop(stdin);
        }

        let status = child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            Err(std::io::Error::other(format!(
                "{} exited with {status}",
                command.program
            )))
        }
    }
}

impl SpeechNotifier for SystemSpeech {
    fn notify(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No async runtime available, skipping speech");
            return;
        };

        let command = SpeechCommand::build(self.platform, &self.config, text);
        let queue = Arc::clone(&self.queue);
        runtime.spawn(async move {
            let _turn = queue.lock().await;
            let program = command.program.clone();
            if let Err(e) = Self::speak(command).await {
                tracing::debug!(program = %program, error = %e, "Speech output failed");
            }
        });
    }
}

/// Pick the notifier the configuration asks for
#[must_use]
pub fn from_config(config: &SpeechConfig) -> Arc<dyn SpeechNotifier> {
    if !config.enabled {
        return Arc::new(SilentSpeech);
    }
    match SystemSpeech::new(config.clone()) {
        Some(speech) => Arc::new(speech),
        None => {
            tracing::info!("No speech tool for this platform, speech disabled");
            Arc::new(SilentSpeech)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> SpeechConfig {
        SpeechConfig::default()
    }

    #[test]
    fn test_macos_command() {
        let cmd = SpeechCommand::build(Platform::MacOs, &config(), "Hello there");
        assert_eq!(cmd.program, "say");
        assert_eq!(cmd.args, vec!["-r", "155", "-f", "-"]);
        assert_eq!(cmd.stdin.as_deref(), Some("Hello there"));
    }

    #[test]
    fn test_macos_bullet_reply_is_not_an_option() {
        let cmd = SpeechCommand::build(Platform::MacOs, &config(), "- First bullet");
        assert!(cmd.args.iter().all(|a| a != "- First bullet"));
        assert_eq!(cmd.stdin.as_deref(), Some("- First bullet"));
    }

    #[test]
    fn test_linux_command_with_voice() {
        let cfg = SpeechConfig {
            voice: Some("en-us".to_string()),
            ..config()
        };
        let cmd = SpeechCommand::build(Platform::Linux, &cfg, "-dash first");
        assert_eq!(cmd.program, "espeak-ng");
        assert_eq!(
            cmd.args,
            vec!["-s", "155", "-a", "88", "-v", "en-us", "--", "-dash first"]
        );
    }

    #[test]
    fn test_windows_reads_text_from_stdin() {
        let cmd = SpeechCommand::build(Platform::Windows, &config(), "Hi 'quoted'");
        assert_eq!(cmd.program, "powershell");
        assert_eq!(cmd.stdin.as_deref(), Some("Hi 'quoted'"));
        let script = cmd.args.last().unwrap();
        assert!(script.contains("$s.Volume = 88"));
        assert!(script.contains("$v[1]"));
        assert!(!script.contains("quoted"));
    }

    #[test]
    fn test_windows_voice_is_escaped() {
        let cfg = SpeechConfig {
            voice: Some("O'Brien".to_string()),
            ..config()
        };
        let cmd = SpeechCommand::build(Platform::Windows, &cfg, "x");
        assert!(cmd.args.last().unwrap().contains("SelectVoice('O''Brien')"));
    }

    #[test]
    fn test_sapi_rate_mapping() {
        assert_eq!(sapi_rate(200), 0);
        assert_eq!(sapi_rate(155), -2);
        assert_eq!(sapi_rate(1000), 10);
        assert_eq!(sapi_rate(0), -10);
    }

    #[test]
    fn test_disabled_config_is_silent() {
        let cfg = SpeechConfig {
            enabled: false,
            ..config()
        };
        // Must not panic or spawn anything without a runtime
        from_config(&cfg).notify("hello");
    }
}
