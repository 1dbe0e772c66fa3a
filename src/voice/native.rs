//! Host speech command provider (`say` on macOS, `espeak-ng` elsewhere).

use async_trait::async_trait;
use tokio::process::Command;

use crate::foundation::error::{VersecastError, VersecastResult};
use crate::voice::provider::{ProviderId, SpeakOptions, Voice, VoiceProvider};

const DEFAULT_WPM: f32 = 175.0;

/// Which host speech program to drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeechCommand {
    Say,
    EspeakNg,
}

impl SpeechCommand {
    pub fn for_host() -> Self {
        if cfg!(target_os = "macos") {
            Self::Say
        } else {
            Self::EspeakNg
        }
    }

    pub fn program(self) -> &'static str {
        match self {
            Self::Say => "say",
            Self::EspeakNg => "espeak-ng",
        }
    }

    fn list_args(self) -> &'static [&'static str] {
        match self {
            Self::Say => &["-v", "?"],
            Self::EspeakNg => &["--voices"],
        }
    }

    /// Arguments that speak `text` aloud.
    pub fn speak_args(self, text: &str, voice_id: Option<&str>, opts: &SpeakOptions) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(v) = voice_id.filter(|v| !v.is_empty()) {
            args.push("-v".to_owned());
            args.push(v.to_owned());
        }
        if let Some(speed) = opts.speed {
            let wpm = (DEFAULT_WPM * speed).round().max(1.0) as u32;
            args.push(match self {
                Self::Say => "-r".to_owned(),
                Self::EspeakNg => "-s".to_owned(),
            });
            args.push(wpm.to_string());
        }
        // Keeps text starting with '-' from being read as a flag.
        args.push("--".to_owned());
        args.push(text.to_owned());
        args
    }

    pub fn parse_voices(self, stdout: &str) -> Vec<Voice> {
        match self {
            Self::Say => parse_say_voices(stdout),
            Self::EspeakNg => parse_espeak_voices(stdout),
        }
    }
}

/// Self-playing provider: synthesis speaks through the host audio device and returns `None`.
///
/// The child process is killed when the synthesis future is dropped.
#[derive(Clone, Debug)]
pub struct NativeProvider {
    command: SpeechCommand,
}

impl NativeProvider {
    pub fn new(command: SpeechCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> SpeechCommand {
        self.command
    }
}

impl Default for NativeProvider {
    fn default() -> Self {
        Self::new(SpeechCommand::for_host())
    }
}

#[async_trait]
impl VoiceProvider for NativeProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Native
    }

    fn display_name(&self) -> &'static str {
        "System Native"
    }

    async fn list_voices(&self) -> Vec<Voice> {
        let output = Command::new(self.command.program())
            .args(self.command.list_args())
            .kill_on_drop(true)
            .output()
            .await;
        match output {
            Ok(out) if out.status.success() => {
                self.command.parse_voices(&String::from_utf8_lossy(&out.stdout))
            }
            Ok(out) => {
                tracing::warn!(status = %out.status, program = self.command.program(), "voice listing failed");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, program = self.command.program(), "speech command unavailable");
                Vec::new()
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self, text, opts), fields(program = self.command.program()))]
    async fn synthesize(
        &self,
        text: &str,
        voice_id: Option<&str>,
        opts: &SpeakOptions,
    ) -> VersecastResult<Option<Vec<u8>>> {
        let status = Command::new(self.command.program())
            .args(self.command.speak_args(text, voice_id, opts))
            .kill_on_drop(true)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await
            .map_err(|e| {
                VersecastError::provider(format!(
                    "failed to run '{}' (is it installed?): {e}",
                    self.command.program()
                ))
            })?;
        if !status.success() {
            return Err(VersecastError::provider(format!(
                "'{}' exited with status {status}",
                self.command.program()
            )));
        }
        Ok(None)
    }
}

// `Alex                en_US    # Most people recognize me by my voice.`
fn parse_say_voices(stdout: &str) -> Vec<Voice> {
    stdout
        .lines()
        .filter_map(|line| {
            let head = line.split('#').next()?.trim_end();
            let (name, lang) = head.rsplit_once(char::is_whitespace)?;
            let name = name.trim();
            if name.is_empty() || lang.is_empty() {
                return None;
            }
            Some(Voice {
                id: name.to_owned(),
                name: name.to_owned(),
                lang: Some(lang.to_owned()),
                preview_url: None,
            })
        })
        .collect()
}

// `Pty Language Age/Gender VoiceName File Other Languages`, one header line.
fn parse_espeak_voices(stdout: &str) -> Vec<Voice> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 4 {
                return None;
            }
            let name = cols[3];
            let id = cols.get(4).copied().unwrap_or(name);
            Some(Voice {
                id: id.to_owned(),
                name: name.replace('_', " "),
                lang: Some(cols[1].to_owned()),
                preview_url: None,
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/voice/native.rs"]
mod tests;
