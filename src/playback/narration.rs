use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt as _;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::NarrationConfig;
use crate::foundation::error::{VersecastError, VersecastResult};
use crate::timeline::Timeline;
use crate::voice::{SpeakOptions, VoiceService};

/// Plays encoded narration audio returned by a provider.
///
/// `play` resolves when playback finishes. Dropping the future stops playback.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn play(&self, audio: Vec<u8>) -> VersecastResult<()>;
}

/// Pipes audio into `ffplay` with no window.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfplayOutput;

#[async_trait]
impl AudioOutput for FfplayOutput {
    async fn play(&self, audio: Vec<u8>) -> VersecastResult<()> {
        let mut child = tokio::process::Command::new("ffplay")
            .args(["-nodisp", "-autoexit", "-loglevel", "error", "-i", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VersecastError::provider(format!("failed to spawn ffplay: {e}")))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&audio)
                .await
                .map_err(|e| VersecastError::provider(format!("ffplay stdin write failed: {e}")))?;
        }
        let status = child
            .wait()
            .await
            .map_err(|e| VersecastError::provider(format!("ffplay wait failed: {e}")))?;
        if !status.success() {
            return Err(VersecastError::provider(format!("ffplay exited with {status}")));
        }
        Ok(())
    }
}

/// Speaks segments as playback enters them.
///
/// Each visit to a segment issues at most one request. Leaving the segment (or stopping) aborts the
/// request and any audio it is playing.
pub struct Narrator {
    runtime: Handle,
    voices: Arc<VoiceService>,
    output: Arc<dyn AudioOutput>,
    last_index: Option<usize>,
    in_flight: Option<JoinHandle<()>>,
}

impl Narrator {
    pub fn new(runtime: Handle, voices: Arc<VoiceService>, output: Arc<dyn AudioOutput>) -> Self {
        Self {
            runtime,
            voices,
            output,
            last_index: None,
            in_flight: None,
        }
    }

    /// React to the active segment at the current tick. Never blocks.
    pub fn on_segment(
        &mut self,
        index: Option<usize>,
        timeline: &Timeline,
        narration: &NarrationConfig,
    ) {
        if index == self.last_index {
            return;
        }
        self.cancel();
        self.last_index = index;

        let Some(segment) = index.and_then(|i| timeline.segments().get(i)) else {
            return;
        };
        if segment.is_pause() {
            return;
        }

        let provider = self.voices.provider(narration.provider);
        let output = Arc::clone(&self.output);
        let text = segment.text.clone();
        let voice_id = narration.voice_id.clone();
        tracing::debug!(index = ?index, provider = %narration.provider, "narrating segment");
        self.in_flight = Some(self.runtime.spawn(async move {
            match provider
                .synthesize(&text, voice_id.as_deref(), &SpeakOptions::default())
                .await
            {
                Ok(Some(audio)) => {
                    if let Err(e) = output.play(audio).await {
                        tracing::warn!(error = %e, "narration playback failed");
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "narration skipped"),
            }
        }));
    }

    /// Abort in-flight narration and forget the last segment.
    pub fn stop(&mut self) {
        self.cancel();
        self.last_index = None;
    }

    /// `true` while a request or its playback is still running.
    pub fn is_busy(&self) -> bool {
        self.in_flight.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

impl Drop for Narrator {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/narration.rs"]
mod tests;
