//! On-device voice model provider (Piper).
//!
//! The model (`.onnx` plus its `.onnx.json` config) is downloaded into a cache directory on first
//! use, reporting per-file progress, then driven through the `piper` binary.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use futures_util::StreamExt as _;
use reqwest::Client;
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;

use crate::foundation::error::{VersecastError, VersecastResult};
use crate::voice::progress::{ProgressEvent, ProgressHub};
use crate::voice::provider::{ProviderId, SpeakOptions, Voice, VoiceProvider};
use crate::voice::wav::{encode_wav_f32, pcm16_from_le_bytes, pcm16_to_f32};

const PIPER_VOICES_BASE: &str = "https://huggingface.co/rhasspy/piper-voices/resolve/main";

/// Where to fetch a Piper voice from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalModelSpec {
    /// File stem, e.g. `en_US-lessac-medium`.
    pub name: String,
    pub model_url: String,
    pub config_url: String,
}

impl LocalModelSpec {
    /// Model at `<base>/<name>.onnx` and `<base>/<name>.onnx.json`.
    pub fn at(base_url: &str, name: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            name: name.to_owned(),
            model_url: format!("{base}/{name}.onnx"),
            config_url: format!("{base}/{name}.onnx.json"),
        }
    }

    pub fn model_file(&self) -> String {
        format!("{}.onnx", self.name)
    }

    pub fn config_file(&self) -> String {
        format!("{}.onnx.json", self.name)
    }
}

impl Default for LocalModelSpec {
    fn default() -> Self {
        Self::at(
            &format!("{PIPER_VOICES_BASE}/en/en_US/lessac/medium"),
            "en_US-lessac-medium",
        )
    }
}

/// A loaded model turning text into mono float samples in `[-1, 1]`.
#[async_trait]
pub trait SpeechModel: Send + Sync {
    fn sample_rate(&self) -> u32;

    async fn infer(&self, text: &str) -> VersecastResult<Vec<f32>>;
}

/// Produces the model on first use.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, progress: &ProgressHub) -> VersecastResult<Arc<dyn SpeechModel>>;
}

#[derive(Debug, serde::Deserialize)]
struct PiperConfig {
    audio: PiperAudio,
}

#[derive(Debug, serde::Deserialize)]
struct PiperAudio {
    sample_rate: u32,
}

/// Downloads a Piper voice into `cache_dir` (once) and runs it with the `piper` binary.
pub struct PiperLoader {
    spec: LocalModelSpec,
    cache_dir: PathBuf,
    client: Client,
}

impl PiperLoader {
    pub fn new(spec: LocalModelSpec, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            spec,
            cache_dir: cache_dir.into(),
            client: Client::new(),
        }
    }

    /// Fetch both model files unless already cached. Returns `(model, config)` paths.
    pub async fn ensure_downloaded(
        &self,
        progress: &ProgressHub,
    ) -> VersecastResult<(PathBuf, PathBuf)> {
        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .with_context(|| format!("create model cache '{}'", self.cache_dir.display()))?;
        let model = self.cache_dir.join(self.spec.model_file());
        let config = self.cache_dir.join(self.spec.config_file());
        self.fetch(&self.spec.config_url, &config, progress).await?;
        self.fetch(&self.spec.model_url, &model, progress).await?;
        Ok((model, config))
    }

    async fn fetch(&self, url: &str, dest: &Path, progress: &ProgressHub) -> VersecastResult<()> {
        if tokio::fs::try_exists(dest).await.unwrap_or(false) {
            return Ok(());
        }
        let file = dest
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::info!(%url, file = %file, "downloading voice model");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| VersecastError::provider(format!("model download failed: {e}")))?;
        if !response.status().is_success() {
            return Err(VersecastError::provider(format!(
                "model download failed: HTTP {} for {url}",
                response.status()
            )));
        }

        let total = response.content_length().filter(|t| *t > 0);
        let part = dest.with_extension("part");
        let mut out = tokio::fs::File::create(&part)
            .await
            .with_context(|| format!("create '{}'", part.display()))?;
        let mut loaded: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| VersecastError::provider(format!("model download failed: {e}")))?;
            out.write_all(&chunk)
                .await
                .with_context(|| format!("write '{}'", part.display()))?;
            loaded += chunk.len() as u64;
            progress.emit(&ProgressEvent {
                status: "progress",
                file: file.clone(),
                progress: total.map(|t| loaded as f64 * 100.0 / t as f64),
                loaded,
                total,
            });
        }
        out.flush().await.context("flush model file")?;
        drop(out);
        tokio::fs::rename(&part, dest)
            .await
            .with_context(|| format!("move '{}' into place", dest.display()))?;
        Ok(())
    }
}

#[async_trait]
impl ModelLoader for PiperLoader {
    async fn load(&self, progress: &ProgressHub) -> VersecastResult<Arc<dyn SpeechModel>> {
        let (model, config) = self.ensure_downloaded(progress).await?;
        let raw = tokio::fs::read_to_string(&config)
            .await
            .with_context(|| format!("read '{}'", config.display()))?;
        let cfg: PiperConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parse '{}'", config.display()))?;
        Ok(Arc::new(PiperModel {
            model,
            sample_rate: cfg.audio.sample_rate,
        }))
    }
}

struct PiperModel {
    model: PathBuf,
    sample_rate: u32,
}

#[async_trait]
impl SpeechModel for PiperModel {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn infer(&self, text: &str) -> VersecastResult<Vec<f32>> {
        let mut child = tokio::process::Command::new("piper")
            .arg("--model")
            .arg(&self.model)
            .arg("--output-raw")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                VersecastError::provider(format!("failed to run 'piper' (is it installed?): {e}"))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| VersecastError::provider("piper stdin unavailable"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| VersecastError::provider("piper stdout unavailable"))?;

        let line = format!("{}\n", text.replace('\n', " "));
        let write = async move {
            stdin.write_all(line.as_bytes()).await?;
            stdin.shutdown().await
        };
        let mut pcm = Vec::new();
        let (written, read) = tokio::join!(write, stdout.read_to_end(&mut pcm));
        written.context("write text to piper")?;
        read.context("read piper output")?;

        let status = child.wait().await.context("wait for piper")?;
        if !status.success() {
            return Err(VersecastError::provider(format!(
                "piper exited with status {status}"
            )));
        }
        Ok(pcm16_to_f32(&pcm16_from_le_bytes(&pcm)))
    }
}

type LoadTask = JoinHandle<VersecastResult<Arc<dyn SpeechModel>>>;

/// On-device provider. The model is loaded lazily, exactly once, on first synthesis.
///
/// Loading runs in its own task, so a cancelled request leaves the download running for the next
/// one to pick up.
pub struct LocalProvider {
    loader: Arc<dyn ModelLoader>,
    model: OnceCell<Arc<dyn SpeechModel>>,
    loading: Mutex<Option<LoadTask>>,
    progress: ProgressHub,
}

impl LocalProvider {
    pub fn new(loader: Box<dyn ModelLoader>, progress: ProgressHub) -> Self {
        Self {
            loader: Arc::from(loader),
            model: OnceCell::new(),
            loading: Mutex::new(None),
            progress,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    async fn model(&self) -> VersecastResult<Arc<dyn SpeechModel>> {
        if let Some(model) = self.model.get() {
            return Ok(Arc::clone(model));
        }
        let mut loading = self.loading.lock().await;
        if let Some(model) = self.model.get() {
            return Ok(Arc::clone(model));
        }
        let task = loading.get_or_insert_with(|| {
            let loader = Arc::clone(&self.loader);
            let progress = self.progress.clone();
            tracing::info!("loading local voice model");
            tokio::spawn(async move { loader.load(&progress).await })
        });
        // Dropping this future keeps the task in `loading`.
        let joined = task.await;
        *loading = None;
        let model = joined
            .map_err(|e| VersecastError::provider(format!("voice model load task failed: {e}")))??;
        // Only the lock holder sets the cell.
        let _ = self.model.set(Arc::clone(&model));
        Ok(model)
    }
}

#[async_trait]
impl VoiceProvider for LocalProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Local
    }

    fn display_name(&self) -> &'static str {
        "Local AI (Piper)"
    }

    async fn list_voices(&self) -> Vec<Voice> {
        vec![Voice {
            id: "default".to_owned(),
            name: "Standard (Piper)".to_owned(),
            lang: Some("en".to_owned()),
            preview_url: None,
        }]
    }

    #[tracing::instrument(level = "debug", skip(self, text, _voice_id, _opts))]
    async fn synthesize(
        &self,
        text: &str,
        _voice_id: Option<&str>,
        _opts: &SpeakOptions,
    ) -> VersecastResult<Option<Vec<u8>>> {
        let model = self.model().await?;
        let samples = model.infer(text).await?;
        Ok(Some(encode_wav_f32(&samples, model.sample_rate())))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/voice/local.rs"]
mod tests;
