use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::foundation::error::{VersecastError, VersecastResult};
use crate::voice::credentials::{ApiKeys, CredentialStore};
use crate::voice::elevenlabs::{ELEVENLABS_API_BASE, ElevenLabsProvider};
use crate::voice::local::{LocalModelSpec, LocalProvider, ModelLoader, PiperLoader};
use crate::voice::native::NativeProvider;
use crate::voice::openai::{OPENAI_API_BASE, OpenAiProvider};
use crate::voice::progress::{ProgressEvent, ProgressHub};
use crate::voice::provider::{ProviderDescriptor, ProviderId, SpeakOptions, Voice, VoiceProvider};

/// Construction options for [`VoiceService`].
#[derive(Clone, Debug)]
pub struct VoiceServiceOpts {
    pub openai_base_url: String,
    pub elevenlabs_base_url: String,
    /// Where the on-device model is cached.
    pub model_cache_dir: PathBuf,
    pub local_model: LocalModelSpec,
}

impl Default for VoiceServiceOpts {
    fn default() -> Self {
        let model_cache_dir = directories::ProjectDirs::from("", "", "versecast")
            .map(|d| d.cache_dir().join("models"))
            .unwrap_or_else(|| std::env::temp_dir().join("versecast-models"));
        Self {
            openai_base_url: OPENAI_API_BASE.to_owned(),
            elevenlabs_base_url: ELEVENLABS_API_BASE.to_owned(),
            model_cache_dir,
            local_model: LocalModelSpec::default(),
        }
    }
}

/// Registry of the four narration providers plus the active selection.
///
/// Passed explicitly to whoever needs narration; there is no process-wide instance.
pub struct VoiceService {
    native: Arc<NativeProvider>,
    openai: Arc<OpenAiProvider>,
    elevenlabs: Arc<ElevenLabsProvider>,
    local: Arc<LocalProvider>,
    active: RwLock<ProviderId>,
    store: Box<dyn CredentialStore>,
    progress: ProgressHub,
}

impl VoiceService {
    /// Build every provider and apply the persisted credentials.
    pub fn init(opts: VoiceServiceOpts, store: Box<dyn CredentialStore>) -> VersecastResult<Self> {
        let loader = PiperLoader::new(opts.local_model.clone(), opts.model_cache_dir.clone());
        Self::with_model_loader(opts, store, Box::new(loader))
    }

    /// Like [`VoiceService::init`] with a custom on-device model loader.
    pub fn with_model_loader(
        opts: VoiceServiceOpts,
        store: Box<dyn CredentialStore>,
        loader: Box<dyn ModelLoader>,
    ) -> VersecastResult<Self> {
        let progress = ProgressHub::new();
        let service = Self {
            native: Arc::new(NativeProvider::default()),
            openai: Arc::new(OpenAiProvider::new(opts.openai_base_url)),
            elevenlabs: Arc::new(ElevenLabsProvider::new(opts.elevenlabs_base_url)),
            local: Arc::new(LocalProvider::new(loader, progress.clone())),
            active: RwLock::new(ProviderId::default()),
            store,
            progress,
        };
        let keys = service.store.load()?;
        service.apply_keys(&keys);
        tracing::debug!(
            openai = service.openai.has_api_key(),
            elevenlabs = service.elevenlabs.has_api_key(),
            "voice service ready"
        );
        Ok(service)
    }

    // Blank keys never clear a key already in effect.
    fn apply_keys(&self, keys: &ApiKeys) {
        if let Some(k) = keys.openai() {
            self.openai.set_api_key(Some(k));
        }
        if let Some(k) = keys.elevenlabs() {
            self.elevenlabs.set_api_key(Some(k));
        }
    }

    pub fn provider(&self, id: ProviderId) -> Arc<dyn VoiceProvider> {
        match id {
            ProviderId::Native => self.native.clone(),
            ProviderId::OpenAi => self.openai.clone(),
            ProviderId::ElevenLabs => self.elevenlabs.clone(),
            ProviderId::Local => self.local.clone(),
        }
    }

    pub fn active_id(&self) -> ProviderId {
        self.active.read().map(|a| *a).unwrap_or_default()
    }

    pub fn active(&self) -> Arc<dyn VoiceProvider> {
        self.provider(self.active_id())
    }

    /// Switch the active provider. Unknown names are ignored; in-flight requests are not cancelled.
    pub fn set_active(&self, id: &str) -> bool {
        let Ok(id) = id.parse::<ProviderId>() else {
            tracing::debug!(id, "ignoring unknown voice provider");
            return false;
        };
        self.select(id);
        true
    }

    pub fn select(&self, id: ProviderId) {
        if let Ok(mut active) = self.active.write() {
            *active = id;
        }
    }

    /// Voices of the active provider.
    pub async fn list_voices(&self) -> Vec<Voice> {
        self.active().list_voices().await
    }

    /// Synthesize with the active provider.
    pub async fn synthesize(
        &self,
        text: &str,
        voice_id: Option<&str>,
        opts: &SpeakOptions,
    ) -> VersecastResult<Option<Vec<u8>>> {
        self.active().synthesize(text, voice_id, opts).await
    }

    /// Persist `keys` and apply the non-empty ones immediately.
    pub fn save_credentials(&self, keys: &ApiKeys) -> VersecastResult<()> {
        self.store
            .save(keys)
            .map_err(|e| VersecastError::provider(format!("failed to persist API keys: {e}")))?;
        self.apply_keys(keys);
        Ok(())
    }

    /// Register a listener for on-device model progress.
    pub fn on_progress(&self, listener: impl Fn(&ProgressEvent) + Send + Sync + 'static) {
        self.progress.subscribe(listener);
    }

    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        ProviderId::ALL
            .into_iter()
            .map(|id| self.provider(id).descriptor())
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/voice/service.rs"]
mod tests;
