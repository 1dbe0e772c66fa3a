use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context as _;

use crate::foundation::error::{VersecastError, VersecastResult};

/// File name of the persisted key set.
pub const CREDENTIALS_FILE: &str = "voice_api_keys.json";

/// API keys for the cloud providers. Empty strings count as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub elevenlabs: Option<String>,
}

impl ApiKeys {
    /// Key for OpenAI if set and non-empty.
    pub fn openai(&self) -> Option<&str> {
        non_empty(self.openai.as_deref())
    }

    /// Key for ElevenLabs if set and non-empty.
    pub fn elevenlabs(&self) -> Option<&str> {
        non_empty(self.elevenlabs.as_deref())
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Durable key-value persistence for provider secrets.
pub trait CredentialStore: Send + Sync {
    /// Load persisted keys. A store that was never written yields defaults.
    fn load(&self) -> VersecastResult<ApiKeys>;

    fn save(&self, keys: &ApiKeys) -> VersecastResult<()>;
}

/// JSON file in the user's config directory.
#[derive(Clone, Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/versecast/voice_api_keys.json`, per platform conventions.
    pub fn in_user_config_dir() -> VersecastResult<Self> {
        let dirs = directories::ProjectDirs::from("", "", "versecast").ok_or_else(|| {
            VersecastError::validation("could not determine the user config directory")
        })?;
        Ok(Self::new(dirs.config_dir().join(CREDENTIALS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> VersecastResult<ApiKeys> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ApiKeys::default()),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("read credentials '{}'", self.path.display()))
                    .into());
            }
        };
        let keys = serde_json::from_str(&text)
            .with_context(|| format!("parse credentials '{}'", self.path.display()))?;
        Ok(keys)
    }

    fn save(&self, keys: &ApiKeys) -> VersecastResult<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create config directory '{}'", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(keys).context("serialize credentials")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("write credentials '{}'", self.path.display()))?;
        Ok(())
    }
}

/// Process-local store, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    keys: Mutex<ApiKeys>,
}

impl MemoryCredentialStore {
    pub fn new(keys: ApiKeys) -> Self {
        Self {
            keys: Mutex::new(keys),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> VersecastResult<ApiKeys> {
        self.keys
            .lock()
            .map(|k| k.clone())
            .map_err(|_| VersecastError::state("credential store lock poisoned"))
    }

    fn save(&self, keys: &ApiKeys) -> VersecastResult<()> {
        let mut guard = self
            .keys
            .lock()
            .map_err(|_| VersecastError::state("credential store lock poisoned"))?;
        *guard = keys.clone();
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/voice/credentials.rs"]
mod tests;
