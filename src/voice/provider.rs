use std::fmt;

use async_trait::async_trait;

use crate::foundation::error::{VersecastError, VersecastResult};

/// Identifier of a narration backend.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum ProviderId {
    /// Host speech command; plays audio itself.
    #[default]
    #[serde(rename = "native")]
    Native,
    /// OpenAI speech API.
    #[serde(rename = "openai")]
    OpenAi,
    /// ElevenLabs text-to-speech API.
    #[serde(rename = "elevenlabs")]
    ElevenLabs,
    /// Downloaded on-device voice model.
    #[serde(rename = "local")]
    Local,
}

impl ProviderId {
    /// Every provider, in registry order.
    pub const ALL: [ProviderId; 4] = [
        ProviderId::Native,
        ProviderId::OpenAi,
        ProviderId::ElevenLabs,
        ProviderId::Local,
    ];

    /// Stable lowercase key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::OpenAi => "openai",
            Self::ElevenLabs => "elevenlabs",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderId {
    type Err = VersecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| VersecastError::validation(format!("unknown voice provider \"{s}\"")))
    }
}

/// A voice offered by a provider.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Voice {
    /// Provider-specific id passed back to `synthesize`.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

/// Public identity of a provider.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    pub display_name: String,
}

/// Per-request synthesis options.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpeakOptions {
    /// Speaking rate multiplier (1.0 = normal). Ignored by providers without rate control.
    pub speed: Option<f32>,
}

/// A narration backend.
///
/// `synthesize` returns `Ok(None)` when the provider already produced audible output itself, and
/// `Ok(Some(bytes))` with encoded audio the caller must play otherwise. Dropping the returned
/// future cancels the request.
#[async_trait]
pub trait VoiceProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn display_name(&self) -> &'static str;

    /// Available voices. Never fails: missing credentials or remote errors yield an empty list.
    async fn list_voices(&self) -> Vec<Voice>;

    async fn synthesize(
        &self,
        text: &str,
        voice_id: Option<&str>,
        opts: &SpeakOptions,
    ) -> VersecastResult<Option<Vec<u8>>>;

    fn descriptor(&self) -> ProviderDescriptor {
        ProviderDescriptor {
            id: self.id(),
            display_name: self.display_name().to_owned(),
        }
    }
}
