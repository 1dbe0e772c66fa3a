//! ElevenLabs text-to-speech provider.

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{VersecastError, VersecastResult};
use crate::voice::provider::{ProviderId, SpeakOptions, Voice, VoiceProvider};

pub const ELEVENLABS_API_BASE: &str = "https://api.elevenlabs.io";

const MODEL: &str = "eleven_monolingual_v1";
const KEY_HEADER: &str = "xi-api-key";
// "Rachel", the first stock voice.
const DEFAULT_VOICE: &str = "21m00Tcm4TlvDq8ikWAM";

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<RemoteVoice>,
}

#[derive(Debug, Deserialize)]
struct RemoteVoice {
    voice_id: String,
    name: String,
    preview_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Cloud provider for ElevenLabs. Returns MP3 bytes.
pub struct ElevenLabsProvider {
    base_url: String,
    api_key: RwLock<Option<String>>,
    client: Client,
}

impl ElevenLabsProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: RwLock::new(None),
            client: Client::new(),
        }
    }

    /// Replace the API key. `None` or blank clears it.
    pub fn set_api_key(&self, key: Option<&str>) {
        let key = key.map(str::trim).filter(|k| !k.is_empty()).map(str::to_owned);
        if let Ok(mut guard) = self.api_key.write() {
            *guard = key;
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    fn api_key(&self) -> Option<String> {
        self.api_key.read().ok().and_then(|k| k.clone())
    }

    /// Voice ids are percent-encoded as a single path segment.
    fn speech_url(&self, voice_id: &str) -> VersecastResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| VersecastError::provider(format!("invalid ElevenLabs base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| VersecastError::provider("ElevenLabs base URL cannot take a path"))?
            .pop_if_empty()
            .extend(["v1", "text-to-speech", voice_id]);
        Ok(url)
    }

    async fn fetch_voices(&self, key: &str) -> Result<Vec<Voice>, reqwest::Error> {
        let response = self
            .client
            .get(format!("{}/v1/voices", self.base_url))
            .header(KEY_HEADER, key)
            .send()
            .await?
            .error_for_status()?;
        let body: VoicesResponse = response.json().await?;
        Ok(body
            .voices
            .into_iter()
            .map(|v| Voice {
                id: v.voice_id,
                name: v.name,
                lang: Some("en".to_owned()),
                preview_url: v.preview_url,
            })
            .collect())
    }
}

impl Default for ElevenLabsProvider {
    fn default() -> Self {
        Self::new(ELEVENLABS_API_BASE)
    }
}

#[async_trait]
impl VoiceProvider for ElevenLabsProvider {
    fn id(&self) -> ProviderId {
        ProviderId::ElevenLabs
    }

    fn display_name(&self) -> &'static str {
        "ElevenLabs"
    }

    async fn list_voices(&self) -> Vec<Voice> {
        let Some(key) = self.api_key() else {
            return Vec::new();
        };
        match self.fetch_voices(&key).await {
            Ok(voices) => voices,
            Err(e) => {
                tracing::warn!(error = %e, "ElevenLabs voice list unavailable");
                Vec::new()
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self, text, _opts), fields(chars = text.chars().count()))]
    async fn synthesize(
        &self,
        text: &str,
        voice_id: Option<&str>,
        _opts: &SpeakOptions,
    ) -> VersecastResult<Option<Vec<u8>>> {
        let key = self
            .api_key()
            .ok_or_else(|| VersecastError::provider("ElevenLabs API Key is missing"))?;

        let request = TtsRequest {
            text,
            model_id: MODEL,
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
            },
        };
        let url = self.speech_url(voice_id.unwrap_or(DEFAULT_VOICE))?;
        let response = self
            .client
            .post(url)
            .header(KEY_HEADER, key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&request)
            .send()
            .await
            .map_err(|e| VersecastError::provider(format!("ElevenLabs request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.detail)
                .and_then(|d| d.message)
                .unwrap_or_else(|| "Failed to generate speech".to_owned());
            tracing::warn!(%status, "ElevenLabs synthesis rejected");
            return Err(VersecastError::provider(message));
        }

        let bytes = response.bytes().await.map_err(|e| {
            VersecastError::provider(format!("ElevenLabs response read failed: {e}"))
        })?;
        Ok(Some(bytes.to_vec()))
    }
}
