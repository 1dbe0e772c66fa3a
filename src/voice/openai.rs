//! OpenAI speech API provider.

use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{VersecastError, VersecastResult};
use crate::voice::provider::{ProviderId, SpeakOptions, Voice, VoiceProvider};

pub const OPENAI_API_BASE: &str = "https://api.openai.com";

const MODEL: &str = "tts-1";
const DEFAULT_VOICE: &str = "alloy";
const VOICES: [(&str, &str); 6] = [
    ("alloy", "Alloy"),
    ("echo", "Echo"),
    ("fable", "Fable"),
    ("onyx", "Onyx"),
    ("nova", "Nova"),
    ("shimmer", "Shimmer"),
];

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Cloud provider backed by `POST /v1/audio/speech`. Returns MP3 bytes.
pub struct OpenAiProvider {
    base_url: String,
    api_key: RwLock<Option<String>>,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: RwLock::new(None),
            client: Client::new(),
        }
    }

    /// Replace the bearer key. `None` or blank clears it.
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
}

impl Default for OpenAiProvider {
    fn default() -> Self {
        Self::new(OPENAI_API_BASE)
    }
}

#[async_trait]
impl VoiceProvider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    fn display_name(&self) -> &'static str {
        "OpenAI TTS"
    }

    // The voice set is fixed, so listing needs no key.
    async fn list_voices(&self) -> Vec<Voice> {
        VOICES
            .iter()
            .map(|(id, name)| Voice {
                id: (*id).to_owned(),
                name: (*name).to_owned(),
                lang: Some("en".to_owned()),
                preview_url: None,
            })
            .collect()
    }

    #[tracing::instrument(level = "debug", skip(self, text, opts), fields(chars = text.chars().count()))]
    async fn synthesize(
        &self,
        text: &str,
        voice_id: Option<&str>,
        opts: &SpeakOptions,
    ) -> VersecastResult<Option<Vec<u8>>> {
        let key = self
            .api_key()
            .ok_or_else(|| VersecastError::provider("OpenAI API key is missing"))?;

        let request = SpeechRequest {
            model: MODEL,
            input: text,
            voice: voice_id.unwrap_or(DEFAULT_VOICE),
            speed: opts.speed.unwrap_or(1.0),
        };
        let url = format!("{}/v1/audio/speech", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .json(&request)
            .send()
            .await
            .map_err(|e| VersecastError::provider(format!("OpenAI request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .and_then(|d| d.message)
                .unwrap_or_else(|| format!("Failed to generate speech (HTTP {status})"));
            tracing::warn!(%status, "OpenAI synthesis rejected");
            return Err(VersecastError::provider(message));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VersecastError::provider(format!("OpenAI response read failed: {e}")))?;
        Ok(Some(bytes.to_vec()))
    }
}
