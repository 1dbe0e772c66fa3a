use super::*;
use crate::voice::credentials::MemoryCredentialStore;
use crate::voice::local::SpeechModel;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct OneSampleModel;

#[async_trait]
impl SpeechModel for OneSampleModel {
    fn sample_rate(&self) -> u32 {
        8_000
    }

    async fn infer(&self, _text: &str) -> VersecastResult<Vec<f32>> {
        Ok(vec![0.5])
    }
}

struct ProgressLoader;

#[async_trait]
impl ModelLoader for ProgressLoader {
    async fn load(&self, progress: &ProgressHub) -> VersecastResult<Arc<dyn SpeechModel>> {
        progress.emit(&ProgressEvent {
            status: "progress",
            file: "m.onnx".to_owned(),
            progress: Some(50.0),
            loaded: 5,
            total: Some(10),
        });
        Ok(Arc::new(OneSampleModel))
    }
}

fn opts(server: &MockServer) -> VoiceServiceOpts {
    VoiceServiceOpts {
        openai_base_url: server.uri(),
        elevenlabs_base_url: server.uri(),
        ..VoiceServiceOpts::default()
    }
}

fn service(server: &MockServer, keys: ApiKeys) -> VoiceService {
    VoiceService::with_model_loader(
        opts(server),
        Box::new(MemoryCredentialStore::new(keys)),
        Box::new(ProgressLoader),
    )
    .unwrap()
}

#[tokio::test]
async fn defaults_to_native_and_ignores_unknown_ids() {
    let server = MockServer::start().await;
    let svc = service(&server, ApiKeys::default());
    assert_eq!(svc.active_id(), ProviderId::Native);
    assert!(!svc.set_active("polly"));
    assert_eq!(svc.active_id(), ProviderId::Native);
    assert!(svc.set_active("elevenlabs"));
    assert_eq!(svc.active_id(), ProviderId::ElevenLabs);
}

#[tokio::test]
async fn descriptors_cover_all_providers_in_order() {
    let server = MockServer::start().await;
    let ids: Vec<ProviderId> = service(&server, ApiKeys::default())
        .descriptors()
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(ids, ProviderId::ALL.to_vec());
}

#[tokio::test]
async fn cloud_providers_require_credentials() {
    let server = MockServer::start().await;
    let svc = service(&server, ApiKeys::default());

    svc.select(ProviderId::ElevenLabs);
    assert!(svc.list_voices().await.is_empty());
    let err = svc
        .synthesize("hi", Some("v"), &SpeakOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "provider error: ElevenLabs API Key is missing");

    svc.select(ProviderId::OpenAi);
    assert_eq!(svc.list_voices().await.len(), 6);
    let err = svc
        .synthesize("hi", None, &SpeakOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("OpenAI API key is missing"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn openai_posts_speech_request_with_bearer_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .and(header("authorization", "Bearer sk-1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3mp3".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let svc = service(
        &server,
        ApiKeys {
            openai: Some("sk-1".to_owned()),
            elevenlabs: None,
        },
    );
    svc.select(ProviderId::OpenAi);
    let audio = svc
        .synthesize("Hello", Some("nova"), &SpeakOptions { speed: Some(1.25) })
        .await
        .unwrap();
    assert_eq!(audio.as_deref(), Some(&b"ID3mp3"[..]));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({"model": "tts-1", "input": "Hello", "voice": "nova", "speed": 1.25})
    );
}

#[tokio::test]
async fn openai_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string(r#"{"error":{"message":"Incorrect API key provided"}}"#),
        )
        .mount(&server)
        .await;
    let svc = service(
        &server,
        ApiKeys {
            openai: Some("bad".to_owned()),
            elevenlabs: None,
        },
    );
    svc.select(ProviderId::OpenAi);
    let err = svc
        .synthesize("x", None, &SpeakOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "provider error: Incorrect API key provided");
}

#[tokio::test]
async fn elevenlabs_lists_voices_and_synthesizes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/voices"))
        .and(header("xi-api-key", "xi-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "voices": [
                {"voice_id": "abc", "name": "Rachel", "preview_url": "https://example.com/r.mp3"},
                {"voice_id": "def", "name": "Adam"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/abc"))
        .and(header("xi-api-key", "xi-1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
        .mount(&server)
        .await;

    let svc = service(
        &server,
        ApiKeys {
            openai: None,
            elevenlabs: Some("xi-1".to_owned()),
        },
    );
    svc.select(ProviderId::ElevenLabs);
    let voices = svc.list_voices().await;
    assert_eq!(voices.len(), 2);
    assert_eq!(voices[0].id, "abc");
    assert_eq!(voices[0].lang.as_deref(), Some("en"));
    assert_eq!(voices[0].preview_url.as_deref(), Some("https://example.com/r.mp3"));
    assert_eq!(voices[1].preview_url, None);

    let audio = svc
        .synthesize("Hi", Some("abc"), &SpeakOptions::default())
        .await
        .unwrap();
    assert_eq!(audio, Some(vec![1, 2, 3]));

    let requests = server.received_requests().await.unwrap();
    let post = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
    let body: serde_json::Value = serde_json::from_slice(&post.body).unwrap();
    assert_eq!(body["model_id"], "eleven_monolingual_v1");
    assert_eq!(body["voice_settings"]["stability"], 0.5);
    assert_eq!(body["voice_settings"]["similarity_boost"], 0.75);
}

#[tokio::test]
async fn elevenlabs_failures_degrade() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("not json"))
        .mount(&server)
        .await;
    let svc = service(
        &server,
        ApiKeys {
            openai: None,
            elevenlabs: Some("xi".to_owned()),
        },
    );
    svc.select(ProviderId::ElevenLabs);
    assert!(svc.list_voices().await.is_empty());
    let err = svc
        .synthesize("x", Some("v"), &SpeakOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "provider error: Failed to generate speech");
}

#[tokio::test]
async fn saved_keys_apply_immediately_and_blank_keys_do_not_clear() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9u8]))
        .mount(&server)
        .await;
    let svc = service(&server, ApiKeys::default());
    svc.select(ProviderId::OpenAi);
    assert!(svc.synthesize("x", None, &SpeakOptions::default()).await.is_err());

    svc.save_credentials(&ApiKeys {
        openai: Some("sk".to_owned()),
        elevenlabs: None,
    })
    .unwrap();
    assert!(svc.synthesize("x", None, &SpeakOptions::default()).await.is_ok());

    svc.save_credentials(&ApiKeys {
        openai: Some(String::new()),
        elevenlabs: None,
    })
    .unwrap();
    assert!(svc.synthesize("x", None, &SpeakOptions::default()).await.is_ok());
}

#[tokio::test]
async fn init_loads_persisted_keys() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let store = crate::voice::credentials::FileCredentialStore::new(dir.path().join("k.json"));
    store
        .save(&ApiKeys {
            openai: None,
            elevenlabs: Some("persisted".to_owned()),
        })
        .unwrap();
    Mock::given(method("GET"))
        .and(path("/v1/voices"))
        .and(header("xi-api-key", "persisted"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"voices": []})))
        .expect(1)
        .mount(&server)
        .await;

    let svc = VoiceService::init(opts(&server), Box::new(store)).unwrap();
    svc.select(ProviderId::ElevenLabs);
    assert!(svc.list_voices().await.is_empty());
}

#[tokio::test]
async fn local_progress_reaches_every_listener() {
    let server = MockServer::start().await;
    let svc = service(&server, ApiKeys::default());
    let a = Arc::new(AtomicUsize::new(0));
    let b = Arc::new(AtomicUsize::new(0));
    let (ca, cb) = (a.clone(), b.clone());
    svc.on_progress(move |_| {
        ca.fetch_add(1, Ordering::SeqCst);
    });
    svc.on_progress(move |e| {
        assert_eq!(e.file, "m.onnx");
        cb.fetch_add(1, Ordering::SeqCst);
    });
    svc.select(ProviderId::Local);
    let wav = svc
        .synthesize("x", None, &SpeakOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&wav[..4], b"RIFF");
    assert_eq!(a.load(Ordering::SeqCst), 1);
    assert_eq!(b.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn elevenlabs_voice_id_stays_one_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/a%2Fb%3Fx"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9u8]))
        .expect(1)
        .mount(&server)
        .await;
    let svc = service(
        &server,
        ApiKeys {
            openai: None,
            elevenlabs: Some("xi".to_owned()),
        },
    );
    svc.select(ProviderId::ElevenLabs);
    let audio = svc
        .synthesize("x", Some("a/b?x"), &SpeakOptions::default())
        .await
        .unwrap();
    assert_eq!(audio, Some(vec![9]));
}
