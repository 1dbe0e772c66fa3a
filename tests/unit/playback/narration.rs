use super::*;
use crate::voice::local::{ModelLoader, SpeechModel};
use crate::voice::{MemoryCredentialStore, ProgressHub, ProviderId, VoiceServiceOpts};
use std::sync::Mutex;
use std::time::Duration;

struct EchoModel;

#[async_trait]
impl SpeechModel for EchoModel {
    fn sample_rate(&self) -> u32 {
        8_000
    }

    async fn infer(&self, text: &str) -> VersecastResult<Vec<f32>> {
        if text.starts_with("slow") {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        Ok(vec![0.0; text.chars().count()])
    }
}

struct EchoLoader;

#[async_trait]
impl ModelLoader for EchoLoader {
    async fn load(&self, _progress: &ProgressHub) -> VersecastResult<Arc<dyn SpeechModel>> {
        Ok(Arc::new(EchoModel))
    }
}

#[derive(Default)]
struct CollectingOutput {
    played: Mutex<Vec<usize>>,
}

#[async_trait]
impl AudioOutput for CollectingOutput {
    async fn play(&self, audio: Vec<u8>) -> VersecastResult<()> {
        // Sample count, header excluded.
        self.played
            .lock()
            .unwrap()
            .push((audio.len() - crate::voice::wav::WAV_HEADER_LEN) / 2);
        Ok(())
    }
}

fn narrator() -> (Narrator, Arc<CollectingOutput>) {
    let voices = VoiceService::with_model_loader(
        VoiceServiceOpts::default(),
        Box::new(MemoryCredentialStore::default()),
        Box::new(EchoLoader),
    )
    .unwrap();
    let output = Arc::new(CollectingOutput::default());
    let n = Narrator::new(Handle::current(), Arc::new(voices), output.clone());
    (n, output)
}

fn local() -> NarrationConfig {
    NarrationConfig {
        enabled: true,
        provider: ProviderId::Local,
        voice_id: None,
    }
}

async fn settle(n: &Narrator) {
    for _ in 0..100 {
        if !n.is_busy() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn each_segment_is_requested_once_per_visit() {
    let tl = Timeline::build("abc\n_\nhello", 2.0, 0.1);
    let (mut n, out) = narrator();
    let cfg = local();

    n.on_segment(Some(0), &tl, &cfg);
    n.on_segment(Some(0), &tl, &cfg);
    settle(&n).await;
    n.on_segment(Some(1), &tl, &cfg);
    assert!(!n.is_busy());
    n.on_segment(Some(2), &tl, &cfg);
    settle(&n).await;
    assert_eq!(*out.played.lock().unwrap(), vec![3, 5]);
}

#[tokio::test]
async fn segment_change_aborts_stale_request() {
    let tl = Timeline::build("slow line\nnext", 2.0, 0.1);
    let (mut n, out) = narrator();
    let cfg = local();

    n.on_segment(Some(0), &tl, &cfg);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(n.is_busy());
    n.on_segment(Some(1), &tl, &cfg);
    settle(&n).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(*out.played.lock().unwrap(), vec![4]);
}

#[tokio::test]
async fn stop_cancels_and_allows_renarration() {
    let tl = Timeline::build("slow a\nb", 2.0, 0.1);
    let (mut n, out) = narrator();
    let cfg = local();

    n.on_segment(Some(0), &tl, &cfg);
    tokio::time::sleep(Duration::from_millis(20)).await;
    n.stop();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(out.played.lock().unwrap().is_empty());

    n.on_segment(Some(1), &tl, &cfg);
    settle(&n).await;
    assert_eq!(*out.played.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn provider_errors_are_swallowed() {
    let tl = Timeline::build("hi", 2.0, 0.1);
    let (mut n, out) = narrator();
    let cfg = NarrationConfig {
        enabled: true,
        provider: ProviderId::OpenAi,
        voice_id: None,
    };
    n.on_segment(Some(0), &tl, &cfg);
    settle(&n).await;
    assert!(out.played.lock().unwrap().is_empty());
}

#[derive(Clone, Default)]
struct SlowLoader {
    loads: Arc<std::sync::atomic::AtomicUsize>,
}

#[async_trait]
impl ModelLoader for SlowLoader {
    async fn load(&self, _progress: &ProgressHub) -> VersecastResult<Arc<dyn SpeechModel>> {
        self.loads.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(150)).await;
        Ok(Arc::new(EchoModel))
    }
}

#[tokio::test]
async fn short_segments_share_one_model_load() {
    let loader = SlowLoader::default();
    let loads = loader.loads.clone();
    let voices = VoiceService::with_model_loader(
        VoiceServiceOpts::default(),
        Box::new(MemoryCredentialStore::default()),
        Box::new(loader),
    )
    .unwrap();
    let out = Arc::new(CollectingOutput::default());
    let mut n = Narrator::new(Handle::current(), Arc::new(voices), out.clone());
    let tl = Timeline::build("a\nbb\nccc\ndddd\neeeee\nffffff", 2.0, 0.1);
    let cfg = local();

    for i in 0..6 {
        n.on_segment(Some(i), &tl, &cfg);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    settle(&n).await;

    assert_eq!(loads.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(out.played.lock().unwrap().last(), Some(&6));
}
