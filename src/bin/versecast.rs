use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};

use versecast::playback::AudioOutput as _;
use versecast::voice::{ApiKeys, FileCredentialStore, SpeakOptions};
use versecast::{
    AspectRatio, CodecHint, Compositor, CpuSurface, ExportQuality, ExportRequest, ExportStart,
    FfmpegSink, FfmpegSinkOpts, Fps, ImageAsset, ManualClock, PlaybackClock, ProviderId,
    RenderConfig, Surface as _, Timeline, VoiceService, VoiceServiceOpts,
};

#[derive(Parser, Debug)]
#[command(name = "versecast", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the timeline built from a text file.
    Timeline(TimelineArgs),
    /// Render the frame at a given time as a PNG.
    Frame(FrameArgs),
    /// Export the whole timeline as a video (requires `ffmpeg` on PATH).
    Export(ExportArgs),
    /// List the voices of a narration provider.
    Voices(VoicesArgs),
    /// Synthesize one line with a narration provider.
    Say(SayArgs),
    /// Store API keys for the cloud providers.
    Keys(KeysArgs),
}

#[derive(Args, Debug)]
struct SceneArgs {
    /// Input text, one segment per line (`-` reads stdin).
    #[arg(long = "text")]
    text_path: PathBuf,

    /// JSON render config; absent fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Font file registered under the configured family, weight and style.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Background image (switches the background to image mode).
    #[arg(long)]
    bg_image: Option<PathBuf>,

    #[arg(long, value_parser = parse_aspect)]
    aspect: Option<AspectRatio>,

    #[arg(long, value_enum)]
    quality: Option<QualityArg>,

    /// Seconds every line is shown for, before the per-character share.
    #[arg(long)]
    base_time: Option<f64>,

    /// Extra seconds per character.
    #[arg(long)]
    char_multiplier: Option<f64>,
}

#[derive(Args, Debug)]
struct TimelineArgs {
    #[command(flatten)]
    scene: SceneArgs,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Playback time in seconds.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Output directory.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Base file name; sanitized, empty picks a default.
    #[arg(long, default_value = "")]
    name: String,

    #[arg(long, value_enum, default_value_t = CodecArg::Webm)]
    codec: CodecArg,
}

#[derive(Args, Debug)]
struct VoicesArgs {
    #[arg(long, value_parser = parse_provider, default_value = "native")]
    provider: ProviderId,
}

#[derive(Args, Debug)]
struct SayArgs {
    #[arg(long, value_parser = parse_provider, default_value = "native")]
    provider: ProviderId,

    #[arg(long)]
    voice: Option<String>,

    /// Speaking rate multiplier.
    #[arg(long)]
    speed: Option<f32>,

    /// Write returned audio here instead of playing it.
    #[arg(long)]
    out: Option<PathBuf>,

    text: String,
}

#[derive(Args, Debug)]
struct KeysArgs {
    #[arg(long)]
    openai: Option<String>,

    #[arg(long)]
    elevenlabs: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum QualityArg {
    High,
    Medium,
    Low,
}

impl From<QualityArg> for ExportQuality {
    fn from(q: QualityArg) -> Self {
        match q {
            QualityArg::High => Self::High,
            QualityArg::Medium => Self::Medium,
            QualityArg::Low => Self::Low,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CodecArg {
    Webm,
    Mp4,
}

impl From<CodecArg> for CodecHint {
    fn from(c: CodecArg) -> Self {
        match c {
            CodecArg::Webm => Self::Vp9Webm,
            CodecArg::Mp4 => Self::H264Mp4,
        }
    }
}

fn parse_aspect(s: &str) -> Result<AspectRatio, versecast::VersecastError> {
    s.parse()
}

fn parse_provider(s: &str) -> Result<ProviderId, versecast::VersecastError> {
    s.parse()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("versecast=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Timeline(args) => cmd_timeline(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Export(args) => cmd_export(args),
        Command::Voices(args) => runtime()?.block_on(cmd_voices(args)),
        Command::Say(args) => runtime()?.block_on(cmd_say(args)),
        Command::Keys(args) => cmd_keys(args),
    }
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")
}

struct Scene {
    timeline: Timeline,
    config: RenderConfig,
    font: Option<PathBuf>,
}

fn load_scene(args: &SceneArgs) -> anyhow::Result<Scene> {
    let mut config = match &args.config {
        Some(path) => RenderConfig::from_json_path(path)?,
        None => RenderConfig::default(),
    };
    if let Some(aspect) = args.aspect {
        config = config.with_aspect_ratio(aspect);
    }
    if let Some(quality) = args.quality {
        config = config.with_export_quality(quality.into());
    }
    if args.base_time.is_some() || args.char_multiplier.is_some() {
        let base_time = args.base_time.unwrap_or(config.timing.base_time);
        let char_multiplier = args.char_multiplier.unwrap_or(config.timing.char_multiplier);
        config = config.with_timing(base_time, char_multiplier);
    }
    if let Some(path) = &args.bg_image {
        config = config.with_background_image(ImageAsset::from_path(path)?);
    }
    config.validate()?;

    let text = read_text(&args.text_path)?;
    let timeline = Timeline::build(&text, config.timing.base_time, config.timing.char_multiplier);
    Ok(Scene {
        timeline,
        config,
        font: args.font.clone(),
    })
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut s = String::new();
        std::io::stdin()
            .read_to_string(&mut s)
            .context("read text from stdin")?;
        return Ok(s);
    }
    std::fs::read_to_string(path).with_context(|| format!("read text '{}'", path.display()))
}

fn surface_for(scene: &Scene) -> anyhow::Result<CpuSurface> {
    let canvas = versecast::render::frame_size(scene.config.aspect_ratio);
    let mut surface = CpuSurface::new(canvas.width, canvas.height)?;
    match &scene.font {
        Some(path) => {
            let bytes =
                std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
            surface.register_font(
                &scene.config.font_family,
                scene.config.font_weight,
                scene.config.font_style,
                bytes,
            )?;
        }
        None => tracing::warn!("no --font given, text will be omitted"),
    }
    Ok(surface)
}

fn cmd_timeline(args: TimelineArgs) -> anyhow::Result<()> {
    let scene = load_scene(&args.scene)?;
    let json = serde_json::to_string_pretty(&scene.timeline).context("serialize timeline")?;
    println!("{json}");
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let scene = load_scene(&args.scene)?;
    let mut surface = surface_for(&scene)?;
    Compositor::new().render(&mut surface, args.time, &scene.timeline, &scene.config);
    let frame = surface.snapshot()?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let png = versecast::render::encode_png(&frame)?;
    std::fs::write(&args.out, png).with_context(|| format!("write png '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let scene = load_scene(&args.scene)?;
    let surface = surface_for(&scene)?;
    let clock = ManualClock::new();
    let estimate = versecast::export::estimate_export_bytes(
        scene.timeline.total_duration(),
        scene.config.export_quality,
        scene.config.aspect_ratio,
    );
    eprintln!(
        "exporting {:.2}s of video (~{} KiB)",
        scene.timeline.total_duration(),
        estimate / 1024
    );
    let mut player = PlaybackClock::new(Box::new(surface), Arc::new(clock.clone()));
    player.set_timeline(scene.timeline);
    player.set_config(scene.config);

    let sink = FfmpegSink::new(FfmpegSinkOpts::default());
    let request = ExportRequest {
        filename: args.name,
        out_dir: Some(args.out_dir),
        codec: args.codec.into(),
    };
    match player.start_export(request, Box::new(sink))? {
        ExportStart::Started => {}
        ExportStart::EmptyTimeline => anyhow::bail!("nothing to export: the text has no lines"),
        ExportStart::Busy => anyhow::bail!("an export is already running"),
    }

    // One frame per tick, faster than real time.
    let step_ms = Fps::new(versecast::export::CAPTURE_FPS, 1)?.frame_duration_secs() * 1000.0;
    while player.is_active() {
        clock.advance_ms(step_ms);
        player.tick();
    }

    let artifact = player
        .take_export_result()
        .context("export did not finish")??;
    eprintln!(
        "wrote {} ({} frames, {} bytes)",
        artifact
            .path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or(artifact.file_name),
        artifact.frames,
        artifact.bytes.len()
    );
    Ok(())
}

fn voice_service() -> anyhow::Result<VoiceService> {
    let store = FileCredentialStore::in_user_config_dir()?;
    Ok(VoiceService::init(VoiceServiceOpts::default(), Box::new(store))?)
}

async fn cmd_voices(args: VoicesArgs) -> anyhow::Result<()> {
    let voices = voice_service()?.provider(args.provider).list_voices().await;
    for v in voices {
        println!("{}", serde_json::to_string(&v).context("serialize voice")?);
    }
    Ok(())
}

async fn cmd_say(args: SayArgs) -> anyhow::Result<()> {
    let service = voice_service()?;
    service.select(args.provider);
    service.on_progress(|e| {
        if let Some(p) = e.progress {
            eprint!("\r{} {p:.0}%", e.file);
        }
    });
    let opts = SpeakOptions { speed: args.speed };
    let audio = service
        .synthesize(&args.text, args.voice.as_deref(), &opts)
        .await?;
    let Some(audio) = audio else {
        return Ok(());
    };
    match args.out {
        Some(path) => {
            std::fs::write(&path, &audio)
                .with_context(|| format!("write audio '{}'", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => versecast::playback::FfplayOutput.play(audio).await?,
    }
    Ok(())
}

fn cmd_keys(args: KeysArgs) -> anyhow::Result<()> {
    let store = FileCredentialStore::in_user_config_dir()?;
    let service = VoiceService::init(VoiceServiceOpts::default(), Box::new(store.clone()))?;
    let current = versecast::voice::CredentialStore::load(&store)?;
    let keys = ApiKeys {
        openai: args.openai.or(current.openai),
        elevenlabs: args.elevenlabs.or(current.elevenlabs),
    };
    service.save_credentials(&keys)?;
    eprintln!("saved {}", store.path().display());
    Ok(())
}
