use crate::encode::sink::{CodecHint, FrameSink, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{VersecastError, VersecastResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::FrameRGBA;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Directory for the intermediate encoded file.
    pub scratch_dir: PathBuf,
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl Default for FfmpegSinkOpts {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir(),
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

/// Sink that spawns the system `ffmpeg`, streams raw frames to stdin and returns the encoded file.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    output: Option<ScratchFile>,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    keep_alpha: bool,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            output: None,
            scratch: Vec::new(),
            cfg: None,
            keep_alpha: false,
            last_idx: None,
        }
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> VersecastResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(VersecastError::validation("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(VersecastError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(VersecastError::validation(
                "ffmpeg sink width/height must be even (required for 4:2:0 output)",
            ));
        }
        if cfg.bits_per_second == 0 {
            return Err(VersecastError::validation("bitrate must be non-zero"));
        }
        if !is_ffmpeg_on_path() {
            return Err(VersecastError::encoding(
                "ffmpeg is required for video export, but was not found on PATH",
            ));
        }

        std::fs::create_dir_all(&self.opts.scratch_dir).map_err(|e| {
            VersecastError::encoding(format!(
                "failed to create scratch directory '{}': {e}",
                self.opts.scratch_dir.display()
            ))
        })?;
        let output = ScratchFile::new(&self.opts.scratch_dir, cfg.codec.extension());

        let keep_alpha = cfg.alpha && cfg.codec == CodecHint::Vp9Webm;
        if cfg.alpha && !keep_alpha {
            tracing::warn!(codec = ?cfg.codec, "codec has no alpha support, flattening frames");
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0", "-an"]);
        push_codec_args(&mut cmd, cfg.codec, cfg.bits_per_second, keep_alpha);
        cmd.arg(output.path());

        let mut child = cmd.spawn().map_err(|e| {
            VersecastError::encoding(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| VersecastError::encoding("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| VersecastError::encoding("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        tracing::debug!(
            width = cfg.width,
            height = cfg.height,
            bps = cfg.bits_per_second,
            codec = ?cfg.codec,
            keep_alpha,
            "ffmpeg started"
        );
        self.scratch = vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.output = Some(output);
        self.cfg = Some(cfg);
        self.keep_alpha = keep_alpha;
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> VersecastResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| VersecastError::encoding("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(VersecastError::encoding(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(VersecastError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.data.len() != self.scratch.len() {
            return Err(VersecastError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        if !frame.premultiplied {
            self.scratch.copy_from_slice(&frame.data);
        } else if self.keep_alpha {
            unpremultiply_to_straight_rgba8(&mut self.scratch, &frame.data)?;
        } else {
            flatten_premul_over_bg_to_opaque_rgba8(
                &mut self.scratch,
                &frame.data,
                self.opts.bg_rgba,
            )?;
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(VersecastError::encoding("ffmpeg sink is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            VersecastError::encoding(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn end(&mut self) -> VersecastResult<Vec<u8>> {
        drop(self.stdin.take());
        self.cfg = None;
        let mut child = self
            .child
            .take()
            .ok_or_else(|| VersecastError::encoding("ffmpeg sink not started"))?;
        let output = self
            .output
            .take()
            .ok_or_else(|| VersecastError::encoding("ffmpeg sink has no output file"))?;

        let status = child.wait().map_err(|e| {
            VersecastError::encoding(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| VersecastError::encoding("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| VersecastError::encoding(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(VersecastError::encoding(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        std::fs::read(output.path()).map_err(|e| {
            VersecastError::encoding(format!(
                "failed to read encoded output '{}': {e}",
                output.path().display()
            ))
        })
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // `-r` before `-i` sets the rawvideo input rate.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

fn push_codec_args(cmd: &mut Command, codec: CodecHint, bits_per_second: u64, keep_alpha: bool) {
    let bitrate = bits_per_second.to_string();
    match codec {
        CodecHint::Vp9Webm => {
            cmd.args([
                "-c:v",
                "libvpx-vp9",
                "-b:v",
                &bitrate,
                "-pix_fmt",
                if keep_alpha { "yuva420p" } else { "yuv420p" },
                "-f",
                "webm",
            ]);
        }
        CodecHint::H264Mp4 => {
            cmd.args([
                "-c:v",
                "libx264",
                "-b:v",
                &bitrate,
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
                "-f",
                "mp4",
            ]);
        }
    }
}

/// Intermediate output file removed on drop.
struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    fn new(dir: &Path, ext: &str) -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        Self {
            path: dir.join(format!("versecast-{}-{n}.{ext}", std::process::id())),
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> VersecastResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(VersecastError::validation(
            "flatten_premul_over_bg_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = bg_rgba[0] as u16;
    let bg_g = bg_rgba[1] as u16;
    let bg_b = bg_rgba[2] as u16;

    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        d[0] = (s[0] as u16 + mul_div255_u16(bg_r, inv)).min(255) as u8;
        d[1] = (s[1] as u16 + mul_div255_u16(bg_g, inv)).min(255) as u8;
        d[2] = (s[2] as u16 + mul_div255_u16(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

fn unpremultiply_to_straight_rgba8(dst: &mut [u8], src_premul: &[u8]) -> VersecastResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(VersecastError::validation(
            "unpremultiply_to_straight_rgba8 expects equal-length rgba8 buffers",
        ));
    }
    dst.copy_from_slice(src_premul);
    crate::render::unpremultiply_rgba8_in_place(dst);
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
