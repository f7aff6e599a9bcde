//! greenroom-input-video
//!
//! Looping file playback through an `ffmpeg` child process. A worker thread reads raw RGB24
//! frames from ffmpeg's stdout, publishes the newest one and announces it to a subscribed
//! listener. The worker never touches the GPU.

use serde::{Deserialize, Serialize};
use std::{
    ffi::{OsStr, OsString},
    io::{self, Read},
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread,
    time::Duration,
};

use greenroom_runtime::{FrameListener, FrameSource, FrameView};

/// Environment variable naming an explicit ffmpeg binary.
pub const FFMPEG_ENV: &str = "GREENROOM_FFMPEG";

#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>, // RGB8, row-major, top row first, tightly packed
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Decoded width (pixels); ffmpeg scales to it.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Decoded height (pixels).
    #[serde(default = "default_height")]
    pub height: u32,

    /// Input file path.
    pub file: String,

    /// Whether to loop the video.
    #[serde(default = "default_loop", rename = "loop")]
    pub r#loop: bool,

    /// Optional explicit ffmpeg binary path.
    #[serde(default)]
    pub ffmpeg_path: Option<String>,
}

fn default_width() -> u32 {
    640
}
fn default_height() -> u32 {
    360
}
fn default_loop() -> bool {
    true
}

impl VideoConfig {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            file: file.into(),
            r#loop: default_loop(),
            ffmpeg_path: None,
        }
    }

    pub fn validate(&self) -> Result<(), VideoError> {
        if self.file.trim().is_empty() {
            return Err(VideoError::InvalidConfig("file is empty".into()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(VideoError::InvalidConfig("width/height must be > 0".into()));
        }
        Ok(())
    }

    pub fn frame_len(&self) -> usize {
        (self.width as usize) * (self.height as usize) * 3
    }
}

#[derive(thiserror::Error, Debug)]
pub enum VideoError {
    #[error("failed to spawn ffmpeg: {0}")]
    Spawn(#[from] io::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Worker-to-consumer handoff. One announcement per latch: a frame published while another
/// is still pending replaces it silently, so the consumer never fires twice for one latch.
#[derive(Default)]
struct Shared {
    /// Newest published frame not yet latched by the consumer.
    pending: Mutex<Option<VideoFrame>>,
    listener: Mutex<Option<FrameListener>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn publish(&self, frame: VideoFrame) {
        let was_empty = lock(&self.pending).replace(frame).is_none();
        if !was_empty {
            return;
        }
        if let Some(notify) = lock(&self.listener).as_ref() {
            notify();
        }
    }
}

pub struct VideoDecoder {
    cfg: VideoConfig,
    shared: Arc<Shared>,
    /// Frame handed out by the last `current_frame` call.
    current: Option<VideoFrame>,
    stop: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl VideoDecoder {
    pub fn from_config(cfg: VideoConfig) -> Result<Self, VideoError> {
        cfg.validate()?;

        let shared = Arc::new(Shared::default());
        let stop = Arc::new(AtomicBool::new(false));

        let cfg_for_thread = cfg.clone();
        let shared_for_thread = Arc::clone(&shared);
        let stop_for_thread = Arc::clone(&stop);

        let worker = thread::Builder::new()
            .name("greenroom-video-decode".into())
            .spawn(move || {
                decode_loop(cfg_for_thread, shared_for_thread, stop_for_thread);
            })?;

        tracing::info!(file = %cfg.file, w = cfg.width, h = cfg.height, "video decoder started");
        Ok(Self {
            cfg,
            shared,
            current: None,
            stop,
            worker: Some(worker),
        })
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, VideoError> {
        Self::from_config(load_video_config(path)?)
    }

    pub fn config(&self) -> &VideoConfig {
        &self.cfg
    }

    /// Move the newest published frame, if any, into `current`.
    fn latch(&mut self) {
        if let Some(frame) = lock(&self.shared.pending).take() {
            self.current = Some(frame);
        }
    }
}

pub fn load_video_config(path: impl AsRef<Path>) -> Result<VideoConfig, VideoError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| VideoError::InvalidConfig(format!("read json: {e}")))?;
    serde_json::from_str(&text).map_err(|e| VideoError::InvalidConfig(format!("parse json: {e}")))
}

impl FrameSource for VideoDecoder {
    fn current_frame(&mut self) -> Option<FrameView<'_>> {
        self.latch();
        self.current
            .as_ref()
            .map(|f| FrameView::new(f.width, f.height, &f.rgb))
    }

    fn subscribe_frames(&mut self, listener: FrameListener) -> bool {
        *lock(&self.shared.listener) = Some(listener);
        true
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for VideoDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoDecoder")
            .field("cfg", &self.cfg)
            .field("has_frame", &self.current.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------- internal ----------------

fn decode_loop(cfg: VideoConfig, shared: Arc<Shared>, stop: Arc<AtomicBool>) {
    let mut buf = vec![0u8; cfg.frame_len()];

    let mut logged_spawn_error = false;

    while !stop.load(Ordering::SeqCst) {
        let ffmpeg = resolve_ffmpeg_path(cfg.ffmpeg_path.as_deref())
            .unwrap_or_else(|| PathBuf::from("ffmpeg"));

        let mut child = match spawn_ffmpeg(&ffmpeg, &cfg) {
            Ok(c) => {
                logged_spawn_error = false;
                c
            }
            Err(e) => {
                if !logged_spawn_error {
                    tracing::warn!(ffmpeg = ?ffmpeg, "failed to spawn ffmpeg: {e}");
                    logged_spawn_error = true;
                }
                if !cfg.r#loop {
                    return;
                }
                thread::sleep(Duration::from_millis(500));
                continue;
            }
        };

        let Some(mut stdout) = child.stdout.take() else {
            tracing::warn!("ffmpeg stdout was not captured");
            let _ = child.kill();
            let _ = child.wait();
            return;
        };

        loop {
            if stop.load(Ordering::SeqCst) {
                let _ = child.kill();
                let _ = child.wait();
                return;
            }

            match stdout.read_exact(&mut buf) {
                Ok(()) => shared.publish(VideoFrame {
                    width: cfg.width,
                    height: cfg.height,
                    rgb: buf.clone(),
                }),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();

                    if cfg.r#loop {
                        tracing::debug!("ffmpeg stream ended ({e}); respawning");
                        break;
                    }
                    // The last frame stays published.
                    tracing::info!("video ended");
                    return;
                }
            }
        }
    }
}

/// Arguments for a real-time RGB24 rawvideo stream on stdout, scaled to the configured size.
/// Rows come out top first; the key shader flips at sampling time.
pub fn ffmpeg_args(cfg: &VideoConfig) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-re"]
        .iter()
        .map(OsString::from)
        .collect();

    if cfg.r#loop {
        args.push("-stream_loop".into());
        args.push("-1".into());
    }

    args.push("-i".into());
    args.push(OsString::from(&cfg.file));
    args.push("-vf".into());
    args.push(format!("scale={}:{}", cfg.width, cfg.height).into());
    for a in ["-pix_fmt", "rgb24", "-f", "rawvideo", "pipe:1"] {
        args.push(a.into());
    }
    args
}

fn spawn_ffmpeg(ffmpeg: &Path, cfg: &VideoConfig) -> io::Result<Child> {
    Command::new(ffmpeg)
        .args(ffmpeg_args(cfg))
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
}

fn resolve_ffmpeg_path(explicit: Option<&str>) -> Option<PathBuf> {
    // Priority:
    // 1) explicit config path
    // 2) GREENROOM_FFMPEG env var
    // 3) bundled ffmpeg near executable (<exe>/../vendor/ffmpeg/ffmpeg)
    if let Some(p) = explicit {
        return Some(PathBuf::from(p));
    }

    if let Some(p) = std::env::var_os(FFMPEG_ENV) {
        return Some(PathBuf::from(p));
    }

    let exe = std::env::current_exe().ok()?;
    let candidate = exe
        .parent()?
        .join("..")
        .join("vendor")
        .join("ffmpeg")
        .join(ffmpeg_filename());
    candidate.exists().then_some(candidate)
}

fn ffmpeg_filename() -> &'static OsStr {
    #[cfg(windows)]
    {
        OsStr::new("ffmpeg.exe")
    }
    #[cfg(not(windows))]
    {
        OsStr::new("ffmpeg")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenroom_runtime::{Cycle, CycleOutcome, FrameScheduler, StrategyKind, Wake};
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    fn frame(w: u32, h: u32, fill: u8) -> VideoFrame {
        VideoFrame {
            width: w,
            height: h,
            rgb: vec![fill; (w * h * 3) as usize],
        }
    }

    #[test]
    fn config_defaults_from_minimal_json() {
        let cfg: VideoConfig = serde_json::from_str(r#"{ "file": "clip.mp4" }"#).unwrap();
        assert_eq!(cfg, VideoConfig::new("clip.mp4"));
        assert!(cfg.r#loop);
        assert_eq!(cfg.frame_len(), 640 * 360 * 3);
    }

    #[test]
    fn loop_key_is_renamed() {
        let cfg: VideoConfig =
            serde_json::from_str(r#"{ "file": "a.mov", "loop": false, "width": 8, "height": 4 }"#)
                .unwrap();
        assert!(!cfg.r#loop);
        assert_eq!((cfg.width, cfg.height), (8, 4));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(VideoConfig::new("  ").validate().is_err());
        let mut cfg = VideoConfig::new("a.mp4");
        cfg.height = 0;
        assert!(matches!(cfg.validate(), Err(VideoError::InvalidConfig(_))));
    }

    #[test]
    fn ffmpeg_emits_unflipped_rgb24() {
        let args = ffmpeg_args(&VideoConfig::new("clip.mp4"));
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();

        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf + 1], "scale=640:360");
        assert!(args.windows(2).any(|w| w == ["-pix_fmt", "rgb24"]));
        assert!(args.windows(2).any(|w| w == ["-stream_loop", "-1"]));
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }

    #[test]
    fn no_stream_loop_when_not_looping() {
        let mut cfg = VideoConfig::new("clip.mp4");
        cfg.r#loop = false;
        assert!(!ffmpeg_args(&cfg).iter().any(|a| a == "-stream_loop"));
    }

    #[test]
    fn explicit_ffmpeg_path_wins() {
        assert_eq!(
            resolve_ffmpeg_path(Some("/opt/ffmpeg")),
            Some(PathBuf::from("/opt/ffmpeg"))
        );
    }

    fn counting_listener() -> (Arc<AtomicUsize>, FrameListener) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let listener: FrameListener = Box::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        (hits, listener)
    }

    /// Decoder without a worker; tests publish frames by hand.
    fn idle_decoder() -> VideoDecoder {
        VideoDecoder {
            cfg: VideoConfig::new("clip.mp4"),
            shared: Arc::new(Shared::default()),
            current: None,
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    #[test]
    fn publishes_before_a_latch_announce_once() {
        let shared = Shared::default();
        let (hits, listener) = counting_listener();
        *lock(&shared.listener) = Some(listener);

        shared.publish(frame(2, 2, 1));
        shared.publish(frame(2, 2, 2));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let newest = lock(&shared.pending).take().unwrap();
        assert_eq!(newest.rgb[0], 2);

        shared.publish(frame(2, 2, 3));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    struct PullCycle {
        source: VideoDecoder,
        draws: Vec<u8>,
    }

    impl Cycle for PullCycle {
        fn run_cycle(&mut self) -> CycleOutcome {
            match self.source.current_frame() {
                Some(f) => {
                    self.draws.push(f.rgb[0]);
                    CycleOutcome::Drawn
                }
                None => CycleOutcome::NoFrame,
            }
        }
    }

    #[test]
    fn burst_of_frames_draws_once() {
        let mut decoder = idle_decoder();
        let shared = Arc::clone(&decoder.shared);
        let (hits, listener) = counting_listener();
        let mut sched = FrameScheduler::probe(&mut decoder, listener);
        assert_eq!(sched.strategy_kind(), StrategyKind::FrameCallback);

        let mut cycle = PullCycle {
            source: decoder,
            draws: Vec::new(),
        };
        let now = Instant::now();
        assert_eq!(sched.start(&mut cycle, now), Some(CycleOutcome::NoFrame));

        shared.publish(frame(2, 2, 1));
        shared.publish(frame(2, 2, 2));
        for _ in 0..hits.load(Ordering::SeqCst) {
            sched.wake(Wake::FrameReady, now, &mut cycle);
        }
        assert_eq!(cycle.draws, vec![2]);

        shared.publish(frame(2, 2, 3));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        sched.wake(Wake::FrameReady, now, &mut cycle);
        assert_eq!(cycle.draws, vec![2, 3]);
    }
}
