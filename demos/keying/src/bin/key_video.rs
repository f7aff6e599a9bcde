//! Key a looping video file into a transparent window.
//!
//! ```text
//! key_video --file clip.mp4 --preset green --osc 127.0.0.1:9000
//! key_video --video-config video.json --key-config key.json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use greenroom_demos::{init_tracing, run_keyer, KeyArgs};
use greenroom_input_video::{load_video_config, VideoConfig, VideoDecoder};

#[derive(Parser, Debug)]
#[command(name = "key_video", version, about = "Chroma-key a video file")]
struct Cli {
    /// Video config JSON (`file`, `width`, `height`, `loop`, `ffmpeg_path`).
    #[arg(long, value_name = "PATH")]
    video_config: Option<PathBuf>,

    /// Input file; required unless the video config names one.
    #[arg(long, value_name = "PATH")]
    file: Option<String>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Play once and hold the last frame.
    #[arg(long)]
    no_loop: bool,

    /// Explicit ffmpeg binary (otherwise $GREENROOM_FFMPEG, a bundled copy, or PATH).
    #[arg(long, value_name = "PATH")]
    ffmpeg: Option<String>,

    #[command(flatten)]
    key: KeyArgs,
}

impl Cli {
    fn video_config(&self) -> Result<VideoConfig> {
        let mut cfg = match &self.video_config {
            Some(p) => load_video_config(p)
                .with_context(|| format!("loading video config {}", p.display()))?,
            None => VideoConfig::new(""),
        };
        if let Some(f) = &self.file {
            cfg.file = f.clone();
        }
        if let Some(w) = self.width {
            cfg.width = w;
        }
        if let Some(h) = self.height {
            cfg.height = h;
        }
        if self.no_loop {
            cfg.r#loop = false;
        }
        if let Some(p) = &self.ffmpeg {
            cfg.ffmpeg_path = Some(p.clone());
        }
        cfg.validate().context("video settings (pass --file or --video-config)")?;
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let decoder = VideoDecoder::from_config(cli.video_config()?)?;
    run_keyer(decoder, &cli.key, "greenroom: key_video")
}
