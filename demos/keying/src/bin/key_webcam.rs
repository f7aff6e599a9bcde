//! Key a live webcam into a transparent window.

use anyhow::{Context, Result};
use clap::Parser;

use greenroom_demos::{init_tracing, run_keyer, KeyArgs};
use greenroom_input_webcam::Webcam;

#[derive(Parser, Debug)]
#[command(name = "key_webcam", version, about = "Chroma-key a webcam")]
struct Cli {
    /// Camera index.
    #[arg(long, default_value_t = 0)]
    index: u32,

    /// Requested capture width; the device may pick another.
    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 720)]
    height: u32,

    #[command(flatten)]
    key: KeyArgs,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let cam = Webcam::new(cli.index, cli.width, cli.height)
        .with_context(|| format!("opening webcam {}", cli.index))?;
    run_keyer(cam, &cli.key, "greenroom: key_webcam")
}
