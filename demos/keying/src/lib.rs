//! Shared plumbing for the keying demos: key CLI flags, logging, and the window bootstrap.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use tracing_subscriber::EnvFilter;
use winit::event_loop::EventLoopBuilder;

use greenroom_control_osc::OscKeyReceiver;
use greenroom_core::{load_key_config, matte_stats, ChromaKeyConfig, KeyPresetSet};
use greenroom_host_winit::{frame_listener, make_gl, UserEvent, WindowOptions};
use greenroom_runtime::{FrameScheduler, FrameSource, KeyingCycle, SharedKeyConfig};
use greenroom_runtime_glow::{GlowKeyer, OutputAlpha, ShaderAsset};

/// Key parameters. A JSON config or named preset sets the base; individual flags override it.
#[derive(Args, Debug, Clone, Default)]
pub struct KeyArgs {
    /// Key config JSON (`key_color`, `similarity`, `smoothness`, `spill`, `curve`).
    #[arg(long, value_name = "PATH", conflicts_with = "preset")]
    pub key_config: Option<PathBuf>,

    /// Preset set JSON; the built-in set (green, blue, green_soft) when omitted.
    #[arg(long, value_name = "PATH")]
    pub presets: Option<PathBuf>,

    /// Start from a named preset.
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Key color as hex, e.g. `#11ff05`.
    #[arg(long, value_name = "HEX", value_parser = parse_hex_color)]
    pub key_color: Option<[f32; 3]>,

    #[arg(long)]
    pub similarity: Option<f32>,

    #[arg(long)]
    pub smoothness: Option<f32>,

    #[arg(long)]
    pub spill: Option<f32>,

    /// Exponent of the alpha and spill ramps.
    #[arg(long)]
    pub curve: Option<f32>,

    /// Directory with `quad.vert` and `chroma_key.frag` overriding the built-in shaders.
    #[arg(long, value_name = "DIR")]
    pub shader_dir: Option<PathBuf>,

    /// Listen for OSC key controls on this address (e.g. `127.0.0.1:9000`).
    #[arg(long, value_name = "ADDR")]
    pub osc: Option<String>,

    /// Draw into an opaque window.
    #[arg(long)]
    pub opaque: bool,

    /// Log matte coverage (keyed-out / opaque fractions) every SECS seconds.
    #[arg(long, value_name = "SECS")]
    pub matte_report: Option<u64>,
}

/// `#rrggbb` or `rrggbb` into linear [0, 1] components.
pub fn parse_hex_color(s: &str) -> Result<[f32; 3], String> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(format!("expected 6 hex digits, got '{s}'"));
    }
    let mut out = [0.0; 3];
    for (i, c) in out.iter_mut().enumerate() {
        let byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .map_err(|e| format!("bad hex color '{s}': {e}"))?;
        *c = f32::from(byte) / 255.0;
    }
    Ok(out)
}

impl KeyArgs {
    /// Starting config plus the preset set OSC `/key/preset` indexes into.
    pub fn resolve(&self) -> Result<(ChromaKeyConfig, KeyPresetSet)> {
        let presets = match &self.presets {
            Some(p) => KeyPresetSet::from_json_path(p)
                .with_context(|| format!("loading presets {}", p.display()))?,
            None => KeyPresetSet::builtin(),
        };

        let mut cfg = if let Some(path) = &self.key_config {
            load_key_config(path).with_context(|| format!("loading {}", path.display()))?
        } else if let Some(name) = &self.preset {
            *presets.get(name).ok_or_else(|| {
                let known: Vec<&str> = presets.names().collect();
                anyhow!("unknown preset '{name}' (known: {})", known.join(", "))
            })?
        } else {
            ChromaKeyConfig::default()
        };

        if let Some(c) = self.key_color {
            cfg.key_color = c;
        }
        if let Some(v) = self.similarity {
            cfg.similarity = v;
        }
        if let Some(v) = self.smoothness {
            cfg.smoothness = v;
        }
        if let Some(v) = self.spill {
            cfg.spill = v;
        }
        if let Some(v) = self.curve {
            cfg.curve = v;
        }

        cfg.validate()
            .map_err(|msg| anyhow!("invalid key flags: {msg}"))?;
        Ok((cfg, presets))
    }
}

/// Periodic matte readback. Requests a capture, logs it on the next report tick.
#[derive(Debug)]
struct MatteReport {
    every: Duration,
    next: Instant,
}

impl MatteReport {
    fn new(every: Duration) -> Self {
        Self {
            every,
            next: Instant::now() + every,
        }
    }

    fn tick(&mut self, keyer: &mut GlowKeyer) {
        let now = Instant::now();
        if now < self.next {
            return;
        }
        self.next = now + self.every;

        if let Some((w, h, rgba)) = keyer.take_readback() {
            if let Some(s) = matte_stats(&rgba) {
                tracing::info!(
                    w,
                    h,
                    keyed_out = s.keyed_out,
                    opaque = s.opaque,
                    mean_alpha = s.mean_alpha,
                    "matte coverage"
                );
            }
        }
        keyer.request_readback();
    }
}

/// Transparent windows are composited as premultiplied color.
fn window_output_alpha(transparent: bool) -> OutputAlpha {
    if transparent {
        OutputAlpha::Premultiplied
    } else {
        OutputAlpha::Straight
    }
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Open the window, build the pipeline around `source`, and run until the window closes.
///
/// Returns only on a setup error.
pub fn run_keyer<S>(mut source: S, key: &KeyArgs, title: &str) -> Result<()>
where
    S: FrameSource + 'static,
{
    let (cfg, presets) = key.resolve()?;
    let asset = match &key.shader_dir {
        Some(dir) => ShaderAsset::from_dir(dir)?,
        None => ShaderAsset::builtin(),
    };

    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event().build();
    let opts = WindowOptions {
        title: title.to_string(),
        transparent: !key.opaque,
        ..WindowOptions::default()
    };
    let (target, gl) = make_gl(&event_loop, &opts).context("creating GL window")?;

    // SAFETY: make_gl left the context current on this thread, and everything below runs
    // on it.
    let mut keyer = unsafe { GlowKeyer::new(gl, &asset) }.context("building key program")?;
    keyer.set_output_alpha(window_output_alpha(opts.transparent));

    let listener = frame_listener(event_loop.create_proxy());
    let scheduler = FrameScheduler::probe(&mut source, listener);

    let shared = SharedKeyConfig::new(cfg);
    let mut osc = match &key.osc {
        Some(addr) => Some(
            OscKeyReceiver::bind(addr, presets)
                .with_context(|| format!("binding OSC on {addr}"))?,
        ),
        None => None,
    };

    let mut report = key
        .matte_report
        .map(|secs| MatteReport::new(Duration::from_secs(secs.max(1))));

    let cycle = KeyingCycle::new(source, target, keyer, shared.clone());

    tracing::info!(?cfg, strategy = ?scheduler.strategy_kind(), "keying");
    greenroom_host_winit::run(event_loop, scheduler, cycle, move |cycle| {
        if let Some(rx) = osc.as_mut() {
            rx.poll_into(&shared);
        }
        if let Some(r) = report.as_mut() {
            r.tick(cycle.backend_mut());
        }
    })
}
