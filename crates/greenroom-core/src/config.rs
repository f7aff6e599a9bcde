use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Smallest smoothness/spill value substituted for a non-positive one.
pub const MIN_THRESHOLD: f32 = 1.0e-4;

/// Exponent applied to the clamped matte and spill ramps.
pub const DEFAULT_CURVE: f32 = 1.5;

/// Key parameters read once per cycle.
///
/// JSON form:
/// ```json
/// { "key_color": [0.0667, 1.0, 0.0196], "similarity": 0.4, "smoothness": 0.08, "spill": 0.1 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChromaKeyConfig {
    /// Key color, linear components in [0, 1].
    #[serde(default = "default_key_color")]
    pub key_color: [f32; 3],

    /// Chroma distance below which pixels are fully keyed out.
    #[serde(default = "default_similarity")]
    pub similarity: f32,

    /// Width of the alpha ramp above `similarity`.
    #[serde(default = "default_smoothness")]
    pub smoothness: f32,

    /// Width of the desaturation ramp above `similarity`.
    #[serde(default = "default_spill")]
    pub spill: f32,

    /// Exponent of both ramps.
    #[serde(default = "default_curve")]
    pub curve: f32,
}

fn default_key_color() -> [f32; 3] {
    // #11ff05
    [17.0 / 255.0, 1.0, 5.0 / 255.0]
}
fn default_similarity() -> f32 {
    0.4
}
fn default_smoothness() -> f32 {
    0.08
}
fn default_spill() -> f32 {
    0.1
}
fn default_curve() -> f32 {
    DEFAULT_CURVE
}

impl Default for ChromaKeyConfig {
    fn default() -> Self {
        Self {
            key_color: default_key_color(),
            similarity: default_similarity(),
            smoothness: default_smoothness(),
            spill: default_spill(),
            curve: default_curve(),
        }
    }
}

/// A value in a config snapshot that had to be replaced before drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigIssue {
    KeyColor([f32; 3]),
    Similarity(f32),
    Smoothness(f32),
    Spill(f32),
    Curve(f32),
}

impl ConfigIssue {
    pub fn field(&self) -> &'static str {
        match self {
            ConfigIssue::KeyColor(_) => "key_color",
            ConfigIssue::Similarity(_) => "similarity",
            ConfigIssue::Smoothness(_) => "smoothness",
            ConfigIssue::Spill(_) => "spill",
            ConfigIssue::Curve(_) => "curve",
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::KeyColor(c) => {
                write!(f, "key_color {c:?} must be finite and in [0, 1]")
            }
            ConfigIssue::Similarity(v) => write!(f, "similarity {v} must be >= 0"),
            ConfigIssue::Smoothness(v) => write!(f, "smoothness {v} must be > 0"),
            ConfigIssue::Spill(v) => write!(f, "spill {v} must be > 0"),
            ConfigIssue::Curve(v) => write!(f, "curve {v} must be > 0"),
        }
    }
}

fn positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

impl ChromaKeyConfig {
    /// Returns a drawable copy of `self` plus everything that was replaced.
    ///
    /// Substitutes: black key color, `MIN_THRESHOLD` for smoothness/spill, 0 for similarity,
    /// `DEFAULT_CURVE` for the curve.
    pub fn sanitize(&self) -> (ChromaKeyConfig, Vec<ConfigIssue>) {
        let mut out = *self;
        let mut issues = Vec::new();

        if !self
            .key_color
            .iter()
            .all(|c| c.is_finite() && (0.0..=1.0).contains(c))
        {
            issues.push(ConfigIssue::KeyColor(self.key_color));
            out.key_color = [0.0, 0.0, 0.0];
        }
        if !(self.similarity.is_finite() && self.similarity >= 0.0) {
            issues.push(ConfigIssue::Similarity(self.similarity));
            out.similarity = 0.0;
        }
        if !positive(self.smoothness) {
            issues.push(ConfigIssue::Smoothness(self.smoothness));
            out.smoothness = MIN_THRESHOLD;
        }
        if !positive(self.spill) {
            issues.push(ConfigIssue::Spill(self.spill));
            out.spill = MIN_THRESHOLD;
        }
        if !positive(self.curve) {
            issues.push(ConfigIssue::Curve(self.curve));
            out.curve = DEFAULT_CURVE;
        }

        (out, issues)
    }

    /// Strict check used when loading files: every issue is an error.
    pub fn validate(&self) -> Result<(), String> {
        let (_, issues) = self.sanitize();
        if issues.is_empty() {
            return Ok(());
        }
        let msgs: Vec<String> = issues.iter().map(ToString::to_string).collect();
        Err(msgs.join("; "))
    }
}

/// Parse and validate a key config. `path` is only used for error messages.
pub fn parse_key_config(text: &str, path: &Path) -> Result<ChromaKeyConfig, EngineError> {
    let cfg: ChromaKeyConfig = serde_json::from_str(text).map_err(|source| EngineError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    cfg.validate().map_err(|msg| EngineError::InvalidConfig {
        path: path.to_path_buf(),
        msg,
    })?;
    Ok(cfg)
}

pub fn load_key_config(path: impl AsRef<Path>) -> Result<ChromaKeyConfig, EngineError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_key_config(&text, path)
}
