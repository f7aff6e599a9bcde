use std::path::PathBuf;

/// Engine-level errors used across greenroom crates.
///
/// Contract rule: this type lives in `greenroom-core` and is re-exported by runtimes.
/// Per-cycle anomalies (bad config values, a source without dimensions) are *not* errors;
/// the cycle substitutes or skips and keeps rendering.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    // ---- Config files ----
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("json parse error at {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid config at {}: {msg}", path.display())]
    InvalidConfig { path: PathBuf, msg: String },

    // ---- Initialization (fatal to a pipeline instance) ----
    #[error("gpu context unavailable: {0}")]
    ContextUnavailable(String),

    #[error("vertex shader compile error: {0}")]
    VertexCompile(String),

    #[error("fragment shader compile error: {0}")]
    FragmentCompile(String),

    #[error("program link error: {0}")]
    Link(String),

    #[error("backend object creation failed: {0}")]
    GlCreate(String),

    #[error("shader asset error ({origin}): {msg}")]
    ShaderAsset { origin: String, msg: String },
}

impl EngineError {
    /// True for errors that leave a pipeline unusable: the scheduler must never start.
    pub fn is_initialization_failure(&self) -> bool {
        matches!(
            self,
            EngineError::ContextUnavailable(_)
                | EngineError::VertexCompile(_)
                | EngineError::FragmentCompile(_)
                | EngineError::Link(_)
                | EngineError::GlCreate(_)
                | EngineError::ShaderAsset { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_failure_is_initialization_failure() {
        let e = EngineError::Link("undefined symbol".into());
        assert!(e.is_initialization_failure());
        assert_eq!(e.to_string(), "program link error: undefined symbol");
    }

    #[test]
    fn config_errors_are_not_initialization_failures() {
        let e = EngineError::InvalidConfig {
            path: PathBuf::from("key.json"),
            msg: "spill must be > 0".into(),
        };
        assert!(!e.is_initialization_failure());
        assert!(e.to_string().contains("key.json"));
    }
}
