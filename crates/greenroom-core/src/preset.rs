//! Named key presets (portable performance data).
//!
//! Presets let a live operator jump between known-good key setups (green screen, blue screen,
//! a studio-specific wall) without retyping thresholds.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ChromaKeyConfig;
use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyPreset {
    pub name: String,
    pub config: ChromaKeyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyPresetSet {
    pub presets: Vec<KeyPreset>,
}

impl KeyPresetSet {
    /// Safe fallback when no JSON is provided.
    pub fn builtin() -> Self {
        let green = ChromaKeyConfig::default();
        let blue = ChromaKeyConfig {
            key_color: [0.0, 71.0 / 255.0, 187.0 / 255.0],
            similarity: 0.35,
            ..ChromaKeyConfig::default()
        };
        let green_soft = ChromaKeyConfig {
            smoothness: 0.2,
            spill: 0.25,
            ..green
        };

        Self {
            presets: vec![
                KeyPreset {
                    name: "green".to_string(),
                    config: green,
                },
                KeyPreset {
                    name: "blue".to_string(),
                    config: blue,
                },
                KeyPreset {
                    name: "green_soft".to_string(),
                    config: green_soft,
                },
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&ChromaKeyConfig> {
        self.presets
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.config)
    }

    pub fn by_index(&self, index: usize) -> Option<&KeyPreset> {
        self.presets.get(index)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.iter().map(|p| p.name.as_str())
    }

    /// Parse + validate. `path` is only used for error messages.
    pub fn from_json_str(text: &str, path: &Path) -> Result<Self, EngineError> {
        let set: KeyPresetSet = serde_json::from_str(text).map_err(|source| EngineError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        set.validate().map_err(|msg| EngineError::InvalidConfig {
            path: path.to_path_buf(),
            msg,
        })?;
        Ok(set)
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text, path)
    }

    fn validate(&self) -> Result<(), String> {
        if self.presets.is_empty() {
            return Err("presets must not be empty".to_string());
        }
        for (i, p) in self.presets.iter().enumerate() {
            if p.name.trim().is_empty() {
                return Err(format!("preset #{i} has an empty name"));
            }
            if self.presets[..i].iter().any(|q| q.name == p.name) {
                return Err(format!("duplicate preset name '{}'", p.name));
            }
            p.config
                .validate()
                .map_err(|msg| format!("preset '{}': {msg}", p.name))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_presets_validate() {
        let set = KeyPresetSet::builtin();
        assert!(set.validate().is_ok());
        assert_eq!(set.get("green"), Some(&ChromaKeyConfig::default()));
        assert_eq!(set.by_index(1).map(|p| p.name.as_str()), Some("blue"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut set = KeyPresetSet::builtin();
        set.presets.push(set.presets[0].clone());
        let msg = set.validate().unwrap_err();
        assert!(msg.contains("duplicate"), "{msg}");
    }
}
