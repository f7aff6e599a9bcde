use std::path::Path;

use greenroom_core::EngineError;

/// Version tag every shader stage must carry.
pub const SHADER_ASSET_TAG: &str = "// greenroom-shader: v1";

pub const QUAD_VERT_FILE: &str = "quad.vert";
pub const CHROMA_KEY_FRAG_FILE: &str = "chroma_key.frag";

const BUILTIN_VERT: &str = include_str!("../shaders/quad.vert");
const BUILTIN_FRAG: &str = include_str!("../shaders/chroma_key.frag");

#[derive(Debug, Clone)]
pub struct ShaderAsset {
    pub vert: String,
    pub frag: String,
    /// Human-friendly origin (path/label) for logs.
    pub origin: String,
}

impl ShaderAsset {
    /// Sources compiled into the crate.
    pub fn builtin() -> Self {
        Self {
            vert: BUILTIN_VERT.to_string(),
            frag: BUILTIN_FRAG.to_string(),
            origin: "builtin".to_string(),
        }
    }

    /// Load `quad.vert` and `chroma_key.frag` from an override directory.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, EngineError> {
        let dir = dir.as_ref();
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path).map_err(|source| EngineError::Io { path, source })
        };

        let asset = Self {
            vert: read(QUAD_VERT_FILE)?,
            frag: read(CHROMA_KEY_FRAG_FILE)?,
            origin: dir.display().to_string(),
        };
        asset.validate()?;
        tracing::info!(origin = %asset.origin, "loaded shader override");
        Ok(asset)
    }

    /// Both stages carry [`SHADER_ASSET_TAG`] within their leading comment block.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (stage, src) in [("vertex", &self.vert), ("fragment", &self.frag)] {
            if !has_version_tag(src) {
                return Err(EngineError::ShaderAsset {
                    origin: self.origin.clone(),
                    msg: format!("{stage} stage is missing the `{SHADER_ASSET_TAG}` tag"),
                });
            }
        }
        Ok(())
    }
}

impl Default for ShaderAsset {
    fn default() -> Self {
        Self::builtin()
    }
}

fn has_version_tag(src: &str) -> bool {
    src.lines()
        .map(str::trim)
        .take_while(|l| l.is_empty() || l.starts_with("//") || l.starts_with("#version"))
        .any(|l| l == SHADER_ASSET_TAG)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_sources_are_tagged() {
        ShaderAsset::builtin().validate().unwrap();
    }

    #[test]
    fn builtin_frag_declares_every_uniform() {
        let frag = ShaderAsset::builtin().frag;
        for name in crate::program::UNIFORM_NAMES {
            assert!(frag.contains(name), "missing uniform {name}");
        }
    }

    #[test]
    fn untagged_stage_is_rejected() {
        let asset = ShaderAsset {
            vert: BUILTIN_VERT.to_string(),
            frag: "#version 330 core\nvoid main() {}\n".to_string(),
            origin: "test".to_string(),
        };
        let err = asset.validate().unwrap_err();
        assert!(matches!(err, EngineError::ShaderAsset { .. }));
        assert!(err.to_string().contains("fragment"));
    }

    #[test]
    fn tag_after_code_does_not_count() {
        let src = format!("#version 330 core\nvoid main() {{}}\n{SHADER_ASSET_TAG}\n");
        assert!(!has_version_tag(&src));
    }

    #[test]
    fn from_dir_reads_both_stages() {
        let dir = std::env::temp_dir().join(format!("greenroom-shaders-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(QUAD_VERT_FILE), BUILTIN_VERT).unwrap();
        std::fs::write(dir.join(CHROMA_KEY_FRAG_FILE), BUILTIN_FRAG).unwrap();

        let asset = ShaderAsset::from_dir(&dir).unwrap();
        assert_eq!(asset.frag, BUILTIN_FRAG);
        assert_eq!(asset.origin, dir.display().to_string());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn from_dir_missing_file_is_io_error() {
        let dir = std::env::temp_dir().join("greenroom-shaders-does-not-exist");
        let err = ShaderAsset::from_dir(&dir).unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }));
    }
}
