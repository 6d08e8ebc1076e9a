//! Engine configuration.
//!
//! Loaded once at startup from JSON. Every field has a default, so a partial
//! file (or none at all) is valid:
//!
//! ```json
//! { "renderer": { "backend": "software", "smoothing": true } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which renderer back end to prefer at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// Use the GPU when it can be initialized, otherwise software.
    #[default]
    Auto,
    /// Ask for the GPU; still falls back to software if it is missing.
    Accelerated,
    /// Always use the software rasterizer.
    Software,
}

/// Renderer settings handed to [`render::setup`](crate::render::setup).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub backend: BackendPreference,
    /// Bilinear texture filtering instead of nearest.
    pub smoothing: bool,
    /// Size of the main drawing target in pixels.
    pub width: u32,
    pub height: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            backend: BackendPreference::Auto,
            smoothing: false,
            width: 320,
            height: 240,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub renderer: RendererConfig,
}

impl EngineConfig {
    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.renderer.backend, BackendPreference::Auto);
    }

    #[test]
    fn partial_renderer_section() {
        let config =
            EngineConfig::from_json(r#"{ "renderer": { "backend": "software", "smoothing": true } }"#)
                .unwrap();
        assert_eq!(config.renderer.backend, BackendPreference::Software);
        assert!(config.renderer.smoothing);
        assert_eq!(config.renderer.width, 320);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = EngineConfig::from_json(r#"{ "renderer": { "backend": "vulkan" } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = EngineConfig::load("/definitely/not/here.json").unwrap_err();
        match err {
            ConfigError::Io { path, .. } => assert!(path.ends_with("here.json")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
