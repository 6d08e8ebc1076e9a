//! Error types for the fallible infrastructure: GPU setup, pixel readback and
//! configuration loading.
//!
//! Scene protocol violations (double attach, missing registry, unbalanced
//! `restore`) are not errors in this sense. They are logged and turned into
//! no-ops so a running game keeps running.

use std::path::PathBuf;

use thiserror::Error;

/// Failure inside a renderer back end.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The crate was built without the `accelerated` feature.
    #[error("accelerated back end not compiled in")]
    Unsupported,
    #[error("no suitable GPU adapter: {0}")]
    AdapterUnavailable(String),
    #[error("GPU device request failed: {0}")]
    Device(String),
    #[error("render pipeline failed validation: {0}")]
    Pipeline(String),
    #[error("pixel readback failed: {0}")]
    Readback(String),
}

/// Failure loading an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
