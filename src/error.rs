use std::path::PathBuf;

use thiserror::Error;

use crate::models::Language;

/// Failures while turning a selected file into a decoded image and preview
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    Decode(#[from] image::ImageError),

    #[error("image too large to upscale: {width}x{height}")]
    TooLarge { width: u32, height: u32 },
}

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("OCR models not found. Expected:\n{}", format_paths(.expected))]
    ModelsMissing { expected: Vec<PathBuf> },

    #[error("no recognition model installed for {0}")]
    LanguageUnavailable(Language),

    #[error("failed to load OCR model: {0}")]
    ModelLoad(String),

    #[error("{0}")]
    Engine(String),
}

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("model failed to load: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("model produced {outputs} scores but {labels} labels are defined")]
    LabelMismatch { outputs: usize, labels: usize },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("there is no recognized text to export")]
    NothingToExport,

    #[error("clipboard write rejected: {0}")]
    Clipboard(String),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("could not determine config directory")]
    NoConfigDir,
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}
