//! Application configuration
//!
//! User settings stored as TOML. Every section falls back to its defaults, so
//! a config file only needs the keys the user wants to change.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::Language;

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub features: FeatureFlags,
    pub preprocess: PreprocessConfig,
    pub recognition: RecognitionConfig,
    pub classification: ClassificationConfig,
    pub export: ExportConfig,
}

/// Switches between the behaviours of the different UI iterations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Show a preview after selection and wait for "Analyze"
    pub preview_step: bool,
    /// Offer the language picker
    pub language_selector: bool,
    /// Offer copy and download of the recognized text
    pub export_actions: bool,
    /// Display `[no text found]` instead of an empty result
    pub empty_text_marker: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            preview_step: true,
            language_selector: true,
            export_actions: true,
            empty_text_marker: false,
        }
    }
}

/// Preview raster settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Contrast/brightness filter applied after upscaling (None = unfiltered).
    /// Stored as a table with an explicit `enabled` key.
    #[serde(with = "filter_table")]
    pub filter: Option<FilterConfig>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            filter: Some(FilterConfig::default()),
        }
    }
}

/// Multipliers with CSS `contrast()` / `brightness()` semantics (1.0 = unchanged)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub contrast: f32,
    pub brightness: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            contrast: 2.0,
            brightness: 1.2,
        }
    }
}

/// TOML has no null, so a disabled filter is written as `enabled = false`
mod filter_table {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::FilterConfig;

    #[derive(Serialize, Deserialize)]
    #[serde(default)]
    struct FilterTable {
        enabled: bool,
        contrast: f32,
        brightness: f32,
    }

    impl Default for FilterTable {
        fn default() -> Self {
            let filter = FilterConfig::default();
            Self {
                enabled: true,
                contrast: filter.contrast,
                brightness: filter.brightness,
            }
        }
    }

    pub fn serialize<S: Serializer>(value: &Option<FilterConfig>, serializer: S) -> Result<S::Ok, S::Error> {
        let filter = value.unwrap_or_default();
        FilterTable {
            enabled: value.is_some(),
            contrast: filter.contrast,
            brightness: filter.brightness,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<FilterConfig>, D::Error> {
        let table = FilterTable::deserialize(deserializer)?;
        Ok(table.enabled.then_some(FilterConfig {
            contrast: table.contrast,
            brightness: table.brightness,
        }))
    }
}

/// Which image is handed to the OCR engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionSource {
    /// The 2x upscaled, filtered preview raster
    #[default]
    Preview,
    /// The decoded image as uploaded
    Original,
}

/// How recognized lines are assembled into the final text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSegmentation {
    /// One line per recognized text line, blank lines dropped
    Auto,
    /// Treat the image as one uniform block of text
    #[default]
    SingleBlock,
    /// Treat the image as a single line of text
    SingleLine,
}

/// Options forwarded to the OCR stage with each request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrOptions {
    pub page_segmentation: PageSegmentation,
    pub preserve_interword_spaces: bool,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            page_segmentation: PageSegmentation::SingleBlock,
            preserve_interword_spaces: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub language: Language,
    pub source: RecognitionSource,
    /// Directory holding the `.rten` OCR models (None = `~/.cache/ocrs`)
    pub model_dir: Option<PathBuf>,
    pub options: OcrOptions,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: Language::English,
            source: RecognitionSource::Preview,
            model_dir: None,
            options: OcrOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Classifier model (None = `mobilenet.rten` in the cache directory)
    pub model_path: Option<PathBuf>,
    /// Newline separated class labels (None = `imagenet-labels.txt` next to the model)
    pub labels_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// File name offered when downloading the recognized text
    pub file_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_name: "ocr-result.txt".to_string(),
        }
    }
}

fn project_dirs() -> Result<directories::ProjectDirs, ConfigError> {
    directories::ProjectDirs::from("com", "insight-ocr", "InsightOCR").ok_or(ConfigError::NoConfigDir)
}

/// Default location of `config.toml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(project_dirs()?.config_dir().join("config.toml"))
}

/// Directory where downloaded classifier models are expected
pub fn default_cache_dir() -> Result<PathBuf, ConfigError> {
    Ok(project_dirs()?.cache_dir().to_path_buf())
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the config at `path`, or the default location when `path` is None.
/// A missing file at the default location yields the defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    if let Some(path) = path {
        return load_config(path);
    }

    let default_path = default_config_path()?;
    if default_path.exists() {
        tracing::info!("Loaded configuration from {}", default_path.display());
        load_config(&default_path)
    } else {
        tracing::debug!("No config at {}, using defaults", default_path.display());
        Ok(AppConfig::default())
    }
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    let content = to_toml(config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn to_toml(config: &AppConfig) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}
