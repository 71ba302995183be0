//! Copy and download actions for the recognized text

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::FeatureFlags;
use crate::error::ExportError;
use crate::models::RecognizedText;

/// Which export actions the UI should offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportActions {
    pub copy: bool,
    pub download: bool,
}

impl ExportActions {
    pub fn any(self) -> bool {
        self.copy || self.download
    }
}

/// Actions are only offered for non-empty text
pub fn available_actions(text: &RecognizedText, flags: &FeatureFlags) -> ExportActions {
    let offered = flags.export_actions && !text.is_empty();
    ExportActions {
        copy: offered,
        download: offered,
    }
}

/// Destination for the copy action
pub trait ClipboardSink {
    fn write_text(&self, text: &str) -> Result<(), ExportError>;
}

/// The platform clipboard
pub struct SystemClipboard;

impl ClipboardSink for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), ExportError> {
        cli_clipboard::set_contents(text.to_string()).map_err(|e| ExportError::Clipboard(e.to_string()))
    }
}

pub fn copy_text(sink: &dyn ClipboardSink, text: &RecognizedText) -> Result<(), ExportError> {
    if text.is_empty() {
        return Err(ExportError::NothingToExport);
    }
    sink.write_text(text.as_str())?;
    info!("Copied {} characters to clipboard", text.as_str().chars().count());
    Ok(())
}

/// Write the text as a `.txt` attachment at exactly `path`
pub fn save_text(path: &Path, text: &RecognizedText) -> Result<(), ExportError> {
    if text.is_empty() {
        return Err(ExportError::NothingToExport);
    }
    let mut content = text.as_str().to_string();
    content.push('\n');
    std::fs::write(path, content).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Saved recognized text to {}", path.display());
    Ok(())
}

/// Write the text into `dir` under the fixed download name
pub fn download_to_dir(dir: &Path, file_name: &str, text: &RecognizedText) -> Result<PathBuf, ExportError> {
    let path = dir.join(file_name);
    save_text(&path, text)?;
    Ok(path)
}

/// Result of an export action, as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acknowledgement {
    Copied,
    CopyFailed(String),
    Saved(PathBuf),
    SaveFailed(String),
}

impl Acknowledgement {
    pub fn from_copy(result: Result<(), ExportError>) -> Self {
        match result {
            Ok(()) => Acknowledgement::Copied,
            Err(e) => Acknowledgement::CopyFailed(e.to_string()),
        }
    }

    pub fn from_save(result: Result<PathBuf, ExportError>) -> Self {
        match result {
            Ok(path) => Acknowledgement::Saved(path),
            Err(e) => Acknowledgement::SaveFailed(e.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Acknowledgement::Copied | Acknowledgement::Saved(_))
    }

    pub fn message(&self) -> String {
        match self {
            Acknowledgement::Copied => "Copied to clipboard!".to_string(),
            Acknowledgement::CopyFailed(e) => format!("Copy failed: {}", e),
            Acknowledgement::Saved(path) => format!("Saved {}", path.display()),
            Acknowledgement::SaveFailed(e) => format!("Download failed: {}", e),
        }
    }
}
