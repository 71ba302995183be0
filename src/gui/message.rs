use std::path::PathBuf;

use crate::models::{Language, RunId};
use crate::pipeline::PipelineEvent;

#[derive(Debug, Clone)]
pub enum Message {
    PickFile,
    FilePicked(Option<PathBuf>),
    LanguageSelected(Language),
    Analyze,
    Pipeline(PipelineEvent),
    /// The blocking task driving a run died before finishing it
    JobFailed(RunId, String),
    ClassifierSettled,
    CopyText,
    DownloadText,
    DownloadTarget(Option<PathBuf>),
    None,
}
