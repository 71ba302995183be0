use tracing::trace;

use crate::acquisition::Acquired;
use crate::models::{PredictionList, RecognizedText, RunId, StatusMessage};
use crate::pipeline::{ClassificationOutcome, EventKind, PipelineEvent, RecognitionOutcome, RunPhase};

/// Everything the user sees about the current analysis.
///
/// Updated only through the consuming methods below; events from any run
/// other than the current one are ignored, so a slow, abandoned run can never
/// overwrite the results of a newer one.
#[derive(Debug, Clone)]
pub struct AnalysisState {
    pub run: Option<RunId>,
    pub phase: RunPhase,
    pub status: StatusMessage,
    pub file_name: Option<String>,
    pub acquired: Option<Acquired>,
    pub text: RecognizedText,
    pub recognition_error: Option<String>,
    pub predictions: PredictionList,
    pub classifier_not_loaded: bool,
    pub classification_error: Option<String>,
}

impl Default for AnalysisState {
    fn default() -> Self {
        Self {
            run: None,
            phase: RunPhase::Idle,
            status: StatusMessage::choose_image(),
            file_name: None,
            acquired: None,
            text: RecognizedText::default(),
            recognition_error: None,
            predictions: PredictionList::default(),
            classifier_not_loaded: false,
            classification_error: None,
        }
    }
}

impl AnalysisState {
    /// A new file was picked. Drops the old preview and all results.
    pub fn select_file(self, run: RunId, file_name: impl Into<String>) -> Self {
        Self {
            run: Some(run),
            phase: RunPhase::FileSelected,
            status: StatusMessage::preprocessing(),
            file_name: Some(file_name.into()),
            ..Self::default()
        }
    }

    /// Start analysing the current preview. Results of earlier runs are cleared
    /// and the state counts as busy until the run finishes.
    pub fn begin_run(self, run: RunId) -> Self {
        Self {
            run: Some(run),
            phase: RunPhase::Recognizing,
            status: StatusMessage::recognizing(),
            text: RecognizedText::default(),
            recognition_error: None,
            predictions: PredictionList::default(),
            classifier_not_loaded: false,
            classification_error: None,
            ..self
        }
    }

    pub fn apply(self, event: PipelineEvent) -> Self {
        if self.run != Some(event.run) {
            trace!("Dropping event from superseded run {}", event.run);
            return self;
        }

        match event.kind {
            EventKind::Entered(phase) => {
                let status = match phase {
                    RunPhase::Recognizing => StatusMessage::recognizing(),
                    RunPhase::Classifying => StatusMessage::classifying(),
                    _ => self.status.clone(),
                };
                Self { phase, status, ..self }
            }
            EventKind::Progress { phase, fraction } => Self {
                status: StatusMessage::progress(&phase, fraction),
                ..self
            },
            EventKind::PreviewReady(acquired) => Self {
                phase: RunPhase::PreviewReady,
                status: StatusMessage::preview_ready(),
                acquired: Some(acquired),
                ..self
            },
            EventKind::Recognized(RecognitionOutcome::Text(text)) => Self {
                text,
                recognition_error: None,
                ..self
            },
            EventKind::Recognized(RecognitionOutcome::Failed(message)) => Self {
                text: RecognizedText::default(),
                recognition_error: Some(message),
                ..self
            },
            EventKind::Classified(ClassificationOutcome::Ranked(predictions)) => Self {
                predictions,
                ..self
            },
            EventKind::Classified(ClassificationOutcome::NotLoaded) => Self {
                predictions: PredictionList::default(),
                classifier_not_loaded: true,
                ..self
            },
            EventKind::Classified(ClassificationOutcome::Failed(message)) => Self {
                predictions: PredictionList::default(),
                classification_error: Some(message),
                ..self
            },
            EventKind::Finished { phase, status } => Self { phase, status, ..self },
        }
    }

    /// A preview exists and nothing is running
    pub fn can_analyze(&self) -> bool {
        self.acquired.is_some() && !self.phase.is_busy()
    }

    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }
}
