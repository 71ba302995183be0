mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from insight_ocr for tests
pub use insight_ocr::acquisition::{Acquired, SelectedFile};
pub use insight_ocr::config::{AppConfig, FeatureFlags, OcrOptions, PageSegmentation, RecognitionSource};
pub use insight_ocr::{
    AnalysisPipeline, AnalysisState, ClassificationOutcome, ClassifierSlot, EventKind, ImageClassifier, Language,
    ModelState, PipelineEvent, Prediction, RecognitionOutcome, RunId, RunPhase, StatusMessage,
};
