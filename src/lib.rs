pub mod acquisition;
pub mod classification;
pub mod config;
pub mod error;
pub mod export;
#[cfg(feature = "gui")]
pub mod gui;
pub mod models;
pub mod pipeline;
pub mod presentation;
pub mod recognition;
pub mod state;

pub use models::{Language, Prediction, PredictionList, RecognizedText, RunId, StatusMessage};
pub use config::{AppConfig, FeatureFlags};
pub use classification::{ClassifierSlot, ImageClassifier, ModelState, RtenClassifier};
pub use recognition::{OcrsRecognizer, ProgressObserver, RecognitionRequest, TextRecognizer};
pub use pipeline::{
    AnalysisPipeline, ClassificationOutcome, EventKind, PipelineEvent, PipelineObserver,
    RecognitionOutcome, RunPhase, RunReport,
};
pub use state::AnalysisState;
