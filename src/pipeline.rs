use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::acquisition::{self, Acquired, SelectedFile};
use crate::classification::{ClassifierSlot, ModelState};
use crate::config::{AppConfig, OcrOptions, PreprocessConfig, RecognitionSource};
use crate::error::AcquisitionError;
use crate::models::{Language, PredictionList, RecognizedText, RunId, StatusMessage};
use crate::recognition::{RecognitionRequest, TextRecognizer};

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    FileSelected,
    PreviewReady,
    Recognizing,
    Classifying,
    Done,
    Error,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Error)
    }

    pub fn is_busy(self) -> bool {
        matches!(
            self,
            RunPhase::FileSelected | RunPhase::Recognizing | RunPhase::Classifying
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionOutcome {
    Text(RecognizedText),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationOutcome {
    Ranked(PredictionList),
    /// The classifier was still loading; not an error
    NotLoaded,
    Failed(String),
}

#[derive(Debug, Clone)]
pub enum EventKind {
    /// A stage started
    Entered(RunPhase),
    /// Recognizer progress notification
    Progress { phase: String, fraction: f32 },
    PreviewReady(Acquired),
    Recognized(RecognitionOutcome),
    Classified(ClassificationOutcome),
    /// Terminal event, always the last one of a run
    Finished { phase: RunPhase, status: StatusMessage },
}

/// Something that happened during a run, tagged with the run that caused it
#[derive(Debug, Clone)]
pub struct PipelineEvent {
    pub run: RunId,
    pub kind: EventKind,
}

impl PipelineEvent {
    pub fn new(run: RunId, kind: EventKind) -> Self {
        Self { run, kind }
    }
}

/// Receives pipeline events as they happen
pub trait PipelineObserver {
    fn on_event(&self, event: PipelineEvent);
}

impl<F> PipelineObserver for F
where
    F: Fn(PipelineEvent),
{
    fn on_event(&self, event: PipelineEvent) {
        self(event)
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Settings shared by every run
#[derive(Clone, Debug, Default)]
pub struct PipelineContext {
    pub preprocess: PreprocessConfig,
    pub source: RecognitionSource,
    pub options: OcrOptions,
    pub debug: Option<DebugConfig>,
}

/// Summary of one finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run: RunId,
    pub recognition: Option<RecognitionOutcome>,
    pub classification: Option<ClassificationOutcome>,
    pub phase: RunPhase,
    pub status: StatusMessage,
}

/// Acquisition, recognition and classification, run strictly in sequence
pub struct AnalysisPipeline {
    recognizer: Arc<dyn TextRecognizer>,
    classifier: ClassifierSlot,
    context: PipelineContext,
}

impl AnalysisPipeline {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, classifier: ClassifierSlot) -> Self {
        Self {
            recognizer,
            classifier,
            context: PipelineContext::default(),
        }
    }

    pub fn from_config(
        config: &AppConfig,
        recognizer: Arc<dyn TextRecognizer>,
        classifier: ClassifierSlot,
    ) -> Self {
        Self::new(recognizer, classifier)
            .with_preprocess(config.preprocess.clone())
            .with_source(config.recognition.source)
            .with_options(config.recognition.options)
    }

    pub fn with_preprocess(mut self, preprocess: PreprocessConfig) -> Self {
        self.context.preprocess = preprocess;
        self
    }

    pub fn with_source(mut self, source: RecognitionSource) -> Self {
        self.context.source = source;
        self
    }

    pub fn with_options(mut self, options: OcrOptions) -> Self {
        self.context.options = options;
        self
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn classifier(&self) -> &ClassifierSlot {
        &self.classifier
    }

    /// Read a file from disk and acquire it
    pub fn open_and_acquire(
        &self,
        run: RunId,
        path: &Path,
        observer: &dyn PipelineObserver,
    ) -> Result<Acquired, AcquisitionError> {
        let file = SelectedFile::open(path);
        match file {
            Ok(file) => self.acquire(run, &file, observer),
            Err(e) => {
                finish_failed_acquisition(run, &e, observer);
                Err(e)
            }
        }
    }

    /// Decode the file and render the preview raster.
    /// On failure the run is finished with an `Error` event.
    pub fn acquire(
        &self,
        run: RunId,
        file: &SelectedFile,
        observer: &dyn PipelineObserver,
    ) -> Result<Acquired, AcquisitionError> {
        info!("[{}] Acquiring {}", run, file.display_name());
        match acquisition::acquire(file, &self.context.preprocess) {
            Ok(acquired) => {
                debug!(
                    "[{}] Preview {}x{} from {}x{}",
                    run,
                    acquired.preview.width(),
                    acquired.preview.height(),
                    acquired.decoded.width(),
                    acquired.decoded.height()
                );
                if let Err(e) = self.save_debug_output(&acquired) {
                    warn!("[{}] Could not save debug output: {}", run, e);
                }
                observer.on_event(PipelineEvent::new(run, EventKind::PreviewReady(acquired.clone())));
                Ok(acquired)
            }
            Err(e) => {
                finish_failed_acquisition(run, &e, observer);
                Err(e)
            }
        }
    }

    /// Run recognition then classification on an acquired image.
    /// Every stage is guarded, and the run always ends with a `Finished` event.
    pub fn analyze(
        &self,
        run: RunId,
        acquired: &Acquired,
        language: Language,
        observer: &dyn PipelineObserver,
    ) -> RunReport {
        let start = Instant::now();

        let recognition = self.recognize(run, acquired, language, observer);
        observer.on_event(PipelineEvent::new(run, EventKind::Recognized(recognition.clone())));

        let classification = self.classify(run, acquired.decoded.image(), observer);
        observer.on_event(PipelineEvent::new(run, EventKind::Classified(classification.clone())));

        let (phase, status) = match (&recognition, &classification) {
            (RecognitionOutcome::Failed(_), _) | (_, ClassificationOutcome::Failed(_)) => {
                (RunPhase::Error, StatusMessage::finished_with_errors())
            }
            (_, ClassificationOutcome::NotLoaded) => (RunPhase::Done, StatusMessage::done_without_classifier()),
            _ => (RunPhase::Done, StatusMessage::done()),
        };

        info!("[{}] {} in {:?}", run, status, start.elapsed());
        observer.on_event(PipelineEvent::new(
            run,
            EventKind::Finished {
                phase,
                status: status.clone(),
            },
        ));

        RunReport {
            run,
            recognition: Some(recognition),
            classification: Some(classification),
            phase,
            status,
        }
    }

    /// Acquire and analyze in one go, for the single-trigger flow
    pub fn run(
        &self,
        run: RunId,
        file: &SelectedFile,
        language: Language,
        observer: &dyn PipelineObserver,
    ) -> RunReport {
        match self.acquire(run, file, observer) {
            Ok(acquired) => self.analyze(run, &acquired, language, observer),
            Err(e) => RunReport {
                run,
                recognition: None,
                classification: None,
                phase: RunPhase::Error,
                status: StatusMessage::decode_failed(&e.to_string()),
            },
        }
    }

    fn recognize(
        &self,
        run: RunId,
        acquired: &Acquired,
        language: Language,
        observer: &dyn PipelineObserver,
    ) -> RecognitionOutcome {
        observer.on_event(PipelineEvent::new(run, EventKind::Entered(RunPhase::Recognizing)));

        let source_image;
        let image: &DynamicImage = match self.context.source {
            RecognitionSource::Preview => {
                source_image = acquired.preview.to_image();
                &source_image
            }
            RecognitionSource::Original => acquired.decoded.image(),
        };

        let request = RecognitionRequest {
            language,
            options: self.context.options,
        };
        let progress = |phase: &str, fraction: f32| {
            observer.on_event(PipelineEvent::new(
                run,
                EventKind::Progress {
                    phase: phase.to_string(),
                    fraction: fraction.clamp(0.0, 1.0),
                },
            ));
        };

        match self.recognizer.recognize(image, &request, &progress) {
            Ok(raw) => {
                let text = RecognizedText::from_raw(&raw);
                info!("[{}] Recognized {} characters", run, text.as_str().chars().count());
                RecognitionOutcome::Text(text)
            }
            Err(e) => {
                warn!("[{}] OCR failed: {}", run, e);
                RecognitionOutcome::Failed(e.to_string())
            }
        }
    }

    fn classify(&self, run: RunId, image: &DynamicImage, observer: &dyn PipelineObserver) -> ClassificationOutcome {
        match self.classifier.state() {
            ModelState::Loading => {
                info!("[{}] Classifier not yet loaded, skipping classification", run);
                ClassificationOutcome::NotLoaded
            }
            ModelState::Failed(message) => ClassificationOutcome::Failed(message),
            ModelState::Ready(classifier) => {
                observer.on_event(PipelineEvent::new(run, EventKind::Entered(RunPhase::Classifying)));
                match classifier.classify(image) {
                    Ok(ranked) => {
                        let predictions = PredictionList::from_ranked(ranked);
                        debug!("[{}] Top predictions: {:?}", run, predictions);
                        ClassificationOutcome::Ranked(predictions)
                    }
                    Err(e) => {
                        warn!("[{}] Classification failed: {}", run, e);
                        ClassificationOutcome::Failed(e.to_string())
                    }
                }
            }
        }
    }

    fn save_debug_output(&self, acquired: &Acquired) -> Result<()> {
        let Some(debug_config) = &self.context.debug else {
            return Ok(());
        };

        save_debug_image(&debug_config.output_dir, "00_input", acquired.decoded.image())?;
        save_debug_image(&debug_config.output_dir, "01_preview", &acquired.preview.to_image())?;
        Ok(())
    }
}

fn finish_failed_acquisition(run: RunId, error: &AcquisitionError, observer: &dyn PipelineObserver) {
    warn!("[{}] Acquisition failed: {}", run, error);
    observer.on_event(PipelineEvent::new(
        run,
        EventKind::Finished {
            phase: RunPhase::Error,
            status: StatusMessage::decode_failed(&error.to_string()),
        },
    ));
}

fn save_debug_image(root: &Path, step_dir_name: &str, image: &DynamicImage) -> Result<()> {
    let step_dir = root.join(step_dir_name);
    std::fs::create_dir_all(&step_dir)?;
    let output_path = step_dir.join("01.png");
    image
        .save(&output_path)
        .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
    debug!("Debug: saved {}/01.png", step_dir_name);
    Ok(())
}

