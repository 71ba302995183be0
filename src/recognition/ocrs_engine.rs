use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info};

use super::{ProgressObserver, RecognitionRequest, TextRecognizer, layout_text};
use crate::error::RecognitionError;
use crate::models::Language;

const DETECTION_MODEL: &str = "text-detection.rten";

/// OCR backed by the `ocrs` engine.
///
/// Detection is shared by all languages; each language needs its own
/// recognition model (`text-recognition.rten` for English,
/// `text-recognition-<code>.rten` otherwise) and optionally an
/// `alphabet-<code>.txt` listing the characters that model emits.
pub struct OcrsRecognizer {
    model_dir: PathBuf,
    // Engines are built on first use per language and reused afterwards
    engines: Mutex<HashMap<Language, Arc<OcrEngine>>>,
}

impl OcrsRecognizer {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            engines: Mutex::new(HashMap::new()),
        }
    }

    /// Use `model_dir` if given, otherwise the ocrs cache (`~/.cache/ocrs`)
    pub fn from_config(model_dir: Option<&Path>) -> Self {
        let dir = model_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(default_model_dir);
        Self::new(dir)
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    fn recognition_model_path(&self, language: Language) -> PathBuf {
        match language {
            Language::English => self.model_dir.join("text-recognition.rten"),
            other => self
                .model_dir
                .join(format!("text-recognition-{}.rten", other.code())),
        }
    }

    fn engine_for(&self, language: Language) -> Result<Arc<OcrEngine>, RecognitionError> {
        let mut engines = self.engines.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(engine) = engines.get(&language) {
            return Ok(engine.clone());
        }

        let detection_path = self.model_dir.join(DETECTION_MODEL);
        let recognition_path = self.recognition_model_path(language);

        if !detection_path.exists() {
            return Err(RecognitionError::ModelsMissing {
                expected: vec![detection_path, recognition_path],
            });
        }
        if !recognition_path.exists() {
            return Err(match language {
                Language::English => RecognitionError::ModelsMissing {
                    expected: vec![recognition_path],
                },
                other => RecognitionError::LanguageUnavailable(other),
            });
        }

        info!("Initializing OCR engine for {}", language);
        let detection_model = Model::load_file(&detection_path)
            .map_err(|e| RecognitionError::ModelLoad(format!("{}: {}", detection_path.display(), e)))?;
        let recognition_model = Model::load_file(&recognition_path)
            .map_err(|e| RecognitionError::ModelLoad(format!("{}: {}", recognition_path.display(), e)))?;

        let mut params = OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        };
        let alphabet_path = self.model_dir.join(format!("alphabet-{}.txt", language.code()));
        if alphabet_path.exists() {
            let alphabet = std::fs::read_to_string(&alphabet_path)
                .map_err(|e| RecognitionError::ModelLoad(format!("{}: {}", alphabet_path.display(), e)))?;
            params.alphabet = Some(alphabet.trim_end_matches(['\n', '\r']).to_string());
        }

        let engine = Arc::new(OcrEngine::new(params).map_err(|e| RecognitionError::ModelLoad(e.to_string()))?);
        info!("OCR engine for {} initialized", language);
        engines.insert(language, engine.clone());
        Ok(engine)
    }
}

impl TextRecognizer for OcrsRecognizer {
    fn recognize(
        &self,
        image: &DynamicImage,
        request: &RecognitionRequest,
        progress: &dyn ProgressObserver,
    ) -> Result<String, RecognitionError> {
        progress.on_progress("loading language model", 0.0);
        let engine = self.engine_for(request.language)?;

        progress.on_progress("preparing image", 0.1);
        let rgb = image.to_rgb8();
        let img_source = ImageSource::from_bytes(rgb.as_raw(), rgb.dimensions())
            .map_err(|e| RecognitionError::Engine(e.to_string()))?;
        let ocr_input = engine
            .prepare_input(img_source)
            .map_err(|e| RecognitionError::Engine(e.to_string()))?;

        progress.on_progress("detecting words", 0.25);
        let word_rects = engine
            .detect_words(&ocr_input)
            .map_err(|e| RecognitionError::Engine(e.to_string()))?;

        progress.on_progress("finding text lines", 0.5);
        let line_rects = engine.find_text_lines(&ocr_input, &word_rects);
        debug!("{} words in {} lines", word_rects.len(), line_rects.len());

        progress.on_progress("recognizing text", 0.6);
        let line_texts = engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| RecognitionError::Engine(e.to_string()))?;

        let lines: Vec<String> = line_texts
            .iter()
            .filter_map(|line| line.as_ref().map(|l| l.to_string()))
            .collect();
        progress.on_progress("recognizing text", 1.0);

        Ok(layout_text(&lines, &request.options))
    }
}

fn default_model_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".cache").join("ocrs"))
        .unwrap_or_else(|| PathBuf::from(".cache/ocrs"))
}
