use std::io::Cursor;
use std::sync::{Arc, Mutex};

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use insight_ocr::classification::ImageClassifier;
use insight_ocr::error::{ClassificationError, ExportError, RecognitionError};
use insight_ocr::export::ClipboardSink;
use insight_ocr::models::Prediction;
use insight_ocr::pipeline::PipelineEvent;
use insight_ocr::recognition::{ProgressObserver, RecognitionRequest, TextRecognizer};
use tempfile::NamedTempFile;

/// Creates a 40x30 red test image and returns the temp file.
/// The file will be automatically cleaned up when dropped.
pub fn create_test_image() -> NamedTempFile {
    let img = ImageBuffer::from_fn(40, 30, |_, _| Rgb([255u8, 0u8, 0u8]));
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    img.save_with_format(file.path(), ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

/// PNG bytes of a uniform image
pub fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |_, _| Rgb(color)));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("Failed to encode test image");
    bytes
}

/// What a [`FakeRecognizer`] was asked to do
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizeCall {
    pub width: u32,
    pub height: u32,
    pub request: RecognitionRequest,
}

/// Recognizer returning a scripted result after reporting scripted progress
pub struct FakeRecognizer {
    result: Result<String, String>,
    progress: Vec<(&'static str, f32)>,
    pub calls: Mutex<Vec<RecognizeCall>>,
}

impl FakeRecognizer {
    pub fn returning(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            progress: vec![("recognizing text", 0.5), ("recognizing text", 1.0)],
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            progress: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecognizeCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl TextRecognizer for FakeRecognizer {
    fn recognize(
        &self,
        image: &DynamicImage,
        request: &RecognitionRequest,
        progress: &dyn ProgressObserver,
    ) -> Result<String, RecognitionError> {
        self.calls.lock().unwrap().push(RecognizeCall {
            width: image.width(),
            height: image.height(),
            request: *request,
        });
        for (phase, fraction) in &self.progress {
            progress.on_progress(phase, *fraction);
        }
        self.result.clone().map_err(RecognitionError::Engine)
    }
}

/// Classifier returning fixed scores
pub struct FakeClassifier {
    result: Result<Vec<Prediction>, String>,
}

impl FakeClassifier {
    pub fn with_scores(scores: &[(&str, f32)]) -> Arc<dyn ImageClassifier> {
        Arc::new(Self {
            result: Ok(scores
                .iter()
                .map(|(label, confidence)| Prediction::new(*label, *confidence))
                .collect()),
        })
    }

    pub fn failing(message: &str) -> Arc<dyn ImageClassifier> {
        Arc::new(Self {
            result: Err(message.to_string()),
        })
    }
}

impl ImageClassifier for FakeClassifier {
    fn classify(&self, _image: &DynamicImage) -> Result<Vec<Prediction>, ClassificationError> {
        self.result.clone().map_err(ClassificationError::Inference)
    }
}

/// Default scores used by pipeline tests: five labels, deliberately unsorted
pub fn five_scores() -> Arc<dyn ImageClassifier> {
    FakeClassifier::with_scores(&[
        ("tabby", 0.05),
        ("envelope", 0.40),
        ("notebook", 0.25),
        ("menu", 0.20),
        ("web site", 0.10),
    ])
}

/// Collects every event it observes
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<PipelineEvent>>>,
}

impl EventLog {
    pub fn observer(&self) -> impl Fn(PipelineEvent) + Send + Sync + 'static {
        let events = self.events.clone();
        move |event| events.lock().unwrap().push(event)
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }
}

/// Clipboard that remembers the last write
#[derive(Default)]
pub struct RecordingClipboard {
    pub contents: Mutex<Option<String>>,
}

impl ClipboardSink for RecordingClipboard {
    fn write_text(&self, text: &str) -> Result<(), ExportError> {
        *self.contents.lock().unwrap() = Some(text.to_string());
        Ok(())
    }
}

/// Clipboard that rejects every write
pub struct FailingClipboard;

impl ClipboardSink for FailingClipboard {
    fn write_text(&self, _text: &str) -> Result<(), ExportError> {
        Err(ExportError::Clipboard("denied".to_string()))
    }
}
