//! Recognition stage: submit an image to the OCR capability and assemble the
//! recognized lines into text.

pub mod ocrs_engine;

use image::DynamicImage;

use crate::config::{OcrOptions, PageSegmentation};
use crate::error::RecognitionError;
use crate::models::Language;

pub use ocrs_engine::OcrsRecognizer;

/// Receives progress notifications from a recognizer
pub trait ProgressObserver {
    /// `fraction` is in [0, 1]
    fn on_progress(&self, phase: &str, fraction: f32);
}

impl<F> ProgressObserver for F
where
    F: Fn(&str, f32),
{
    fn on_progress(&self, phase: &str, fraction: f32) {
        self(phase, fraction)
    }
}

/// Everything the OCR capability needs besides the image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecognitionRequest {
    pub language: Language,
    pub options: OcrOptions,
}

/// An OCR capability
pub trait TextRecognizer: Send + Sync {
    /// Recognize the text in `image`. The returned text is untrimmed.
    fn recognize(
        &self,
        image: &DynamicImage,
        request: &RecognitionRequest,
        progress: &dyn ProgressObserver,
    ) -> Result<String, RecognitionError>;
}

/// Assemble recognized lines according to the segmentation options
pub fn layout_text<S: AsRef<str>>(lines: &[S], options: &OcrOptions) -> String {
    let lines = lines.iter().map(|line| {
        let line = line.as_ref();
        if options.preserve_interword_spaces {
            line.to_string()
        } else {
            line.split_whitespace().collect::<Vec<_>>().join(" ")
        }
    });

    match options.page_segmentation {
        PageSegmentation::Auto => lines
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        PageSegmentation::SingleBlock => lines.collect::<Vec<_>>().join("\n"),
        PageSegmentation::SingleLine => lines
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    }
}
