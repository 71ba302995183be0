//! Turning analysis state into the strings shown to the user

use crate::config::FeatureFlags;
use crate::models::{Prediction, PredictionList, RecognizedText};
use crate::state::AnalysisState;

pub const CLASSIFIER_NOT_LOADED: &str = "Classifier not yet loaded.";

/// Content of the OCR result block
pub fn displayed_text(state: &AnalysisState, flags: &FeatureFlags) -> String {
    if let Some(error) = &state.recognition_error {
        return format!("OCR error: {}", error);
    }
    text_or_marker(&state.text, flags)
}

pub fn text_or_marker(text: &RecognizedText, flags: &FeatureFlags) -> String {
    if text.is_empty() && flags.empty_text_marker {
        RecognizedText::NO_TEXT_MARKER.to_string()
    } else {
        text.as_str().to_string()
    }
}

/// `<label> — <rounded percentage>%`
pub fn prediction_line(prediction: &Prediction) -> String {
    format!("{} — {}%", prediction.label, prediction.percent())
}

pub fn prediction_lines(predictions: &PredictionList) -> Vec<String> {
    predictions.iter().map(prediction_line).collect()
}

/// What the predictions area shows: a message, or the ranked list
pub enum PredictionsView {
    Message(String),
    List(Vec<String>),
}

pub fn predictions_view(state: &AnalysisState) -> PredictionsView {
    if let Some(error) = &state.classification_error {
        PredictionsView::Message(format!("Classification error: {}", error))
    } else if state.classifier_not_loaded {
        PredictionsView::Message(CLASSIFIER_NOT_LOADED.to_string())
    } else {
        PredictionsView::List(prediction_lines(&state.predictions))
    }
}

/// Plain-text report used by the command line
pub fn render_report(state: &AnalysisState, flags: &FeatureFlags) -> String {
    let mut out = String::new();
    out.push_str("=== OCR Result ===\n");
    out.push_str(&displayed_text(state, flags));
    out.push_str("\n\n=== Top 3 Predictions ===\n");
    match predictions_view(state) {
        PredictionsView::Message(message) => {
            out.push_str(&message);
            out.push('\n');
        }
        PredictionsView::List(lines) if lines.is_empty() => out.push_str("(none)\n"),
        PredictionsView::List(lines) => {
            for line in lines {
                out.push_str("  • ");
                out.push_str(&line);
                out.push('\n');
            }
        }
    }
    out.push_str("\nStatus: ");
    out.push_str(state.status.as_str());
    out.push('\n');
    out
}
