use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one end-to-end analysis run.
///
/// Every event the pipeline emits carries the id of the run that produced it,
/// so results arriving from an abandoned run can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first block is plenty to tell runs apart in logs
        let id = self.0.simple().to_string();
        f.write_str(&id[..8])
    }
}

/// OCR languages offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "eng")]
    English,
    #[serde(rename = "spa")]
    Spanish,
    #[serde(rename = "fra")]
    French,
    #[serde(rename = "deu")]
    German,
    #[serde(rename = "ita")]
    Italian,
    #[serde(rename = "vie")]
    Vietnamese,
    #[serde(rename = "jpn")]
    Japanese,
    #[serde(rename = "chi_sim")]
    SimplifiedChinese,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::English,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Italian,
        Language::Vietnamese,
        Language::Japanese,
        Language::SimplifiedChinese,
    ];

    /// Language code used to look up recognition models
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "eng",
            Language::Spanish => "spa",
            Language::French => "fra",
            Language::German => "deu",
            Language::Italian => "ita",
            Language::Vietnamese => "vie",
            Language::Japanese => "jpn",
            Language::SimplifiedChinese => "chi_sim",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
            Language::Italian => "Italian",
            Language::Vietnamese => "Vietnamese",
            Language::Japanese => "Japanese",
            Language::SimplifiedChinese => "Simplified Chinese",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = String;

    /// Accepts either the language code (`deu`) or its English name (`german`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Language::ALL
            .into_iter()
            .find(|lang| {
                lang.code().eq_ignore_ascii_case(wanted) || lang.name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| {
                let known: Vec<&str> = Language::ALL.iter().map(|l| l.code()).collect();
                format!("unknown language '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// Trimmed output of the OCR stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecognizedText(String);

impl RecognizedText {
    pub const NO_TEXT_MARKER: &'static str = "[no text found]";

    pub fn from_raw(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A single label assigned by the classifier
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    /// Probability in [0, 1]
    pub confidence: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// Confidence as a whole percentage, rounded half up
    pub fn percent(&self) -> u32 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

/// Top-ranked predictions, never longer than [`PredictionList::MAX_LEN`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionList(Vec<Prediction>);

impl PredictionList {
    pub const MAX_LEN: usize = 3;

    /// Sort descending by confidence and keep the top entries.
    /// Non-finite confidences are dropped.
    pub fn from_ranked(predictions: Vec<Prediction>) -> Self {
        let mut predictions: Vec<Prediction> = predictions
            .into_iter()
            .filter(|p| p.confidence.is_finite())
            .collect();
        predictions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        predictions.truncate(Self::MAX_LEN);
        Self(predictions)
    }

    pub fn as_slice(&self) -> &[Prediction] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Prediction> {
        self.0.iter()
    }
}

/// Human readable status line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusMessage(String);

impl StatusMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn choose_image() -> Self {
        Self::new("Choose an image…")
    }

    pub fn preprocessing() -> Self {
        Self::new("Preprocessing image…")
    }

    pub fn preview_ready() -> Self {
        Self::new("Preview ready. Press Analyze to start.")
    }

    pub fn recognizing() -> Self {
        Self::new("Recognizing text…")
    }

    /// `<phase> <percentage>%` with one decimal
    pub fn progress(phase: &str, fraction: f32) -> Self {
        let percent = fraction.clamp(0.0, 1.0) * 100.0;
        Self(format!("{} {:.1}%", phase, percent))
    }

    pub fn classifying() -> Self {
        Self::new("Classifying image…")
    }

    pub fn done() -> Self {
        Self::new("All done!")
    }

    pub fn done_without_classifier() -> Self {
        Self::new("All done! (classifier not yet loaded)")
    }

    pub fn finished_with_errors() -> Self {
        Self::new("Finished with errors")
    }

    pub fn decode_failed(message: &str) -> Self {
        Self(format!("Could not decode image: {}", message))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
