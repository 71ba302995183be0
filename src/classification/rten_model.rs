use std::path::{Path, PathBuf};

use image::DynamicImage;
use image::imageops::FilterType;
use rten::Model;
use rten_tensor::NdTensor;
use rten_tensor::prelude::*;
use tracing::debug;

use super::ImageClassifier;
use crate::config::{self, ClassificationConfig};
use crate::error::ClassificationError;
use crate::models::Prediction;

/// Square input edge expected by ImageNet classifiers such as MobileNet
const INPUT_SIZE: usize = 224;
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

pub const DEFAULT_MODEL_FILE: &str = "mobilenet.rten";
pub const DEFAULT_LABELS_FILE: &str = "imagenet-labels.txt";

/// ImageNet-style classifier run through `rten`
pub struct RtenClassifier {
    model: Model,
    labels: Vec<String>,
}

impl RtenClassifier {
    pub fn load(model_path: &Path, labels_path: &Path) -> Result<Self, ClassificationError> {
        let model = Model::load_file(model_path)
            .map_err(|e| ClassificationError::ModelLoad(format!("{}: {}", model_path.display(), e)))?;
        let labels = std::fs::read_to_string(labels_path)
            .map_err(|e| ClassificationError::ModelLoad(format!("{}: {}", labels_path.display(), e)))?;
        let labels = parse_labels(&labels);
        if labels.is_empty() {
            return Err(ClassificationError::ModelLoad(format!(
                "{} contains no labels",
                labels_path.display()
            )));
        }
        debug!("Classifier has {} labels", labels.len());
        Ok(Self { model, labels })
    }

    /// Resolve model and label paths from config, defaulting to the cache dir
    pub fn from_config(config: &ClassificationConfig) -> Result<Self, ClassificationError> {
        let (model_path, labels_path) = resolve_paths(config)?;
        Self::load(&model_path, &labels_path)
    }
}

pub fn resolve_paths(config: &ClassificationConfig) -> Result<(PathBuf, PathBuf), ClassificationError> {
    let model_path = match &config.model_path {
        Some(path) => path.clone(),
        None => config::default_cache_dir()
            .map_err(|e| ClassificationError::ModelLoad(e.to_string()))?
            .join(DEFAULT_MODEL_FILE),
    };
    let labels_path = match &config.labels_path {
        Some(path) => path.clone(),
        None => model_path.with_file_name(DEFAULT_LABELS_FILE),
    };
    Ok((model_path, labels_path))
}

impl ImageClassifier for RtenClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<Vec<Prediction>, ClassificationError> {
        let input = to_input_tensor(image);
        let output = self
            .model
            .run_one(input.view().into(), None)
            .map_err(|e| ClassificationError::Inference(e.to_string()))?;
        let scores = NdTensor::<f32, 2>::try_from(output)
            .map_err(|e| ClassificationError::Inference(format!("unexpected output: {:?}", e)))?;
        let scores: Vec<f32> = scores.iter().copied().collect();

        rank(&scores, &self.labels)
    }
}

/// Resize to the model input and normalise into NCHW
fn to_input_tensor(image: &DynamicImage) -> NdTensor<f32, 4> {
    let size = INPUT_SIZE as u32;
    let rgb = image.resize_exact(size, size, FilterType::Triangle).to_rgb8();

    let plane = INPUT_SIZE * INPUT_SIZE;
    let mut data = vec![0.0f32; 3 * plane];
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let offset = y as usize * INPUT_SIZE + x as usize;
        for c in 0..3 {
            data[c * plane + offset] = (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }

    NdTensor::from_data([1, 3, INPUT_SIZE, INPUT_SIZE], data)
}

/// Pair scores with labels and sort by descending probability.
/// Raw logits are soft-maxed; scores that already form a distribution are kept.
pub fn rank(scores: &[f32], labels: &[String]) -> Result<Vec<Prediction>, ClassificationError> {
    if scores.len() != labels.len() {
        return Err(ClassificationError::LabelMismatch {
            outputs: scores.len(),
            labels: labels.len(),
        });
    }

    let probabilities = if is_distribution(scores) {
        scores.to_vec()
    } else {
        softmax(scores)
    };

    let mut ranked: Vec<Prediction> = labels
        .iter()
        .zip(probabilities)
        .map(|(label, p)| Prediction::new(label.clone(), p))
        .collect();
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    Ok(ranked)
}

fn is_distribution(scores: &[f32]) -> bool {
    let sum: f32 = scores.iter().sum();
    scores.iter().all(|s| (0.0..=1.0).contains(s)) && (sum - 1.0).abs() < 1e-3
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// One label per line. ImageNet label files often list synonyms separated by
/// commas; only the first is kept.
pub fn parse_labels(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.split(',').next().unwrap_or(line).trim().to_string())
        .collect()
}
