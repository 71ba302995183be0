//! Integration tests for the analysis pipeline.
//!
//! Tests cover:
//! - Event order of a complete run
//! - Top-3 ranking of classifier output
//! - Classifier still loading or failed to load
//! - OCR failures not stopping classification
//! - Which raster is handed to the recognizer
//! - Decode failures and debug output

mod common;

use std::sync::Arc;

use insight_ocr::config::{FilterConfig, PreprocessConfig};
use insight_ocr::error::ClassificationError;
use insight_ocr::presentation;

use common::*;

fn pipeline_with(recognizer: Arc<FakeRecognizer>, slot: ClassifierSlot) -> AnalysisPipeline {
    AnalysisPipeline::new(recognizer, slot)
}

fn acquire(pipeline: &AnalysisPipeline, run: RunId, log: &EventLog) -> Acquired {
    let file = SelectedFile::from_bytes(png_bytes(40, 30, [200, 200, 200]));
    pipeline
        .acquire(run, &file, &log.observer())
        .expect("test image should decode")
}

#[test]
fn test_full_run_emits_events_in_order() {
    let recognizer = Arc::new(FakeRecognizer::returning("  Hello World \n"));
    let pipeline = pipeline_with(recognizer, ClassifierSlot::ready(five_scores()));
    let log = EventLog::default();
    let run = RunId::new();

    let acquired = acquire(&pipeline, run, &log);
    let report = pipeline.analyze(run, &acquired, Language::English, &log.observer());

    let kinds: Vec<&'static str> = log
        .events()
        .iter()
        .map(|event| match &event.kind {
            EventKind::PreviewReady(_) => "preview",
            EventKind::Entered(RunPhase::Recognizing) => "recognizing",
            EventKind::Entered(RunPhase::Classifying) => "classifying",
            EventKind::Entered(_) => "entered",
            EventKind::Progress { .. } => "progress",
            EventKind::Recognized(_) => "recognized",
            EventKind::Classified(_) => "classified",
            EventKind::Finished { .. } => "finished",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "preview",
            "recognizing",
            "progress",
            "progress",
            "recognized",
            "classifying",
            "classified",
            "finished"
        ]
    );
    assert!(log.events().iter().all(|event| event.run == run));

    assert_eq!(report.phase, RunPhase::Done);
    assert_eq!(report.status, StatusMessage::done());
    match report.recognition {
        Some(RecognitionOutcome::Text(text)) => assert_eq!(text.as_str(), "Hello World"),
        other => panic!("unexpected recognition outcome: {:?}", other),
    }
}

#[test]
fn test_predictions_are_top_three_sorted() {
    let recognizer = Arc::new(FakeRecognizer::returning("menu"));
    let pipeline = pipeline_with(recognizer, ClassifierSlot::ready(five_scores()));
    let log = EventLog::default();
    let run = RunId::new();

    let acquired = acquire(&pipeline, run, &log);
    let report = pipeline.analyze(run, &acquired, Language::English, &log.observer());

    let Some(ClassificationOutcome::Ranked(predictions)) = report.classification else {
        panic!("expected ranked predictions");
    };
    let labels: Vec<&str> = predictions.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, vec!["envelope", "notebook", "menu"]);

    let lines = presentation::prediction_lines(&predictions);
    assert_eq!(lines[0], "envelope — 40%");
    assert_eq!(lines[2], "menu — 20%");
}

#[test]
fn test_classifier_not_loaded_is_not_an_error() {
    let recognizer = Arc::new(FakeRecognizer::returning("receipt"));
    let pipeline = pipeline_with(recognizer, ClassifierSlot::loading());
    let log = EventLog::default();
    let run = RunId::new();

    let acquired = acquire(&pipeline, run, &log);
    let report = pipeline.analyze(run, &acquired, Language::English, &log.observer());

    assert_eq!(report.classification, Some(ClassificationOutcome::NotLoaded));
    assert_eq!(report.phase, RunPhase::Done);
    assert_eq!(report.status.as_str(), "All done! (classifier not yet loaded)");
    assert!(
        !log.events()
            .iter()
            .any(|event| matches!(event.kind, EventKind::Entered(RunPhase::Classifying)))
    );
}

#[test]
fn test_classifier_load_failure_finishes_with_errors() {
    let recognizer = Arc::new(FakeRecognizer::returning("receipt"));
    let slot = ClassifierSlot::loading();
    slot.set_failed("mobilenet.rten not found");
    let pipeline = pipeline_with(recognizer, slot);
    let log = EventLog::default();
    let run = RunId::new();

    let acquired = acquire(&pipeline, run, &log);
    let report = pipeline.analyze(run, &acquired, Language::English, &log.observer());

    match report.classification {
        Some(ClassificationOutcome::Failed(message)) => {
            assert!(message.contains("mobilenet.rten not found"))
        }
        other => panic!("unexpected classification outcome: {:?}", other),
    }
    assert_eq!(report.phase, RunPhase::Error);
    assert_eq!(report.status, StatusMessage::finished_with_errors());
}

#[test]
fn test_load_failure_message_is_not_prefixed_twice() {
    let slot = ClassifierSlot::loading();
    let error = ClassificationError::ModelLoad("/x/mobilenet.rten: not found".to_string());
    slot.set_failed(error.to_string());
    let pipeline = pipeline_with(Arc::new(FakeRecognizer::returning("receipt")), slot);
    let log = EventLog::default();
    let run = RunId::new();

    let acquired = acquire(&pipeline, run, &log);
    let report = pipeline.analyze(run, &acquired, Language::English, &log.observer());

    assert_eq!(
        report.classification,
        Some(ClassificationOutcome::Failed(
            "model failed to load: /x/mobilenet.rten: not found".to_string()
        ))
    );
}

#[test]
fn test_ocr_error_display() {
    let pipeline = pipeline_with(
        Arc::new(FakeRecognizer::failing("engine crashed")),
        ClassifierSlot::loading(),
    );
    let log = EventLog::default();
    let run = RunId::new();

    let acquired = acquire(&pipeline, run, &log);
    pipeline.analyze(run, &acquired, Language::English, &log.observer());

    let state = log
        .events()
        .into_iter()
        .fold(AnalysisState::default().select_file(run, "scan.png"), AnalysisState::apply);
    assert_eq!(
        presentation::displayed_text(&state, &FeatureFlags::default()),
        "OCR error: engine crashed"
    );
}

#[test]
fn test_ocr_failure_still_classifies() {
    let recognizer = Arc::new(FakeRecognizer::failing("engine crashed"));
    let pipeline = pipeline_with(recognizer, ClassifierSlot::ready(five_scores()));
    let log = EventLog::default();
    let run = RunId::new();

    let acquired = acquire(&pipeline, run, &log);
    let report = pipeline.analyze(run, &acquired, Language::English, &log.observer());

    assert!(matches!(report.recognition, Some(RecognitionOutcome::Failed(_))));
    assert!(matches!(report.classification, Some(ClassificationOutcome::Ranked(_))));
    assert_eq!(report.phase, RunPhase::Error);
    assert_eq!(report.status.as_str(), "Finished with errors");
}

#[test]
fn test_classifier_inference_failure() {
    let recognizer = Arc::new(FakeRecognizer::returning("text"));
    let slot = ClassifierSlot::ready(FakeClassifier::failing("bad tensor"));
    let pipeline = pipeline_with(recognizer, slot);
    let log = EventLog::default();
    let run = RunId::new();

    let acquired = acquire(&pipeline, run, &log);
    let report = pipeline.analyze(run, &acquired, Language::English, &log.observer());

    assert!(matches!(report.classification, Some(ClassificationOutcome::Failed(_))));
    assert_eq!(report.phase, RunPhase::Error);
}

#[test]
fn test_recognizer_receives_upscaled_preview() {
    let recognizer = Arc::new(FakeRecognizer::returning("x"));
    let pipeline = pipeline_with(recognizer.clone(), ClassifierSlot::loading());
    let log = EventLog::default();
    let run = RunId::new();

    let acquired = acquire(&pipeline, run, &log);
    pipeline.analyze(run, &acquired, Language::German, &log.observer());

    let calls = recognizer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!((calls[0].width, calls[0].height), (80, 60));
    assert_eq!(calls[0].request.language, Language::German);
}

#[test]
fn test_recognizer_can_receive_original_image() {
    let recognizer = Arc::new(FakeRecognizer::returning("x"));
    let options = OcrOptions {
        page_segmentation: PageSegmentation::Auto,
        preserve_interword_spaces: false,
    };
    let pipeline = pipeline_with(recognizer.clone(), ClassifierSlot::loading())
        .with_source(RecognitionSource::Original)
        .with_options(options);
    let log = EventLog::default();
    let run = RunId::new();

    let acquired = acquire(&pipeline, run, &log);
    pipeline.analyze(run, &acquired, Language::English, &log.observer());

    let calls = recognizer.calls();
    assert_eq!((calls[0].width, calls[0].height), (40, 30));
    assert_eq!(calls[0].request.options, options);
}

#[test]
fn test_decode_failure_finishes_run() {
    let recognizer = Arc::new(FakeRecognizer::returning("never"));
    let pipeline = pipeline_with(recognizer.clone(), ClassifierSlot::loading());
    let log = EventLog::default();
    let run = RunId::new();

    let file = SelectedFile::from_bytes(b"definitely not an image".to_vec());
    let report = pipeline.run(run, &file, Language::English, &log.observer());

    assert_eq!(report.phase, RunPhase::Error);
    assert!(report.status.as_str().starts_with("Could not decode image:"));
    assert!(report.recognition.is_none());
    assert!(recognizer.calls().is_empty());

    let events = log.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0].kind,
        EventKind::Finished {
            phase: RunPhase::Error,
            ..
        }
    ));
}

#[test]
fn test_open_missing_file_finishes_run() {
    let pipeline = pipeline_with(
        Arc::new(FakeRecognizer::returning("never")),
        ClassifierSlot::loading(),
    );
    let log = EventLog::default();
    let dir = tempfile::TempDir::new().unwrap();

    let result = pipeline.open_and_acquire(RunId::new(), &dir.path().join("missing.png"), &log.observer());

    assert!(result.is_err());
    assert_eq!(log.events().len(), 1);
}

#[test]
fn test_unfiltered_preview_keeps_colors() {
    let pipeline = pipeline_with(
        Arc::new(FakeRecognizer::returning("")),
        ClassifierSlot::loading(),
    )
    .with_preprocess(PreprocessConfig { filter: None });
    let log = EventLog::default();

    let acquired = acquire(&pipeline, RunId::new(), &log);
    let pixel = acquired.preview.raster().get_pixel(10, 10);
    assert!(pixel.0[..3].iter().all(|&c| c.abs_diff(200) <= 1));
    assert_eq!(pixel.0[3], 255);

    let filtered = pipeline_with(
        Arc::new(FakeRecognizer::returning("")),
        ClassifierSlot::loading(),
    )
    .with_preprocess(PreprocessConfig {
        filter: Some(FilterConfig::default()),
    });
    let acquired = acquire(&filtered, RunId::new(), &log);
    assert_eq!(acquired.preview.raster().get_pixel(10, 10).0, [255, 255, 255, 255]);
}

#[test]
fn test_debug_output_written() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let pipeline = pipeline_with(
        Arc::new(FakeRecognizer::returning("")),
        ClassifierSlot::loading(),
    )
    .with_debug(dir.path().to_path_buf())?;
    let log = EventLog::default();

    acquire(&pipeline, RunId::new(), &log);

    assert!(dir.path().join("00_input").join("01.png").exists());
    assert!(dir.path().join("01_preview").join("01.png").exists());
    Ok(())
}

#[test]
fn test_debug_dir_must_be_empty() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    std::fs::write(dir.path().join("leftover.txt"), "x")?;

    let result = pipeline_with(
        Arc::new(FakeRecognizer::returning("")),
        ClassifierSlot::loading(),
    )
    .with_debug(dir.path().to_path_buf());

    assert!(result.is_err());
    Ok(())
}

#[test]
fn test_from_config_uses_recognition_settings() {
    let mut config = AppConfig::default();
    config.recognition.source = RecognitionSource::Original;
    config.preprocess.filter = None;

    let pipeline = AnalysisPipeline::from_config(
        &config,
        Arc::new(FakeRecognizer::returning("")),
        ClassifierSlot::loading(),
    );

    assert_eq!(pipeline.context().source, RecognitionSource::Original);
    assert!(pipeline.context().preprocess.filter.is_none());
    assert!(pipeline.context().debug.is_none());
}
