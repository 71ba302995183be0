use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use insight_ocr::acquisition::SelectedFile;
use insight_ocr::config::{self, AppConfig};
use insight_ocr::export::{self, Acknowledgement, SystemClipboard};
use insight_ocr::presentation;
use insight_ocr::{
    AnalysisPipeline, AnalysisState, ClassifierSlot, EventKind, ImageClassifier, Language,
    OcrsRecognizer, PipelineEvent, RtenClassifier, RunId, RunPhase,
};

#[derive(Parser)]
#[command(name = "insight-ocr")]
#[command(about = "Read the text in an image and classify what it shows")]
struct Cli {
    /// Path to input image file (omit to open the GUI)
    #[arg(value_name = "IMAGE")]
    image_path: Option<PathBuf>,

    /// OCR language, as a code (eng, deu, chi_sim, ...) or a name
    #[arg(short, long, value_name = "LANG")]
    lang: Option<Language>,

    /// Config file to use instead of the default location
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Save the recognized text into this directory
    #[arg(long, value_name = "DIR")]
    download: Option<PathBuf>,

    /// Copy the recognized text to the clipboard
    #[arg(long)]
    copy: bool,

    /// Don't wait for the classifier to finish loading
    #[arg(long)]
    no_wait: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Open the graphical interface
    #[arg(long)]
    gui: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let default_filter = if args.verbose {
        "insight_ocr=debug"
    } else {
        "insight_ocr=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = config::load_or_default(args.config.as_deref())?;
    if let Some(lang) = args.lang {
        config.recognition.language = lang;
    }

    if args.print_config {
        print!("{}", config::to_toml(&config)?);
        return Ok(());
    }

    match args.image_path.clone() {
        Some(image_path) if !args.gui => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_cli(&args, image_path, config))
        }
        _ => run_gui(config),
    }
}

#[cfg(feature = "gui")]
fn run_gui(config: AppConfig) -> Result<()> {
    insight_ocr::gui::run(config)?;
    Ok(())
}

#[cfg(not(feature = "gui"))]
fn run_gui(_config: AppConfig) -> Result<()> {
    anyhow::bail!("No image given and this build has no GUI. Usage: insight-ocr <IMAGE>")
}

async fn run_cli(args: &Cli, image_path: PathBuf, config: AppConfig) -> Result<()> {
    // Start loading the classifier right away; decoding and OCR don't need it
    let classifier = ClassifierSlot::loading();
    let classification_config = config.classification.clone();
    classifier.spawn_preload(move || {
        let model = RtenClassifier::from_config(&classification_config)?;
        Ok(Arc::new(model) as Arc<dyn ImageClassifier>)
    });

    let recognizer = Arc::new(OcrsRecognizer::from_config(config.recognition.model_dir.as_deref()));
    let mut pipeline = AnalysisPipeline::from_config(&config, recognizer, classifier.clone());
    if let Some(debug_dir) = args.debug_out.clone() {
        pipeline = pipeline.with_debug(debug_dir)?;
    }
    let pipeline = Arc::new(pipeline);

    let file = SelectedFile::open(&image_path)?;
    let run = RunId::new();
    let language = config.recognition.language;
    info!("Loading image: {}", image_path.display());

    let state = Arc::new(Mutex::new(
        AnalysisState::default().select_file(run, file.display_name()),
    ));

    let acquired = {
        let pipeline = pipeline.clone();
        let observer = fold_into(state.clone());
        tokio::task::spawn_blocking(move || pipeline.acquire(run, &file, &observer)).await?
    };
    let Ok(acquired) = acquired else {
        let state = snapshot(&state);
        anyhow::bail!("{}", state.status);
    };

    if !args.no_wait && classifier.state().is_loading() {
        info!("Waiting for the classifier to load...");
        classifier.settled().await;
    }

    {
        let pipeline = pipeline.clone();
        let observer = fold_into(state.clone());
        tokio::task::spawn_blocking(move || pipeline.analyze(run, &acquired, language, &observer))
            .await
            .context("analysis task failed")?;
    }

    let state = snapshot(&state);
    println!("\n{}", presentation::render_report(&state, &config.features));

    let actions = export::available_actions(&state.text, &config.features);
    if args.copy {
        let ack = if actions.copy {
            Acknowledgement::from_copy(export::copy_text(&SystemClipboard, &state.text))
        } else {
            Acknowledgement::CopyFailed("there is no recognized text to export".to_string())
        };
        report_ack(&ack);
    }
    if let Some(dir) = &args.download {
        let ack = if actions.download {
            Acknowledgement::from_save(export::download_to_dir(dir, &config.export.file_name, &state.text))
        } else {
            Acknowledgement::SaveFailed("there is no recognized text to export".to_string())
        };
        report_ack(&ack);
    }

    if state.phase == RunPhase::Error {
        anyhow::bail!("analysis finished with errors");
    }
    Ok(())
}

/// Observer that folds every event into the shared state and logs status changes
fn fold_into(state: Arc<Mutex<AnalysisState>>) -> impl Fn(PipelineEvent) + Send + 'static {
    move |event: PipelineEvent| {
        let is_progress = matches!(event.kind, EventKind::Progress { .. });
        let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
        let before = guard.status.clone();
        let current = std::mem::take(&mut *guard);
        *guard = current.apply(event);
        if guard.status != before {
            if is_progress {
                tracing::debug!("{}", guard.status);
            } else {
                info!("{}", guard.status);
            }
        }
    }
}

fn snapshot(state: &Arc<Mutex<AnalysisState>>) -> AnalysisState {
    state.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

fn report_ack(ack: &Acknowledgement) {
    if ack.is_success() {
        info!("{}", ack.message());
    } else {
        warn!("{}", ack.message());
    }
}
