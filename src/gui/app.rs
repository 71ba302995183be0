use std::path::PathBuf;
use std::sync::Arc;

use iced::{
    Alignment::Center,
    Element, Font, Length, Task,
    futures::channel::mpsc,
    widget::{button, column, container, image, pick_list, row, scrollable, text},
};
use rfd::{AsyncFileDialog, AsyncMessageDialog, MessageLevel};
use tracing::{error, info};

use super::widgets::{section, stage_indicator};
use super::{AppState, Message};
use crate::acquisition::IMAGE_EXTENSIONS;
use crate::classification::{ClassifierSlot, ImageClassifier, ModelState, RtenClassifier};
use crate::config::AppConfig;
use crate::export::{self, Acknowledgement, SystemClipboard};
use crate::models::{Language, RunId, StatusMessage};
use crate::pipeline::{AnalysisPipeline, EventKind, PipelineEvent, PipelineObserver, RunPhase};
use crate::presentation::{self, PredictionsView};
use crate::recognition::OcrsRecognizer;

pub struct InsightApp {
    state: AppState,
}

impl InsightApp {
    pub fn new(config: AppConfig) -> (Self, Task<Message>) {
        let classifier = ClassifierSlot::loading();
        let recognizer = Arc::new(OcrsRecognizer::from_config(config.recognition.model_dir.as_deref()));
        let pipeline = Arc::new(AnalysisPipeline::from_config(&config, recognizer, classifier.clone()));

        let slot = classifier.clone();
        let classification_config = config.classification.clone();
        let preload = Task::perform(
            async move {
                let loader = slot.spawn_preload(move || {
                    let model = RtenClassifier::from_config(&classification_config)?;
                    Ok(Arc::new(model) as Arc<dyn ImageClassifier>)
                });
                let _ = loader.await;
            },
            |_| Message::ClassifierSettled,
        );

        (
            Self {
                state: AppState::new(config, pipeline, classifier),
            },
            preload,
        )
    }

    pub fn title(&self) -> String {
        match &self.state.analysis.file_name {
            Some(name) => format!("InsightOCR - {}", name),
            None => "InsightOCR".to_string(),
        }
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PickFile => Task::perform(
                AsyncFileDialog::new()
                    .set_title("Choose an image")
                    .add_filter("Images", IMAGE_EXTENSIONS)
                    .pick_file(),
                |handle| Message::FilePicked(handle.map(|data| data.path().to_path_buf())),
            ),
            Message::FilePicked(Some(path)) => self.start_with_file(path),
            Message::FilePicked(None) => Task::none(),
            Message::LanguageSelected(language) => {
                self.state.language = language;
                Task::none()
            }
            Message::Analyze => self.start_analysis(),
            Message::Pipeline(event) => {
                self.state.apply(event);
                Task::none()
            }
            Message::JobFailed(run, reason) => {
                error!("[{}] Run aborted: {}", run, reason);
                self.state.apply(PipelineEvent::new(
                    run,
                    EventKind::Finished {
                        phase: RunPhase::Error,
                        status: StatusMessage::finished_with_errors(),
                    },
                ));
                Task::none()
            }
            Message::ClassifierSettled => {
                info!("Classifier state: {:?}", self.state.classifier.state());
                Task::none()
            }
            Message::CopyText => {
                let result = export::copy_text(&SystemClipboard, &self.state.analysis.text);
                acknowledge(Acknowledgement::from_copy(result))
            }
            Message::DownloadText => Task::perform(
                AsyncFileDialog::new()
                    .set_title("Save recognized text")
                    .set_file_name(self.state.config.export.file_name.clone())
                    .add_filter("Text", &["txt"])
                    .save_file(),
                |handle| Message::DownloadTarget(handle.map(|data| data.path().to_path_buf())),
            ),
            Message::DownloadTarget(Some(path)) => {
                let result = export::save_text(&path, &self.state.analysis.text).map(|()| path);
                acknowledge(Acknowledgement::from_save(result))
            }
            Message::DownloadTarget(None) | Message::None => Task::none(),
        }
    }

    /// Selecting a file always starts a fresh run; with the preview step
    /// disabled the analysis follows immediately.
    fn start_with_file(&mut self, path: PathBuf) -> Task<Message> {
        let run = RunId::new();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let analysis = std::mem::take(&mut self.state.analysis);
        self.state.analysis = analysis.select_file(run, name);
        self.state.preview = None;

        let pipeline = self.state.pipeline.clone();
        let language = self.state.language;
        let analyze_immediately = !self.state.config.features.preview_step;
        pipeline_job(run, move |observer| {
            if let Ok(acquired) = pipeline.open_and_acquire(run, &path, observer) {
                if analyze_immediately {
                    pipeline.analyze(run, &acquired, language, observer);
                }
            }
        })
    }

    fn start_analysis(&mut self) -> Task<Message> {
        if !self.state.analysis.can_analyze() {
            return Task::none();
        }
        let Some(acquired) = self.state.analysis.acquired.clone() else {
            return Task::none();
        };

        let run = RunId::new();
        let analysis = std::mem::take(&mut self.state.analysis);
        self.state.analysis = analysis.begin_run(run);

        let pipeline = self.state.pipeline.clone();
        let language = self.state.language;
        pipeline_job(run, move |observer| {
            pipeline.analyze(run, &acquired, language, observer);
        })
    }

    pub fn view(&self) -> Element<'_, Message> {
        let flags = &self.state.config.features;
        let analysis = &self.state.analysis;

        let mut controls = row![button("Choose image…").on_press(Message::PickFile)]
            .spacing(10)
            .align_y(Center);
        if flags.language_selector {
            controls = controls.push(pick_list(
                Language::ALL,
                Some(self.state.language),
                Message::LanguageSelected,
            ));
        }
        if flags.preview_step {
            controls = controls.push(
                button("Analyze").on_press_maybe(analysis.can_analyze().then_some(Message::Analyze)),
            );
        }

        let mut content = column![
            text("InsightOCR").size(32),
            controls,
            text(analysis.status.as_str()),
            stage_indicator(analysis.phase),
        ]
        .spacing(16)
        .padding(20);

        if flags.preview_step {
            if let Some(handle) = &self.state.preview {
                content = content.push(
                    image(handle.clone())
                        .width(Length::Fill)
                        .height(Length::Fixed(360.0)),
                );
            }
        }

        let actions = export::available_actions(&analysis.text, flags);
        let mut ocr_block =
            column![text(presentation::displayed_text(analysis, flags)).font(Font::MONOSPACE)].spacing(10);
        if actions.any() {
            ocr_block = ocr_block.push(
                row![
                    button("Download as .txt").on_press_maybe(actions.download.then_some(Message::DownloadText)),
                    button("Copy Text").on_press_maybe(actions.copy.then_some(Message::CopyText)),
                ]
                .spacing(10),
            );
        }
        content = content.push(section("OCR Result", ocr_block));

        let predictions = match presentation::predictions_view(analysis) {
            PredictionsView::Message(message) => column![text(message)],
            PredictionsView::List(lines) => {
                column(lines.into_iter().map(|line| Element::from(text(format!("• {}", line)))))
            }
        };
        content = content.push(section("Top 3 Predictions", predictions.spacing(4)));

        let model_status = match self.state.classifier.state() {
            ModelState::Loading => "Classifier: loading model…".to_string(),
            ModelState::Ready(_) => "Classifier: ready".to_string(),
            ModelState::Failed(reason) => format!("Classifier: failed to load ({})", reason),
        };
        content = content.push(text(model_status).size(14));

        container(scrollable(content))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }
}

/// Run `job` on the blocking pool, streaming its events back as messages
fn pipeline_job<F>(run: RunId, job: F) -> Task<Message>
where
    F: FnOnce(&dyn PipelineObserver) + Send + 'static,
{
    let (sender, receiver) = mpsc::unbounded();
    let events = Task::run(receiver, Message::Pipeline);
    let worker = Task::perform(
        async move {
            tokio::task::spawn_blocking(move || {
                let observer = move |event: PipelineEvent| {
                    // Receiver gone means the window closed
                    let _ = sender.unbounded_send(event);
                };
                job(&observer);
            })
            .await
        },
        move |result| match result {
            Ok(()) => Message::None,
            Err(e) => Message::JobFailed(run, e.to_string()),
        },
    );
    Task::batch([events, worker])
}

fn acknowledge(ack: Acknowledgement) -> Task<Message> {
    let level = if ack.is_success() {
        MessageLevel::Info
    } else {
        MessageLevel::Error
    };
    Task::perform(
        AsyncMessageDialog::new()
            .set_level(level)
            .set_title("InsightOCR")
            .set_description(ack.message())
            .show(),
        |_| Message::None,
    )
}

pub fn run(config: AppConfig) -> iced::Result {
    iced::application(
        move || InsightApp::new(config.clone()),
        InsightApp::update,
        InsightApp::view,
    )
    .title(InsightApp::title)
    .run()
}
