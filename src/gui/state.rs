use std::sync::Arc;

use iced::widget::image::Handle;

use crate::classification::ClassifierSlot;
use crate::config::AppConfig;
use crate::models::Language;
use crate::pipeline::{AnalysisPipeline, EventKind, PipelineEvent};
use crate::state::AnalysisState;

pub struct AppState {
    pub config: AppConfig,
    pub analysis: AnalysisState,
    pub language: Language,
    pub classifier: ClassifierSlot,
    pub pipeline: Arc<AnalysisPipeline>,
    /// Preview raster converted for display, rebuilt when a new preview arrives
    pub preview: Option<Handle>,
}

impl AppState {
    pub fn new(config: AppConfig, pipeline: Arc<AnalysisPipeline>, classifier: ClassifierSlot) -> Self {
        Self {
            language: config.recognition.language,
            config,
            analysis: AnalysisState::default(),
            classifier,
            pipeline,
            preview: None,
        }
    }

    pub fn apply(&mut self, event: PipelineEvent) {
        let current = self.analysis.run == Some(event.run);
        if let (true, EventKind::PreviewReady(acquired)) = (current, &event.kind) {
            let raster = acquired.preview.raster();
            self.preview = Some(Handle::from_rgba(
                raster.width(),
                raster.height(),
                raster.as_raw().clone(),
            ));
        }
        let analysis = std::mem::take(&mut self.analysis);
        self.analysis = analysis.apply(event);
    }
}
