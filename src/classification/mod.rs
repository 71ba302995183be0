//! Classification stage: a pretrained classifier that is preloaded once in
//! the background and consulted without blocking when a run needs it.

pub mod rten_model;

use std::sync::Arc;

use image::DynamicImage;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::ClassificationError;
use crate::models::Prediction;

pub use rten_model::RtenClassifier;

/// An image classification capability
pub trait ImageClassifier: Send + Sync {
    /// Ranked labels for `image`, ordered by descending probability
    fn classify(&self, image: &DynamicImage) -> Result<Vec<Prediction>, ClassificationError>;
}

/// Load state of the classifier
#[derive(Clone)]
pub enum ModelState {
    Loading,
    Ready(Arc<dyn ImageClassifier>),
    Failed(String),
}

impl ModelState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ModelState::Loading)
    }
}

impl std::fmt::Debug for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelState::Loading => f.write_str("Loading"),
            ModelState::Ready(_) => f.write_str("Ready"),
            ModelState::Failed(msg) => f.debug_tuple("Failed").field(msg).finish(),
        }
    }
}

/// Shared handle to the classifier. Clones observe the same state.
#[derive(Clone)]
pub struct ClassifierSlot {
    state: Arc<watch::Sender<ModelState>>,
}

impl ClassifierSlot {
    /// A slot whose model has not arrived yet
    pub fn loading() -> Self {
        let (tx, _rx) = watch::channel(ModelState::Loading);
        Self { state: Arc::new(tx) }
    }

    pub fn ready(classifier: Arc<dyn ImageClassifier>) -> Self {
        let slot = Self::loading();
        slot.set_ready(classifier);
        slot
    }

    pub fn set_ready(&self, classifier: Arc<dyn ImageClassifier>) {
        self.state.send_replace(ModelState::Ready(classifier));
    }

    pub fn set_failed(&self, message: impl Into<String>) {
        self.state.send_replace(ModelState::Failed(message.into()));
    }

    /// Current state without waiting
    pub fn state(&self) -> ModelState {
        self.state.borrow().clone()
    }

    /// Wait until the model is either ready or has failed
    pub async fn settled(&self) -> ModelState {
        let mut rx = self.state.subscribe();
        match rx.wait_for(|state| !state.is_loading()).await {
            Ok(state) => state.clone(),
            // The sender lives in self, so the channel cannot close while we wait
            Err(_) => self.state(),
        }
    }

    /// Run `load` on the blocking pool and publish its result.
    /// Must be called from within a tokio runtime.
    pub fn spawn_preload<F>(&self, load: F) -> JoinHandle<()>
    where
        F: FnOnce() -> anyhow::Result<Arc<dyn ImageClassifier>> + Send + 'static,
    {
        let slot = self.clone();
        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(load).await;
            match result {
                Ok(Ok(classifier)) => {
                    info!("Classifier loaded");
                    slot.set_ready(classifier);
                }
                Ok(Err(e)) => {
                    warn!("Classifier failed to load: {:#}", e);
                    slot.set_failed(format!("{:#}", e));
                }
                Err(e) => {
                    warn!("Classifier loader panicked: {}", e);
                    slot.set_failed(e.to_string());
                }
            }
        })
    }
}

impl Default for ClassifierSlot {
    fn default() -> Self {
        Self::loading()
    }
}
