mod app;
mod message;
mod state;
mod widgets;

pub use app::{InsightApp, run};
pub use message::Message;
pub use state::AppState;
