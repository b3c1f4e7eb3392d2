// Pulseboard Core Library
// Polling data widgets and the pipelines that shape their rows

pub mod backoff;
pub mod config;
pub mod pipeline;
pub mod request;
pub mod source;
pub mod state;
pub mod telemetry;
pub mod widget;
pub mod widgets;

// Export core types
pub use backoff::Backoff;
pub use config::RuntimeConfig;
pub use request::{ApiEnvelope, Method, WidgetRequest};
pub use source::{DataSource, HttpSource};
pub use state::FetchState;
pub use widget::{RenderFn, RowPipeline, Widget, WidgetDescriptor, WidgetHandle};

/// A single untyped row as returned by the backend.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// A flattened, display-ready row produced by a pipeline.
pub type ProcessedRow = serde_json::Map<String, serde_json::Value>;

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WidgetError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("{0}")]
    Api(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl WidgetError {
    /// Message surfaced to the UI layer for a failed fetch.
    pub fn display_message(&self) -> String {
        match self {
            WidgetError::Api(message) => message.clone(),
            WidgetError::Status { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WidgetError>;
