/// Widget data sources
///
/// `DataSource` is the seam between the polling runtime and the backend.
/// `HttpSource` talks to the dashboard API: `GET {base}/{query}` without a
/// payload, `POST {base}/{query}` with a JSON body otherwise, and expects the
/// `{ success, data?, error? }` envelope back.
use crate::config::RuntimeConfig;
use crate::request::{ApiEnvelope, Method, WidgetRequest};
use crate::{RawRecord, Result, WidgetError};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

/// Anything that can answer a widget request with rows.
///
/// Implementations must be cancel-safe: the runtime drops the returned future
/// when a request is superseded or the widget shuts down.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, request: &WidgetRequest) -> Result<Vec<RawRecord>>;
}

/// reqwest-backed source for the dashboard API
#[derive(Clone)]
pub struct HttpSource {
    http: Client,
    base_url: String,
    module: Option<String>,
}

impl HttpSource {
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| WidgetError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            module: None,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(&RuntimeConfig::from_env())
    }

    /// Name sent in the `module` header so the backend can attribute requests
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Absolute URL for a request; absolute queries are used as-is
    pub fn url_for(&self, request: &WidgetRequest) -> String {
        let query = request.query();
        if query.starts_with("http://") || query.starts_with("https://") {
            query.to_string()
        } else if query.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, query.trim_start_matches('/'))
        }
    }
}

#[async_trait]
impl DataSource for HttpSource {
    async fn fetch(&self, request: &WidgetRequest) -> Result<Vec<RawRecord>> {
        let url = self.url_for(request);
        debug!(target: "http_source", method = ?request.method(), url = %url, "Fetching widget data");

        let mut req = match request.method() {
            Method::Get => self.http.get(&url),
            Method::Post => self
                .http
                .post(&url)
                .json(request.payload().unwrap_or(&serde_json::Value::Null)),
        };
        if let Some(module) = &self.module {
            req = req.header("module", module);
        }

        let response = req.send().await.map_err(|e| {
            warn!(target: "http_source", url = %url, error = %e, "Widget request failed");
            WidgetError::Transport(e.to_string())
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            warn!(target: "http_source", url = %url, error = %e, "Failed to read widget response");
            WidgetError::Transport(e.to_string())
        })?;

        if !status.is_success() {
            // Error responses usually still carry the envelope; prefer its message.
            let message = serde_json::from_str::<ApiEnvelope>(&body)
                .ok()
                .and_then(|env| env.error)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            warn!(target: "http_source", url = %url, %status, message = %message, "Widget endpoint returned error");
            return Err(WidgetError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiEnvelope = serde_json::from_str(&body).map_err(|e| {
            warn!(target: "http_source", url = %url, error = %e, "Failed to parse widget response");
            WidgetError::Decode(format!("Failed to parse widget response: {e}"))
        })?;

        envelope.into_records()
    }
}
