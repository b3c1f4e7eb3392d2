// Widget request and the backend response envelope
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{RawRecord, Result, WidgetError};

/// HTTP verb used for a widget fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

/// One fetch attempt for a widget.
///
/// The method is derived from the payload: `POST` when a payload is present,
/// `GET` otherwise. Fields are private so the two can never disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetRequest {
    query: String,
    payload: Option<Value>,
    method: Method,
}

impl WidgetRequest {
    pub fn new(query: impl Into<String>, payload: Option<Value>) -> Self {
        let method = if payload.is_some() {
            Method::Post
        } else {
            Method::Get
        };
        Self {
            query: query.into(),
            payload,
            method,
        }
    }

    /// GET request for an endpoint or registered query id
    pub fn get(query: impl Into<String>) -> Self {
        Self::new(query, None)
    }

    /// POST request carrying a JSON body
    pub fn post(query: impl Into<String>, payload: Value) -> Self {
        Self::new(query, Some(payload))
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn method(&self) -> Method {
        self.method
    }
}

/// Response shape shared by every widget endpoint: `{ success, data?, error? }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiEnvelope {
    /// Unwrap the envelope into its rows.
    ///
    /// `success: false` is a failure carrying the backend message. A
    /// successful envelope without `data` yields no rows; a scalar `data`
    /// (e.g. a single humidity reading) is wrapped as `{ "value": .. }`.
    pub fn into_records(self) -> Result<Vec<RawRecord>> {
        if !self.success {
            return Err(WidgetError::Api(
                self.error
                    .unwrap_or_else(|| "Request was not successful".to_string()),
            ));
        }

        match self.data {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => map,
                    other => wrap_scalar(other),
                })
                .collect()),
            Some(Value::Object(map)) => Ok(vec![map]),
            Some(other) => Ok(vec![wrap_scalar(other)]),
        }
    }
}

fn wrap_scalar(value: Value) -> RawRecord {
    let mut map = RawRecord::new();
    map.insert("value".to_string(), value);
    map
}
