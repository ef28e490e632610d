//! GraphQL responses as received over HTTP.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A GraphQL response received over HTTP.
///
/// JSON members are omitted when absent. The HTTP status is never
/// serialized, so comparisons only see the GraphQL payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,

    #[serde(skip, default = "default_status")]
    pub status: StatusCode,
}

const fn default_status() -> StatusCode {
    StatusCode::OK
}

impl Default for ExecutionResponse {
    fn default() -> Self {
        Self {
            data: None,
            errors: None,
            extensions: None,
            status: default_status(),
        }
    }
}

impl ExecutionResponse {
    /// Error objects in the response, or an empty slice.
    #[must_use]
    pub fn error_list(&self) -> &[Value] {
        self.errors
            .as_ref()
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Messages of all errors, in order.
    #[must_use]
    pub fn error_messages(&self) -> Vec<&str> {
        self.error_list()
            .iter()
            .filter_map(|error| error.get("message").and_then(Value::as_str))
            .collect()
    }
}
