use serde::{Deserialize, Serialize};
use tracing::debug;

/// Body of `POST /run_cpp`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunRequest {
    pub input_text: String,
}

impl RunRequest {
    /// Parse a raw request body leniently.
    ///
    /// Anything unusable (empty body, invalid JSON, a non-object, a non-string `inputText`)
    /// yields an empty `inputText` instead of an error.
    pub fn from_body(body: &[u8]) -> Self {
        if body.is_empty() {
            return Self::default();
        }

        serde_json::from_slice(body).unwrap_or_else(|e| {
            debug!("Unusable /run_cpp body, treating inputText as empty: {}", e);
            Self::default()
        })
    }
}

/// Successful response of `POST /run_cpp`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub output_text: String,
}
