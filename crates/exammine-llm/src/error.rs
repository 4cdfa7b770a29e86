use thiserror::Error;

/// Errors returned by the Gemini API client.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network or TLS failure. URLs are stripped so the API key never leaks.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("Gemini API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The configured model does not exist or is not available to this key.
    #[error("model {model} not found: {message}")]
    ModelNotFound { model: String, message: String },

    /// The API answered 200 but produced no text, usually because the prompt
    /// or the candidate was blocked.
    #[error("Gemini returned no text ({0})")]
    EmptyResponse(String),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl LlmError {
    #[must_use]
    pub fn is_model_not_found(&self) -> bool {
        matches!(self, Self::ModelNotFound { .. })
    }

    /// Whether the failure was caused by a missing or rejected API key.
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        match self {
            Self::Api { status, message } => {
                matches!(status, 401 | 403)
                    || message.contains("API key")
                    || message.contains("API_KEY")
            }
            _ => false,
        }
    }
}

/// Whether an API error message describes a missing model.
pub(crate) fn mentions_missing_model(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("model") && lower.contains("not found")
}
