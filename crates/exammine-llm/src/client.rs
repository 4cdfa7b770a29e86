//! HTTP client for the Gemini `generateContent` and `models` endpoints.
//!
//! The API key travels as the `key` query parameter, so every transport
//! error has its URL stripped before it is surfaced.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};

use crate::error::{mentions_missing_model, LlmError};
use crate::generator::TextGenerator;
use crate::types::{
    ApiErrorEnvelope, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    GenerationOptions, ModelList, Part,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "models/gemini-1.5-pro";

const API_VERSION: &str = "v1beta";

/// Maximum number of model-list pages to follow.
const MAX_MODEL_PAGES: usize = 10;

/// Client for the Gemini REST API.
///
/// Use [`GeminiClient::new`] for production or [`GeminiClient::with_base_url`]
/// to point at a mock server in tests.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Creates a client pointed at the production Gemini API.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Result<Self, LlmError> {
        Self::with_base_url(api_key, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// `model` may be given with or without the `models/` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the `reqwest::Client` cannot be built, or
    /// [`LlmError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("exammine/0.1 (exam-analysis)")
            .build()
            .map_err(reqwest::Error::without_url)?;

        let base_url = base_url.trim_end_matches('/').to_owned();
        Url::parse(&base_url).map_err(|e| LlmError::InvalidBaseUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            model: normalise_model(model),
        })
    }

    /// Fully-qualified model name, e.g. `models/gemini-1.5-pro`.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Builds `{base}/v1beta/{path}?key=…` plus any extra query pairs.
    fn endpoint(&self, path: &str, extra: &[(&str, &str)]) -> Result<Url, LlmError> {
        let raw = format!("{}/{API_VERSION}/{path}", self.base_url);
        let mut url = Url::parse(&raw).map_err(|e| LlmError::InvalidBaseUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("key", &self.api_key);
            for (k, v) in extra {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Turns a non-2xx response into [`LlmError::Api`] or
    /// [`LlmError::ModelNotFound`].
    async fn error_from_response(&self, response: Response) -> LlmError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
            .map(|envelope| envelope.error.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.trim().to_owned());

        if status == 404 || mentions_missing_model(&message) {
            return LlmError::ModelNotFound {
                model: self.model.clone(),
                message,
            };
        }
        LlmError::Api { status, message }
    }

    async fn send_json<T>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<T, LlmError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = request.send().await.map_err(reqwest::Error::without_url)?;
        if !response.status().is_success() {
            return Err(self.error_from_response(response).await);
        }
        let body = response.text().await.map_err(reqwest::Error::without_url)?;
        serde_json::from_str(&body).map_err(|e| LlmError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    /// Calls `generateContent` with a single user turn.
    ///
    /// # Errors
    ///
    /// - [`LlmError::ModelNotFound`] if the model is unknown to the API.
    /// - [`LlmError::Api`] for any other non-2xx response.
    /// - [`LlmError::EmptyResponse`] if the reply carries no text.
    /// - [`LlmError::Http`] / [`LlmError::Deserialize`] on transport or shape errors.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let url = self.endpoint(&format!("{}:generateContent", self.model), &[])?;
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_owned()),
                }],
                role: Some("user".to_owned()),
            }],
            generation_config: GenerationConfig::from(options),
            safety_settings: options.safety_settings.clone(),
        };

        tracing::debug!(
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            safety = !options.safety_settings.is_empty(),
            "calling generateContent"
        );

        let response: GenerateContentResponse = self
            .send_json(self.client.post(url).json(&request), "generateContent")
            .await?;

        let text = response.first_candidate_text();
        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse(response.empty_reason()));
        }

        tracing::debug!(model = %self.model, response_chars = text.chars().count(), "generateContent succeeded");
        Ok(text)
    }

    /// Lists model names, following pagination.
    ///
    /// # Errors
    ///
    /// Same as [`TextGenerator::generate`], minus `EmptyResponse`.
    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_MODEL_PAGES {
            let url = match page_token.as_deref() {
                Some(token) => self.endpoint("models", &[("pageSize", "1000"), ("pageToken", token)])?,
                None => self.endpoint("models", &[("pageSize", "1000")])?,
            };
            let page: ModelList = self.send_json(self.client.get(url), "models").await?;
            names.extend(page.models.into_iter().map(|m| m.name));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => return Ok(names),
            }
        }

        tracing::warn!(
            pages = MAX_MODEL_PAGES,
            "model listing truncated after page limit"
        );
        Ok(names)
    }
}

fn normalise_model(model: &str) -> String {
    let model = model.trim();
    if model.starts_with("models/") {
        model.to_owned()
    } else {
        format!("models/{model}")
    }
}
