//! The LLM-backed use cases served by the API.

use std::sync::Arc;

use exammine_llm::{GenerationOptions, LlmError, TextGenerator};
use exammine_scraper::MedicationSearch;
use serde::Serialize;
use thiserror::Error;

use crate::prompts;
use crate::session::SessionCache;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The configured model is missing; `available` lists what the key can use.
    #[error("{source}. Available models: {available:?}")]
    ModelUnavailable {
        #[source]
        source: LlmError,
        available: Vec<String>,
    },
}

impl AgentError {
    #[must_use]
    pub fn is_model_unavailable(&self) -> bool {
        match self {
            Self::ModelUnavailable { .. } => true,
            Self::Llm(e) => e.is_model_not_found(),
        }
    }

    #[must_use]
    pub fn is_api_key_problem(&self) -> bool {
        matches!(self, Self::Llm(e) if e.is_auth_error())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExamAnalysis {
    pub session_id: String,
    pub analysis: String,
}

/// Shared handle to the model, the scrapers and the session cache.
#[derive(Clone)]
pub struct Agents {
    llm: Arc<dyn TextGenerator>,
    search: Arc<MedicationSearch>,
    sessions: SessionCache,
}

impl Agents {
    #[must_use]
    pub fn new(
        llm: Arc<dyn TextGenerator>,
        search: Arc<MedicationSearch>,
        sessions: SessionCache,
    ) -> Self {
        Self {
            llm,
            search,
            sessions,
        }
    }

    /// Stores the exam text under a new session and asks for an analysis.
    ///
    /// The returned analysis always ends with [`prompts::EXAM_DISCLAIMER`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the model call fails.
    pub async fn analyze_exam(&self, exam_text: &str) -> Result<ExamAnalysis, AgentError> {
        let session_id = self.sessions.create(exam_text).await;
        let cached_sessions = self.sessions.len().await;
        tracing::info!(
            session_id = %session_id,
            chars = exam_text.chars().count(),
            cached_sessions,
            "stored exam text, requesting analysis"
        );

        let analysis = self
            .generate(
                "analyze_exam",
                &prompts::exam_analysis(exam_text),
                &GenerationOptions::with_default_safety(),
            )
            .await?;

        Ok(ExamAnalysis {
            session_id,
            analysis: ensure_disclaimer(analysis),
        })
    }

    /// Answers a question about a previously analysed exam.
    ///
    /// An unknown or expired session yields [`prompts::SESSION_NOT_FOUND_MESSAGE`]
    /// rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the model call fails.
    pub async fn answer_exam_question(
        &self,
        session_id: &str,
        question: &str,
    ) -> Result<String, AgentError> {
        let Some(exam_text) = self.sessions.get(session_id).await else {
            tracing::warn!(session_id, "no exam stored for session");
            return Ok(prompts::SESSION_NOT_FOUND_MESSAGE.to_owned());
        };

        self.generate(
            "exam_question",
            &prompts::exam_follow_up(&exam_text, question),
            &GenerationOptions::default(),
        )
        .await
    }

    /// Scrapes medication information and has the model organise it.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the model call fails. Scraping failures only
    /// switch to the fallback prompt.
    pub async fn medication_info(&self, medication: &str) -> Result<String, AgentError> {
        let scraped = self.search.search_info(medication).await;
        if let Some(record) = &scraped {
            let preview: String = record.content.chars().take(200).collect();
            tracing::info!(medication, source = %record.source, preview = %preview, "scraped medication information");
        }

        let mut answer = self
            .generate(
                "medication_info",
                &prompts::medication_info(medication, scraped.as_ref()),
                &GenerationOptions::default(),
            )
            .await?;

        if let Some(record) = scraped.filter(|r| !r.source.is_empty()) {
            answer.push_str("\n\nFonte: ");
            answer.push_str(&record.source);
        }
        Ok(answer)
    }

    /// Scrapes pharmacy prices and has the model summarise them.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the model call fails.
    pub async fn medication_prices(&self, medication: &str) -> Result<String, AgentError> {
        let prices = self.search.search_prices(medication).await;
        tracing::info!(
            medication,
            sources = prices.sources.len(),
            products = prices.products.len(),
            "scraped medication prices"
        );

        let mut answer = self
            .generate(
                "medication_prices",
                &prompts::medication_prices(medication, &prices),
                &GenerationOptions::default(),
            )
            .await?;

        if let Some(links) = prompts::purchase_links(&prices) {
            answer.push_str(&links);
        }
        Ok(answer)
    }

    /// # Errors
    ///
    /// Returns [`AgentError`] if the model call fails.
    pub async fn general_question(&self, question: &str) -> Result<String, AgentError> {
        self.generate(
            "general_question",
            &prompts::general_question(question),
            &GenerationOptions::default(),
        )
        .await
    }

    /// Model names available to the configured key; empty on failure.
    pub async fn available_models(&self) -> Vec<String> {
        match self.llm.list_models().await {
            Ok(models) => {
                tracing::info!(count = models.len(), "listed available models");
                models
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to list models");
                Vec::new()
            }
        }
    }

    async fn generate(
        &self,
        agent: &'static str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, AgentError> {
        tracing::debug!(agent, prompt_chars = prompt.chars().count(), "sending prompt");
        match self.llm.generate(prompt, options).await {
            Ok(text) => {
                tracing::info!(agent, chars = text.chars().count(), "model response received");
                Ok(text)
            }
            Err(e) if e.is_model_not_found() => {
                let available = self.available_models().await;
                Err(AgentError::ModelUnavailable {
                    source: e,
                    available,
                })
            }
            Err(e) => Err(AgentError::Llm(e)),
        }
    }
}

fn ensure_disclaimer(mut analysis: String) -> String {
    if !analysis.contains(prompts::EXAM_DISCLAIMER) {
        let trimmed_len = analysis.trim_end().len();
        analysis.truncate(trimmed_len);
        analysis.push_str("\n\n");
        analysis.push_str(prompts::EXAM_DISCLAIMER);
    }
    analysis
}
