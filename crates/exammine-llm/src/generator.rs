use async_trait::async_trait;

use crate::error::LlmError;
use crate::types::GenerationOptions;

/// A model that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates a completion for `prompt`.
    async fn generate(&self, prompt: &str, options: &GenerationOptions)
        -> Result<String, LlmError>;

    /// Names of the models available to the configured credentials.
    async fn list_models(&self) -> Result<Vec<String>, LlmError>;
}
