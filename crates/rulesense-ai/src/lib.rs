//! AI layer: prompt building and the hosted model that proposes rule changes.

mod error;
pub mod gemini;
pub mod prompt;

use async_trait::async_trait;

pub use error::AiError;
pub use gemini::{API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiClient, GeminiConfig};
pub use prompt::build_prompt;

/// Something that can propose rule changes for a requirement.
///
/// Implementations return the model's raw text; extracting the JSON patch
/// from it is the caller's job.
#[async_trait]
pub trait RuleAdvisor: Send + Sync {
    /// Human-readable name shown while a request is in flight.
    fn name(&self) -> &str;

    async fn advise(&self, rules_text: &str, requirement: &str) -> Result<String, AiError>;
}
