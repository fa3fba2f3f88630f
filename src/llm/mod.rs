pub mod gemini;
pub mod groq;

use crate::error::LlmError;
use async_trait::async_trait;

/// A text-generation provider. The review engine only ever needs one
/// operation, so fallback tiers can be stacked behind this without the
/// engine knowing which service answers.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Name of this provider for logging
    fn name(&self) -> &'static str;
}
