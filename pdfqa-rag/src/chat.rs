//! Chat-completion model trait used for verification and answering.

use async_trait::async_trait;

use crate::error::Result;

/// A model that completes a single prompt with free text.
///
/// The pipeline sends each prompt as one user message and reads back the
/// text of the first choice. Implementations should return an empty string
/// rather than an error when the model produced no content; the answerer
/// treats that as "not found".
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete `prompt` and return the model's reply.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// The model identifier, used in logs and errors.
    fn name(&self) -> &str;
}
