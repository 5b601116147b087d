use async_trait::async_trait;

use crate::Result;
use crate::prompt::PromptInput;
use crate::types::GeneratedImage;

/// One text-to-image backend. Implementations hold only construction-time
/// state, so a single instance may serve concurrent calls.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn provider(&self) -> &str;

    async fn generate(&self, prompt: &PromptInput) -> Result<GeneratedImage>;
}
