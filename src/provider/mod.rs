pub mod bedrock;
pub mod openai;

use crate::{config::ProviderConfig, error::Result};
use async_trait::async_trait;
use std::sync::Arc;

pub use bedrock::BedrockImageProvider;
pub use openai::OpenAiImageProvider;

/// Upstream service that turns prompts into encoded image bytes.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn create(&self, prompt: &str, size: &str) -> Result<Vec<u8>>;

    async fn edit(&self, prompt: &str, image: &[u8]) -> Result<Vec<u8>>;

    fn name(&self) -> &'static str;
}

pub async fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn ImageProvider>> {
    let provider: Arc<dyn ImageProvider> = match config {
        ProviderConfig::OpenAi(openai_config) => {
            Arc::new(OpenAiImageProvider::new(openai_config.clone())?)
        }
        ProviderConfig::Bedrock(bedrock_config) => {
            Arc::new(BedrockImageProvider::new(bedrock_config.clone()).await?)
        }
    };

    log::info!("Image provider ready: {}", provider.name());
    Ok(provider)
}
