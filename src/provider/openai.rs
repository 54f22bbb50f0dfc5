use crate::{
    codec,
    config::OpenAiConfig,
    error::{ImageServiceError, Result},
    logger,
    models::{OpenAiErrorResponse, OpenAiGenerationRequest, OpenAiImagesResponse},
    provider::ImageProvider,
};
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};

pub struct OpenAiImageProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiImageProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .ok_or_else(|| ImageServiceError::ConfigError("OPENAI_API_KEY is required".into()))?;

        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/images/{}", self.base_url, path)
    }

    /// DALL-E models default to URL responses and must be asked for base64;
    /// the gpt-image models always return base64 and reject the parameter.
    fn response_format(&self) -> Option<&'static str> {
        self.model.starts_with("dall-e").then_some("b64_json")
    }
}

#[async_trait]
impl ImageProvider for OpenAiImageProvider {
    async fn create(&self, prompt: &str, size: &str) -> Result<Vec<u8>> {
        let mut body = serde_json::to_value(OpenAiGenerationRequest {
            model: &self.model,
            prompt,
            size,
            n: 1,
        })?;
        if let Some(format) = self.response_format() {
            body["response_format"] = format.into();
        }

        log::info!("Generating image with model: {} ({})", self.model, size);
        let _timer = logger::timer("openai images/generations");

        let response = self
            .client
            .post(self.endpoint("generations"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        read_image(response).await
    }

    async fn edit(&self, prompt: &str, image: &[u8]) -> Result<Vec<u8>> {
        let image_part = Part::bytes(image.to_vec())
            .file_name("image.png")
            .mime_str("image/png")?;

        let mut form = Form::new()
            .text("model", self.model.clone())
            .text("prompt", prompt.to_string())
            .part("image", image_part);
        if let Some(format) = self.response_format() {
            form = form.text("response_format", format);
        }

        log::info!(
            "Editing image with model: {} ({} source bytes)",
            self.model,
            image.len()
        );
        let _timer = logger::timer("openai images/edits");

        let response = self
            .client
            .post(self.endpoint("edits"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        read_image(response).await
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

async fn read_image(response: Response) -> Result<Vec<u8>> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<OpenAiErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        return Err(ImageServiceError::ProviderError(format!(
            "OpenAI returned {}: {}",
            status, message
        )));
    }

    extract_image(&body)
}

fn extract_image(body: &str) -> Result<Vec<u8>> {
    let images: OpenAiImagesResponse = serde_json::from_str(body)
        .map_err(|e| ImageServiceError::ProviderError(format!("Unreadable response: {}", e)))?;

    let encoded = images
        .data
        .into_iter()
        .find_map(|image| image.b64_json)
        .ok_or_else(|| ImageServiceError::ProviderError("No images generated".into()))?;

    codec::decode_image(&encoded).map_err(|e| {
        ImageServiceError::ProviderError(format!("Provider returned invalid image data: {}", e))
    })
}
