use crate::{
    codec,
    config::BedrockConfig,
    error::{ImageServiceError, Result},
    logger,
    models::{ImageDimensions, TitanImageResponse},
    provider::ImageProvider,
};
use async_trait::async_trait;
use aws_sdk_bedrockruntime::{error::DisplayErrorContext, primitives::Blob, Client};
use serde_json::{json, Value};

const CFG_SCALE: f32 = 8.0;

#[derive(Clone)]
pub struct BedrockImageProvider {
    client: Client,
    model_id: String,
}

impl BedrockImageProvider {
    pub async fn new(config: BedrockConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(aws_sdk_bedrockruntime::config::Region::new(region.clone()));
        } else {
            log::warn!("No AWS region configured, relying on the default provider chain");
        }

        if let Some((access_key, secret_key)) = static_credentials(&config)? {
            loader = loader.credentials_provider(aws_sdk_bedrockruntime::config::Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "imagegen-service",
            ));
        }

        let aws_config = loader.load().await;

        Ok(Self {
            client: Client::new(&aws_config),
            model_id: config.model_id,
        })
    }

    async fn invoke(&self, payload: Value) -> Result<Vec<u8>> {
        let request_json = serde_json::to_string(&payload)?;

        let response = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(request_json.into_bytes()))
            .send()
            .await
            .map_err(|e| ImageServiceError::ProviderError(DisplayErrorContext(&e).to_string()))?;

        extract_image(response.body.as_ref())
    }
}

#[async_trait]
impl ImageProvider for BedrockImageProvider {
    async fn create(&self, prompt: &str, size: &str) -> Result<Vec<u8>> {
        let dimensions = ImageDimensions::parse(size).unwrap_or_else(|| {
            log::warn!("Size '{}' is not WIDTHxHEIGHT, using 1024x1024", size);
            ImageDimensions::default()
        });

        log::info!(
            "Generating image with model: {} ({}x{})",
            self.model_id,
            dimensions.width,
            dimensions.height
        );
        let _timer = logger::timer("bedrock text-to-image");

        self.invoke(text_to_image_payload(prompt, dimensions)).await
    }

    async fn edit(&self, prompt: &str, image: &[u8]) -> Result<Vec<u8>> {
        log::info!(
            "Editing image with model: {} ({} source bytes)",
            self.model_id,
            image.len()
        );
        let _timer = logger::timer("bedrock image-variation");

        self.invoke(image_variation_payload(prompt, &codec::encode_image(image)))
            .await
    }

    fn name(&self) -> &'static str {
        "bedrock"
    }
}

/// Both keys or neither; a lone key is a configuration mistake rather than a
/// request to use the default credential chain.
fn static_credentials(config: &BedrockConfig) -> Result<Option<(&str, &str)>> {
    match (config.access_key.as_deref(), config.secret_key.as_deref()) {
        (Some(access_key), Some(secret_key)) => Ok(Some((access_key, secret_key))),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ImageServiceError::ConfigError(
            "AWS_SECRET_ACCESS_KEY is required when AWS_ACCESS_KEY_ID is set".into(),
        )),
        (None, Some(_)) => Err(ImageServiceError::ConfigError(
            "AWS_ACCESS_KEY_ID is required when AWS_SECRET_ACCESS_KEY is set".into(),
        )),
    }
}

fn text_to_image_payload(prompt: &str, dimensions: ImageDimensions) -> Value {
    json!({
        "taskType": "TEXT_IMAGE",
        "textToImageParams": {
            "text": prompt
        },
        "imageGenerationConfig": {
            "numberOfImages": 1,
            "width": dimensions.width,
            "height": dimensions.height,
            "quality": "standard",
            "cfgScale": CFG_SCALE
        }
    })
}

fn image_variation_payload(prompt: &str, image_base64: &str) -> Value {
    json!({
        "taskType": "IMAGE_VARIATION",
        "imageVariationParams": {
            "text": prompt,
            "images": [image_base64]
        },
        "imageGenerationConfig": {
            "numberOfImages": 1,
            "quality": "standard",
            "cfgScale": CFG_SCALE
        }
    })
}

fn extract_image(body: &[u8]) -> Result<Vec<u8>> {
    let titan_response: TitanImageResponse = serde_json::from_slice(body)
        .map_err(|e| ImageServiceError::ProviderError(format!("Unreadable response: {}", e)))?;

    if let Some(error) = titan_response.error.filter(|e| !e.is_empty()) {
        return Err(ImageServiceError::ProviderError(error));
    }

    let image = titan_response
        .images
        .first()
        .ok_or_else(|| ImageServiceError::ProviderError("No images generated".into()))?;

    codec::decode_image(image).map_err(|e| {
        ImageServiceError::ProviderError(format!("Provider returned invalid image data: {}", e))
    })
}
