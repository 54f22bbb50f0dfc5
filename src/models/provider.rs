use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct OpenAiGenerationRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub size: &'a str,
    pub n: u8,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiImageData {
    pub b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiImagesResponse {
    pub data: Vec<OpenAiImageData>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiErrorBody {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiErrorResponse {
    pub error: OpenAiErrorBody,
}

#[derive(Serialize, Deserialize)]
pub struct TitanImageResponse {
    pub images: Vec<String>,
    pub error: Option<String>,
}
