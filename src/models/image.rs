use serde::{Deserialize, Serialize};

pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";

fn default_size() -> String {
    DEFAULT_IMAGE_SIZE.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRequest {
    pub prompt: String,
    #[serde(default = "default_size")]
    pub size: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditRequest {
    pub prompt: String,
    pub image_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageResponse {
    pub image_base64: String, // Base64 encoded
}

/// Pixel dimensions parsed from a `"WIDTHxHEIGHT"` size string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for ImageDimensions {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
        }
    }
}

impl ImageDimensions {
    /// Returns `None` for `"auto"` and anything that is not `WxH` with
    /// positive integers.
    pub fn parse(size: &str) -> Option<Self> {
        let (width, height) = size.trim().split_once(|c: char| c == 'x' || c == 'X')?;
        let width: u32 = width.trim().parse().ok()?;
        let height: u32 = height.trim().parse().ok()?;
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { width, height })
    }
}
