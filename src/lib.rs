//! HTTP front for an image generation provider.
//!
//! `POST /api/create` turns a prompt into an image and `POST /api/edit`
//! applies a prompt to a caller-supplied image. Images travel as base64
//! inside JSON in both directions; the provider behind the service is chosen
//! at startup through [`config::ProviderConfig`].

pub mod codec;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod provider;
pub mod server;

pub use config::{BedrockConfig, Config, OpenAiConfig, ProviderConfig};
pub use error::{ImageServiceError, Result};
pub use models::{CreateRequest, EditRequest, HealthResponse, ImageResponse};
pub use provider::{build_provider, BedrockImageProvider, ImageProvider, OpenAiImageProvider};
