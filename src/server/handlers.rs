use actix_web::{web, HttpResponse};

use crate::{
    codec,
    error::{ErrorResponse, ImageServiceError, Result},
    models::{CreateRequest, EditRequest, HealthResponse, ImageResponse},
    server::AppState,
};

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse::ok())
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse {
        detail: "Not Found".to_string(),
    })
}

pub async fn create_image(
    state: web::Data<AppState>,
    payload: web::Json<CreateRequest>,
) -> Result<HttpResponse> {
    let request = payload.into_inner();
    require_prompt(&request.prompt, "Prompt is required.")?;

    let image_bytes = state
        .provider
        .create(&request.prompt, &request.size)
        .await?;
    log::debug!("Provider returned {} bytes for create", image_bytes.len());

    Ok(HttpResponse::Ok().json(ImageResponse {
        image_base64: codec::encode_image(&image_bytes),
    }))
}

pub async fn edit_image(
    state: web::Data<AppState>,
    payload: web::Json<EditRequest>,
) -> Result<HttpResponse> {
    let request = payload.into_inner();
    require_prompt(&request.prompt, "Edit prompt is required.")?;

    let source_bytes = codec::decode_image(&request.image_base64)
        .ok()
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| ImageServiceError::DecodingError("Invalid image data.".into()))?;

    let edited_bytes = state.provider.edit(&request.prompt, &source_bytes).await?;
    log::debug!("Provider returned {} bytes for edit", edited_bytes.len());

    Ok(HttpResponse::Ok().json(ImageResponse {
        image_base64: codec::encode_image(&edited_bytes),
    }))
}

fn require_prompt(prompt: &str, message: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(ImageServiceError::ValidationError(message.to_string()));
    }
    Ok(())
}
