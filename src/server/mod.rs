pub mod handlers;

use crate::{
    config::Config,
    error::ImageServiceError,
    provider::ImageProvider,
};
use actix_cors::Cors;
use actix_web::{error::JsonPayloadError, middleware, web, App, HttpServer};
use std::sync::Arc;

/// Shared per-worker application data. Holds nothing mutable.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn ImageProvider>,
}

impl AppState {
    pub fn new(provider: Arc<dyn ImageProvider>) -> Self {
        Self { provider }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::health))
        .route("/health", web::get().to(handlers::health))
        .service(
            web::scope("/api")
                .route("/create", web::post().to(handlers::create_image))
                .route("/edit", web::post().to(handlers::edit_image)),
        )
        .default_service(web::to(handlers::not_found));
}

/// Body extraction failures are reported in the same `{detail}` shape as
/// every other rejected request.
pub fn json_config(max_body_bytes: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(max_body_bytes)
        .error_handler(|err, _req| {
            let message = match &err {
                JsonPayloadError::ContentType => "Request body must be JSON.".to_string(),
                JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
                    "Request body is too large.".to_string()
                }
                JsonPayloadError::Deserialize(e) => format!("Invalid request body: {}", e),
                other => format!("Invalid request body: {}", other),
            };
            ImageServiceError::ValidationError(message).into()
        })
}

/// A `*` anywhere in the origin list wins over explicit origins.
pub fn build_cors(config: &Config) -> Cors {
    let mut cors = Cors::default();
    if config.allows_any_origin() {
        cors = cors.allow_any_origin();
    } else {
        for origin in &config.cors_allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }
    cors.allow_any_method().allow_any_header().max_age(3600)
}

pub async fn run(config: Config, provider: Arc<dyn ImageProvider>) -> std::io::Result<()> {
    let state = web::Data::new(AppState::new(provider));
    let app_config = config.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(json_config(app_config.max_body_bytes))
            .wrap(build_cors(&app_config))
            .wrap(middleware::Logger::new("%r %s %b bytes %Dms"))
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use actix_http::Request;
    use actix_web::{
        body::MessageBody,
        dev::{Service, ServiceResponse},
        http::{header, Method, StatusCode},
        test,
    };
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Create { prompt: String, size: String },
        Edit { prompt: String, image: Vec<u8> },
    }

    /// Returns fixed bytes and remembers what it was asked for.
    struct StubProvider {
        output: Vec<u8>,
        calls: Mutex<Vec<Call>>,
    }

    impl StubProvider {
        fn returning(output: &[u8]) -> Arc<Self> {
            Arc::new(Self {
                output: output.to_vec(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageProvider for StubProvider {
        async fn create(&self, prompt: &str, size: &str) -> Result<Vec<u8>> {
            self.calls.lock().unwrap().push(Call::Create {
                prompt: prompt.to_string(),
                size: size.to_string(),
            });
            Ok(self.output.clone())
        }

        async fn edit(&self, prompt: &str, image: &[u8]) -> Result<Vec<u8>> {
            self.calls.lock().unwrap().push(Call::Edit {
                prompt: prompt.to_string(),
                image: image.to_vec(),
            });
            Ok(self.output.clone())
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl ImageProvider for FailingProvider {
        async fn create(&self, _prompt: &str, _size: &str) -> Result<Vec<u8>> {
            Err(ImageServiceError::ProviderError(
                "OpenAI returned 500 Internal Server Error: upstream exploded".into(),
            ))
        }

        async fn edit(&self, _prompt: &str, _image: &[u8]) -> Result<Vec<u8>> {
            Err(ImageServiceError::ProviderError("connection reset".into()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    async fn init_app(
        provider: Arc<dyn ImageProvider>,
    ) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>
    {
        init_app_with(provider, Config::new().with_max_body_bytes(1024 * 1024)).await
    }

    async fn init_app_with(
        provider: Arc<dyn ImageProvider>,
        config: Config,
    ) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>
    {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(provider)))
                .app_data(json_config(config.max_body_bytes))
                .wrap(build_cors(&config))
                .configure(configure),
        )
        .await
    }

    async fn preflight_status<S, B>(app: &S, origin: &str) -> StatusCode
    where
        S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
        B: MessageBody,
    {
        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/api/create")
            .insert_header((header::ORIGIN, origin))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
            .to_request();
        match app.call(req).await {
            Ok(resp) => resp.status(),
            Err(err) => err.as_response_error().status_code(),
        }
    }

    async fn post_json<S, B>(app: &S, path: &str, body: Value) -> (StatusCode, Value)
    where
        S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
        B: MessageBody,
    {
        let req = test::TestRequest::post()
            .uri(path)
            .set_json(body)
            .to_request();
        let resp = test::call_service(app, req).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }

    #[actix_web::test]
    async fn test_health_endpoints() {
        let app = init_app(StubProvider::returning(b"PNGDATA")).await;
        for path in ["/", "/health"] {
            let req = test::TestRequest::get().uri(path).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body, json!({"status": "ok"}));
        }
    }

    #[actix_web::test]
    async fn test_unknown_route_is_not_found() {
        let app = init_app(StubProvider::returning(b"PNGDATA")).await;
        let req = test::TestRequest::get().uri("/api/variations").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"], "Not Found");
    }

    #[actix_web::test]
    async fn test_create_returns_base64_image() {
        let provider = StubProvider::returning(b"PNGDATA");
        let app = init_app(provider.clone()).await;

        let (status, body) = post_json(&app, "/api/create", json!({"prompt": "a cat"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"image_base64": "UE5HREFUQQ=="}));
        assert_eq!(
            provider.calls(),
            vec![Call::Create {
                prompt: "a cat".into(),
                size: "1024x1024".into()
            }]
        );
    }

    #[actix_web::test]
    async fn test_create_forwards_size_and_untrimmed_prompt() {
        let provider = StubProvider::returning(b"\x89PNG");
        let app = init_app(provider.clone()).await;

        let (status, body) = post_json(
            &app,
            "/api/create",
            json!({"prompt": "  a lighthouse at dusk ", "size": "1536x1024"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let encoded = body["image_base64"].as_str().unwrap();
        assert_eq!(crate::codec::decode_image(encoded).unwrap(), b"\x89PNG");
        assert_eq!(
            provider.calls(),
            vec![Call::Create {
                prompt: "  a lighthouse at dusk ".into(),
                size: "1536x1024".into()
            }]
        );
    }

    #[actix_web::test]
    async fn test_blank_prompts_are_rejected() {
        let provider = StubProvider::returning(b"PNGDATA");
        let app = init_app(provider.clone()).await;

        for prompt in ["", "   ", "\t\n", "\u{3000}"] {
            let (status, body) = post_json(&app, "/api/create", json!({ "prompt": prompt })).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["detail"], "Prompt is required.");

            let (status, body) = post_json(
                &app,
                "/api/edit",
                json!({ "prompt": prompt, "image_base64": "UE5HREFUQQ==" }),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["detail"], "Edit prompt is required.");
        }

        assert!(provider.calls().is_empty());
    }

    #[actix_web::test]
    async fn test_edit_decodes_and_reencodes() {
        let provider = StubProvider::returning(b"EDITED");
        let app = init_app(provider.clone()).await;

        let (status, body) = post_json(
            &app,
            "/api/edit",
            json!({"prompt": "add a hat", "image_base64": "UE5HREFUQQ=="}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"image_base64": "RURJVEVE"}));
        assert_eq!(
            provider.calls(),
            vec![Call::Edit {
                prompt: "add a hat".into(),
                image: b"PNGDATA".to_vec()
            }]
        );
    }

    #[actix_web::test]
    async fn test_edit_rejects_invalid_image_data() {
        let provider = StubProvider::returning(b"EDITED");
        let app = init_app(provider.clone()).await;

        for image in ["!!!not-base64!!!", "UE5HREFUQQ", "", "   "] {
            let (status, body) = post_json(
                &app,
                "/api/edit",
                json!({"prompt": "add a hat", "image_base64": image}),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["detail"], "Invalid image data.");
        }

        assert!(provider.calls().is_empty());
    }

    #[actix_web::test]
    async fn test_edit_accepts_line_wrapped_image() {
        let provider = StubProvider::returning(b"EDITED");
        let app = init_app(provider.clone()).await;

        let (status, body) = post_json(
            &app,
            "/api/edit",
            json!({"prompt": "add a hat", "image_base64": "UE5H\nREFUQQ=="}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"image_base64": "RURJVEVE"}));
        assert_eq!(
            provider.calls(),
            vec![Call::Edit {
                prompt: "add a hat".into(),
                image: b"PNGDATA".to_vec()
            }]
        );
    }

    #[actix_web::test]
    async fn test_provider_failure_is_bad_gateway() {
        let app = init_app(Arc::new(FailingProvider)).await;

        let (status, body) = post_json(&app, "/api/create", json!({"prompt": "a cat"})).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["detail"], "Image provider request failed.");
        assert!(!body.to_string().contains("exploded"));

        let (status, _) = post_json(
            &app,
            "/api/edit",
            json!({"prompt": "add a hat", "image_base64": "UE5HREFUQQ=="}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[actix_web::test]
    async fn test_malformed_bodies_are_bad_request() {
        let app = init_app(StubProvider::returning(b"PNGDATA")).await;

        let (status, body) = post_json(&app, "/api/create", json!({"size": "1024x1024"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("prompt"));

        let (status, _) = post_json(&app, "/api/edit", json!({"prompt": "add a hat"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/create")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/create")
            .insert_header((header::CONTENT_TYPE, "text/plain"))
            .set_payload("a cat")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"], "Request body must be JSON.");
    }

    #[actix_web::test]
    async fn test_cors_preflight_allows_any_origin() {
        let app = init_app(StubProvider::returning(b"PNGDATA")).await;

        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/api/create")
            .insert_header((header::ORIGIN, "http://localhost:5173"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("http://localhost:5173")
        );
    }

    #[actix_web::test]
    async fn test_cors_wildcard_wins_regardless_of_order() {
        for origins in ["*,http://a.com", "http://a.com,*"] {
            let config = Config::new().with_cors_origins(origins);
            let app = init_app_with(StubProvider::returning(b"PNGDATA"), config).await;

            assert_eq!(preflight_status(&app, "http://b.com").await, StatusCode::OK);
            assert_eq!(preflight_status(&app, "http://a.com").await, StatusCode::OK);
        }
    }

    #[actix_web::test]
    async fn test_cors_explicit_origins_reject_others() {
        let config = Config::new().with_cors_origins("http://a.com");
        let app = init_app_with(StubProvider::returning(b"PNGDATA"), config).await;

        assert_eq!(preflight_status(&app, "http://a.com").await, StatusCode::OK);
        assert_ne!(preflight_status(&app, "http://b.com").await, StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_oversized_body_is_rejected() {
        let provider = StubProvider::returning(b"PNGDATA");
        let config = Config::new().with_max_body_bytes(64);
        let app = init_app_with(provider.clone(), config).await;

        let prompt = "a very detailed cat ".repeat(10);
        let (status, body) = post_json(&app, "/api/create", json!({ "prompt": prompt })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Request body is too large.");
        assert!(provider.calls().is_empty());
    }
}
