use std::env;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-image-1";
pub const DEFAULT_BEDROCK_MODEL: &str = "amazon.titan-image-generator-v1";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct BedrockConfig {
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub model_id: String,
}

#[derive(Debug, Clone)]
pub enum ProviderConfig {
    OpenAi(OpenAiConfig),
    Bedrock(BedrockConfig),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_body_bytes: usize,
    pub provider: ProviderConfig,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        OpenAiConfig {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }
}

impl OpenAiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());
        let base_url =
            lookup("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
        let model =
            lookup("OPENAI_IMAGE_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());

        OpenAiConfig {
            api_key,
            base_url,
            model,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl Default for BedrockConfig {
    fn default() -> Self {
        BedrockConfig {
            region: None,
            access_key: None,
            secret_key: None,
            model_id: DEFAULT_BEDROCK_MODEL.to_string(),
        }
    }
}

impl BedrockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let region = lookup("AWS_REGION").or_else(|| lookup("AWS_DEFAULT_REGION"));
        let access_key = lookup("AWS_ACCESS_KEY_ID");
        let secret_key = lookup("AWS_SECRET_ACCESS_KEY");
        let model_id =
            lookup("BEDROCK_IMAGE_MODEL").unwrap_or_else(|| DEFAULT_BEDROCK_MODEL.to_string());

        BedrockConfig {
            region,
            access_key,
            secret_key,
            model_id,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }
}

impl ProviderConfig {
    /// Reads `IMAGE_PROVIDER` (`openai` or `bedrock`, default `openai`).
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        match lookup("IMAGE_PROVIDER")
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "bedrock" => ProviderConfig::Bedrock(BedrockConfig::from_lookup(lookup)),
            other => {
                if !other.is_empty() && other != "openai" {
                    log::warn!("Unknown IMAGE_PROVIDER '{}', using openai", other);
                }
                ProviderConfig::OpenAi(OpenAiConfig::from_lookup(lookup))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProviderConfig::OpenAi(_) => "openai",
            ProviderConfig::Bedrock(_) => "bedrock",
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            cors_allowed_origins: vec!["*".to_string()],
            max_body_bytes: 20 * 1024 * 1024,
            provider: ProviderConfig::OpenAi(OpenAiConfig::default()),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    /// Builds the configuration from any key lookup; unset or unparsable
    /// values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();
        let host = lookup("HOST").unwrap_or(defaults.host);
        let port = lookup("PORT")
            .and_then(|port| port.trim().parse().ok())
            .unwrap_or(defaults.port);
        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|origins| parse_origins(&origins))
            .unwrap_or(defaults.cors_allowed_origins);
        let max_body_bytes = lookup("MAX_BODY_MB")
            .and_then(|mb| mb.trim().parse::<usize>().ok())
            .filter(|mb| *mb > 0)
            .and_then(|mb| mb.checked_mul(1024 * 1024))
            .unwrap_or(defaults.max_body_bytes);

        Config {
            host,
            port,
            cors_allowed_origins,
            max_body_bytes,
            provider: ProviderConfig::from_lookup(lookup),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_cors_origins(mut self, origins: &str) -> Self {
        self.cors_allowed_origins = parse_origins(origins);
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn with_openai(mut self, config: OpenAiConfig) -> Self {
        self.provider = ProviderConfig::OpenAi(config);
        self
    }

    pub fn with_bedrock(mut self, config: BedrockConfig) -> Self {
        self.provider = ProviderConfig::Bedrock(config);
        self
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_allowed_origins.iter().any(|origin| origin == "*")
    }
}

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn parse_origins(origins: &str) -> Vec<String> {
    let parsed: Vec<String> = origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect();
    if parsed.is_empty() {
        vec!["*".to_string()]
    } else {
        parsed
    }
}
