use imagegen_service::{build_provider, logger, server, Config};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    logger::init()?;
    if dotenv_loaded {
        log::info!("✅ .env file loaded");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = Config::from_env();
    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), &config);
    logger::log_config_info(&config);

    let provider = match build_provider(&config.provider).await {
        Ok(provider) => provider,
        Err(e) => {
            log::error!("❌ Failed to initialize image provider: {}", e);
            return Err(e.into());
        }
    };

    server::run(config, provider).await?;

    log::info!("👋 Server stopped");
    Ok(())
}
