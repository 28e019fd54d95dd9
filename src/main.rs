use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use site_content::config::Config;
use site_content::server::{self, AppState};
use site_content::store::ContentStore;
use site_content::translator::HttpTranslator;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("site_content=info".parse()?),
        )
        .init();

    info!("Starting site content service");

    let config = Config::from_env()?;

    if let Some(parent) = std::path::Path::new(&config.database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let store = ContentStore::open(&config.database_path)?;

    let translator = Arc::new(HttpTranslator::new(reqwest::Client::new(), &config));
    let state = AppState::new(store, translator, &config);
    let app = server::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
