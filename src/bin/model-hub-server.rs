//! Chat endpoint: `POST /chat` relayed to the Gemini API.
//!
//! ```bash
//! GEMINI_API_KEY=... model-hub-server
//! RUST_LOG=debug MODEL_HUB_BIND=0.0.0.0:8000 model-hub-server
//! ```

use anyhow::{Context, Result};
use model_hub::config::ServerConfig;
use model_hub::server;

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("model_hub=info,tower_http=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    // A missing key should stop us here, not surface later as an upstream 401.
    let config = ServerConfig::from_env().context("cannot start chat endpoint")?;
    server::serve(config).await
}
