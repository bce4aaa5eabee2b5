//! Terminal chat frontend. Talks to `model-hub-server` over HTTP.
//!
//! ```bash
//! BACKEND_URL=http://127.0.0.1:8000 model-hub
//! MODEL_HUB_UI=plain model-hub
//! ```

use anyhow::{Context, Result};
use model_hub::config::UiConfig;
use model_hub::ui::TerminalUI;
use model_hub::RelayClient;
use tracing::info;

/// Logs go to stderr and only when asked for, so they never interleave with the chat.
fn init_logging() {
    if let Ok(filter) = tracing_subscriber::EnvFilter::try_from_default_env() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let config = UiConfig::from_env().context("invalid frontend configuration")?;
    let client = RelayClient::from_config(&config);
    info!(endpoint = %client.endpoint(), variant = ?config.variant, "starting chat frontend");

    let mut ui = TerminalUI::new(client, config)?;
    ui.run().await?;

    Ok(())
}
