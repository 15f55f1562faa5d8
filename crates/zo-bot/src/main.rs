//! zo grid bot entry point.
//!
//! Single long-running command, no arguments; configuration comes from
//! the environment. Exit code 0 on clean shutdown, non-zero on
//! configuration or authentication failure.

use anyhow::Result;
use tracing::info;

use zo_bot::{Application, BotConfig};

#[tokio::main]
async fn main() -> Result<()> {
    zo_bot::logging::init_logging();

    info!("starting zo-bot v{}", env!("CARGO_PKG_VERSION"));

    let config = BotConfig::from_env()?;
    info!(?config, "configuration loaded");

    let app = Application::new(config)?;
    app.run().await?;

    info!("clean shutdown");
    Ok(())
}
