use anyhow::Result;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use reveal::config::AppConfig;

const DEFAULT_CONFIG_PATH: &str = "reveal.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let mut args = std::env::args().skip(1);
    let first = args.next();

    // `reveal init-config [path]` writes the defaults and exits
    if first.as_deref() == Some("init-config") {
        let path = config_path(args.next());
        AppConfig::default().save(&path)?;
        info!(path = %path.display(), "Wrote default configuration");
        return Ok(());
    }

    let config = AppConfig::load(config_path(first))?;
    reveal::server::start_server(config).await
}

fn config_path(arg: Option<String>) -> PathBuf {
    arg.or_else(|| std::env::var("REVEAL_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
