// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::error;

use clawbridge::config::BridgeConfig;

/// Standalone runner for the gateway↔engine bridge.
#[derive(Debug, Parser)]
#[command(name = "clawbridge", version)]
struct Cli {
    /// Path to a plugin-config JSON file; environment variables win over it.
    #[arg(long, env = "CLAWBRIDGE_CONFIG")]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let plugin_config = match load_plugin_config(cli.config.as_deref()) {
        Ok(value) => value,
        Err(e) => {
            error!("fatal: {e:#}");
            std::process::exit(1);
        }
    };
    let config = BridgeConfig::resolve(&plugin_config);

    if let Err(e) = clawbridge::run(config).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

fn load_plugin_config(path: Option<&std::path::Path>) -> anyhow::Result<serde_json::Value> {
    let Some(path) = path else {
        return Ok(serde_json::Value::Null);
    };
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
