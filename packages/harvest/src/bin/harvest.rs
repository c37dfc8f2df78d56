//! Harvest CLI
//!
//! Runs the items of a config file and prints their JSON to stdout.
//! Logs go to stderr.

use anyhow::{Context as _, Result};
use clap::Parser;
use harvest::{Config, Context, Runner, Settings};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "harvest")]
#[command(about = "Extract typed JSON from JSON, HTML and XML documents")]
struct Cli {
    /// Path to the JSON config file
    config: PathBuf,

    /// Run a single item by name
    #[arg(long)]
    item: Option<String>,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,harvest=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .init();

    let cli = Cli::parse();

    let settings = Settings::from_env().context("Invalid HARVEST_* environment settings")?;
    let config = Config::from_path(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
    let context = Context::from_settings(&settings).context("Failed to build HTTP client")?;
    let runner = Runner::new(context);

    let output = match &cli.item {
        Some(name) => {
            let item = config
                .item(name)
                .with_context(|| format!("No item named {name} in config"))?;
            harvest::populate_references(runner.context(), &config.references).await;
            runner.run_item(item).await.json
        }
        None => {
            let results = runner.run(&config).await;
            let entries: Vec<String> = results
                .iter()
                .map(|(name, result)| {
                    format!("{}:{}", serde_json::Value::from(name.as_str()), result.json)
                })
                .collect();
            format!("{{{}}}", entries.join(","))
        }
    };

    if cli.pretty {
        let value: serde_json::Value =
            serde_json::from_str(&output).context("Output is not valid JSON")?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{output}");
    }

    Ok(())
}
