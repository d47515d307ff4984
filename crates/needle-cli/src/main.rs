//! Needle CLI - find structured needles hidden in a text haystack.

use anyhow::Context;
use clap::Parser;
use needle_cli::commands;
use needle_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays clean for results
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(Cli::parse()).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // Determine output format
    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);

    // Determine color setting
    let color_enabled = !cli.no_color && config.settings.color;

    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Extract(args) => {
            commands::execute_extract(args, &config, &formatter)
                .await
                .context("Extraction failed")?;
        }
        Command::Schemas => {
            commands::execute_schemas(&config, &formatter)?;
        }
        Command::Config(args) => {
            commands::execute_config(args, &config, cli.config.as_deref(), &formatter)?;
        }
    }

    Ok(())
}
