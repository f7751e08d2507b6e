use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use weather_core::{Config, ProviderId};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-dashboard", version, about = "Weather dashboard backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server.
    Serve {
        /// Interface to bind; overrides the config file.
        #[arg(long)]
        host: Option<String>,

        /// Port to bind; overrides the config file and PORT.
        #[arg(long)]
        port: Option<u16>,

        /// Directory with the browser frontend.
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "tomorrow" or "openai".
        provider: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Serve {
                host,
                port,
                static_dir,
            } => {
                let mut config = Config::load_with_env()?;
                if let Some(host) = host {
                    config.server.host = host;
                }
                if let Some(port) = port {
                    config.server.port = port;
                }
                if let Some(dir) = static_dir {
                    config.server.static_dir = dir;
                }
                weather_server::serve(config).await
            }
            Command::Configure { provider } => configure(&provider),
        }
    }
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    if config.is_provider_configured(id) {
        let replace = inquire::Confirm::new(&format!("An API key for '{id}' exists. Replace it?"))
            .with_default(false)
            .prompt()
            .context("Prompt aborted")?;
        if !replace {
            println!("Keeping the existing key for '{id}'.");
            return Ok(());
        }
    }

    let api_key = inquire::Password::new(&format!("API key for '{id}':"))
        .without_confirmation()
        .prompt()
        .context("Prompt aborted")?;

    let api_key = api_key.trim();
    if api_key.is_empty() {
        anyhow::bail!("API key must not be empty");
    }

    config.upsert_provider_api_key(id, api_key.to_string());
    config.save()?;

    println!(
        "Saved API key for '{id}' to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}
