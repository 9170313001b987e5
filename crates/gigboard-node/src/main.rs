use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gigboard_node::{logging, GigNode, NodeConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "gigboard")]
#[command(about = "Gigboard - freelance marketplace service core", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gigboard node
    Start {
        /// Host to bind the HTTP API to
        #[arg(long)]
        host: Option<String>,

        /// Port for the HTTP API
        #[arg(long)]
        port: Option<u16>,
    },

    /// Write a default configuration file
    Init {
        /// Output directory for the configuration
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => NodeConfig::default(),
    };

    match cli.command {
        Commands::Start { host, port } => {
            if let Some(host) = host {
                config.api.host = host;
            }
            if let Some(port) = port {
                config.api.port = port;
            }
            logging::init_logging(&config.logging, cli.verbose)?;
            info!(name = %config.node.name, "✨ Node initialized");

            let node = GigNode::new(config)?;
            node.start().await
        }
        Commands::Init { output } => {
            let path = output.join("gigboard.toml");
            NodeConfig::default().to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
            Ok(())
        }
    }
}
