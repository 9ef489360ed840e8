//! Shopfront CLI - Database migrations and interactive cart sessions.
//!
//! # Usage
//!
//! ```bash
//! # Run persistence API database migrations
//! shop-cli migrate
//!
//! # Start a cart session against a running persistence API
//! shop-cli session --api-url http://127.0.0.1:3000
//!
//! # Start a cart session backed by process memory
//! shop-cli session --offline
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `session` - Interactive cart session (type `help` at the prompt)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use url::Url;

mod commands;

#[derive(Parser)]
#[command(name = "shop-cli")]
#[command(author, version, about = "Shopfront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Start an interactive cart session
    Session {
        /// Base URL of the persistence API (default: `SHOPFRONT_API_URL`)
        #[arg(long)]
        api_url: Option<Url>,

        /// Keep carts in process memory instead of calling the API
        #[arg(long, conflicts_with = "api_url")]
        offline: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shop_cli=info,shopfront_storefront=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Session { api_url, offline } => {
            commands::session::run(api_url, offline).await?;
        }
    }
    Ok(())
}
