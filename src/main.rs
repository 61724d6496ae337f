//! tonpay - custodial TON payout wallet manager
//!
//! # WARNING
//! - This tool moves real funds from a hot wallet.
//! - The seed phrase is the wallet. Anyone holding it holds the money.
//! - An UNKNOWN transfer outcome means exactly that: reconcile against
//!   chain state before resending anything.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

// Use the library crate
use tonpay::cli::commands;
use tonpay::config::Config;

/// Custodial TON payout wallet manager
#[derive(Parser)]
#[command(name = "tonpay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the hot wallet's address
    Address,

    /// Show a balance (the hot wallet's by default)
    Balance {
        /// Address to query instead of the hot wallet
        address: Option<String>,
    },

    /// Show the hot wallet's current sequence number
    Seqno,

    /// Send TON to an address
    Send {
        /// Destination address (raw or user-friendly form)
        to: String,

        /// Amount in TON, e.g. "0.5"
        amount: String,

        /// Attach a text comment to the transfer
        #[arg(long)]
        comment: Option<String>,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Generate a fresh wallet seed phrase
    Generate,

    /// Show current configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tonpay=info".parse().unwrap()),
        )
        .with_target(true)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Address => commands::address(&config),
        Commands::Balance { address } => commands::balance(&config, address).await,
        Commands::Seqno => commands::seqno(&config).await,
        Commands::Send {
            to,
            amount,
            comment,
            force,
        } => commands::send(&config, &to, &amount, comment, force).await,
        Commands::Generate => commands::generate(),
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
