//! CLI command implementations

use anyhow::Result;
use dialoguer::Confirm;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::rpc::TonCenterClient;
use crate::ton::mnemonic::Mnemonic;
use crate::ton::units;
use crate::wallet::identity::WalletIdentity;
use crate::wallet::session::{TransferPolicy, WalletSession};
use crate::wallet::transfer::TransferOutcome;

/// Build the wallet identity from configuration
fn identity(config: &Config) -> Result<WalletIdentity> {
    if config.wallet.mnemonic.is_empty() {
        anyhow::bail!(
            "wallet mnemonic is not configured (set TONPAY__WALLET__MNEMONIC or wallet.mnemonic)"
        );
    }
    let mnemonic = Mnemonic::parse(&config.wallet.mnemonic)?;
    Ok(WalletIdentity::initialize(
        &mnemonic,
        config.wallet.version,
        config.wallet.wallet_id,
    )?)
}

/// Open a session against the configured RPC provider
fn open_session(config: &Config) -> Result<WalletSession> {
    let identity = identity(config)?;
    let client = TonCenterClient::new(
        config.network.endpoint().to_string(),
        config.network.api_key(),
        &config.rpc,
    )?;
    let policy = TransferPolicy {
        send_mode: config.transfer.send_mode,
        fee_reserve: config.transfer.fee_reserve_nano,
        message_ttl_secs: config.transfer.message_ttl_secs,
    };
    Ok(WalletSession::open(identity, Arc::new(client), policy))
}

/// Show the hot wallet's address in both encodings
pub fn address(config: &Config) -> Result<()> {
    let identity = identity(config)?;
    let address = identity.address();
    println!("Wallet address ({}):", identity.version());
    println!("  friendly: {}", address);
    println!("  raw:      {}", address.to_raw());
    Ok(())
}

/// Show the balance of the hot wallet or an arbitrary address
pub async fn balance(config: &Config, address: Option<String>) -> Result<()> {
    let session = open_session(config)?;
    let target = match &address {
        Some(addr) => addr.clone(),
        None => session.address().to_string(),
    };
    let balance = session.balance_of(&target).await?;
    println!("{} TON", balance);
    Ok(())
}

/// Show the hot wallet's current on-chain sequence number
pub async fn seqno(config: &Config) -> Result<()> {
    let session = open_session(config)?;
    let seqno = session.seqno().await?;
    println!("{}", seqno);
    Ok(())
}

/// Issue a payout transfer
pub async fn send(
    config: &Config,
    to: &str,
    amount_ton: &str,
    comment: Option<String>,
    force: bool,
) -> Result<()> {
    let amount = units::to_nano(amount_ton)?;
    let session = open_session(config)?;

    info!(
        "Sending {} TON from {} to {}",
        units::from_nano(amount),
        session.address(),
        to
    );

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Send {} TON to {}?", units::from_nano(amount), to))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    match session.issue(to, amount, comment.as_deref()).await? {
        TransferOutcome::Confirmed { message_hash, seqno } => {
            info!("Transfer confirmed (seqno {})", seqno);
            println!("Confirmed.");
            println!("  message hash: {}", message_hash);
            println!("  seqno:        {}", seqno);
        }
        TransferOutcome::Rejected { reason } => {
            warn!("Transfer rejected: {}", reason);
            println!("Rejected: {}", reason);
        }
        TransferOutcome::Unknown { message_hash } => {
            warn!("Transfer outcome unknown");
            println!("UNKNOWN OUTCOME - the transfer may or may not have been broadcast.");
            println!("Do NOT resend before checking chain state for message {}", message_hash);
        }
    }
    Ok(())
}

/// Generate a fresh seed phrase
pub fn generate() -> Result<()> {
    let mnemonic = Mnemonic::generate(&mut rand::thread_rng());
    println!("{}", mnemonic.phrase());
    eprintln!();
    eprintln!("Store this phrase securely; it is the only way to recover the wallet.");
    Ok(())
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}
