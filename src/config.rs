//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::wallet::identity::{WalletVersion, DEFAULT_WALLET_ID};
use crate::wallet::transfer::DEFAULT_SEND_MODE;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
}

/// Network selector: which chain and which RPC provider endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_network")]
    pub network: Network,

    /// Explicit RPC endpoint override; defaults per network
    #[serde(default)]
    pub endpoint: Option<String>,

    /// RPC provider API key credential
    #[serde(default)]
    pub api_key: String,
}

impl NetworkConfig {
    /// Resolved JSON-RPC endpoint
    pub fn endpoint(&self) -> &str {
        match &self.endpoint {
            Some(endpoint) => endpoint,
            None => match self.network {
                Network::Mainnet => "https://toncenter.com/api/v2/jsonRPC",
                Network::Testnet => "https://testnet.toncenter.com/api/v2/jsonRPC",
            },
        }
    }

    pub fn api_key(&self) -> Option<String> {
        if self.api_key.is_empty() {
            None
        } else {
            Some(self.api_key.clone())
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            endpoint: None,
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// 24-word seed phrase; a secret, never logged or echoed
    #[serde(default)]
    pub mnemonic: String,

    /// Wallet contract version; affects address derivation and
    /// message framing
    #[serde(default = "default_wallet_version")]
    pub version: WalletVersion,

    /// Subwallet id baked into the contract state
    #[serde(default = "default_wallet_id")]
    pub wallet_id: u32,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            mnemonic: String::new(),
            version: default_wallet_version(),
            wallet_id: default_wallet_id(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_elapsed_ms")]
    pub retry_max_elapsed_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_elapsed_ms: default_retry_max_elapsed_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    /// Send-mode flags for outgoing transfers
    #[serde(default = "default_send_mode")]
    pub send_mode: u8,

    /// Nanotons kept above the transfer amount as fee headroom
    #[serde(default = "default_fee_reserve_nano")]
    pub fee_reserve_nano: u64,

    /// Validity window of a signed message, in seconds
    #[serde(default = "default_message_ttl_secs")]
    pub message_ttl_secs: u32,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            send_mode: default_send_mode(),
            fee_reserve_nano: default_fee_reserve_nano(),
            message_ttl_secs: default_message_ttl_secs(),
        }
    }
}

// Default value functions
fn default_network() -> Network {
    Network::Testnet
}

fn default_wallet_version() -> WalletVersion {
    WalletVersion::V3R2
}

fn default_wallet_id() -> u32 {
    DEFAULT_WALLET_ID
}

fn default_timeout_ms() -> u64 {
    30000
}

fn default_retry_base_delay_ms() -> u64 {
    250
}

fn default_retry_max_elapsed_ms() -> u64 {
    10000
}

fn default_send_mode() -> u8 {
    DEFAULT_SEND_MODE
}

fn default_fee_reserve_nano() -> u64 {
    10_000_000 // 0.01 TON
}

fn default_message_ttl_secs() -> u32 {
    60
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix TONPAY_)
            .add_source(
                config::Environment::with_prefix("TONPAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.rpc.timeout_ms == 0 {
            anyhow::bail!("rpc.timeout_ms must be positive");
        }

        if self.rpc.retry_max_elapsed_ms < self.rpc.retry_base_delay_ms {
            anyhow::bail!("rpc.retry_max_elapsed_ms must be at least retry_base_delay_ms");
        }

        if self.transfer.message_ttl_secs == 0 {
            anyhow::bail!("transfer.message_ttl_secs must be positive");
        }

        // The mnemonic itself is validated at identity initialization;
        // here only check for obvious misconfiguration.
        if !self.wallet.mnemonic.is_empty()
            && self.wallet.mnemonic.split_whitespace().count() != 24
        {
            anyhow::bail!("wallet.mnemonic must contain exactly 24 words");
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  Network:
    network: {:?}
    endpoint: {}
    api_key: {}
  Wallet:
    mnemonic: {}
    version: {}
    wallet_id: {}
  RPC:
    timeout: {}ms
    retry_base_delay: {}ms
    retry_max_elapsed: {}ms
  Transfer:
    send_mode: {}
    fee_reserve: {} nanoton
    message_ttl: {}s
"#,
            self.network.network,
            self.network.endpoint(),
            if self.network.api_key.is_empty() {
                "(not set)"
            } else {
                "***"
            },
            if self.wallet.mnemonic.is_empty() {
                "(not set)"
            } else {
                "*** (24 words)"
            },
            self.wallet.version,
            self.wallet.wallet_id,
            self.rpc.timeout_ms,
            self.rpc.retry_base_delay_ms,
            self.rpc.retry_max_elapsed_ms,
            self.transfer.send_mode,
            self.transfer.fee_reserve_nano,
            self.transfer.message_ttl_secs,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            wallet: WalletConfig::default(),
            rpc: RpcConfig::default(),
            transfer: TransferConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.network.network, Network::Testnet);
        assert_eq!(config.wallet.version, WalletVersion::V3R2);
        assert_eq!(config.transfer.send_mode, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoint_follows_network() {
        let mut config = NetworkConfig::default();
        assert!(config.endpoint().contains("testnet"));
        config.network = Network::Mainnet;
        assert!(!config.endpoint().contains("testnet"));
        config.endpoint = Some("http://localhost:8081/jsonRPC".to_string());
        assert_eq!(config.endpoint(), "http://localhost:8081/jsonRPC");
    }

    #[test]
    fn test_masked_display_hides_secrets() {
        let mut config = Config::default();
        config.network.api_key = "super-secret-key".to_string();
        config.wallet.mnemonic = "twenty four secret words".to_string();
        let display = config.masked_display();
        assert!(!display.contains("super-secret-key"));
        assert!(!display.contains("secret words"));
    }

    #[test]
    fn test_validate_rejects_partial_mnemonic() {
        let mut config = Config::default();
        config.wallet.mnemonic = "only three words".to_string();
        assert!(config.validate().is_err());
    }
}
