//! tonpay - custodial TON payout wallet manager
//!
//! Holds one hot wallet's key material, tracks its on-chain sequence
//! number, signs and broadcasts value transfers, and answers balance
//! queries. The surrounding payout service calls in through
//! [`wallet::WalletSession`].

pub mod cli;
pub mod config;
pub mod error;
pub mod rpc;
pub mod ton;
pub mod wallet;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use ton::{Mnemonic, TonAddress};
pub use wallet::{TransferOutcome, WalletIdentity, WalletSession, WalletVersion};
