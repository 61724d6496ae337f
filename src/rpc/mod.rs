//! Ledger RPC provider
//!
//! `LedgerProvider` is the seam between the wallet core and the remote
//! ledger: sequence-number/state reads, balance reads, and raw message
//! broadcast. The production implementation speaks toncenter JSON-RPC
//! over HTTP; tests substitute a scripted in-memory provider.

pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use crate::ton::address::TonAddress;

pub use client::TonCenterClient;

/// On-chain state of a wallet account, as one read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletInfo {
    /// Spendable balance in nanotons
    pub balance: u64,
    /// Current sequence number; 0 for an account with no history
    pub seqno: u32,
    /// Whether the account contract is deployed
    pub active: bool,
}

/// Remote ledger operations used by the wallet core
///
/// All reads are side-effect free and safe at unbounded concurrency;
/// `send_boc` broadcasts a signed message and is serialized upstream.
#[async_trait]
pub trait LedgerProvider: Send + Sync {
    /// Read balance, seqno, and deployment state in one round trip
    async fn wallet_information(&self, address: &TonAddress) -> Result<WalletInfo>;

    /// Read the spendable balance of any address, in nanotons
    async fn address_balance(&self, address: &TonAddress) -> Result<u64>;

    /// Broadcast a base64 bag-of-cells; returns the provider-reported
    /// message hash
    ///
    /// Errors map the ambiguity of broadcast: `Network` means the
    /// message never left (safe to retry), `SequenceConflict` and
    /// `MessageRejected` are definitive refusals, and `UnknownOutcome`
    /// means the request timed out after it may have reached the
    /// network.
    async fn send_boc(&self, boc_base64: &str) -> Result<String>;
}
