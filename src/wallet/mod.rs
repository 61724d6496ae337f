//! Wallet core: identity, serialization, transfer issuance
//!
//! # Architecture
//!
//! ```text
//! WalletIdentity ──┐
//!                  ├─→ WalletSession ──→ LedgerProvider
//! TransferSerializer┘        │
//!                     TransferRequest / TransferOutcome
//! ```
//!
//! One `WalletSession` per process owns the key material and the
//! single-writer issuance path; reads bypass both.

pub mod identity;
pub mod serializer;
pub mod session;
pub mod transfer;

pub use identity::{WalletIdentity, WalletVersion, DEFAULT_WALLET_ID};
pub use serializer::TransferSerializer;
pub use session::{TransferPolicy, WalletSession};
pub use transfer::{RejectReason, TransferOutcome, TransferRequest, DEFAULT_SEND_MODE};
