//! TON ledger primitives: addresses, cells, mnemonics, units

pub mod address;
pub mod boc;
pub mod mnemonic;
pub mod units;

pub use address::TonAddress;
pub use mnemonic::Mnemonic;
