//! Wallet identity: key material and address derivation
//!
//! Derives the hot wallet's ed25519 keypair and canonical address
//! deterministically from the configured seed phrase and wallet
//! contract version. No local record of the wallet is persisted; the
//! identity is fully reconstructible from configuration, which is what
//! makes the service crash-recoverable.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::ton::address::TonAddress;
use crate::ton::boc::{Cell, CellBuilder};
use crate::ton::mnemonic::Mnemonic;

/// Default subwallet id used by v3 wallet contracts on the basechain
pub const DEFAULT_WALLET_ID: u32 = 698_983_191;

/// Wallet v3 r1 contract bytecode (a single data-only cell)
const WALLET_V3R1_CODE: &str = "ff0020dd2082014c97ba9730ed44d0d70b1fe0a4f2608308d71820d31fd31fd31ff82313bbf263ed44d0d31fd31fd3ffd15132baf2a15144baf2a204f901541055f910f2a3f8009320d74a96d307d402fb00e8d101a4c8cb1fcb1fcbffc9ed54";

/// Wallet v3 r2 contract bytecode (adds the subwallet-id guard)
const WALLET_V3R2_CODE: &str = "ff0020dd2082014c97ba218201339cbab19f71b0ed44d0d31fd31f31d70bffe304e0a4f2608308d71820d31fd31fd31ff82313bbf263ed44d0d31fd31fd3ffd15132baf2a15144baf2a204f901541055f910f2a3f8009320d74a96d307d402fb00e8d101a4c8cb1fcb1fcbffc9ed54";

/// Wallet contract version
///
/// Explicit configuration, never hardcoded: address derivation and
/// message framing both depend on it. v4+ is out of scope (its plugin
/// interface is general smart-contract surface).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletVersion {
    V3R1,
    V3R2,
}

impl WalletVersion {
    fn code(&self) -> &'static str {
        match self {
            WalletVersion::V3R1 => WALLET_V3R1_CODE,
            WalletVersion::V3R2 => WALLET_V3R2_CODE,
        }
    }
}

impl FromStr for WalletVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "v3r1" => Ok(WalletVersion::V3R1),
            "v3r2" => Ok(WalletVersion::V3R2),
            other => Err(Error::Config(format!(
                "unsupported wallet version: {} (expected v3r1 or v3r2)",
                other
            ))),
        }
    }
}

impl fmt::Display for WalletVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletVersion::V3R1 => write!(f, "v3r1"),
            WalletVersion::V3R2 => write!(f, "v3r2"),
        }
    }
}

/// The hot wallet's identity: keypair, contract version, address
///
/// Created once per process lifetime. The signing key lives only
/// inside this struct; nothing returns it, logs it, or serializes it.
pub struct WalletIdentity {
    signing_key: SigningKey,
    public_key: VerifyingKey,
    version: WalletVersion,
    wallet_id: u32,
    state_init: Cell,
    address: TonAddress,
}

impl WalletIdentity {
    /// Derive the identity from a validated seed phrase
    ///
    /// Deterministic: the same phrase, version, and wallet id always
    /// yield the same keypair and address.
    pub fn initialize(mnemonic: &Mnemonic, version: WalletVersion, wallet_id: u32) -> Result<Self> {
        let signing_key = mnemonic.to_signing_key();
        let public_key = signing_key.verifying_key();

        let state_init = build_state_init(version, wallet_id, &public_key.to_bytes())?;
        let address = TonAddress::new(0, state_init.repr_hash());

        info!(address = %address, version = %version, "wallet identity initialized");

        Ok(Self {
            signing_key,
            public_key,
            version,
            wallet_id,
            state_init,
            address,
        })
    }

    pub fn address(&self) -> &TonAddress {
        &self.address
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.public_key.to_bytes()
    }

    pub fn version(&self) -> WalletVersion {
        self.version
    }

    pub fn wallet_id(&self) -> u32 {
        self.wallet_id
    }

    /// The contract's initial state, attached to the first outgoing
    /// message when the account is not yet deployed
    pub(crate) fn state_init(&self) -> &Cell {
        &self.state_init
    }

    /// Sign a cell representation hash with the wallet's secret key
    pub(crate) fn sign(&self, hash: &[u8; 32]) -> [u8; 64] {
        self.signing_key.sign(hash).to_bytes()
    }
}

impl fmt::Debug for WalletIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletIdentity")
            .field("address", &self.address)
            .field("version", &self.version)
            .field("wallet_id", &self.wallet_id)
            .finish_non_exhaustive()
    }
}

/// StateInit cell: no split depth, not special, code + data refs, no
/// libraries. Its representation hash is the account address.
fn build_state_init(version: WalletVersion, wallet_id: u32, public_key: &[u8; 32]) -> Result<Cell> {
    let code_bytes = hex::decode(version.code())
        .map_err(|e| Error::Config(format!("bad embedded wallet code: {}", e)))?;
    let code = Cell::from_bytes(&code_bytes)?;

    // Initial contract data: seqno 0, subwallet id, owner public key
    let mut data = CellBuilder::new();
    data.store_uint(0, 32)?;
    data.store_uint(wallet_id as u64, 32)?;
    data.store_bytes(public_key)?;

    let mut state_init = CellBuilder::new();
    state_init.store_bit(false)?; // no split depth
    state_init.store_bit(false)?; // not special
    state_init.store_bit(true)?; // code present
    state_init.store_bit(true)?; // data present
    state_init.store_bit(false)?; // no libraries
    state_init.store_ref(code)?;
    state_init.store_ref(data.build())?;
    Ok(state_init.build())
}
