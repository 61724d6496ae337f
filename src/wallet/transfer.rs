//! Transfer construction and signing
//!
//! Builds the wallet contract's signed external message for a single
//! value transfer: an internal transfer message wrapped in the v3
//! signing body (subwallet id, expiry, seqno, send mode), signed over
//! the body cell's representation hash.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;

use crate::error::{Error, Result};
use crate::ton::address::TonAddress;
use crate::ton::boc::{serialize_boc, Cell, CellBuilder};

use super::identity::WalletIdentity;

/// Pay forwarding fees from the wallet balance, not the message value
pub const SEND_MODE_PAY_FEES_SEPARATELY: u8 = 1;
/// Ignore action-phase errors instead of bouncing the whole message
pub const SEND_MODE_IGNORE_ERRORS: u8 = 2;
/// Default send mode for payouts
pub const DEFAULT_SEND_MODE: u8 = SEND_MODE_PAY_FEES_SEPARATELY | SEND_MODE_IGNORE_ERRORS;

/// Longest comment that fits the single body cell (32-bit opcode plus
/// text)
pub const MAX_COMMENT_BYTES: usize = 123;

/// One outgoing transfer, fully resolved and ready to sign
///
/// Short-lived: created per issuance after the sequence number is
/// assigned, discarded once the submission outcome is known.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub destination: TonAddress,
    /// Amount in nanotons; always a positive integer
    pub amount: u64,
    pub comment: Option<String>,
    pub seqno: u32,
    pub send_mode: u8,
    /// Unix time after which the message is no longer valid
    pub valid_until: u32,
    /// Attach the wallet's state init (first message of an undeployed
    /// account)
    pub deploy: bool,
}

/// Why a submission was definitively rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The submitted sequence number was already consumed, even after
    /// one re-fetch
    SequenceConflict { submitted: u32 },
    /// The provider refused the message outright
    NotAccepted { detail: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::SequenceConflict { submitted } => {
                write!(f, "sequence number {} already consumed", submitted)
            }
            RejectReason::NotAccepted { detail } => write!(f, "not accepted: {}", detail),
        }
    }
}

/// Terminal result of one issuance
///
/// `Unknown` is a first-class outcome, not an error folded into
/// either side: the message may or may not have been broadcast, and
/// only the caller can decide to re-check chain state before acting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Confirmed { message_hash: String, seqno: u32 },
    Rejected { reason: RejectReason },
    Unknown { message_hash: String },
}

/// A signed external message ready for broadcast
pub struct ExternalMessage {
    /// Base64 bag-of-cells, the wire form the provider accepts
    pub boc_base64: String,
    /// Representation hash of the message cell (base64), usable as a
    /// transaction handle for reconciliation
    pub message_hash: String,
}

/// Reject a comment that cannot fit the body cell
pub fn check_comment(comment: &str) -> Result<()> {
    if comment.len() > MAX_COMMENT_BYTES {
        return Err(Error::Validation(format!(
            "comment of {} bytes exceeds {} byte limit",
            comment.len(),
            MAX_COMMENT_BYTES
        )));
    }
    Ok(())
}

/// Message expiry for a given seqno
///
/// A not-yet-deployed wallet (seqno 0) has no on-chain notion of time
/// to validate against, so its first message is pinned open.
pub fn valid_until(seqno: u32, ttl_secs: u32) -> u32 {
    if seqno == 0 {
        u32::MAX
    } else {
        Utc::now().timestamp() as u32 + ttl_secs
    }
}

/// Build and sign the external message for one transfer
pub fn build_external_message(
    identity: &WalletIdentity,
    request: &TransferRequest,
) -> Result<ExternalMessage> {
    let internal = build_internal_message(request)?;
    let signed_body = build_signed_body(identity, request, internal)?;

    let mut external = CellBuilder::new();
    external.store_uint(0b10, 2)?; // ext_in_msg_info
    external.store_address(None)?; // source unknown
    external.store_address(Some(identity.address()))?;
    external.store_coins(0)?; // import fee
    if request.deploy {
        external.store_bit(true)?;
        external.store_bit(true)?; // state init as a reference
        external.store_ref(identity.state_init().clone())?;
    } else {
        external.store_bit(false)?;
    }
    external.store_bit(true)?; // body as a reference
    external.store_ref(signed_body)?;
    let external = external.build();

    let boc = serialize_boc(&external)?;
    Ok(ExternalMessage {
        boc_base64: STANDARD.encode(&boc),
        message_hash: STANDARD.encode(external.repr_hash()),
    })
}

/// The internal value-transfer message carried by the external one
fn build_internal_message(request: &TransferRequest) -> Result<Cell> {
    let mut msg = CellBuilder::new();
    msg.store_bit(false)?; // int_msg_info
    msg.store_bit(true)?; // ihr disabled
    msg.store_bit(request.destination.is_bounceable())?;
    msg.store_bit(false)?; // not bounced
    msg.store_address(None)?; // source filled in by the chain
    msg.store_address(Some(&request.destination))?;
    msg.store_coins(request.amount)?;
    msg.store_bit(false)?; // no extra currencies
    msg.store_coins(0)?; // ihr fee
    msg.store_coins(0)?; // forward fee
    msg.store_uint(0, 64)?; // created_lt
    msg.store_uint(0, 32)?; // created_at
    msg.store_bit(false)?; // no state init
    match &request.comment {
        Some(comment) => {
            check_comment(comment)?;
            let mut body = CellBuilder::new();
            body.store_uint(0, 32)?; // text comment opcode
            body.store_bytes(comment.as_bytes())?;
            msg.store_bit(true)?;
            msg.store_ref(body.build())?;
        }
        None => {
            msg.store_bit(false)?; // empty body inline
        }
    }
    Ok(msg.build())
}

/// v3 signing body: signature over (wallet id, expiry, seqno, mode,
/// message), prepended to those same fields
fn build_signed_body(
    identity: &WalletIdentity,
    request: &TransferRequest,
    internal: Cell,
) -> Result<Cell> {
    let mut unsigned = CellBuilder::new();
    store_body_fields(&mut unsigned, identity, request, internal.clone())?;
    let signature = identity.sign(&unsigned.build().repr_hash());

    let mut signed = CellBuilder::new();
    signed.store_bytes(&signature)?;
    store_body_fields(&mut signed, identity, request, internal)?;
    Ok(signed.build())
}

fn store_body_fields(
    builder: &mut CellBuilder,
    identity: &WalletIdentity,
    request: &TransferRequest,
    internal: Cell,
) -> Result<()> {
    builder.store_uint(identity.wallet_id() as u64, 32)?;
    builder.store_uint(request.valid_until as u64, 32)?;
    builder.store_uint(request.seqno as u64, 32)?;
    builder.store_uint(request.send_mode as u64, 8)?;
    builder.store_ref(internal)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::identity::{WalletVersion, DEFAULT_WALLET_ID};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_identity() -> WalletIdentity {
        let mut rng = StdRng::seed_from_u64(11);
        let mnemonic = crate::ton::mnemonic::Mnemonic::generate(&mut rng);
        WalletIdentity::initialize(&mnemonic, WalletVersion::V3R2, DEFAULT_WALLET_ID).unwrap()
    }

    fn test_request(identity: &WalletIdentity) -> TransferRequest {
        TransferRequest {
            destination: *identity.address(),
            amount: 500_000_000,
            comment: None,
            seqno: 3,
            send_mode: DEFAULT_SEND_MODE,
            valid_until: 1_700_000_000,
            deploy: false,
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let identity = test_identity();
        let request = test_request(&identity);
        let a = build_external_message(&identity, &request).unwrap();
        let b = build_external_message(&identity, &request).unwrap();
        assert_eq!(a.boc_base64, b.boc_base64);
        assert_eq!(a.message_hash, b.message_hash);
    }

    #[test]
    fn test_seqno_changes_message() {
        let identity = test_identity();
        let mut request = test_request(&identity);
        let a = build_external_message(&identity, &request).unwrap();
        request.seqno = 4;
        let b = build_external_message(&identity, &request).unwrap();
        assert_ne!(a.message_hash, b.message_hash);
    }

    #[test]
    fn test_boc_is_wellformed_base64() {
        let identity = test_identity();
        let message = build_external_message(&identity, &test_request(&identity)).unwrap();
        let bytes = STANDARD.decode(&message.boc_base64).unwrap();
        assert_eq!(&bytes[..4], &[0xb5, 0xee, 0x9c, 0x72]);
    }

    #[test]
    fn test_deploy_attaches_state_init() {
        let identity = test_identity();
        let mut request = test_request(&identity);
        let plain = build_external_message(&identity, &request).unwrap();
        request.deploy = true;
        request.seqno = 0;
        request.valid_until = u32::MAX;
        let deploy = build_external_message(&identity, &request).unwrap();
        // the deploy variant carries the state init cells on top of
        // the signed body
        assert!(deploy.boc_base64.len() > plain.boc_base64.len());
    }

    #[test]
    fn test_comment_carried_in_body() {
        let identity = test_identity();
        let mut request = test_request(&identity);
        let without = build_external_message(&identity, &request).unwrap();
        request.comment = Some("game #412 payout".to_string());
        let with = build_external_message(&identity, &request).unwrap();
        assert_ne!(without.message_hash, with.message_hash);
    }

    #[test]
    fn test_overlong_comment_rejected() {
        assert!(check_comment(&"x".repeat(MAX_COMMENT_BYTES)).is_ok());
        assert!(matches!(
            check_comment(&"x".repeat(MAX_COMMENT_BYTES + 1)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_valid_until_pins_deploy_open() {
        assert_eq!(valid_until(0, 60), u32::MAX);
        assert!(valid_until(1, 60) > 1_600_000_000);
    }
}
