//! Wallet session: the owning handle for all wallet operations
//!
//! One explicitly constructed value per process owns the identity, the
//! ledger provider, and the transfer serializer; every operation hangs
//! off it. Reads run lock-free at any concurrency; issuance serializes
//! through the admission gate so sequence numbers are never reused.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::rpc::LedgerProvider;
use crate::ton::address::TonAddress;
use crate::ton::units;

use super::identity::WalletIdentity;
use super::serializer::TransferSerializer;
use super::transfer::{
    self, RejectReason, TransferOutcome, TransferRequest, DEFAULT_SEND_MODE,
};

/// Issuance policy knobs, sourced from configuration
#[derive(Debug, Clone)]
pub struct TransferPolicy {
    /// Send-mode flags stamped on every transfer
    pub send_mode: u8,
    /// Headroom kept above the transfer amount for fees
    pub fee_reserve: u64,
    /// Validity window for signed messages
    pub message_ttl_secs: u32,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            send_mode: DEFAULT_SEND_MODE,
            fee_reserve: 10_000_000, // 0.01 TON
            message_ttl_secs: 60,
        }
    }
}

/// A live session over one hot wallet
pub struct WalletSession {
    identity: WalletIdentity,
    provider: Arc<dyn LedgerProvider>,
    serializer: TransferSerializer,
    policy: TransferPolicy,
}

impl WalletSession {
    /// Open a session over an initialized identity
    pub fn open(
        identity: WalletIdentity,
        provider: Arc<dyn LedgerProvider>,
        policy: TransferPolicy,
    ) -> Self {
        info!(address = %identity.address(), "wallet session opened");
        Self {
            identity,
            provider,
            serializer: TransferSerializer::new(),
            policy,
        }
    }

    /// The wallet's canonical address
    pub fn address(&self) -> &TonAddress {
        self.identity.address()
    }

    /// Current on-chain sequence number (pure read)
    pub async fn seqno(&self) -> Result<u32> {
        Ok(self.provider.wallet_information(self.address()).await?.seqno)
    }

    /// Own spendable balance in nanotons (pure read)
    pub async fn balance(&self) -> Result<u64> {
        self.provider.address_balance(self.address()).await
    }

    /// Spendable balance of any address, as an exact decimal TON
    /// string (pure read)
    pub async fn balance_of(&self, address: &str) -> Result<String> {
        let address = TonAddress::parse(address)?;
        let nano = self.provider.address_balance(&address).await?;
        Ok(units::from_nano(nano))
    }

    /// Issue a value transfer to `destination`
    ///
    /// `amount` is in nanotons and must be positive. Preconditions are
    /// checked before any network traffic. At most one issuance per
    /// session is in flight at a time; a caller that drops this future
    /// before admission leaves no trace.
    ///
    /// This method performs no deduplication: the payout collaborator
    /// owns the idempotency key for each logical payout, and must not
    /// reissue one whose previous outcome was `Unknown` without first
    /// reconciling against chain state.
    pub async fn issue(
        &self,
        destination: &str,
        amount: u64,
        comment: Option<&str>,
    ) -> Result<TransferOutcome> {
        // Fail fast, before admission and before any network call.
        if amount == 0 {
            return Err(Error::Validation(
                "transfer amount must be positive".to_string(),
            ));
        }
        let destination = TonAddress::parse(destination)?;
        if let Some(comment) = comment {
            transfer::check_comment(comment)?;
        }

        let mut permit = self.serializer.admit().await;

        // Resolve the sequence number: trust the cache from the
        // immediately preceding confirmed transfer when present (one
        // balance read instead of a wallet-state read), otherwise ask
        // the oracle. Either path costs exactly one read round trip.
        let (mut seqno, mut deploy) = match permit.cached_next_seqno() {
            Some(next) => {
                let balance = self.provider.address_balance(self.address()).await?;
                self.ensure_funded(balance, amount)?;
                (next, false)
            }
            None => self.fresh_wallet_state(amount).await?,
        };

        let mut refetched = false;
        loop {
            let request = TransferRequest {
                destination,
                amount,
                comment: comment.map(str::to_string),
                seqno,
                send_mode: self.policy.send_mode,
                valid_until: transfer::valid_until(seqno, self.policy.message_ttl_secs),
                deploy,
            };
            let message = transfer::build_external_message(&self.identity, &request)?;

            debug!(seqno, amount, destination = %destination, "submitting transfer");
            match self.provider.send_boc(&message.boc_base64).await {
                Ok(provider_hash) => {
                    permit.record_confirmed(seqno);
                    let message_hash = if provider_hash.is_empty() {
                        message.message_hash
                    } else {
                        provider_hash
                    };
                    info!(seqno, amount, hash = %message_hash, "transfer confirmed by provider");
                    return Ok(TransferOutcome::Confirmed { message_hash, seqno });
                }
                Err(Error::SequenceConflict(detail)) => {
                    permit.invalidate();
                    if refetched {
                        warn!(seqno, detail = %detail, "sequence conflict persisted after re-fetch");
                        return Ok(TransferOutcome::Rejected {
                            reason: RejectReason::SequenceConflict { submitted: seqno },
                        });
                    }
                    warn!(seqno, detail = %detail, "sequence conflict, re-fetching and retrying once");
                    refetched = true;
                    let (fresh_seqno, fresh_deploy) = self.fresh_wallet_state(amount).await?;
                    seqno = fresh_seqno;
                    deploy = fresh_deploy;
                }
                Err(Error::MessageRejected(detail)) => {
                    permit.invalidate();
                    warn!(seqno, detail = %detail, "transfer rejected by provider");
                    return Ok(TransferOutcome::Rejected {
                        reason: RejectReason::NotAccepted { detail },
                    });
                }
                Err(Error::UnknownOutcome(detail)) => {
                    // The message may have been broadcast. Do not
                    // retry, do not reuse the cached seqno.
                    permit.invalidate();
                    warn!(seqno, detail = %detail, "transfer outcome unknown");
                    return Ok(TransferOutcome::Unknown {
                        message_hash: message.message_hash,
                    });
                }
                Err(e) => {
                    // Transport failure before broadcast: nothing was
                    // consumed, surface to the caller.
                    return Err(e);
                }
            }
        }
    }

    /// One oracle read: seqno, balance precheck, deployment state
    async fn fresh_wallet_state(&self, amount: u64) -> Result<(u32, bool)> {
        let info = self.provider.wallet_information(self.address()).await?;
        self.ensure_funded(info.balance, amount)?;
        Ok((info.seqno, !info.active))
    }

    fn ensure_funded(&self, balance: u64, amount: u64) -> Result<()> {
        let required = amount.saturating_add(self.policy.fee_reserve);
        if balance < required {
            return Err(Error::InsufficientFunds {
                available: balance,
                required,
            });
        }
        Ok(())
    }
}
