//! toncenter JSON-RPC client
//!
//! One HTTP provider serves all three outbound operations: wallet
//! state reads, balance reads, and raw message broadcast. Reads are
//! retried with bounded exponential backoff. Broadcast is retried only
//! when the message provably never left (connect failure or an
//! explicit rate limit); a timeout after the request was sent becomes
//! an `UnknownOutcome`, never a silent retry.

use std::time::Duration;

use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::RpcConfig;
use crate::error::{Error, Result};
use crate::ton::address::TonAddress;

use super::types::{
    AddressParams, RpcRequest, RpcResponse, SendBocParams, SendBocResult, WalletInformationResult,
};
use super::{LedgerProvider, WalletInfo};

/// HTTP client for the toncenter JSON-RPC v2 API
pub struct TonCenterClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
    retry_base_delay_ms: u64,
    retry_max_elapsed_ms: u64,
}

impl TonCenterClient {
    /// Create a client for the given endpoint
    pub fn new(endpoint: String, api_key: Option<String>, rpc: &RpcConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(rpc.timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint,
            api_key,
            retry_base_delay_ms: rpc.retry_base_delay_ms,
            retry_max_elapsed_ms: rpc.retry_max_elapsed_ms,
        })
    }

    fn backoff_policy(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_millis(self.retry_base_delay_ms),
            max_interval: Duration::from_millis(self.retry_base_delay_ms * 8),
            max_elapsed_time: Some(Duration::from_millis(self.retry_max_elapsed_ms)),
            ..Default::default()
        }
    }

    /// Read call with bounded retry on transient failures
    async fn call<P: Serialize, R: DeserializeOwned>(&self, method: &str, params: P) -> Result<R> {
        retry(self.backoff_policy(), || async {
            match self.dispatch(method, &params, false).await {
                Ok(result) => Ok(result),
                Err(e) if e.is_retryable() => {
                    warn!(method, error = %e, "transient RPC failure, backing off");
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }

    /// One request/response round trip
    ///
    /// `submit` selects the broadcast-side classification: a timeout
    /// after the request was sent is an unknown outcome there, a plain
    /// transient failure on reads.
    async fn dispatch<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: &P,
        submit: bool,
    ) -> Result<R> {
        let envelope = RpcRequest {
            id: "1",
            jsonrpc: "2.0",
            method,
            params,
        };

        let mut request = self.http.post(&self.endpoint).json(&envelope);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() && submit {
                Error::UnknownOutcome(format!("{} timed out after dispatch: {}", method, e))
            } else {
                Error::Network(format!("{} transport failure: {}", method, e))
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if submit {
                Error::UnknownOutcome(format!("{} response lost: {}", method, e))
            } else {
                Error::Network(format!("{} response read failed: {}", method, e))
            }
        })?;

        let parsed: RpcResponse<R> = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            // Gateways answer 5xx/429 with non-JSON bodies; the request
            // was not processed, so this is transient either way.
            Err(_) if status.as_u16() == 429 || status.is_server_error() => {
                return Err(Error::Network(format!("{} failed with HTTP {}", method, status)));
            }
            Err(e) => {
                return Err(Error::Serialization(format!(
                    "malformed {} response: {}",
                    method, e
                )));
            }
        };

        if parsed.ok {
            return parsed
                .result
                .ok_or_else(|| Error::Serialization(format!("{} response missing result", method)));
        }

        let detail = parsed.error.unwrap_or_else(|| format!("HTTP {}", status));
        let code = parsed.code.unwrap_or(status.as_u16() as i64);
        Err(classify_provider_error(method, &detail, code, submit))
    }
}

/// Map an `ok: false` provider response onto the error taxonomy
fn classify_provider_error(method: &str, detail: &str, code: i64, submit: bool) -> Error {
    // Rate limits never reach message processing; always safe to retry.
    if code == 429 || detail.contains("Ratelimit") {
        return Error::Network(format!("{} rate limited: {}", method, detail));
    }
    if submit {
        // Exit code 33 is the v3 wallet's seqno guard.
        if detail.contains("exitcode=33") || detail.contains("exit code 33") {
            return Error::SequenceConflict(detail.to_string());
        }
        return Error::MessageRejected(detail.to_string());
    }
    if code >= 500 {
        return Error::Network(format!("{} provider error: {}", method, detail));
    }
    Error::Rpc(format!("{} failed: {}", method, detail))
}

#[async_trait]
impl LedgerProvider for TonCenterClient {
    async fn wallet_information(&self, address: &TonAddress) -> Result<WalletInfo> {
        let address = address.to_string();
        let result: WalletInformationResult = self
            .call("getWalletInformation", AddressParams { address: &address })
            .await?;

        let balance = result
            .balance
            .parse()
            .map_err(|_| Error::Serialization(format!("bad balance value: {}", result.balance)))?;

        let info = WalletInfo {
            balance,
            // An address with no on-chain history has no seqno yet.
            seqno: result.seqno.unwrap_or(0),
            active: result.account_state.as_deref() == Some("active"),
        };
        debug!(address = %address, seqno = info.seqno, balance = info.balance, "wallet state read");
        Ok(info)
    }

    async fn address_balance(&self, address: &TonAddress) -> Result<u64> {
        let address = address.to_string();
        let balance: String = self
            .call("getAddressBalance", AddressParams { address: &address })
            .await?;
        balance
            .parse()
            .map_err(|_| Error::Serialization(format!("bad balance value: {}", balance)))
    }

    async fn send_boc(&self, boc_base64: &str) -> Result<String> {
        let result: SendBocResult = retry(self.backoff_policy(), || async {
            match self
                .dispatch("sendBocReturnHash", &SendBocParams { boc: boc_base64 }, true)
                .await
            {
                Ok(result) => Ok(result),
                Err(e) if e.is_retryable() => {
                    warn!(error = %e, "broadcast not accepted for transient reason, backing off");
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await?;
        Ok(result.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rate_limit_is_transient() {
        let e = classify_provider_error("sendBocReturnHash", "Ratelimit exceed", 429, true);
        assert!(e.is_retryable());
    }

    #[test]
    fn test_classify_seqno_guard() {
        let detail = "LITE_SERVER_UNKNOWN: cannot apply external message: exitcode=33";
        assert!(matches!(
            classify_provider_error("sendBocReturnHash", detail, 500, true),
            Error::SequenceConflict(_)
        ));
    }

    #[test]
    fn test_classify_definitive_rejection() {
        let detail = "cannot apply external message: invalid signature";
        assert!(matches!(
            classify_provider_error("sendBocReturnHash", detail, 500, true),
            Error::MessageRejected(_)
        ));
    }

    #[test]
    fn test_classify_read_errors() {
        assert!(matches!(
            classify_provider_error("getAddressBalance", "upstream down", 503, false),
            Error::Network(_)
        ));
        assert!(matches!(
            classify_provider_error("getAddressBalance", "bad request", 422, false),
            Error::Rpc(_)
        ));
    }
}
