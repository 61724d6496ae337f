//! toncenter JSON-RPC wire types

use serde::{Deserialize, Serialize};

/// JSON-RPC 2.0 request envelope
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a, P> {
    pub id: &'a str,
    pub jsonrpc: &'a str,
    pub method: &'a str,
    pub params: P,
}

/// toncenter response envelope
///
/// The provider reports failures both through HTTP status and through
/// `ok: false` with an error string and code in the body.
#[derive(Debug, Deserialize)]
pub struct RpcResponse<R> {
    pub ok: bool,
    pub result: Option<R>,
    pub error: Option<String>,
    pub code: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AddressParams<'a> {
    pub address: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SendBocParams<'a> {
    pub boc: &'a str,
}

/// `getWalletInformation` result
///
/// `seqno` is absent for an account with no on-chain history.
#[derive(Debug, Deserialize)]
pub struct WalletInformationResult {
    #[serde(default)]
    pub wallet: bool,
    pub balance: String,
    #[serde(default)]
    pub account_state: Option<String>,
    #[serde(default)]
    pub seqno: Option<u32>,
}

/// `sendBocReturnHash` result
#[derive(Debug, Deserialize)]
pub struct SendBocResult {
    pub hash: String,
}
