// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-over-HTTP client bound to one enclave node.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::chain::Blockchain;
use crate::error::BridgeError;

/// Node metadata returned by `get-info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnclaveInfo {
    /// Compressed secp256k1 key the node derives deposit addresses from
    #[serde(default, alias = "public-key", alias = "public_key", alias = "enclavePublicKey")]
    pub enclave_public_key: String,
    /// Pegged token contract on the host chain
    #[serde(
        default,
        alias = "smart-contract-address",
        alias = "smartContractAddress"
    )]
    pub smart_contract_address: Option<String>,
    /// Native account collecting deposits, for account-based native chains
    #[serde(
        default,
        alias = "native-vault-address",
        alias = "nativeVaultAddress"
    )]
    pub native_vault_address: Option<String>,
    #[serde(default, alias = "native-network", alias = "nativeNetwork")]
    pub native_network: Option<String>,
    #[serde(default, alias = "host-network", alias = "hostNetwork")]
    pub host_network: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EnclaveInfo {
    /// Fill the key and contract from asset-prefixed fields
    /// (`pbtc-public-key`, `pbtc-smart-contract-address`) when the plain
    /// names are absent.
    pub fn with_prefixed_fields(mut self) -> Self {
        if self.enclave_public_key.is_empty() {
            if let Some(key) = prefixed_field(&self.extra, "public-key") {
                self.enclave_public_key = key;
            }
        }
        if self.smart_contract_address.is_none() {
            self.smart_contract_address = prefixed_field(&self.extra, "smart-contract-address");
        }
        self
    }
}

/// String value of the first `<asset>-<suffix>` key.
fn prefixed_field(extra: &Map<String, Value>, suffix: &str) -> Option<String> {
    extra.iter().find_map(|(key, value)| {
        let asset = key.strip_suffix(suffix)?.strip_suffix('-')?;
        if asset.is_empty() || !asset.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        value.as_str().map(str::to_string)
    })
}

/// Observation status of a transaction the enclave is expected to relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingTxReport {
    #[serde(default)]
    pub broadcast: bool,
    #[serde(default, alias = "broadcastTxHash")]
    pub broadcast_tx_hash: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A deposit address the node claims to have derived for a host account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositAddressReport {
    #[serde(alias = "nativeDepositAddress")]
    pub native_deposit_address: String,
    #[serde(alias = "enclavePublicKey")]
    pub enclave_public_key: String,
    pub nonce: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// RPC surface of one enclave node.
#[async_trait]
pub trait EnclaveApi: Send + Sync {
    /// Base URL of the node this client is bound to.
    fn endpoint(&self) -> &str;

    async fn ping(&self) -> Result<(), BridgeError>;

    async fn get_info(
        &self,
        native_network: &str,
        host_network: &str,
    ) -> Result<EnclaveInfo, BridgeError>;

    async fn get_reports(&self, kind: Blockchain, limit: u32) -> Result<Vec<Value>, BridgeError>;

    async fn get_reports_by_address(
        &self,
        kind: Blockchain,
        address: &str,
        limit: u32,
    ) -> Result<Vec<Value>, BridgeError>;

    async fn get_report_by_nonce(&self, kind: Blockchain, nonce: u64)
        -> Result<Value, BridgeError>;

    async fn get_last_processed_block(&self, kind: Blockchain) -> Result<Value, BridgeError>;

    async fn get_incoming_transaction_status(
        &self,
        tx_hash: &str,
    ) -> Result<IncomingTxReport, BridgeError>;

    async fn get_broadcast_transaction_status(&self, tx_hash: &str)
        -> Result<Value, BridgeError>;

    async fn submit_block(&self, kind: Blockchain, block: &Value) -> Result<Value, BridgeError>;

    async fn get_native_deposit_address(
        &self,
        host_account: &str,
    ) -> Result<DepositAddressReport, BridgeError>;
}

/// Opens an [`EnclaveApi`] for an endpoint.
pub trait EnclaveConnector: Send + Sync {
    fn connect(&self, endpoint: &str) -> Arc<dyn EnclaveApi>;
}

/// Connector sharing one HTTP client (and its pool) across nodes.
#[derive(Clone)]
pub struct HttpConnector {
    http: Client,
}

impl HttpConnector {
    pub fn new(timeout: Duration) -> Result<Self, BridgeError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    pub fn http(&self) -> &Client {
        &self.http
    }
}

impl EnclaveConnector for HttpConnector {
    fn connect(&self, endpoint: &str) -> Arc<dyn EnclaveApi> {
        Arc::new(EnclaveClient::with_client(endpoint, self.http.clone()))
    }
}

/// HTTP implementation of [`EnclaveApi`].
#[derive(Clone)]
pub struct EnclaveClient {
    endpoint: String,
    http: Client,
}

impl EnclaveClient {
    pub fn with_client(endpoint: impl Into<String>, http: Client) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    fn unreachable(&self, e: reqwest::Error) -> BridgeError {
        BridgeError::EnclaveUnreachable {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        }
    }

    fn response_error(&self, status: Option<StatusCode>, message: String) -> BridgeError {
        BridgeError::EnclaveResponse {
            endpoint: self.endpoint.clone(),
            status: status.map(|s| s.as_u16()),
            message,
        }
    }

    /// `endpoint` with `segments` appended, each percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, BridgeError> {
        let invalid = |reason: String| BridgeError::EnclaveUnreachable {
            endpoint: self.endpoint.clone(),
            reason,
        };

        let mut url =
            Url::parse(&self.endpoint).map_err(|e| invalid(format!("invalid endpoint URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| invalid("endpoint URL cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request_text(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
    ) -> Result<String, BridgeError> {
        let url = self.url(segments)?;
        let path = url.path().to_string();

        let mut request = self.http.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| self.unreachable(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.response_error(
                Some(status),
                format!("{method} {path} returned {status}: {body}"),
            ));
        }

        response.text().await.map_err(|e| {
            self.response_error(Some(status), format!("{method} {path} unreadable body: {e}"))
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, BridgeError> {
        let text = self.request_text(Method::GET, segments, None).await?;
        serde_json::from_str(&text).map_err(|e| {
            self.response_error(
                None,
                format!("GET /{} invalid JSON: {e}", segments.join("/")),
            )
        })
    }
}

/// Some nodes answer plain text where others answer JSON.
fn json_or_text(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

#[async_trait]
impl EnclaveApi for EnclaveClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn ping(&self) -> Result<(), BridgeError> {
        self.request_text(Method::GET, &["ping"], None).await?;
        Ok(())
    }

    async fn get_info(
        &self,
        native_network: &str,
        host_network: &str,
    ) -> Result<EnclaveInfo, BridgeError> {
        self.get_json::<EnclaveInfo>(&["get-info", native_network, host_network])
            .await
            .map(EnclaveInfo::with_prefixed_fields)
    }

    async fn get_reports(&self, kind: Blockchain, limit: u32) -> Result<Vec<Value>, BridgeError> {
        let limit = limit.to_string();
        self.get_json(&[kind.symbol(), "reports", "limit", limit.as_str()])
            .await
    }

    async fn get_reports_by_address(
        &self,
        kind: Blockchain,
        address: &str,
        limit: u32,
    ) -> Result<Vec<Value>, BridgeError> {
        let limit = limit.to_string();
        self.get_json(&[
            kind.symbol(),
            "reports",
            "address",
            address,
            "limit",
            limit.as_str(),
        ])
        .await
    }

    async fn get_report_by_nonce(
        &self,
        kind: Blockchain,
        nonce: u64,
    ) -> Result<Value, BridgeError> {
        let nonce = nonce.to_string();
        self.get_json(&[kind.symbol(), "reports", "nonce", nonce.as_str()])
            .await
    }

    async fn get_last_processed_block(&self, kind: Blockchain) -> Result<Value, BridgeError> {
        self.get_json(&[kind.symbol(), "last-processed-block"])
            .await
    }

    async fn get_incoming_transaction_status(
        &self,
        tx_hash: &str,
    ) -> Result<IncomingTxReport, BridgeError> {
        self.get_json(&["incoming-tx-hash", tx_hash]).await
    }

    async fn get_broadcast_transaction_status(
        &self,
        tx_hash: &str,
    ) -> Result<Value, BridgeError> {
        self.get_json(&["broadcast-tx-hash", tx_hash]).await
    }

    async fn submit_block(&self, kind: Blockchain, block: &Value) -> Result<Value, BridgeError> {
        let segment = format!("submit-{}-block", kind.symbol());
        let text = self
            .request_text(Method::POST, &[segment.as_str()], Some(block))
            .await?;
        Ok(json_or_text(text))
    }

    async fn get_native_deposit_address(
        &self,
        host_account: &str,
    ) -> Result<DepositAddressReport, BridgeError> {
        self.get_json(&["get-native-deposit-address", host_account])
            .await
    }
}
