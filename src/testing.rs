// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory enclave and chain fakes for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::chain::{
    Blockchain, Chain, ChainClientError, ChainPair, ChainReader, ChainSubmitter, ChainTxStatus,
    SubmitAction, SubmitParams, SubmittedTx, TokenMetadata, TokenMetadataSource, TxStatus,
};
use crate::enclave::{
    DepositAddressReport, EnclaveApi, EnclaveConnector, EnclaveInfo, EnclaveNode,
    IncomingTxReport, SelectedNode,
};
use crate::error::BridgeError;

/// secp256k1 generator point, compressed.
pub const G_PUBKEY: &str = "0279BE667EF9DCBBAC55A06295CE870B07029BFCDB2DCE28D959F2815B16F81798";
/// 2G, compressed.
pub const OTHER_PUBKEY: &str =
    "02C6047F9441ED7D6D3045406E95C07CD85C778E4B8CEF3CA7ABAC09B95C709EE5";
/// Pegged token contract advertised by fake nodes.
pub const TOKEN_CONTRACT: &str = "0x1111111111111111111111111111111111111111";

pub fn fake_info(public_key: &str) -> EnclaveInfo {
    EnclaveInfo {
        enclave_public_key: public_key.to_string(),
        smart_contract_address: Some(TOKEN_CONTRACT.to_string()),
        native_vault_address: None,
        native_network: None,
        host_network: None,
        extra: Map::new(),
    }
}

pub fn incoming(broadcast: bool, broadcast_tx_hash: Option<&str>) -> IncomingTxReport {
    IncomingTxReport {
        broadcast,
        broadcast_tx_hash: broadcast_tx_hash.map(str::to_string),
        extra: Map::new(),
    }
}

pub fn not_found(endpoint: &str) -> BridgeError {
    BridgeError::EnclaveResponse {
        endpoint: endpoint.to_string(),
        status: Some(404),
        message: "Not found".to_string(),
    }
}

pub fn unreachable(endpoint: &str) -> BridgeError {
    BridgeError::EnclaveUnreachable {
        endpoint: endpoint.to_string(),
        reason: "connection refused".to_string(),
    }
}

/// Bind `enclave` as a selected node without probing it.
pub fn selected(enclave: Arc<FakeEnclave>, chains: &ChainPair) -> SelectedNode {
    SelectedNode {
        node: EnclaveNode {
            endpoint: enclave.endpoint.clone(),
            native: chains.native.clone(),
            host: chains.host.clone(),
            last_healthy_at: Utc::now(),
        },
        info: enclave.info.clone(),
        api: enclave,
    }
}

/// Scripted enclave node.
///
/// Incoming-transaction polls pop from the script; an exhausted script
/// answers 404. A scripted transport error takes the node down for good.
pub struct FakeEnclave {
    endpoint: String,
    reachable: AtomicBool,
    info: EnclaveInfo,
    incoming: Mutex<VecDeque<Result<IncomingTxReport, BridgeError>>>,
    deposit: Option<DepositAddressReport>,
    calls: AtomicUsize,
    incoming_polls: AtomicUsize,
}

impl FakeEnclave {
    pub fn new(endpoint: &str, info: EnclaveInfo) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            reachable: AtomicBool::new(true),
            info,
            incoming: Mutex::new(VecDeque::new()),
            deposit: None,
            calls: AtomicUsize::new(0),
            incoming_polls: AtomicUsize::new(0),
        }
    }

    /// A node whose every call fails at the transport level.
    pub fn unreachable(endpoint: &str) -> Self {
        Self {
            reachable: AtomicBool::new(false),
            ..Self::new(endpoint, fake_info(G_PUBKEY))
        }
    }

    pub fn with_incoming(self, script: Vec<Result<IncomingTxReport, BridgeError>>) -> Self {
        *self.incoming.lock().unwrap() = script.into();
        self
    }

    pub fn with_deposit(mut self, address: &str, public_key: &str, nonce: u64) -> Self {
        self.deposit = Some(DepositAddressReport {
            native_deposit_address: address.to_string(),
            enclave_public_key: public_key.to_string(),
            nonce,
            extra: Map::new(),
        });
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn incoming_polls(&self) -> usize {
        self.incoming_polls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), BridgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(unreachable(&self.endpoint))
        }
    }
}

#[async_trait]
impl EnclaveApi for FakeEnclave {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn ping(&self) -> Result<(), BridgeError> {
        self.enter()
    }

    async fn get_info(&self, _: &str, _: &str) -> Result<EnclaveInfo, BridgeError> {
        self.enter()?;
        Ok(self.info.clone())
    }

    async fn get_reports(&self, _: Blockchain, limit: u32) -> Result<Vec<Value>, BridgeError> {
        self.enter()?;
        Ok((0..limit).map(|nonce| json!({ "nonce": nonce })).collect())
    }

    async fn get_reports_by_address(
        &self,
        _: Blockchain,
        address: &str,
        limit: u32,
    ) -> Result<Vec<Value>, BridgeError> {
        self.enter()?;
        Ok((0..limit)
            .map(|nonce| json!({ "nonce": nonce, "address": address }))
            .collect())
    }

    async fn get_report_by_nonce(&self, _: Blockchain, nonce: u64) -> Result<Value, BridgeError> {
        self.enter()?;
        Ok(json!({ "nonce": nonce }))
    }

    async fn get_last_processed_block(&self, _: Blockchain) -> Result<Value, BridgeError> {
        self.enter()?;
        Ok(json!({ "block_num": 1 }))
    }

    async fn get_incoming_transaction_status(
        &self,
        _: &str,
    ) -> Result<IncomingTxReport, BridgeError> {
        self.enter()?;
        self.incoming_polls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .incoming
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(not_found(&self.endpoint)));
        if matches!(next, Err(BridgeError::EnclaveUnreachable { .. })) {
            self.reachable.store(false, Ordering::SeqCst);
        }
        next
    }

    async fn get_broadcast_transaction_status(&self, tx_hash: &str) -> Result<Value, BridgeError> {
        self.enter()?;
        Ok(json!({ "broadcast_tx_hash": tx_hash }))
    }

    async fn submit_block(&self, _: Blockchain, _: &Value) -> Result<Value, BridgeError> {
        self.enter()?;
        Ok(Value::String("Block submitted".to_string()))
    }

    async fn get_native_deposit_address(
        &self,
        _: &str,
    ) -> Result<DepositAddressReport, BridgeError> {
        self.enter()?;
        self.deposit.clone().ok_or_else(|| not_found(&self.endpoint))
    }
}

/// Connector over a fixed set of fake nodes.
///
/// Unknown endpoints connect to an unreachable node.
pub struct FakeConnector {
    nodes: HashMap<String, Arc<FakeEnclave>>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(nodes: Vec<Arc<FakeEnclave>>) -> Self {
        Self {
            nodes: nodes
                .into_iter()
                .map(|node| (node.endpoint.clone(), node))
                .collect(),
            connects: AtomicUsize::new(0),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl EnclaveConnector for FakeConnector {
    fn connect(&self, endpoint: &str) -> Arc<dyn EnclaveApi> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match self.nodes.get(endpoint) {
            Some(node) => node.clone(),
            None => Arc::new(FakeEnclave::unreachable(endpoint)),
        }
    }
}

/// Scripted chain: submitter, reader and token metadata in one.
///
/// Reads pop from the status script; an exhausted script reads confirmed.
pub struct FakeChain {
    decimals: u8,
    submit_result: Mutex<Result<SubmittedTx, ChainClientError>>,
    statuses: Mutex<VecDeque<Result<TxStatus, ChainClientError>>>,
    submitted: Mutex<Vec<SubmitAction>>,
    read_times: Mutex<Vec<tokio::time::Instant>>,
    metadata_error: Option<ChainClientError>,
    metadata_calls: AtomicUsize,
}

impl FakeChain {
    pub fn new(decimals: u8) -> Self {
        Self {
            decimals,
            submit_result: Mutex::new(Ok(SubmittedTx {
                tx_hash: "source-tx".to_string(),
                receipt: json!({ "transactionHash": "source-tx" }),
            })),
            statuses: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            read_times: Mutex::new(Vec::new()),
            metadata_error: None,
            metadata_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_statuses(self, script: Vec<Result<TxStatus, ChainClientError>>) -> Self {
        *self.statuses.lock().unwrap() = script.into();
        self
    }

    pub fn with_submit_result(self, result: Result<SubmittedTx, ChainClientError>) -> Self {
        *self.submit_result.lock().unwrap() = result;
        self
    }

    pub fn with_metadata_error(mut self, error: ChainClientError) -> Self {
        self.metadata_error = Some(error);
        self
    }

    pub fn submitted(&self) -> Vec<SubmitAction> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn reads(&self) -> usize {
        self.read_times.lock().unwrap().len()
    }

    pub fn read_times(&self) -> Vec<tokio::time::Instant> {
        self.read_times.lock().unwrap().clone()
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    /// Every call that would have touched the network.
    pub fn network_calls(&self) -> usize {
        self.submitted().len() + self.reads() + self.metadata_calls()
    }
}

#[async_trait]
impl ChainSubmitter for FakeChain {
    async fn submit(
        &self,
        _: &Chain,
        action: &SubmitAction,
        _: &SubmitParams,
    ) -> Result<SubmittedTx, ChainClientError> {
        self.submitted.lock().unwrap().push(action.clone());
        self.submit_result.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn get_transaction(
        &self,
        _: &Chain,
        tx_hash: &str,
    ) -> Result<ChainTxStatus, ChainClientError> {
        self.read_times
            .lock()
            .unwrap()
            .push(tokio::time::Instant::now());
        let status = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(TxStatus::Confirmed))?;
        Ok(ChainTxStatus {
            status,
            raw: json!({ "hash": tx_hash }),
        })
    }
}

#[async_trait]
impl TokenMetadataSource for FakeChain {
    async fn token_metadata(&self, _: &Chain, _: &str) -> Result<TokenMetadata, ChainClientError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.metadata_error {
            return Err(error.clone());
        }
        Ok(TokenMetadata {
            decimals: self.decimals,
            symbol: None,
        })
    }
}
