// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Interfaces the bridge consumes from chain-specific helpers.
//!
//! The orchestrator never builds, signs or reads chain transactions itself.
//! It talks to implementations of these traits, selected per chain leg.

use alloy::primitives::U256;
use async_trait::async_trait;

use super::types::{Chain, ChainTxStatus, TokenMetadata};

/// What the source-chain transaction of a transfer does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitAction {
    /// Move collateral to the enclave on the native chain.
    Deposit {
        to: String,
        amount: U256,
        memo: Option<String>,
    },
    /// Burn pegged tokens on the host chain, naming the native recipient.
    Redeem {
        contract: String,
        amount: U256,
        recipient: String,
    },
}

/// Per-call submission overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitParams {
    pub gas_limit: Option<u64>,
    pub max_priority_fee: Option<u128>,
}

/// Result of a successful broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedTx {
    pub tx_hash: String,
    pub receipt: serde_json::Value,
}

/// Builds, signs and broadcasts a transaction on one chain.
///
/// Implementations own their signing credentials.
#[async_trait]
pub trait ChainSubmitter: Send + Sync {
    async fn submit(
        &self,
        chain: &Chain,
        action: &SubmitAction,
        params: &SubmitParams,
    ) -> Result<SubmittedTx, ChainClientError>;

    /// Account that signs submissions, when known.
    fn account(&self) -> Option<String> {
        None
    }
}

/// Reads transaction status from one chain.
///
/// A transaction the chain has not seen yet is reported as pending, not as
/// an error.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn get_transaction(
        &self,
        chain: &Chain,
        tx_hash: &str,
    ) -> Result<ChainTxStatus, ChainClientError>;
}

/// Reads token metadata from a deployed contract.
#[async_trait]
pub trait TokenMetadataSource: Send + Sync {
    async fn token_metadata(
        &self,
        chain: &Chain,
        contract_address: &str,
    ) -> Result<TokenMetadata, ChainClientError>;
}

/// Pure address syntax check for a chain.
pub trait AddressValidator: Send + Sync {
    fn is_valid(&self, chain: &Chain, address: &str) -> bool;
}

/// Errors that can occur during chain operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainClientError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Contract error: {0}")]
    ContractError(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Unsupported operation on {chain}: {operation}")]
    Unsupported { chain: String, operation: String },
}

impl ChainClientError {
    /// Whether retrying the same read later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChainClientError::RpcError(_))
    }
}
