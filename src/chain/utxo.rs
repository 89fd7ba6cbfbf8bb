// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Insight-style block explorer reader for UTXO native chains.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use super::traits::{ChainClientError, ChainReader};
use super::types::{Chain, ChainFamily, ChainTxStatus, TxStatus};

/// Default confirmations before a deposit counts as confirmed.
pub const DEFAULT_MIN_CONFIRMATIONS: u64 = 1;

/// Reads transaction confirmations from an Insight API (`GET /tx/{txid}`).
#[derive(Clone)]
pub struct InsightClient {
    base_url: String,
    http: Client,
    min_confirmations: u64,
}

impl InsightClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        min_confirmations: u64,
    ) -> Result<Self, ChainClientError> {
        let base_url = base_url.into();
        url::Url::parse(&base_url).map_err(|e| ChainClientError::InvalidRpcUrl(e.to_string()))?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainClientError::RpcError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            http,
            min_confirmations: min_confirmations.max(1),
        })
    }

    pub fn min_confirmations(&self) -> u64 {
        self.min_confirmations
    }
}

#[async_trait]
impl ChainReader for InsightClient {
    async fn get_transaction(
        &self,
        chain: &Chain,
        tx_hash: &str,
    ) -> Result<ChainTxStatus, ChainClientError> {
        if chain.family() != ChainFamily::Utxo {
            return Err(ChainClientError::Unsupported {
                chain: chain.to_string(),
                operation: "get_transaction".to_string(),
            });
        }

        let path = format!("/tx/{tx_hash}");
        let response = self
            .http
            .get(format!("{}{}", self.base_url.trim_end_matches('/'), path))
            .send()
            .await
            .map_err(|e| ChainClientError::RpcError(format!("GET {path} failed: {e}")))?;

        // Explorers answer 404 until the transaction reaches their mempool.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(ChainTxStatus {
                status: TxStatus::Pending,
                raw: Value::Null,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChainClientError::RpcError(format!(
                "GET {path} returned {status}: {body}"
            )));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| ChainClientError::RpcError(format!("GET {path} invalid JSON: {e}")))?;

        let confirmations = raw
            .get("confirmations")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        let status = if confirmations >= self.min_confirmations {
            TxStatus::Confirmed
        } else {
            TxStatus::Pending
        };

        Ok(ChainTxStatus { status, raw })
    }
}
