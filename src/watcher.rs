// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Confirmation Watcher
//!
//! Polls a chain until a submitted transaction reaches a terminal state.
//!
//! ## Strategy
//!
//! The first read happens immediately, then one read per `poll_interval`.
//! Reads for one transaction never overlap. A confirmed read resolves, a
//! failed read rejects at once, and transient read errors are retried until
//! the optional deadline runs out.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::chain::{Chain, ChainReader, ConfirmationState, TransactionRecord, TxStatus};
use crate::error::BridgeError;

/// Waits for transaction confirmations on one chain.
#[derive(Clone)]
pub struct ConfirmationWatcher {
    reader: Arc<dyn ChainReader>,
}

impl ConfirmationWatcher {
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        Self { reader }
    }

    /// Poll until `tx_hash` is confirmed on `chain`.
    ///
    /// Fails with [`BridgeError::ConfirmationTimeout`] if `deadline` elapses
    /// first. Without a deadline the wait is unbounded.
    pub async fn wait_for_confirmation(
        &self,
        chain: &Chain,
        tx_hash: &str,
        poll_interval: Duration,
        deadline: Option<Duration>,
    ) -> Result<TransactionRecord, BridgeError> {
        let polling = self.poll_until_terminal(chain, tx_hash, poll_interval);

        match deadline {
            Some(deadline) => tokio::time::timeout(deadline, polling).await.map_err(|_| {
                warn!(chain = %chain, tx_hash = %tx_hash, waited_secs = deadline.as_secs(), "Confirmation deadline elapsed");
                BridgeError::ConfirmationTimeout {
                    chain: chain.clone(),
                    tx_hash: tx_hash.to_string(),
                    waited: deadline,
                }
            })?,
            None => polling.await,
        }
    }

    async fn poll_until_terminal(
        &self,
        chain: &Chain,
        tx_hash: &str,
        poll_interval: Duration,
    ) -> Result<TransactionRecord, BridgeError> {
        let mut polls: u64 = 0;

        loop {
            polls += 1;
            match self.reader.get_transaction(chain, tx_hash).await {
                Ok(read) => match read.status {
                    TxStatus::Confirmed => {
                        info!(chain = %chain, tx_hash = %tx_hash, polls, "Transaction confirmed");
                        return Ok(TransactionRecord {
                            chain: chain.clone(),
                            tx_hash: tx_hash.to_string(),
                            receipt: read.raw,
                            state: ConfirmationState::Confirmed,
                        });
                    }
                    TxStatus::Failed => {
                        warn!(chain = %chain, tx_hash = %tx_hash, "Transaction failed on-chain");
                        return Err(BridgeError::TransactionFailed {
                            chain: chain.clone(),
                            tx_hash: tx_hash.to_string(),
                            reason: "transaction reverted or dropped".to_string(),
                        });
                    }
                    TxStatus::Pending => {
                        debug!(chain = %chain, tx_hash = %tx_hash, polls, "Transaction pending");
                    }
                },
                Err(e) if e.is_transient() => {
                    warn!(chain = %chain, tx_hash = %tx_hash, error = %e, "Transaction read failed, retrying");
                }
                Err(e) => {
                    return Err(BridgeError::TransactionFailed {
                        chain: chain.clone(),
                        tx_hash: tx_hash.to_string(),
                        reason: e.to_string(),
                    });
                }
            }

            tokio::time::sleep(poll_interval).await;
        }
    }
}
