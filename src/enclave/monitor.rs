// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Polls an enclave until it relays a transaction to the other chain.

use std::time::Duration;

use super::client::EnclaveApi;
use crate::error::BridgeError;

/// Milestones observed while monitoring an incoming transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnclaveMilestone {
    /// The node has a report for the transaction.
    Received { tx_hash: String },
    /// The node broadcast the counterpart transaction.
    Broadcasted {
        tx_hash: String,
        broadcast_tx_hash: String,
    },
}

/// Milestones already reported for one transaction.
///
/// Kept by the caller so a monitor restarted against another node does not
/// report `Received` twice.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitorProgress {
    received: bool,
}

impl MonitorProgress {
    pub fn received(&self) -> bool {
        self.received
    }
}

/// Poll `api` until the transaction is broadcast and return the broadcast
/// transaction hash.
///
/// A 404 means the node has not observed the transaction yet. Any other error
/// is returned so the caller can decide whether to switch nodes.
pub async fn monitor_incoming_transaction<F>(
    api: &dyn EnclaveApi,
    tx_hash: &str,
    poll_interval: Duration,
    progress: &mut MonitorProgress,
    mut on_milestone: F,
) -> Result<String, BridgeError>
where
    F: FnMut(EnclaveMilestone) + Send,
{
    loop {
        match api.get_incoming_transaction_status(tx_hash).await {
            Ok(report) => {
                if !progress.received {
                    progress.received = true;
                    tracing::info!(tx_hash = %tx_hash, endpoint = %api.endpoint(), "Enclave received transaction");
                    on_milestone(EnclaveMilestone::Received {
                        tx_hash: tx_hash.to_string(),
                    });
                }

                let broadcast_hash = report
                    .broadcast_tx_hash
                    .filter(|hash| report.broadcast && !hash.is_empty());
                if let Some(broadcast_tx_hash) = broadcast_hash {
                    tracing::info!(
                        tx_hash = %tx_hash,
                        broadcast_tx_hash = %broadcast_tx_hash,
                        "Enclave broadcast transaction"
                    );
                    on_milestone(EnclaveMilestone::Broadcasted {
                        tx_hash: tx_hash.to_string(),
                        broadcast_tx_hash: broadcast_tx_hash.clone(),
                    });
                    return Ok(broadcast_tx_hash);
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(tx_hash = %tx_hash, "Transaction not yet observed by enclave");
            }
            Err(e) => return Err(e),
        }

        tokio::time::sleep(poll_interval).await;
    }
}
