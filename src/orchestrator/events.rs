// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Progress events emitted while a transfer runs.

use tokio::sync::mpsc;

use crate::chain::TransactionRecord;

/// Named progress signal of one transfer, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// The transaction submitted on the source chain is confirmed.
    SourceTxConfirmed(TransactionRecord),
    /// The enclave has observed the source transaction.
    EnclaveReceivedTx { tx_hash: String },
    /// The enclave broadcast the counterpart on the destination chain.
    EnclaveBroadcastedTx {
        tx_hash: String,
        broadcast_tx_hash: String,
    },
    /// The counterpart is confirmed on the destination chain.
    DestinationTxConfirmed(TransactionRecord),
}

impl ProgressEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SourceTxConfirmed(_) => "onSourceTxConfirmed",
            Self::EnclaveReceivedTx { .. } => "onEnclaveReceivedTx",
            Self::EnclaveBroadcastedTx { .. } => "onEnclaveBroadcastedTx",
            Self::DestinationTxConfirmed(_) => "onDestinationTxConfirmed",
        }
    }
}

/// Sending half of a transfer's event buffer.
#[derive(Debug, Clone)]
pub(crate) struct ProgressSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// Buffer `event` for the caller. A dropped handle is not an error.
    pub(crate) fn emit(&self, event: ProgressEvent) {
        tracing::info!(event = event.name(), "Transfer progress");
        let _ = self.tx.send(event);
    }
}
