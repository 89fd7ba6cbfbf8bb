// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transfer intents, results, and the handle returned to callers.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::events::{ProgressEvent, ProgressSink};
use crate::chain::{ChainPair, TokenAmount};
use crate::error::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Native collateral in, pegged tokens minted on the host chain.
    Issue,
    /// Pegged tokens burned on the host chain, native collateral released.
    Redeem,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Issue => f.write_str("issue"),
            Direction::Redeem => f.write_str("redeem"),
        }
    }
}

/// A validated request to move value across the chain pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferIntent {
    pub id: Uuid,
    pub direction: Direction,
    /// Amount at the native asset's precision
    pub amount: TokenAmount,
    pub source_account: Option<String>,
    pub destination: String,
    pub chains: ChainPair,
}

/// Outcome of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferResult {
    pub direction: Direction,
    /// Amount fixed to the destination chain's precision
    pub amount: String,
    pub to: String,
    /// Destination chain transaction hash
    pub tx: String,
    pub source_tx: String,
}

/// A transfer running in the background.
///
/// Await it for the result. Progress events are buffered from the moment the
/// transfer starts, so none are missed however late they are read. Dropping
/// the handle does not stop the transfer.
#[derive(Debug)]
pub struct PendingTransfer {
    transfer_id: Uuid,
    events: mpsc::UnboundedReceiver<ProgressEvent>,
    handle: JoinHandle<Result<TransferResult, BridgeError>>,
}

impl PendingTransfer {
    pub(crate) fn spawn<F, Fut>(transfer_id: Uuid, run: F) -> Self
    where
        F: FnOnce(ProgressSink) -> Fut,
        Fut: Future<Output = Result<TransferResult, BridgeError>> + Send + 'static,
    {
        let (tx, events) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(ProgressSink::new(tx)));
        Self {
            transfer_id,
            events,
            handle,
        }
    }

    pub fn transfer_id(&self) -> Uuid {
        self.transfer_id
    }

    /// Next progress event, or `None` once the transfer has finished and
    /// every event has been read.
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.events.recv().await
    }

    /// Next already-buffered progress event, without waiting.
    pub fn try_next_event(&mut self) -> Option<ProgressEvent> {
        self.events.try_recv().ok()
    }

    /// Wait for the result and collect every event not read yet.
    pub async fn finish(mut self) -> (Result<TransferResult, BridgeError>, Vec<ProgressEvent>) {
        let result = (&mut self).await;
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        (result, events)
    }
}

impl Future for PendingTransfer {
    type Output = Result<TransferResult, BridgeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx).map(|joined| {
            joined.unwrap_or_else(|e| {
                Err(BridgeError::Internal(format!("transfer task aborted: {e}")))
            })
        })
    }
}
