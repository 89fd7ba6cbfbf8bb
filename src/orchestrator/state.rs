// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transfer state machine.

use serde::Serialize;
use uuid::Uuid;

use crate::error::BridgeError;

/// Lifecycle of one issue or redeem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum TransferState {
    Validating,
    Submitting,
    AwaitingEnclaveObservation,
    AwaitingEnclaveBroadcast,
    ConfirmingDestination,
    Resolved,
    Failed(String),
}

impl TransferState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Submitting => "submitting",
            Self::AwaitingEnclaveObservation => "awaiting_enclave_observation",
            Self::AwaitingEnclaveBroadcast => "awaiting_enclave_broadcast",
            Self::ConfirmingDestination => "confirming_destination",
            Self::Resolved => "resolved",
            Self::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Failed(_))
    }

    /// Whether moving from `self` to `to` is a legal step.
    pub fn can_transition(&self, to: &TransferState) -> bool {
        use TransferState::*;

        if self.is_terminal() {
            return false;
        }

        matches!(
            (self, to),
            (Validating, Submitting)
                | (Submitting, AwaitingEnclaveObservation)
                | (AwaitingEnclaveObservation, AwaitingEnclaveBroadcast)
                | (AwaitingEnclaveBroadcast, ConfirmingDestination)
                | (ConfirmingDestination, Resolved)
                | (_, Failed(_))
        )
    }
}

/// Tracks and logs the state of one transfer.
#[derive(Debug)]
pub struct StateTracker {
    transfer_id: Uuid,
    state: TransferState,
    history: Vec<TransferState>,
}

impl StateTracker {
    pub fn new(transfer_id: Uuid) -> Self {
        Self {
            transfer_id,
            state: TransferState::Validating,
            history: vec![TransferState::Validating],
        }
    }

    pub fn state(&self) -> &TransferState {
        &self.state
    }

    pub fn history(&self) -> &[TransferState] {
        &self.history
    }

    pub fn advance(&mut self, to: TransferState) -> Result<(), BridgeError> {
        if !self.state.can_transition(&to) {
            return Err(BridgeError::Internal(format!(
                "Invalid state transition: {} -> {}",
                self.state.as_str(),
                to.as_str()
            )));
        }

        tracing::info!(
            transfer_id = %self.transfer_id,
            from = self.state.as_str(),
            to = to.as_str(),
            "Transfer state changed"
        );
        self.history.push(to.clone());
        self.state = to;
        Ok(())
    }

    /// Record a failure. Has no effect once the transfer is terminal.
    pub fn fail(&mut self, reason: &BridgeError) {
        if !self.state.is_terminal() {
            let failed = TransferState::Failed(reason.to_string());
            self.history.push(failed.clone());
            self.state = failed;
        }
    }
}
