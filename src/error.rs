// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy for bridge operations.
//!
//! Every public operation fails with exactly one [`BridgeError`]. Validation
//! variants are produced before any network effect; enclave variants may be
//! retried against a freshly selected node; chain variants are terminal for
//! the transfer that produced them.

use std::time::Duration;

use crate::chain::Chain;

/// Errors surfaced by the bridge client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("{0}")]
    InvalidAmount(String),

    #[error("{0}")]
    InvalidAddress(String),

    #[error("No enclave node available ({tried} candidate(s) probed)")]
    NoAvailableNode { tried: usize },

    #[error("No node selected. {0}")]
    NoNodeSelected(String),

    #[error("Enclave {endpoint} unreachable: {reason}")]
    EnclaveUnreachable { endpoint: String, reason: String },

    #[error("Enclave {endpoint} returned an error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    EnclaveResponse {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Transaction {tx_hash} failed on {chain}: {reason}")]
    TransactionFailed {
        chain: Chain,
        tx_hash: String,
        reason: String,
    },

    #[error("Transaction {tx_hash} not confirmed on {chain} within {}s", waited.as_secs())]
    ConfirmationTimeout {
        chain: Chain,
        tx_hash: String,
        waited: Duration,
    },

    #[error("Node deposit address does not match expected address (node: {received}, expected: {expected})")]
    DepositAddressMismatch { expected: String, received: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Whether this error is attributable to the selected enclave node and
    /// therefore warrants re-selecting a node before giving up.
    pub fn is_node_failure(&self) -> bool {
        match self {
            BridgeError::EnclaveUnreachable { .. } => true,
            BridgeError::EnclaveResponse { status, .. } => match status {
                Some(code) => *code >= 500,
                None => true,
            },
            _ => false,
        }
    }

    /// Whether the enclave answered "not found" for the requested resource.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BridgeError::EnclaveResponse {
                status: Some(404),
                ..
            }
        )
    }

    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            BridgeError::InvalidAmount(_) => "invalid_amount",
            BridgeError::InvalidAddress(_) => "invalid_address",
            BridgeError::NoAvailableNode { .. } => "no_available_node",
            BridgeError::NoNodeSelected(_) => "no_node_selected",
            BridgeError::EnclaveUnreachable { .. } => "enclave_unreachable",
            BridgeError::EnclaveResponse { .. } => "enclave_response",
            BridgeError::SubmissionFailed(_) => "submission_failed",
            BridgeError::TransactionFailed { .. } => "transaction_failed",
            BridgeError::ConfirmationTimeout { .. } => "confirmation_timeout",
            BridgeError::DepositAddressMismatch { .. } => "deposit_address_mismatch",
            BridgeError::Config(_) => "config",
            BridgeError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: Option<u16>) -> BridgeError {
        BridgeError::EnclaveResponse {
            endpoint: "https://node.example".to_string(),
            status,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn transport_and_server_errors_are_node_failures() {
        let unreachable = BridgeError::EnclaveUnreachable {
            endpoint: "https://node.example".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(unreachable.is_node_failure());
        assert!(response(Some(502)).is_node_failure());
        assert!(response(None).is_node_failure());
    }

    #[test]
    fn client_errors_are_not_node_failures() {
        assert!(!response(Some(404)).is_node_failure());
        assert!(!response(Some(400)).is_node_failure());
        assert!(!BridgeError::SubmissionFailed("nonce too low".to_string()).is_node_failure());
        assert!(!BridgeError::DepositAddressMismatch {
            expected: "a".to_string(),
            received: "b".to_string(),
        }
        .is_node_failure());
    }

    #[test]
    fn not_found_only_matches_404() {
        assert!(response(Some(404)).is_not_found());
        assert!(!response(Some(500)).is_not_found());
    }

    #[test]
    fn validation_messages_are_passed_through() {
        let err = BridgeError::InvalidAmount("Impossible to burn 0 pEOS".to_string());
        assert_eq!(err.to_string(), "Impossible to burn 0 pEOS");
        assert_eq!(err.error_code(), "invalid_amount");
    }

    #[test]
    fn enclave_response_message_includes_status() {
        let msg = response(Some(503)).to_string();
        assert!(msg.contains("(503)"), "{msg}");
        let msg = response(None).to_string();
        assert!(!msg.contains('('), "{msg}");
    }
}
