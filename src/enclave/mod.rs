// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Enclave network access.
//!
//! This module provides:
//! - An HTTP client bound to a single enclave node
//! - Node selection with health and consistency probes
//! - Monitoring of transactions the enclave relays between chains

pub mod client;
pub mod monitor;
pub mod selector;

pub use client::{
    DepositAddressReport, EnclaveApi, EnclaveClient, EnclaveConnector, EnclaveInfo,
    HttpConnector, IncomingTxReport,
};
pub use monitor::{monitor_incoming_transaction, EnclaveMilestone, MonitorProgress};
pub use selector::{EnclaveNode, NodeSelector, SelectedNode};
