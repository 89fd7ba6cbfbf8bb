// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Enclave Bridge - Pegged Asset Issue/Redeem Client
//!
//! Moves value between a native chain (Bitcoin, Litecoin, EOS) and a host
//! chain carrying the pegged token. The client submits the user's side of a
//! transfer and then follows a network of enclave nodes as they observe it
//! and broadcast the counterpart.
//!
//! ## Modules
//!
//! - `chain` - Chain model, amounts, address checks, and chain adapters
//! - `enclave` - Enclave node API, node selection, and status monitoring
//! - `deposit` - Deposit address derivation and verification
//! - `orchestrator` - Issue/redeem state machine and progress events
//! - `watcher` - Confirmation polling
//! - `config` - Environment configuration
//! - `telemetry` - Logging setup

pub mod chain;
pub mod config;
pub mod deposit;
pub mod enclave;
pub mod error;
pub mod orchestrator;
pub mod telemetry;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use config::BridgeConfig;
pub use error::BridgeError;
pub use orchestrator::{
    ChainLeg, Collaborators, OrchestratorSettings, PendingTransfer, ProgressEvent,
    TransactionOrchestrator, TransferResult,
};
