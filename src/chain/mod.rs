// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain-side building blocks.
//!
//! This module provides:
//! - Chain identifiers and pegged asset parameters
//! - Fixed-point amounts
//! - Collaborator interfaces (submit, read, metadata, address syntax)
//! - Reference adapters for EVM host chains and Insight-style UTXO explorers

pub mod address;
pub mod amount;
pub mod evm;
pub mod traits;
pub mod types;
pub mod utxo;

pub use address::SyntaxValidator;
pub use amount::{format_amount, format_amount_fixed, parse_amount, TokenAmount};
pub use traits::*;
pub use types::*;
