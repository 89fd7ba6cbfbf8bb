// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Native deposit addresses for issuing.

pub mod derivation;
pub mod verifier;

pub use derivation::{account_bytes, parse_public_key, AddressDerivation};
pub use verifier::{DepositAddress, DepositAddressVerifier};
