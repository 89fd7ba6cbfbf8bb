// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Deposit address generation with independent verification.
//!
//! A node is only semi-trusted. Every address it hands out is recomputed
//! locally from the key the node published during selection, and an address
//! that does not match is never returned as trusted.

use std::sync::Arc;

use serde::Serialize;

use super::derivation::{parse_public_key, AddressDerivation};
use crate::chain::{AddressValidator, Chain, ChainPair};
use crate::enclave::SelectedNode;
use crate::error::BridgeError;

/// A one-time native deposit address bound to a host account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositAddress {
    pub address: String,
    pub host_account: String,
    pub enclave_public_key: String,
    pub nonce: u64,
    pub native_chain: Chain,
    pub host_chain: Chain,
    /// Result of local re-derivation
    pub verified: bool,
}

/// Generates deposit addresses through a bound node and checks them.
pub struct DepositAddressVerifier {
    node: Option<SelectedNode>,
    chains: ChainPair,
    validator: Arc<dyn AddressValidator>,
}

impl DepositAddressVerifier {
    pub fn new(chains: ChainPair, validator: Arc<dyn AddressValidator>) -> Self {
        Self {
            node: None,
            chains,
            validator,
        }
    }

    pub fn with_node(mut self, node: SelectedNode) -> Self {
        self.node = Some(node);
        self
    }

    /// Bind a freshly selected node, replacing any previous one.
    pub fn bind(&mut self, node: SelectedNode) {
        self.node = Some(node);
    }

    pub fn node(&self) -> Option<&SelectedNode> {
        self.node.as_ref()
    }

    /// Ask the bound node for a deposit address for `host_account`.
    ///
    /// The returned address carries its verification result; it is not
    /// trustworthy unless `verified` is set.
    pub async fn generate(&self, host_account: &str) -> Result<DepositAddress, BridgeError> {
        let node = self.node.as_ref().ok_or_else(|| {
            BridgeError::NoNodeSelected("Select a node before generating a deposit address".to_string())
        })?;

        if !self.validator.is_valid(&self.chains.host, host_account) {
            return Err(BridgeError::InvalidAddress(format!(
                "{} address is not valid",
                self.chains.host.blockchain
            )));
        }

        let report = node.api.get_native_deposit_address(host_account).await?;

        let mut deposit = DepositAddress {
            address: report.native_deposit_address,
            host_account: host_account.to_string(),
            enclave_public_key: report.enclave_public_key,
            nonce: report.nonce,
            native_chain: self.chains.native.clone(),
            host_chain: self.chains.host.clone(),
            verified: false,
        };
        deposit.verified = self.verify(&deposit);

        tracing::debug!(
            address = %deposit.address,
            host_account = %host_account,
            verified = deposit.verified,
            endpoint = %node.endpoint(),
            "Generated deposit address"
        );

        Ok(deposit)
    }

    /// Recompute the expected address and compare it with the node's.
    ///
    /// Returns false when no node is bound, when the key in the address does
    /// not match the key the node published, or when the addresses differ.
    pub fn verify(&self, deposit: &DepositAddress) -> bool {
        let Some(node) = &self.node else {
            return false;
        };

        let published = parse_public_key(&node.info.enclave_public_key);
        let claimed = parse_public_key(&deposit.enclave_public_key);
        let public_key = match (published, claimed) {
            (Some(published), Some(claimed)) if published == claimed => published,
            _ => return false,
        };

        let derivation = AddressDerivation::for_chain(&deposit.native_chain);
        let expected = derivation.derive(&public_key, &deposit.host_account, deposit.nonce);
        derivation.addresses_match(&expected, &deposit.address)
    }

    /// Generate an address and fail unless it verifies.
    pub async fn generate_verified(
        &self,
        host_account: &str,
    ) -> Result<DepositAddress, BridgeError> {
        let deposit = self.generate(host_account).await?;
        if deposit.verified {
            return Ok(deposit);
        }

        let expected = parse_public_key(&deposit.enclave_public_key)
            .map(|key| {
                AddressDerivation::for_chain(&deposit.native_chain).derive(
                    &key,
                    &deposit.host_account,
                    deposit.nonce,
                )
            })
            .unwrap_or_default();

        tracing::error!(
            received = %deposit.address,
            expected = %expected,
            host_account = %host_account,
            "Node deposit address does not match expected address"
        );

        Err(BridgeError::DepositAddressMismatch {
            expected,
            received: deposit.address,
        })
    }
}
