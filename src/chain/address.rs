// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Address syntax validation.
//!
//! Pure checks only: nothing here touches the network. A syntactically valid
//! address may still not exist on-chain.

use std::str::FromStr;

use alloy::primitives::Address;

use super::traits::AddressValidator;
use super::types::{Blockchain, Chain};

/// EOS account names are exactly 12 characters.
const EOS_ACCOUNT_LENGTH: usize = 12;

/// Base58Check payload length: one version byte plus a 20-byte hash.
const BASE58_PAYLOAD_LEN: usize = 21;

/// Validator covering every [`Blockchain`] the client supports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxValidator;

impl AddressValidator for SyntaxValidator {
    fn is_valid(&self, chain: &Chain, address: &str) -> bool {
        match chain.blockchain {
            Blockchain::Ethereum => is_valid_eth_address(address),
            Blockchain::Eos => is_valid_eos_account(address),
            Blockchain::Bitcoin | Blockchain::Litecoin => {
                is_valid_base58_address(address, &base58_versions(chain))
            }
        }
    }
}

/// `0x` followed by 40 hex characters.
pub fn is_valid_eth_address(address: &str) -> bool {
    address.len() == 42 && address.starts_with("0x") && Address::from_str(address).is_ok()
}

/// 12 characters from `a-z` and `1-5`.
pub fn is_valid_eos_account(account: &str) -> bool {
    account.len() == EOS_ACCOUNT_LENGTH
        && account
            .chars()
            .all(|c| c.is_ascii_lowercase() || ('1'..='5').contains(&c))
}

/// Base58Check address whose version byte is one of `versions`.
pub fn is_valid_base58_address(address: &str, versions: &[u8]) -> bool {
    match bs58::decode(address).with_check(None).into_vec() {
        Ok(payload) => payload.len() == BASE58_PAYLOAD_LEN && versions.contains(&payload[0]),
        Err(_) => false,
    }
}

/// Accepted P2PKH/P2SH version bytes for a UTXO chain.
///
/// Litecoin testnet P2SH addresses exist with both the legacy `0xc4` prefix
/// and the newer `0x3a` (`Q...`) prefix.
pub fn base58_versions(chain: &Chain) -> Vec<u8> {
    match (chain.blockchain, chain.is_testnet()) {
        (Blockchain::Bitcoin, false) => vec![0x00, 0x05],
        (Blockchain::Bitcoin, true) => vec![0x6f, 0xc4],
        (Blockchain::Litecoin, false) => vec![0x30, 0x32, 0x05],
        (Blockchain::Litecoin, true) => vec![0x6f, 0x3a, 0xc4],
        _ => Vec::new(),
    }
}

/// Encode a 20-byte hash as a Base58Check address.
pub fn encode_base58_address(version: u8, hash: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(BASE58_PAYLOAD_LEN);
    payload.push(version);
    payload.extend_from_slice(hash);
    bs58::encode(payload).with_check().into_string()
}
