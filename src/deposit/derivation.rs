// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Deposit address derivation per chain family.
//!
//! Both families commit to the host account and a node-chosen nonce under the
//! enclave public key, so anyone holding the published key can recompute the
//! address a node hands out.

use alloy::primitives::{keccak256, Address};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::chain::address::encode_base58_address;
use crate::chain::{Blockchain, Chain};

/// Compressed secp256k1 public key length.
pub const PUBLIC_KEY_LEN: usize = 33;

const OP_PUSH32: u8 = 0x20;
const OP_DROP: u8 = 0x75;
const OP_PUSH33: u8 = 0x21;
const OP_CHECKSIG: u8 = 0xac;

/// How a native chain derives deposit addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressDerivation {
    /// P2SH over `<commitment> OP_DROP <pubkey> OP_CHECKSIG`.
    ScriptHash { version: u8 },
    /// Forwarder contract address bound to the account and nonce.
    Forwarder,
}

impl AddressDerivation {
    /// Derivation used for deposits on `chain`.
    pub fn for_chain(chain: &Chain) -> Self {
        match (chain.blockchain, chain.is_testnet()) {
            (Blockchain::Bitcoin, false) => AddressDerivation::ScriptHash { version: 0x05 },
            (Blockchain::Bitcoin, true) => AddressDerivation::ScriptHash { version: 0xc4 },
            (Blockchain::Litecoin, false) => AddressDerivation::ScriptHash { version: 0x32 },
            (Blockchain::Litecoin, true) => AddressDerivation::ScriptHash { version: 0x3a },
            (Blockchain::Ethereum | Blockchain::Eos, _) => AddressDerivation::Forwarder,
        }
    }

    /// Address the enclave should hand out for `account` and `nonce`.
    pub fn derive(&self, public_key: &[u8; PUBLIC_KEY_LEN], account: &str, nonce: u64) -> String {
        let account = account_bytes(account);
        match self {
            AddressDerivation::ScriptHash { version } => {
                let mut preimage = account;
                preimage.extend_from_slice(&nonce.to_be_bytes());
                let commitment = Sha256::digest(Sha256::digest(&preimage));

                let mut script = Vec::with_capacity(3 + 32 + PUBLIC_KEY_LEN + 1);
                script.push(OP_PUSH32);
                script.extend_from_slice(&commitment);
                script.push(OP_DROP);
                script.push(OP_PUSH33);
                script.extend_from_slice(public_key);
                script.push(OP_CHECKSIG);

                let digest = Ripemd160::digest(Sha256::digest(&script));
                let mut hash = [0u8; 20];
                hash.copy_from_slice(&digest);
                encode_base58_address(*version, &hash)
            }
            AddressDerivation::Forwarder => {
                let mut preimage = Vec::with_capacity(PUBLIC_KEY_LEN + 32 + 8);
                preimage.extend_from_slice(public_key);
                preimage.extend_from_slice(keccak256(&account).as_slice());
                preimage.extend_from_slice(&nonce.to_be_bytes());
                let digest = keccak256(&preimage);
                Address::from_slice(&digest[12..]).to_checksum(None)
            }
        }
    }

    /// Decoded address bytes, or `None` if `address` is not well-formed for
    /// this derivation.
    pub fn address_bytes(&self, address: &str) -> Option<Vec<u8>> {
        match self {
            AddressDerivation::ScriptHash { .. } => {
                bs58::decode(address.trim()).with_check(None).into_vec().ok()
            }
            AddressDerivation::Forwarder => address
                .trim()
                .parse::<Address>()
                .ok()
                .map(|a| a.to_vec()),
        }
    }

    /// Byte-level equality of two addresses. Malformed input never matches.
    pub fn addresses_match(&self, a: &str, b: &str) -> bool {
        match (self.address_bytes(a), self.address_bytes(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Hex-decoded bytes for `0x` accounts, UTF-8 bytes otherwise.
pub fn account_bytes(account: &str) -> Vec<u8> {
    account
        .strip_prefix("0x")
        .and_then(|hex| alloy::hex::decode(hex).ok())
        .unwrap_or_else(|| account.as_bytes().to_vec())
}

/// Parse a hex SEC1 public key and return it compressed.
pub fn parse_public_key(hex: &str) -> Option<[u8; PUBLIC_KEY_LEN]> {
    let bytes = alloy::hex::decode(hex.trim()).ok()?;
    let key = PublicKey::from_sec1_bytes(&bytes).ok()?;
    key.to_encoded_point(true).as_bytes().try_into().ok()
}
