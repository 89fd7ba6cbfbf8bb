// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain identifiers, pegged asset parameters, and transaction records.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Blockchains the bridge knows how to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Blockchain {
    Bitcoin,
    Litecoin,
    Ethereum,
    Eos,
}

/// How a chain models ownership, which decides deposit address derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainFamily {
    /// Unspent-output chains (Bitcoin, Litecoin).
    Utxo,
    /// Account-based chains (Ethereum, EOS).
    Account,
}

impl Blockchain {
    /// Short symbol used by the enclave API for report types (e.g. `btc`).
    pub fn symbol(&self) -> &'static str {
        match self {
            Blockchain::Bitcoin => "btc",
            Blockchain::Litecoin => "ltc",
            Blockchain::Ethereum => "eth",
            Blockchain::Eos => "eos",
        }
    }

    /// Human-readable name for messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Blockchain::Bitcoin => "Bitcoin",
            Blockchain::Litecoin => "Litecoin",
            Blockchain::Ethereum => "Ethereum",
            Blockchain::Eos => "EOS",
        }
    }

    pub fn family(&self) -> ChainFamily {
        match self {
            Blockchain::Bitcoin | Blockchain::Litecoin => ChainFamily::Utxo,
            Blockchain::Ethereum | Blockchain::Eos => ChainFamily::Account,
        }
    }

    /// Default cadence for confirmation polling on this chain.
    pub fn default_poll_interval(&self) -> Duration {
        match self {
            Blockchain::Bitcoin | Blockchain::Litecoin => Duration::from_millis(3000),
            Blockchain::Ethereum => Duration::from_millis(5000),
            Blockchain::Eos => Duration::from_millis(300),
        }
    }
}

impl fmt::Display for Blockchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Blockchain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "btc" | "bitcoin" => Ok(Blockchain::Bitcoin),
            "ltc" | "litecoin" => Ok(Blockchain::Litecoin),
            "eth" | "ethereum" => Ok(Blockchain::Ethereum),
            "eos" => Ok(Blockchain::Eos),
            other => Err(format!("unknown blockchain `{other}`")),
        }
    }
}

/// Network names treated as test networks.
const TESTNET_NAMES: &[&str] = &[
    "testnet", "ropsten", "kovan", "rinkeby", "goerli", "sepolia", "jungle",
];

/// A blockchain on a specific network (e.g. Ethereum on `ropsten`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chain {
    pub blockchain: Blockchain,
    pub network: String,
}

impl Chain {
    pub fn new(blockchain: Blockchain, network: impl Into<String>) -> Self {
        Self {
            blockchain,
            network: network.into().trim().to_ascii_lowercase(),
        }
    }

    pub fn is_testnet(&self) -> bool {
        TESTNET_NAMES.contains(&self.network.as_str())
    }

    pub fn family(&self) -> ChainFamily {
        self.blockchain.family()
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.blockchain, self.network)
    }
}

/// The native chain holding collateral and the host chain holding the peg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainPair {
    pub native: Chain,
    pub host: Chain,
}

/// Static parameters of a pegged asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeggedAsset {
    /// Symbol of the pegged token (e.g. `pBTC`)
    pub symbol: &'static str,
    /// Chain holding the collateral
    pub native: Blockchain,
    /// Decimal precision of the collateral asset
    pub native_decimals: u8,
    /// Smallest amount accepted by `issue`
    pub minimum_issuable: &'static str,
    /// Smallest amount accepted by `redeem` (dust threshold)
    pub minimum_redeemable: &'static str,
}

pub const PBTC: PeggedAsset = PeggedAsset {
    symbol: "pBTC",
    native: Blockchain::Bitcoin,
    native_decimals: 8,
    minimum_issuable: "0.00005",
    minimum_redeemable: "0.00005",
};

pub const PLTC: PeggedAsset = PeggedAsset {
    symbol: "pLTC",
    native: Blockchain::Litecoin,
    native_decimals: 8,
    minimum_issuable: "0.00005",
    minimum_redeemable: "0.00005",
};

/// pEOS cannot be issued in fractions of one EOS.
pub const PEOS: PeggedAsset = PeggedAsset {
    symbol: "pEOS",
    native: Blockchain::Eos,
    native_decimals: 4,
    minimum_issuable: "1",
    minimum_redeemable: "0.0001",
};

impl PeggedAsset {
    /// Look up an asset by its symbol, case-insensitively.
    pub fn by_symbol(symbol: &str) -> Option<PeggedAsset> {
        [PBTC, PLTC, PEOS]
            .into_iter()
            .find(|asset| asset.symbol.eq_ignore_ascii_case(symbol.trim()))
    }
}

/// Status reported by a chain for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

/// One read of a transaction from a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainTxStatus {
    pub status: TxStatus,
    /// Raw chain response (receipt, explorer document, ...)
    pub raw: serde_json::Value,
}

/// Confirmation state of one chain leg of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationState {
    Pending,
    Confirmed,
    Failed,
}

/// A transaction on one chain leg of a transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub chain: Chain,
    pub tx_hash: String,
    pub receipt: serde_json::Value,
    pub state: ConfirmationState,
}

impl TransactionRecord {
    pub fn pending(chain: Chain, tx_hash: impl Into<String>, receipt: serde_json::Value) -> Self {
        Self {
            chain,
            tx_hash: tx_hash.into(),
            receipt,
            state: ConfirmationState::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state != ConfirmationState::Pending
    }
}

/// Token metadata read from a host-chain contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub decimals: u8,
    pub symbol: Option<String>,
}
