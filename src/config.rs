// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the [`BridgeConfig`] built from
//! them.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `BRIDGE_ASSET` | Pegged asset (`pbtc`, `pltc`, `peos`) | Required |
//! | `NATIVE_NETWORK` | Network of the collateral chain | `mainnet` |
//! | `HOST_NETWORK` | Network of the pegged token's chain | `mainnet` |
//! | `HOST_BLOCKCHAIN` | Blockchain hosting the pegged token | `eth` |
//! | `ENCLAVE_ENDPOINTS` | Comma-separated enclave URLs, in preference order | Required unless discovery is set |
//! | `ENCLAVE_DISCOVERY_URL` | URL listing further enclave nodes | Optional |
//! | `ENCLAVE_TIMEOUT_SECS` | Per-request enclave timeout | `10` |
//! | `ENCLAVE_POLL_INTERVAL_MS` | Enclave status polling interval | `3000` |
//! | `NATIVE_POLL_INTERVAL_MS` | Native chain confirmation polling | Per chain |
//! | `HOST_POLL_INTERVAL_MS` | Host chain confirmation polling | Per chain |
//! | `CONFIRMATION_DEADLINE_SECS` | Give up waiting for a confirmation | No deadline |
//! | `MAX_RESELECTIONS` | Node re-selections after a node failure | `1` |
//! | `HOST_RPC_URL` | JSON-RPC endpoint of the host chain | Optional |
//! | `NATIVE_API_URL` | Insight-style explorer of a UTXO native chain | Optional |
//! | `NATIVE_MIN_CONFIRMATIONS` | Confirmations required on a UTXO native chain | `1` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,enclave_bridge=debug` |

use std::sync::Arc;
use std::time::Duration;

use crate::chain::evm::EvmNetwork;
use crate::chain::utxo::InsightClient;
use crate::chain::{Blockchain, Chain, ChainFamily, ChainPair, PeggedAsset};
use crate::enclave::{HttpConnector, NodeSelector};
use crate::error::BridgeError;
use crate::orchestrator::{
    OrchestratorSettings, DEFAULT_ENCLAVE_POLL_INTERVAL, DEFAULT_MAX_RESELECTIONS,
};
use crate::telemetry::LogFormat;

/// Pegged asset symbol, case-insensitive.
pub const BRIDGE_ASSET_ENV: &str = "BRIDGE_ASSET";
pub const NATIVE_NETWORK_ENV: &str = "NATIVE_NETWORK";
pub const HOST_NETWORK_ENV: &str = "HOST_NETWORK";
pub const HOST_BLOCKCHAIN_ENV: &str = "HOST_BLOCKCHAIN";
/// Static candidates. The first reachable one is used.
pub const ENCLAVE_ENDPOINTS_ENV: &str = "ENCLAVE_ENDPOINTS";
/// JSON array of URLs or `{ "endpoint": url }` objects, tried after the
/// static candidates.
pub const ENCLAVE_DISCOVERY_URL_ENV: &str = "ENCLAVE_DISCOVERY_URL";
pub const ENCLAVE_TIMEOUT_SECS_ENV: &str = "ENCLAVE_TIMEOUT_SECS";
pub const ENCLAVE_POLL_INTERVAL_MS_ENV: &str = "ENCLAVE_POLL_INTERVAL_MS";
pub const NATIVE_POLL_INTERVAL_MS_ENV: &str = "NATIVE_POLL_INTERVAL_MS";
pub const HOST_POLL_INTERVAL_MS_ENV: &str = "HOST_POLL_INTERVAL_MS";
pub const CONFIRMATION_DEADLINE_SECS_ENV: &str = "CONFIRMATION_DEADLINE_SECS";
pub const MAX_RESELECTIONS_ENV: &str = "MAX_RESELECTIONS";
pub const HOST_RPC_URL_ENV: &str = "HOST_RPC_URL";
pub const NATIVE_API_URL_ENV: &str = "NATIVE_API_URL";
pub const NATIVE_MIN_CONFIRMATIONS_ENV: &str = "NATIVE_MIN_CONFIRMATIONS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_NETWORK: &str = "mainnet";
pub const DEFAULT_ENCLAVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything needed to build an orchestrator for one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub asset: PeggedAsset,
    pub chains: ChainPair,
    pub enclave_endpoints: Vec<String>,
    pub discovery_url: Option<String>,
    pub enclave_timeout: Duration,
    pub enclave_poll_interval: Duration,
    pub native_poll_interval: Duration,
    pub host_poll_interval: Duration,
    pub confirmation_deadline: Option<Duration>,
    pub max_reselections: u32,
    pub host_rpc_url: Option<String>,
    pub native_api_url: Option<String>,
    pub native_min_confirmations: u64,
    pub log_format: LogFormat,
}

impl BridgeConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, BridgeError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let symbol = get(BRIDGE_ASSET_ENV)
            .ok_or_else(|| BridgeError::Config(format!("{BRIDGE_ASSET_ENV} is required")))?;
        let asset = PeggedAsset::by_symbol(&symbol).ok_or_else(|| {
            BridgeError::Config(format!("{BRIDGE_ASSET_ENV}: unknown asset `{symbol}`"))
        })?;

        let host_blockchain = match get(HOST_BLOCKCHAIN_ENV) {
            Some(value) => value
                .parse::<Blockchain>()
                .map_err(|e| BridgeError::Config(format!("{HOST_BLOCKCHAIN_ENV}: {e}")))?,
            None => Blockchain::Ethereum,
        };
        if host_blockchain == asset.native {
            return Err(BridgeError::Config(format!(
                "{HOST_BLOCKCHAIN_ENV}: host chain must differ from the native chain ({})",
                asset.native
            )));
        }

        let chains = ChainPair {
            native: Chain::new(
                asset.native,
                get(NATIVE_NETWORK_ENV).unwrap_or_else(|| DEFAULT_NETWORK.to_string()),
            ),
            host: Chain::new(
                host_blockchain,
                get(HOST_NETWORK_ENV).unwrap_or_else(|| DEFAULT_NETWORK.to_string()),
            ),
        };

        let enclave_endpoints: Vec<String> = get(ENCLAVE_ENDPOINTS_ENV)
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let discovery_url = get(ENCLAVE_DISCOVERY_URL_ENV);
        if enclave_endpoints.is_empty() && discovery_url.is_none() {
            return Err(BridgeError::Config(format!(
                "one of {ENCLAVE_ENDPOINTS_ENV} or {ENCLAVE_DISCOVERY_URL_ENV} is required"
            )));
        }

        let duration = |name: &str, unit: fn(u64) -> Duration| -> Result<Option<Duration>, BridgeError> {
            get(name).map(|v| parse_number(name, &v).map(unit)).transpose()
        };

        Ok(Self {
            enclave_timeout: duration(ENCLAVE_TIMEOUT_SECS_ENV, Duration::from_secs)?
                .unwrap_or(DEFAULT_ENCLAVE_TIMEOUT),
            enclave_poll_interval: duration(ENCLAVE_POLL_INTERVAL_MS_ENV, Duration::from_millis)?
                .unwrap_or(DEFAULT_ENCLAVE_POLL_INTERVAL),
            native_poll_interval: duration(NATIVE_POLL_INTERVAL_MS_ENV, Duration::from_millis)?
                .unwrap_or_else(|| chains.native.blockchain.default_poll_interval()),
            host_poll_interval: duration(HOST_POLL_INTERVAL_MS_ENV, Duration::from_millis)?
                .unwrap_or_else(|| chains.host.blockchain.default_poll_interval()),
            confirmation_deadline: duration(CONFIRMATION_DEADLINE_SECS_ENV, Duration::from_secs)?,
            max_reselections: get(MAX_RESELECTIONS_ENV)
                .map(|v| parse_number(MAX_RESELECTIONS_ENV, &v))
                .transpose()?
                .unwrap_or(DEFAULT_MAX_RESELECTIONS),
            host_rpc_url: get(HOST_RPC_URL_ENV),
            native_api_url: get(NATIVE_API_URL_ENV),
            native_min_confirmations: get(NATIVE_MIN_CONFIRMATIONS_ENV)
                .map(|v| parse_number(NATIVE_MIN_CONFIRMATIONS_ENV, &v))
                .transpose()?
                .unwrap_or(1),
            log_format: get(LOG_FORMAT_ENV)
                .map(|v| LogFormat::from_str_lossy(&v))
                .unwrap_or_default(),
            asset,
            chains,
            enclave_endpoints,
            discovery_url,
        })
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            asset: self.asset,
            enclave_poll_interval: self.enclave_poll_interval,
            confirmation_deadline: self.confirmation_deadline,
            max_reselections: self.max_reselections,
        }
    }

    /// Node selector over HTTP enclave clients sharing one connection pool.
    pub fn node_selector(&self) -> Result<NodeSelector, BridgeError> {
        let connector = HttpConnector::new(self.enclave_timeout)?;
        let http = connector.http().clone();
        let selector = NodeSelector::new(
            self.enclave_endpoints.clone(),
            self.chains.clone(),
            Arc::new(connector),
        );
        Ok(match &self.discovery_url {
            Some(url) => selector.with_discovery(url.clone(), http),
            None => selector,
        })
    }

    /// Host chain endpoint, if an EVM host with an RPC URL is configured.
    pub fn host_evm_network(&self) -> Option<EvmNetwork> {
        if self.chains.host.blockchain != Blockchain::Ethereum {
            return None;
        }
        self.host_rpc_url.as_ref().map(|rpc_url| EvmNetwork {
            name: self.chains.host.network.clone(),
            rpc_url: rpc_url.clone(),
        })
    }

    /// Explorer reader for a UTXO native chain, if one is configured.
    pub fn native_insight_client(&self) -> Result<Option<InsightClient>, BridgeError> {
        if self.chains.native.family() != ChainFamily::Utxo {
            return Ok(None);
        }
        self.native_api_url
            .as_ref()
            .map(|url| {
                InsightClient::new(url.clone(), self.enclave_timeout, self.native_min_confirmations)
                    .map_err(|e| BridgeError::Config(format!("{NATIVE_API_URL_ENV}: {e}")))
            })
            .transpose()
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, BridgeError> {
    value
        .parse()
        .map_err(|_| BridgeError::Config(format!("{name}: `{value}` is not a valid number")))
}
