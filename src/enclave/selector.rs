// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Enclave node selection.
//!
//! Candidates are probed in order with `ping` and `get-info`. The first node
//! that answers both, and serves the configured chain pair, is selected.
//! Health state is never cached between selections: a re-selection probes the
//! whole candidate list again.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::client::{EnclaveApi, EnclaveConnector, EnclaveInfo};
use crate::chain::{Chain, ChainPair};
use crate::error::BridgeError;

/// An enclave node that answered its last probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnclaveNode {
    pub endpoint: String,
    pub native: Chain,
    pub host: Chain,
    pub last_healthy_at: DateTime<Utc>,
}

/// The node bound to an orchestrator or verifier.
///
/// Replaced as a whole on re-selection.
#[derive(Clone)]
pub struct SelectedNode {
    pub node: EnclaveNode,
    pub api: Arc<dyn EnclaveApi>,
    pub info: EnclaveInfo,
}

impl SelectedNode {
    pub fn endpoint(&self) -> &str {
        &self.node.endpoint
    }
}

impl fmt::Debug for SelectedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedNode")
            .field("node", &self.node)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Chooses a live enclave node for a chain pair.
pub struct NodeSelector {
    candidates: Vec<String>,
    discovery_url: Option<String>,
    http: reqwest::Client,
    chains: ChainPair,
    connector: Arc<dyn EnclaveConnector>,
}

impl NodeSelector {
    /// Create a selector over an ordered static candidate list.
    ///
    /// Malformed endpoints are dropped with a warning.
    pub fn new(
        candidates: Vec<String>,
        chains: ChainPair,
        connector: Arc<dyn EnclaveConnector>,
    ) -> Self {
        Self {
            candidates: sanitize_endpoints(candidates),
            discovery_url: None,
            http: reqwest::Client::new(),
            chains,
            connector,
        }
    }

    /// Append nodes listed by a discovery endpoint after the static ones.
    pub fn with_discovery(mut self, url: impl Into<String>, http: reqwest::Client) -> Self {
        self.discovery_url = Some(url.into());
        self.http = http;
        self
    }

    pub fn chains(&self) -> &ChainPair {
        &self.chains
    }

    /// Static candidates followed by discovered ones, deduplicated.
    pub async fn candidates(&self) -> Vec<String> {
        let mut all = self.candidates.clone();
        if let Some(url) = &self.discovery_url {
            match self.discover(url).await {
                Ok(found) => {
                    tracing::debug!(count = found.len(), discovery_url = %url, "Discovered enclave nodes");
                    all.extend(found);
                }
                Err(e) => {
                    tracing::warn!(error = %e, discovery_url = %url, "Enclave discovery failed, using static candidates");
                }
            }
        }

        let mut seen = std::collections::HashSet::new();
        all.retain(|endpoint| seen.insert(endpoint.clone()));
        all
    }

    /// Select a node from the configured candidates.
    pub async fn select(&self) -> Result<SelectedNode, BridgeError> {
        let candidates = self.candidates().await;
        self.select_from(&candidates).await
    }

    /// Probe `candidates` in order and return the first healthy node.
    pub async fn select_from(&self, candidates: &[String]) -> Result<SelectedNode, BridgeError> {
        for endpoint in candidates {
            match self.probe(endpoint).await {
                Ok(selected) => {
                    tracing::info!(
                        endpoint = %endpoint,
                        native = %self.chains.native,
                        host = %self.chains.host,
                        "Selected enclave node"
                    );
                    return Ok(selected);
                }
                Err(e) => {
                    tracing::warn!(endpoint = %endpoint, error = %e, "Enclave probe failed");
                }
            }
        }

        Err(BridgeError::NoAvailableNode {
            tried: candidates.len(),
        })
    }

    /// Replace a node that failed at runtime.
    pub async fn reselect(&self, failed: &SelectedNode) -> Result<SelectedNode, BridgeError> {
        tracing::warn!(endpoint = %failed.endpoint(), "Re-selecting enclave node");
        self.select().await
    }

    async fn probe(&self, endpoint: &str) -> Result<SelectedNode, BridgeError> {
        let api = self.connector.connect(endpoint);

        let ((), info) = tokio::try_join!(
            api.ping(),
            api.get_info(&self.chains.native.network, &self.chains.host.network)
        )?;

        self.check_networks(endpoint, &info)?;

        Ok(SelectedNode {
            node: EnclaveNode {
                endpoint: endpoint.to_string(),
                native: self.chains.native.clone(),
                host: self.chains.host.clone(),
                last_healthy_at: Utc::now(),
            },
            api,
            info,
        })
    }

    fn check_networks(&self, endpoint: &str, info: &EnclaveInfo) -> Result<(), BridgeError> {
        let advertised = [
            (&info.native_network, &self.chains.native),
            (&info.host_network, &self.chains.host),
        ];
        for (network, chain) in advertised {
            if let Some(network) = network {
                if !network.trim().eq_ignore_ascii_case(&chain.network) {
                    return Err(BridgeError::EnclaveResponse {
                        endpoint: endpoint.to_string(),
                        status: None,
                        message: format!(
                            "node serves {} network `{}`, expected `{}`",
                            chain.blockchain, network, chain.network
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    async fn discover(&self, url: &str) -> Result<Vec<String>, String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| format!("GET {url} failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("GET {url} returned {}", response.status()));
        }

        let listing: Value = response
            .json()
            .await
            .map_err(|e| format!("GET {url} invalid JSON: {e}"))?;

        let entries = listing
            .as_array()
            .ok_or_else(|| "discovery response is not an array".to_string())?;

        let endpoints = entries
            .iter()
            .filter_map(|entry| match entry {
                Value::String(s) => Some(s.clone()),
                Value::Object(o) => o.get("endpoint").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect();

        Ok(sanitize_endpoints(endpoints))
    }
}

/// Keep only absolute http(s) URLs, without trailing slashes.
fn sanitize_endpoints(endpoints: Vec<String>) -> Vec<String> {
    endpoints
        .into_iter()
        .filter_map(|raw| {
            let trimmed = raw.trim();
            match url::Url::parse(trimmed) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {
                    Some(trimmed.trim_end_matches('/').to_string())
                }
                _ => {
                    tracing::warn!(endpoint = %raw, "Ignoring malformed enclave endpoint");
                    None
                }
            }
        })
        .collect()
}
