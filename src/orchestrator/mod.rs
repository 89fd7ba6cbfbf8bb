// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transaction Orchestrator
//!
//! Drives issue and redeem transfers across a native/host chain pair.
//!
//! ## Flow
//!
//! 1. Validate amount and destination (no network access).
//! 2. Submit the source transaction and wait for its confirmation.
//! 3. Wait for the enclave to observe it and broadcast the counterpart.
//! 4. Wait for the counterpart's confirmation on the destination chain.
//!
//! Enclave failures attributable to the selected node trigger a bounded
//! number of re-selections. Chain submission and confirmation failures end the
//! transfer: resubmitting a burn or deposit could move funds twice.

pub mod events;
pub mod state;
pub mod transfer;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::Instrument;
use uuid::Uuid;

use crate::chain::{
    AddressValidator, Chain, ChainPair, ChainReader, ChainSubmitter, PeggedAsset, SubmitAction,
    SubmitParams, TokenAmount, TokenMetadataSource, TransactionRecord,
};
use crate::deposit::{DepositAddress, DepositAddressVerifier};
use crate::enclave::{
    monitor_incoming_transaction, EnclaveMilestone, MonitorProgress, NodeSelector, SelectedNode,
};
use crate::error::BridgeError;
use crate::watcher::ConfirmationWatcher;

pub use events::ProgressEvent;
pub use state::{StateTracker, TransferState};
pub use transfer::{Direction, PendingTransfer, TransferIntent, TransferResult};

use events::ProgressSink;

/// Default enclave polling interval.
pub const DEFAULT_ENCLAVE_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default number of re-selections per enclave interaction.
pub const DEFAULT_MAX_RESELECTIONS: u32 = 1;

/// Tunables of an orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub asset: PeggedAsset,
    pub enclave_poll_interval: Duration,
    /// Applied to every confirmation wait; `None` waits indefinitely
    pub confirmation_deadline: Option<Duration>,
    /// Node re-selections allowed after a node failure
    pub max_reselections: u32,
}

impl OrchestratorSettings {
    pub fn new(asset: PeggedAsset) -> Self {
        Self {
            asset,
            enclave_poll_interval: DEFAULT_ENCLAVE_POLL_INTERVAL,
            confirmation_deadline: None,
            max_reselections: DEFAULT_MAX_RESELECTIONS,
        }
    }
}

/// Submission and read access to one side of the chain pair.
#[derive(Clone)]
pub struct ChainLeg {
    pub submitter: Arc<dyn ChainSubmitter>,
    pub reader: Arc<dyn ChainReader>,
    pub poll_interval: Duration,
}

/// External helpers the orchestrator relies on.
#[derive(Clone)]
pub struct Collaborators {
    pub native: ChainLeg,
    pub host: ChainLeg,
    pub validator: Arc<dyn AddressValidator>,
    pub metadata: Arc<dyn TokenMetadataSource>,
}

/// Pegged token contract and precision, fetched once.
#[derive(Debug, Clone)]
struct TokenBinding {
    contract: String,
    decimals: u8,
}

struct Inner {
    settings: OrchestratorSettings,
    selector: NodeSelector,
    node: RwLock<Option<SelectedNode>>,
    token: RwLock<Option<TokenBinding>>,
    collaborators: Collaborators,
}

/// Issue/redeem client for one pegged asset.
///
/// Clones share the selected node and token cache.
#[derive(Clone)]
pub struct TransactionOrchestrator {
    inner: Arc<Inner>,
}

impl TransactionOrchestrator {
    pub fn new(
        settings: OrchestratorSettings,
        selector: NodeSelector,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                selector,
                node: RwLock::new(None),
                token: RwLock::new(None),
                collaborators,
            }),
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.inner.settings
    }

    pub fn chains(&self) -> &ChainPair {
        self.inner.selector.chains()
    }

    /// Mint pegged tokens for `amount` of the native asset, sent to the host
    /// account `destination`.
    ///
    /// Validation errors are returned before anything is sent.
    pub fn issue(&self, amount: &str, destination: &str) -> Result<PendingTransfer, BridgeError> {
        self.issue_with_params(amount, destination, SubmitParams::default())
    }

    pub fn issue_with_params(
        &self,
        amount: &str,
        destination: &str,
        params: SubmitParams,
    ) -> Result<PendingTransfer, BridgeError> {
        let intent = self.validate(Direction::Issue, amount, destination)?;
        Ok(self.start(intent, params))
    }

    /// Burn `amount` pegged tokens and release the collateral to the native
    /// account `destination`.
    ///
    /// Validation errors are returned before anything is sent.
    pub fn redeem(&self, amount: &str, destination: &str) -> Result<PendingTransfer, BridgeError> {
        self.redeem_with_params(amount, destination, SubmitParams::default())
    }

    pub fn redeem_with_params(
        &self,
        amount: &str,
        destination: &str,
        params: SubmitParams,
    ) -> Result<PendingTransfer, BridgeError> {
        let intent = self.validate(Direction::Redeem, amount, destination)?;
        Ok(self.start(intent, params))
    }

    /// A verified native deposit address minting to `host_account`.
    pub async fn get_deposit_address(
        &self,
        host_account: &str,
    ) -> Result<DepositAddress, BridgeError> {
        self.check_destination(&self.chains().host, host_account)?;
        let account = host_account.to_string();
        self.with_node(|node| {
            let verifier = self.verifier(node);
            let account = account.clone();
            async move { verifier.generate_verified(&account).await }
        })
        .await
    }

    /// The currently bound node, selecting one if none is bound.
    ///
    /// A selection that finds no healthy node is retried up to
    /// `max_reselections` times.
    pub async fn selected_node(&self) -> Result<SelectedNode, BridgeError> {
        if let Some(node) = self.inner.node.read().await.clone() {
            return Ok(node);
        }

        let mut guard = self.inner.node.write().await;
        if let Some(node) = guard.clone() {
            return Ok(node);
        }
        let max = self.inner.settings.max_reselections;
        let mut attempts = 0;
        let node = loop {
            match self.inner.selector.select().await {
                Ok(node) => break node,
                Err(e @ BridgeError::NoAvailableNode { .. }) if attempts < max => {
                    attempts += 1;
                    tracing::warn!(error = %e, attempts, "Node selection failed, retrying");
                }
                Err(e) => return Err(e),
            }
        };
        *guard = Some(node.clone());
        Ok(node)
    }

    /// Replace `failed` unless another task already replaced it.
    async fn replace_node(&self, failed: &SelectedNode) -> Result<SelectedNode, BridgeError> {
        let mut guard = self.inner.node.write().await;
        if let Some(current) = guard.as_ref() {
            if !Arc::ptr_eq(&current.api, &failed.api) {
                return Ok(current.clone());
            }
        }

        *guard = None;
        let node = self.inner.selector.reselect(failed).await?;
        *guard = Some(node.clone());
        Ok(node)
    }

    /// Run `op` against the bound node, re-selecting on node failures.
    async fn with_node<T, F, Fut>(&self, mut op: F) -> Result<T, BridgeError>
    where
        F: FnMut(SelectedNode) -> Fut,
        Fut: Future<Output = Result<T, BridgeError>>,
    {
        let mut node = self.selected_node().await?;
        let mut reselections = 0;
        loop {
            match op(node.clone()).await {
                Err(e) if e.is_node_failure() && reselections < self.inner.settings.max_reselections => {
                    reselections += 1;
                    tracing::warn!(endpoint = %node.endpoint(), error = %e, reselections, "Enclave call failed");
                    node = self.replace_node(&node).await?;
                }
                other => return other,
            }
        }
    }

    fn verifier(&self, node: SelectedNode) -> DepositAddressVerifier {
        DepositAddressVerifier::new(
            self.chains().clone(),
            self.inner.collaborators.validator.clone(),
        )
        .with_node(node)
    }

    async fn token(&self) -> Result<TokenBinding, BridgeError> {
        if let Some(token) = self.inner.token.read().await.clone() {
            return Ok(token);
        }

        let node = self.selected_node().await?;
        let contract = node.info.smart_contract_address.clone().ok_or_else(|| {
            BridgeError::EnclaveResponse {
                endpoint: node.endpoint().to_string(),
                status: None,
                message: "node does not advertise a smart contract address".to_string(),
            }
        })?;

        let host = &self.chains().host;
        let metadata = self
            .inner
            .collaborators
            .metadata
            .token_metadata(host, &contract)
            .await
            .map_err(|e| BridgeError::Internal(format!("Error during getting decimals: {e}")))?;

        let token = TokenBinding {
            contract,
            decimals: metadata.decimals,
        };
        tracing::debug!(contract = %token.contract, decimals = token.decimals, "Token metadata cached");
        *self.inner.token.write().await = Some(token.clone());
        Ok(token)
    }

    fn check_destination(&self, chain: &Chain, address: &str) -> Result<(), BridgeError> {
        if self.inner.collaborators.validator.is_valid(chain, address) {
            Ok(())
        } else {
            Err(BridgeError::InvalidAddress(format!(
                "{} address is not valid",
                chain.blockchain
            )))
        }
    }

    fn validate(
        &self,
        direction: Direction,
        amount: &str,
        destination: &str,
    ) -> Result<TransferIntent, BridgeError> {
        let asset = &self.inner.settings.asset;
        let chains = self.chains();
        let amount = TokenAmount::parse(amount, asset.native_decimals)?;

        let (destination_chain, source) = match direction {
            Direction::Issue => {
                let minimum = TokenAmount::parse(asset.minimum_issuable, asset.native_decimals)?;
                if amount < minimum {
                    return Err(BridgeError::InvalidAmount(format!(
                        "Amount to issue must be at least {} {}",
                        asset.minimum_issuable, asset.symbol
                    )));
                }
                (&chains.host, &self.inner.collaborators.native)
            }
            Direction::Redeem => {
                if amount.is_zero() {
                    return Err(BridgeError::InvalidAmount(format!(
                        "Impossible to burn 0 {}",
                        asset.symbol
                    )));
                }
                let minimum =
                    TokenAmount::parse(asset.minimum_redeemable, asset.native_decimals)?;
                if amount < minimum {
                    return Err(BridgeError::InvalidAmount(format!(
                        "Impossible to burn less than {} {}",
                        asset.minimum_redeemable, asset.symbol
                    )));
                }
                (&chains.native, &self.inner.collaborators.host)
            }
        };

        self.check_destination(destination_chain, destination)?;

        Ok(TransferIntent {
            id: Uuid::new_v4(),
            direction,
            amount,
            source_account: source.submitter.account(),
            destination: destination.to_string(),
            chains: chains.clone(),
        })
    }

    fn start(&self, intent: TransferIntent, params: SubmitParams) -> PendingTransfer {
        let span = tracing::info_span!(
            "transfer",
            transfer_id = %intent.id,
            direction = %intent.direction,
            asset = self.inner.settings.asset.symbol,
        );
        let this = self.clone();
        PendingTransfer::spawn(intent.id, move |sink| {
            async move { this.run(intent, params, sink).await }.instrument(span)
        })
    }

    async fn run(
        self,
        intent: TransferIntent,
        params: SubmitParams,
        sink: ProgressSink,
    ) -> Result<TransferResult, BridgeError> {
        let mut tracker = StateTracker::new(intent.id);
        tracing::info!(
            amount = %intent.amount,
            destination = %intent.destination,
            "Transfer started"
        );

        let result = match intent.direction {
            Direction::Issue => self.run_issue(&intent, &params, &sink, &mut tracker).await,
            Direction::Redeem => self.run_redeem(&intent, &params, &sink, &mut tracker).await,
        };

        match &result {
            Ok(outcome) => {
                tracing::info!(tx = %outcome.tx, amount = %outcome.amount, "Transfer resolved");
            }
            Err(e) => {
                tracker.fail(e);
                tracing::error!(error = %e, code = e.error_code(), state = ?tracker.state(), "Transfer failed");
            }
        }
        result
    }

    async fn run_issue(
        &self,
        intent: &TransferIntent,
        params: &SubmitParams,
        sink: &ProgressSink,
        tracker: &mut StateTracker,
    ) -> Result<TransferResult, BridgeError> {
        let chains = &intent.chains;
        let legs = &self.inner.collaborators;
        tracker.advance(TransferState::Submitting)?;

        let token = self.token().await?;
        let action = self.deposit_action(intent).await?;
        let source = self
            .submit(&chains.native, &legs.native, &action, params)
            .await?;

        let source = self
            .confirm(&chains.native, &legs.native, &source.tx_hash)
            .await?;
        sink.emit(ProgressEvent::SourceTxConfirmed(source.clone()));

        let broadcast = self.await_broadcast(&source.tx_hash, sink, tracker).await?;

        tracker.advance(TransferState::ConfirmingDestination)?;
        let destination = self.confirm(&chains.host, &legs.host, &broadcast).await?;
        sink.emit(ProgressEvent::DestinationTxConfirmed(destination.clone()));

        tracker.advance(TransferState::Resolved)?;
        Ok(TransferResult {
            direction: Direction::Issue,
            amount: intent.amount.to_fixed(token.decimals),
            to: intent.destination.clone(),
            tx: destination.tx_hash,
            source_tx: source.tx_hash,
        })
    }

    async fn run_redeem(
        &self,
        intent: &TransferIntent,
        params: &SubmitParams,
        sink: &ProgressSink,
        tracker: &mut StateTracker,
    ) -> Result<TransferResult, BridgeError> {
        let chains = &intent.chains;
        let legs = &self.inner.collaborators;
        let native_decimals = self.inner.settings.asset.native_decimals;
        tracker.advance(TransferState::Submitting)?;

        let token = self.token().await?;
        let burn = intent.amount.rescale(token.decimals)?;
        let action = SubmitAction::Redeem {
            contract: token.contract.clone(),
            amount: burn.raw(),
            recipient: intent.destination.clone(),
        };
        let source = self.submit(&chains.host, &legs.host, &action, params).await?;

        let source = self
            .confirm(&chains.host, &legs.host, &source.tx_hash)
            .await?;
        sink.emit(ProgressEvent::SourceTxConfirmed(source.clone()));

        let broadcast = self.await_broadcast(&source.tx_hash, sink, tracker).await?;

        tracker.advance(TransferState::ConfirmingDestination)?;
        let destination = self
            .confirm(&chains.native, &legs.native, &broadcast)
            .await?;
        sink.emit(ProgressEvent::DestinationTxConfirmed(destination.clone()));

        tracker.advance(TransferState::Resolved)?;
        Ok(TransferResult {
            direction: Direction::Redeem,
            amount: intent.amount.to_fixed(native_decimals),
            to: intent.destination.clone(),
            tx: destination.tx_hash,
            source_tx: source.tx_hash,
        })
    }

    /// Where issue collateral goes: the node's vault with a memo, or a
    /// verified one-time deposit address.
    async fn deposit_action(&self, intent: &TransferIntent) -> Result<SubmitAction, BridgeError> {
        let amount = intent.amount.raw();
        let destination = intent.destination.clone();

        self.with_node(|node| {
            let verifier = self.verifier(node.clone());
            let destination = destination.clone();
            async move {
                if let Some(vault) = node.info.native_vault_address.clone() {
                    return Ok(SubmitAction::Deposit {
                        to: vault,
                        amount,
                        memo: Some(destination),
                    });
                }

                let deposit = verifier.generate_verified(&destination).await?;
                Ok(SubmitAction::Deposit {
                    to: deposit.address,
                    amount,
                    memo: None,
                })
            }
        })
        .await
    }

    async fn submit(
        &self,
        chain: &Chain,
        leg: &ChainLeg,
        action: &SubmitAction,
        params: &SubmitParams,
    ) -> Result<TransactionRecord, BridgeError> {
        let submitted = leg
            .submitter
            .submit(chain, action, params)
            .await
            .map_err(|e| BridgeError::SubmissionFailed(e.to_string()))?;

        tracing::info!(chain = %chain, tx_hash = %submitted.tx_hash, "Source transaction submitted");
        Ok(TransactionRecord::pending(
            chain.clone(),
            submitted.tx_hash,
            submitted.receipt,
        ))
    }

    async fn confirm(
        &self,
        chain: &Chain,
        leg: &ChainLeg,
        tx_hash: &str,
    ) -> Result<TransactionRecord, BridgeError> {
        ConfirmationWatcher::new(leg.reader.clone())
            .wait_for_confirmation(
                chain,
                tx_hash,
                leg.poll_interval,
                self.inner.settings.confirmation_deadline,
            )
            .await
    }

    /// Wait for the enclave to relay `tx_hash`, moving to another node if the
    /// bound one fails mid-way.
    async fn await_broadcast(
        &self,
        tx_hash: &str,
        sink: &ProgressSink,
        tracker: &mut StateTracker,
    ) -> Result<String, BridgeError> {
        tracker.advance(TransferState::AwaitingEnclaveObservation)?;

        let interval = self.inner.settings.enclave_poll_interval;
        let mut progress = MonitorProgress::default();
        let mut node = self.selected_node().await?;
        let mut reselections = 0;

        loop {
            let outcome = monitor_incoming_transaction(
                node.api.as_ref(),
                tx_hash,
                interval,
                &mut progress,
                |milestone| match milestone {
                    EnclaveMilestone::Received { tx_hash } => {
                        if let Err(e) = tracker.advance(TransferState::AwaitingEnclaveBroadcast) {
                            tracing::error!(error = %e, "Unexpected transfer state");
                        }
                        sink.emit(ProgressEvent::EnclaveReceivedTx { tx_hash });
                    }
                    EnclaveMilestone::Broadcasted {
                        tx_hash,
                        broadcast_tx_hash,
                    } => {
                        sink.emit(ProgressEvent::EnclaveBroadcastedTx {
                            tx_hash,
                            broadcast_tx_hash,
                        });
                    }
                },
            )
            .await;

            match outcome {
                Err(e)
                    if e.is_node_failure()
                        && reselections < self.inner.settings.max_reselections =>
                {
                    reselections += 1;
                    tracing::warn!(endpoint = %node.endpoint(), error = %e, reselections, "Enclave monitoring failed");
                    node = self.replace_node(&node).await?;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::address::encode_base58_address;
    use crate::chain::{
        Blockchain, ChainClientError, ConfirmationState, SyntaxValidator, TxStatus, PBTC, PEOS,
    };
    use crate::deposit::{parse_public_key, AddressDerivation};
    use crate::enclave::EnclaveApi;
    use crate::testing::{
        fake_info, incoming, unreachable, FakeChain, FakeConnector, FakeEnclave, G_PUBKEY,
        TOKEN_CONTRACT,
    };
    use alloy::primitives::U256;

    const ETH_ACCOUNT: &str = "0xdf3B180694aB22C577f7114D822D28b92cadFd75";
    const EOS_VAULT: &str = "pbtcvault123";
    const ALL_EVENTS: [&str; 4] = [
        "onSourceTxConfirmed",
        "onEnclaveReceivedTx",
        "onEnclaveBroadcastedTx",
        "onDestinationTxConfirmed",
    ];

    struct Harness {
        orchestrator: TransactionOrchestrator,
        connector: Arc<FakeConnector>,
        native: Arc<FakeChain>,
        host: Arc<FakeChain>,
    }

    impl Harness {
        fn network_calls(&self) -> usize {
            self.connector.connects() + self.native.network_calls() + self.host.network_calls()
        }
    }

    fn eos_chains() -> ChainPair {
        ChainPair {
            native: Chain::new(Blockchain::Eos, "mainnet"),
            host: Chain::new(Blockchain::Ethereum, "ropsten"),
        }
    }

    fn btc_chains() -> ChainPair {
        ChainPair {
            native: Chain::new(Blockchain::Bitcoin, "testnet"),
            host: Chain::new(Blockchain::Ethereum, "ropsten"),
        }
    }

    fn eos_node(endpoint: &str) -> FakeEnclave {
        let mut info = fake_info(G_PUBKEY);
        info.native_vault_address = Some(EOS_VAULT.to_string());
        FakeEnclave::new(endpoint, info)
    }

    fn harness(
        settings: OrchestratorSettings,
        chains: ChainPair,
        nodes: Vec<Arc<FakeEnclave>>,
        native: FakeChain,
        host: FakeChain,
    ) -> Harness {
        let endpoints = nodes.iter().map(|n| n.endpoint().to_string()).collect();
        let connector = Arc::new(FakeConnector::new(nodes));
        let selector = NodeSelector::new(endpoints, chains, connector.clone());
        let native = Arc::new(native);
        let host = Arc::new(host);

        let collaborators = Collaborators {
            native: ChainLeg {
                submitter: native.clone(),
                reader: native.clone(),
                poll_interval: Duration::from_millis(300),
            },
            host: ChainLeg {
                submitter: host.clone(),
                reader: host.clone(),
                poll_interval: Duration::from_secs(5),
            },
            validator: Arc::new(SyntaxValidator),
            metadata: host.clone(),
        };

        Harness {
            orchestrator: TransactionOrchestrator::new(settings, selector, collaborators),
            connector,
            native,
            host,
        }
    }

    fn names(events: &[ProgressEvent]) -> Vec<&'static str> {
        events.iter().map(ProgressEvent::name).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn issue_resolves_with_all_events_in_order() {
        let node = Arc::new(eos_node("http://a.enclave").with_incoming(vec![
            Ok(incoming(false, None)),
            Ok(incoming(false, None)),
            Ok(incoming(true, Some("0xdest"))),
        ]));
        let h = harness(
            OrchestratorSettings::new(PEOS),
            eos_chains(),
            vec![node],
            FakeChain::new(4),
            FakeChain::new(4),
        );

        let pending = h.orchestrator.issue("1", ETH_ACCOUNT).expect("valid intent");
        let (result, events) = pending.finish().await;
        let result = result.expect("issued");

        assert_eq!(result.amount, "1.0000");
        assert_eq!(result.to, ETH_ACCOUNT);
        assert_eq!(result.tx, "0xdest");
        assert_eq!(result.source_tx, "source-tx");
        assert_eq!(result.direction, Direction::Issue);
        assert_eq!(names(&events), ALL_EVENTS);

        match &events[0] {
            ProgressEvent::SourceTxConfirmed(record) => {
                assert_eq!(record.chain, eos_chains().native);
                assert_eq!(record.state, ConfirmationState::Confirmed);
            }
            other => panic!("unexpected first event {other:?}"),
        }

        assert_eq!(
            h.native.submitted(),
            vec![SubmitAction::Deposit {
                to: EOS_VAULT.to_string(),
                amount: U256::from(10_000u64),
                memo: Some(ETH_ACCOUNT.to_string()),
            }]
        );
        assert!(h.host.submitted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn events_can_be_read_while_running() {
        let node = Arc::new(eos_node("http://a.enclave").with_incoming(vec![Ok(incoming(
            true,
            Some("0xdest"),
        ))]));
        let h = harness(
            OrchestratorSettings::new(PEOS),
            eos_chains(),
            vec![node],
            FakeChain::new(4),
            FakeChain::new(4),
        );

        let mut pending = h.orchestrator.issue("2.5", ETH_ACCOUNT).expect("valid intent");
        let mut seen = Vec::new();
        while let Some(event) = pending.next_event().await {
            seen.push(event.name());
        }
        assert_eq!(seen, ALL_EVENTS);
        assert_eq!(pending.await.expect("issued").amount, "2.5000");
    }

    #[tokio::test]
    async fn redeem_zero_is_rejected_without_network_calls() {
        let h = harness(
            OrchestratorSettings::new(PEOS),
            eos_chains(),
            vec![Arc::new(eos_node("http://a.enclave"))],
            FakeChain::new(4),
            FakeChain::new(4),
        );

        let err = h.orchestrator.redeem("0", "all3manfr4di").unwrap_err();
        assert_eq!(
            err,
            BridgeError::InvalidAmount("Impossible to burn 0 pEOS".to_string())
        );
        assert_eq!(h.network_calls(), 0);
    }

    #[tokio::test]
    async fn amounts_below_minimum_are_rejected() {
        let btc = harness(
            OrchestratorSettings::new(PBTC),
            btc_chains(),
            Vec::new(),
            FakeChain::new(8),
            FakeChain::new(18),
        );
        let btc_address = encode_base58_address(0x6f, &[3u8; 20]);
        assert_eq!(
            btc.orchestrator.redeem("0.00001", &btc_address).unwrap_err(),
            BridgeError::InvalidAmount("Impossible to burn less than 0.00005 pBTC".to_string())
        );

        let eos = harness(
            OrchestratorSettings::new(PEOS),
            eos_chains(),
            Vec::new(),
            FakeChain::new(4),
            FakeChain::new(4),
        );
        assert_eq!(
            eos.orchestrator.issue("0.5", ETH_ACCOUNT).unwrap_err(),
            BridgeError::InvalidAmount("Amount to issue must be at least 1 pEOS".to_string())
        );
        assert!(matches!(
            eos.orchestrator.issue("1.00001", ETH_ACCOUNT),
            Err(BridgeError::InvalidAmount(_))
        ));
        assert!(matches!(
            eos.orchestrator.issue("abc", ETH_ACCOUNT),
            Err(BridgeError::InvalidAmount(_))
        ));

        assert_eq!(btc.network_calls() + eos.network_calls(), 0);
    }

    #[tokio::test]
    async fn invalid_destinations_are_rejected() {
        let h = harness(
            OrchestratorSettings::new(PEOS),
            eos_chains(),
            vec![Arc::new(eos_node("http://a.enclave"))],
            FakeChain::new(4),
            FakeChain::new(4),
        );

        assert_eq!(
            h.orchestrator.issue("1", "invalid eth address").unwrap_err(),
            BridgeError::InvalidAddress("Ethereum address is not valid".to_string())
        );
        assert_eq!(
            h.orchestrator.redeem("1", "invalid eos address").unwrap_err(),
            BridgeError::InvalidAddress("EOS address is not valid".to_string())
        );
        assert_eq!(h.network_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn issue_to_utxo_native_uses_verified_deposit_address() {
        let native = btc_chains().native;
        let key = parse_public_key(G_PUBKEY).unwrap();
        let address = AddressDerivation::for_chain(&native).derive(&key, ETH_ACCOUNT, 9);

        let node = Arc::new(
            FakeEnclave::new("http://a.enclave", fake_info(G_PUBKEY))
                .with_deposit(&address, G_PUBKEY, 9)
                .with_incoming(vec![Ok(incoming(true, Some("0xminted")))]),
        );
        let h = harness(
            OrchestratorSettings::new(PBTC),
            btc_chains(),
            vec![node],
            FakeChain::new(8),
            FakeChain::new(18),
        );

        let result = h
            .orchestrator
            .issue("0.001", ETH_ACCOUNT)
            .expect("valid intent")
            .await
            .expect("issued");

        assert_eq!(result.amount, "0.001000000000000000");
        assert_eq!(
            h.native.submitted(),
            vec![SubmitAction::Deposit {
                to: address,
                amount: U256::from(100_000u64),
                memo: None,
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn forged_deposit_address_aborts_issue() {
        let native = btc_chains().native;
        let key = parse_public_key(G_PUBKEY).unwrap();
        let forged = AddressDerivation::for_chain(&native).derive(&key, ETH_ACCOUNT, 10);

        let node = Arc::new(
            FakeEnclave::new("http://a.enclave", fake_info(G_PUBKEY))
                .with_deposit(&forged, G_PUBKEY, 9),
        );
        let h = harness(
            OrchestratorSettings::new(PBTC),
            btc_chains(),
            vec![node],
            FakeChain::new(8),
            FakeChain::new(18),
        );

        let (result, events) = h
            .orchestrator
            .issue("0.001", ETH_ACCOUNT)
            .expect("valid intent")
            .finish()
            .await;

        assert!(matches!(
            result,
            Err(BridgeError::DepositAddressMismatch { .. })
        ));
        assert!(events.is_empty());
        assert!(h.native.submitted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn redeem_burns_on_host_and_caches_token_metadata() {
        let btc_address = encode_base58_address(0x6f, &[3u8; 20]);
        let node = Arc::new(
            FakeEnclave::new("http://a.enclave", fake_info(G_PUBKEY)).with_incoming(vec![
                Ok(incoming(true, Some("native-release"))),
                Ok(incoming(true, Some("native-release-2"))),
            ]),
        );
        let h = harness(
            OrchestratorSettings::new(PBTC),
            btc_chains(),
            vec![node],
            FakeChain::new(8),
            FakeChain::new(18),
        );

        let (result, events) = h
            .orchestrator
            .redeem("0.5", &btc_address)
            .expect("valid intent")
            .finish()
            .await;
        let result = result.expect("redeemed");

        assert_eq!(result.amount, "0.50000000");
        assert_eq!(result.to, btc_address);
        assert_eq!(result.tx, "native-release");
        assert_eq!(names(&events), ALL_EVENTS);
        assert_eq!(
            h.host.submitted(),
            vec![SubmitAction::Redeem {
                contract: TOKEN_CONTRACT.to_string(),
                amount: U256::from(500_000_000_000_000_000u64),
                recipient: btc_address.clone(),
            }]
        );

        h.orchestrator
            .redeem("0.5", &btc_address)
            .expect("valid intent")
            .await
            .expect("redeemed");
        assert_eq!(h.host.metadata_calls(), 1);
        assert_eq!(h.connector.connects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn node_failure_while_monitoring_reselects_once() {
        let first = Arc::new(eos_node("http://a.enclave").with_incoming(vec![
            Ok(incoming(false, None)),
            Err(unreachable("http://a.enclave")),
        ]));
        let second = Arc::new(
            eos_node("http://b.enclave").with_incoming(vec![Ok(incoming(true, Some("0xdest")))]),
        );
        let h = harness(
            OrchestratorSettings::new(PEOS),
            eos_chains(),
            vec![first, second.clone()],
            FakeChain::new(4),
            FakeChain::new(4),
        );

        let (result, events) = h
            .orchestrator
            .issue("1", ETH_ACCOUNT)
            .expect("valid intent")
            .finish()
            .await;

        assert_eq!(result.expect("issued").tx, "0xdest");
        assert_eq!(names(&events), ALL_EVENTS);
        assert_eq!(second.incoming_polls(), 1);
        assert_eq!(
            h.orchestrator.selected_node().await.unwrap().endpoint(),
            "http://b.enclave"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn node_failure_surfaces_when_reselections_exhausted() {
        let first = Arc::new(
            eos_node("http://a.enclave")
                .with_incoming(vec![Err(unreachable("http://a.enclave"))]),
        );
        let second = Arc::new(eos_node("http://b.enclave"));
        let mut settings = OrchestratorSettings::new(PEOS);
        settings.max_reselections = 0;
        let h = harness(
            settings,
            eos_chains(),
            vec![first, second.clone()],
            FakeChain::new(4),
            FakeChain::new(4),
        );

        let (result, events) = h
            .orchestrator
            .issue("1", ETH_ACCOUNT)
            .expect("valid intent")
            .finish()
            .await;

        assert!(matches!(
            result,
            Err(BridgeError::EnclaveUnreachable { .. })
        ));
        assert_eq!(names(&events), vec!["onSourceTxConfirmed"]);
        assert_eq!(second.incoming_polls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn submission_failure_is_terminal() {
        let node = Arc::new(eos_node("http://a.enclave"));
        let h = harness(
            OrchestratorSettings::new(PEOS),
            eos_chains(),
            vec![node.clone()],
            FakeChain::new(4).with_submit_result(Err(ChainClientError::TransactionFailed(
                "insufficient funds".to_string(),
            ))),
            FakeChain::new(4),
        );

        let (result, events) = h
            .orchestrator
            .issue("1", ETH_ACCOUNT)
            .expect("valid intent")
            .finish()
            .await;

        assert!(matches!(result, Err(BridgeError::SubmissionFailed(_))));
        assert!(events.is_empty());
        assert_eq!(h.native.submitted().len(), 1);
        assert_eq!(h.native.reads(), 0);
        assert_eq!(node.incoming_polls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_source_transaction_is_terminal() {
        let node = Arc::new(eos_node("http://a.enclave"));
        let h = harness(
            OrchestratorSettings::new(PEOS),
            eos_chains(),
            vec![node.clone()],
            FakeChain::new(4).with_statuses(vec![Ok(TxStatus::Pending), Ok(TxStatus::Failed)]),
            FakeChain::new(4),
        );

        let (result, events) = h
            .orchestrator
            .issue("1", ETH_ACCOUNT)
            .expect("valid intent")
            .finish()
            .await;

        assert!(matches!(result, Err(BridgeError::TransactionFailed { .. })));
        assert!(events.is_empty());
        assert_eq!(node.incoming_polls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn no_reachable_node_fails_the_transfer() {
        let h = harness(
            OrchestratorSettings::new(PEOS),
            eos_chains(),
            vec![Arc::new(FakeEnclave::unreachable("http://a.enclave"))],
            FakeChain::new(4),
            FakeChain::new(4),
        );

        let result = h
            .orchestrator
            .issue("1", ETH_ACCOUNT)
            .expect("valid intent")
            .await;
        assert_eq!(result.unwrap_err(), BridgeError::NoAvailableNode { tried: 1 });
        assert_eq!(h.connector.connects(), 2);
        assert!(h.native.submitted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn selection_is_not_retried_without_budget() {
        let mut settings = OrchestratorSettings::new(PEOS);
        settings.max_reselections = 0;
        let h = harness(
            settings,
            eos_chains(),
            vec![Arc::new(FakeEnclave::unreachable("http://a.enclave"))],
            FakeChain::new(4),
            FakeChain::new(4),
        );

        let result = h
            .orchestrator
            .issue("1", ETH_ACCOUNT)
            .expect("valid intent")
            .await;
        assert_eq!(result.unwrap_err(), BridgeError::NoAvailableNode { tried: 1 });
        assert_eq!(h.connector.connects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn token_metadata_failure_is_not_a_submission_failure() {
        let btc_address = encode_base58_address(0x6f, &[3u8; 20]);
        let h = harness(
            OrchestratorSettings::new(PBTC),
            btc_chains(),
            vec![Arc::new(FakeEnclave::new("http://a.enclave", fake_info(G_PUBKEY)))],
            FakeChain::new(8),
            FakeChain::new(18).with_metadata_error(ChainClientError::ContractError(
                "execution reverted".to_string(),
            )),
        );

        let (result, events) = h
            .orchestrator
            .redeem("0.5", &btc_address)
            .expect("valid intent")
            .finish()
            .await;

        match result {
            Err(BridgeError::Internal(message)) => {
                assert!(message.starts_with("Error during getting decimals"), "{message}");
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert!(events.is_empty());
        assert!(h.host.submitted().is_empty());
    }

    #[tokio::test]
    async fn deposit_address_is_verified_before_returning() {
        let native = btc_chains().native;
        let key = parse_public_key(G_PUBKEY).unwrap();
        let address = AddressDerivation::for_chain(&native).derive(&key, ETH_ACCOUNT, 4);
        let node = Arc::new(
            FakeEnclave::new("http://a.enclave", fake_info(G_PUBKEY))
                .with_deposit(&address, G_PUBKEY, 4),
        );
        let h = harness(
            OrchestratorSettings::new(PBTC),
            btc_chains(),
            vec![node],
            FakeChain::new(8),
            FakeChain::new(18),
        );

        let deposit = h
            .orchestrator
            .get_deposit_address(ETH_ACCOUNT)
            .await
            .expect("deposit address");
        assert!(deposit.verified);
        assert_eq!(deposit.address, address);

        assert!(matches!(
            h.orchestrator.get_deposit_address("nope").await,
            Err(BridgeError::InvalidAddress(_))
        ));
    }
}
