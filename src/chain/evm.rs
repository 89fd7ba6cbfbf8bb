// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM host-chain adapter.
//!
//! Reads receipts and pegged-token metadata over JSON-RPC, and submits the
//! pegged token's `redeem` burn call with a local signer.

use std::str::FromStr;

use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::{Address, B256},
    providers::{
        fillers::{
            BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller,
            WalletFiller,
        },
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    sol,
    sol_types::SolCall,
};
use async_trait::async_trait;
use serde_json::json;

use super::traits::{
    ChainClientError, ChainReader, ChainSubmitter, SubmitAction, SubmitParams, SubmittedTx,
    TokenMetadataSource,
};
use super::types::{Blockchain, Chain, ChainTxStatus, TokenMetadata, TxStatus};

sol! {
    #[sol(rpc)]
    interface IPToken {
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function redeem(uint256 value, string underlyingAssetRecipient) external returns (bool);
    }
}

/// HTTP provider type for read-only access (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// HTTP provider type with a wallet attached for signing.
type SigningProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Ethereum>,
>;

/// Standard priority fee (1.5 gwei).
const DEFAULT_PRIORITY_FEE: u128 = 1_500_000_000;

/// Base fee assumed when the latest block does not report one (25 gwei).
const FALLBACK_BASE_FEE: u128 = 25_000_000_000;

/// EVM network endpoint.
#[derive(Debug, Clone)]
pub struct EvmNetwork {
    /// Network name for display
    pub name: String,
    /// RPC endpoint URL
    pub rpc_url: String,
}

fn parse_rpc_url(network: &EvmNetwork) -> Result<url::Url, ChainClientError> {
    network
        .rpc_url
        .parse()
        .map_err(|e: url::ParseError| ChainClientError::InvalidRpcUrl(e.to_string()))
}

fn ensure_ethereum(chain: &Chain, operation: &str) -> Result<(), ChainClientError> {
    if chain.blockchain == Blockchain::Ethereum {
        Ok(())
    } else {
        Err(ChainClientError::Unsupported {
            chain: chain.to_string(),
            operation: operation.to_string(),
        })
    }
}

/// Create a signer from a private key (hex string, `0x` prefix optional).
pub fn create_signer(private_key_hex: &str) -> Result<PrivateKeySigner, ChainClientError> {
    let key_bytes = alloy::hex::decode(private_key_hex.trim())
        .map_err(|e| ChainClientError::InvalidPrivateKey(e.to_string()))?;

    PrivateKeySigner::from_slice(&key_bytes)
        .map_err(|e| ChainClientError::InvalidPrivateKey(e.to_string()))
}

/// Read-only EVM client: receipts and token metadata.
pub struct EvmClient {
    network: EvmNetwork,
    provider: HttpProvider,
}

impl EvmClient {
    pub fn new(network: EvmNetwork) -> Result<Self, ChainClientError> {
        let url = parse_rpc_url(&network)?;
        let provider = ProviderBuilder::new().connect_http(url);
        Ok(Self { network, provider })
    }

    pub fn network(&self) -> &EvmNetwork {
        &self.network
    }
}

#[async_trait]
impl ChainReader for EvmClient {
    async fn get_transaction(
        &self,
        chain: &Chain,
        tx_hash: &str,
    ) -> Result<ChainTxStatus, ChainClientError> {
        ensure_ethereum(chain, "get_transaction")?;

        let hash = B256::from_str(tx_hash)
            .map_err(|e| ChainClientError::InvalidAddress(format!("Invalid tx hash: {}", e)))?;

        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| ChainClientError::RpcError(format!("Failed to get receipt: {}", e)))?;

        Ok(match receipt {
            None => ChainTxStatus {
                status: TxStatus::Pending,
                raw: serde_json::Value::Null,
            },
            Some(receipt) => ChainTxStatus {
                status: if receipt.status() {
                    TxStatus::Confirmed
                } else {
                    TxStatus::Failed
                },
                raw: serde_json::to_value(&receipt).unwrap_or_default(),
            },
        })
    }
}

#[async_trait]
impl TokenMetadataSource for EvmClient {
    async fn token_metadata(
        &self,
        chain: &Chain,
        contract_address: &str,
    ) -> Result<TokenMetadata, ChainClientError> {
        ensure_ethereum(chain, "token_metadata")?;

        let address = Address::from_str(contract_address)
            .map_err(|e| ChainClientError::InvalidAddress(e.to_string()))?;
        let contract = IPToken::new(address, self.provider.clone());

        let decimals: u8 = contract
            .decimals()
            .call()
            .await
            .map_err(|e| ChainClientError::ContractError(e.to_string()))?;
        let symbol: Option<String> = contract.symbol().call().await.ok();

        Ok(TokenMetadata { decimals, symbol })
    }
}

/// Signing EVM client that submits pegged-token burns.
pub struct EvmSubmitter {
    network: EvmNetwork,
    account: Address,
    provider: SigningProvider,
}

impl EvmSubmitter {
    /// Create a new submitter with signing capabilities.
    pub fn new(network: EvmNetwork, signer: PrivateKeySigner) -> Result<Self, ChainClientError> {
        let url = parse_rpc_url(&network)?;
        let account = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url);

        Ok(Self {
            network,
            account,
            provider,
        })
    }

    /// Create a submitter from a hex-encoded private key.
    pub fn from_private_key(
        network: EvmNetwork,
        private_key_hex: &str,
    ) -> Result<Self, ChainClientError> {
        Self::new(network, create_signer(private_key_hex)?)
    }

    /// Get current gas prices from the network.
    async fn get_gas_prices(&self) -> Result<(u128, u128), ChainClientError> {
        let block = self
            .provider
            .get_block_by_number(alloy::eips::BlockNumberOrTag::Latest)
            .await
            .map_err(|e| ChainClientError::RpcError(format!("Failed to get block: {}", e)))?
            .ok_or_else(|| ChainClientError::RpcError("No latest block".to_string()))?;

        let base_fee: u128 = block
            .header
            .base_fee_per_gas
            .map(|f| f as u128)
            .unwrap_or(FALLBACK_BASE_FEE);

        // Max fee = 2 * base_fee + priority_fee (allows for base fee increase)
        let max_fee = base_fee
            .saturating_mul(2)
            .saturating_add(DEFAULT_PRIORITY_FEE);

        Ok((max_fee, DEFAULT_PRIORITY_FEE))
    }

    async fn send_redeem(
        &self,
        contract: &str,
        call: IPToken::redeemCall,
        params: &SubmitParams,
    ) -> Result<SubmittedTx, ChainClientError> {
        let contract_addr = Address::from_str(contract).map_err(|e| {
            ChainClientError::InvalidAddress(format!("Invalid contract address: {}", e))
        })?;

        let (max_fee_per_gas, default_priority_fee) = self.get_gas_prices().await?;
        let priority_fee = params.max_priority_fee.unwrap_or(default_priority_fee);

        let mut tx = TransactionRequest::default()
            .to(contract_addr)
            .input(call.abi_encode().into())
            .max_fee_per_gas(max_fee_per_gas.max(priority_fee))
            .max_priority_fee_per_gas(priority_fee);

        if let Some(limit) = params.gas_limit {
            tx = tx.gas_limit(limit);
        }

        let pending = self.provider.send_transaction(tx).await.map_err(|e| {
            ChainClientError::TransactionFailed(format!("Failed to send: {}", e))
        })?;

        let tx_hash = format!("{:#x}", pending.tx_hash());
        tracing::info!(
            network = %self.network.name,
            tx_hash = %tx_hash,
            "Submitted redeem transaction"
        );

        Ok(SubmittedTx {
            receipt: json!({
                "transactionHash": tx_hash,
                "from": format!("{:#x}", self.account),
                "to": format!("{:#x}", contract_addr),
            }),
            tx_hash,
        })
    }
}

#[async_trait]
impl ChainSubmitter for EvmSubmitter {
    async fn submit(
        &self,
        chain: &Chain,
        action: &SubmitAction,
        params: &SubmitParams,
    ) -> Result<SubmittedTx, ChainClientError> {
        ensure_ethereum(chain, "submit")?;

        match action {
            SubmitAction::Redeem {
                contract,
                amount,
                recipient,
            } => {
                let call = IPToken::redeemCall {
                    value: *amount,
                    underlyingAssetRecipient: recipient.clone(),
                };
                self.send_redeem(contract, call, params).await
            }
            SubmitAction::Deposit { .. } => Err(ChainClientError::Unsupported {
                chain: chain.to_string(),
                operation: "deposit".to_string(),
            }),
        }
    }

    fn account(&self) -> Option<String> {
        Some(self.account.to_checksum(None))
    }
}
