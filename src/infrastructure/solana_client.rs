use serde_json::json;
use solana_account_decoder::{UiAccount, UiAccountEncoding};
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_client::GetConfirmedSignaturesForAddress2Config,
    rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig, RpcSendTransactionConfig},
    rpc_filter::{Memcmp, RpcFilterType},
    rpc_request::{RpcError, RpcRequest, TokenAccountsFilter},
    rpc_response::{Response, RpcKeyedAccount},
};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    hash::Hash,
    program_pack::Pack,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};
use std::{str::FromStr, sync::Arc, time::Duration};
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    RetryIf,
};

use crate::domain::errors::GatewayError;
use crate::domain::models::{HoldingAccount, HoldingFilter, MintDescriptor, SignatureRecord};

use super::bc_client::BcClient;
use super::parsed_account::{holding_from_account_data, mint_from_account_data};

/// Reads fail on the first transport error unless retries are configured.
pub const DEFAULT_READ_RETRIES: usize = 0;
const READ_BACKOFF_BASE_MILLIS: u64 = 2;
const READ_BACKOFF_FACTOR: u64 = 100;
const READ_BACKOFF_MAX_DELAY: Duration = Duration::from_secs(2);
const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(30);
const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A client for interacting with the Solana blockchain.
///
/// Cloning is cheap and every clone shares the same connection; the handle carries only
/// read-only configuration.
#[derive(Clone)]
pub struct SolanaClient {
    rpc_client: Arc<RpcClient>,
    read_retries: usize,
    confirm_timeout: Duration,
}

impl SolanaClient {
    /// Creates a new `SolanaClient` instance from the given RPC URL.
    ///
    /// # Arguments
    ///
    /// * `rpc_url` - The URL of the Solana RPC endpoint.
    ///
    /// # Returns
    ///
    /// A new `SolanaClient` instance.
    pub fn from_url(rpc_url: &str) -> Self {
        Self::from_rpc_client(RpcClient::new_with_commitment(
            rpc_url.to_string(),
            CommitmentConfig::confirmed(),
        ))
    }

    /// Wraps an already configured `RpcClient`.
    pub fn from_rpc_client(rpc_client: RpcClient) -> Self {
        Self {
            rpc_client: Arc::new(rpc_client),
            read_retries: DEFAULT_READ_RETRIES,
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
        }
    }

    /// Sets how many times an idempotent read is retried after a transport failure. Node
    /// rejections and writes are never retried.
    pub fn with_read_retries(mut self, read_retries: usize) -> Self {
        self.read_retries = read_retries;
        self
    }

    /// Sets how long `confirm_transaction` waits before giving up.
    pub fn with_confirm_timeout(mut self, confirm_timeout: Duration) -> Self {
        self.confirm_timeout = confirm_timeout;
        self
    }

    fn retry_strategy(&self) -> impl Iterator<Item = Duration> {
        read_backoff(self.read_retries).map(jitter)
    }

    async fn parsed_token_accounts_of_mint(
        &self,
        mint: &Pubkey,
    ) -> Result<Vec<RpcKeyedAccount>, ClientError> {
        let config = RpcProgramAccountsConfig {
            filters: Some(vec![
                RpcFilterType::DataSize(spl_token::state::Account::LEN as u64),
                RpcFilterType::Memcmp(Memcmp::new_base58_encoded(0, mint.as_ref())),
            ]),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::JsonParsed),
                commitment: Some(CommitmentConfig::confirmed()),
                ..RpcAccountInfoConfig::default()
            },
            ..RpcProgramAccountsConfig::default()
        };
        let params = json!([spl_token::id().to_string(), config]);

        RetryIf::spawn(
            self.retry_strategy(),
            || {
                self.rpc_client
                    .send::<Vec<RpcKeyedAccount>>(RpcRequest::GetProgramAccounts, params.clone())
            },
            is_transient,
        )
        .await
    }

    async fn poll_until_confirmed(&self, signature: &Signature) -> Result<(), GatewayError> {
        loop {
            let status = self
                .rpc_client
                .get_signature_status_with_commitment(signature, CommitmentConfig::confirmed())
                .await
                .map_err(classify)?;

            match status {
                Some(Ok(())) => return Ok(()),
                Some(Err(e)) => return Err(GatewayError::NodeRejected(e.to_string())),
                None => tokio::time::sleep(CONFIRM_POLL_INTERVAL).await,
            }
        }
    }
}

/// Delays between read attempts before jitter: 200ms, 400ms, 800ms, ... capped at 2s.
fn read_backoff(retries: usize) -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(READ_BACKOFF_BASE_MILLIS)
        .factor(READ_BACKOFF_FACTOR)
        .max_delay(READ_BACKOFF_MAX_DELAY)
        .take(retries)
}

fn is_transient(err: &ClientError) -> bool {
    matches!(err.kind(), ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_))
}

/// Splits client failures into transport problems and node-side rejections.
fn classify(err: ClientError) -> GatewayError {
    match err.kind() {
        ClientErrorKind::RpcError(RpcError::RpcResponseError { .. })
        | ClientErrorKind::TransactionError(_)
        | ClientErrorKind::SigningError(_) => GatewayError::NodeRejected(err.to_string()),
        _ => GatewayError::Network(err.to_string()),
    }
}

fn into_holdings(accounts: Vec<RpcKeyedAccount>) -> Vec<HoldingAccount> {
    accounts
        .into_iter()
        .filter_map(|keyed| {
            let address = Pubkey::from_str(&keyed.pubkey).ok()?;
            let holding = holding_from_account_data(address, &keyed.account.data);
            if holding.is_none() {
                tracing::warn!("Skipping unparseable token account {}", keyed.pubkey);
            }
            holding
        })
        .collect()
}

#[async_trait::async_trait]
impl BcClient for SolanaClient {
    async fn get_mint_descriptor(&self, mint: &Pubkey) -> Result<MintDescriptor, GatewayError> {
        let params = json!([
            mint.to_string(),
            { "encoding": "jsonParsed", "commitment": "confirmed" }
        ]);

        let response = RetryIf::spawn(
            self.retry_strategy(),
            || {
                self.rpc_client
                    .send::<Response<Option<UiAccount>>>(RpcRequest::GetAccountInfo, params.clone())
            },
            is_transient,
        )
        .await
        .map_err(classify)?;

        let account = response
            .value
            .ok_or_else(|| GatewayError::NotFound(format!("mint {mint}")))?;
        Ok(mint_from_account_data(*mint, &account.data))
    }

    async fn list_holding_accounts(
        &self,
        filter: HoldingFilter,
    ) -> Result<Vec<HoldingAccount>, GatewayError> {
        let accounts = match filter {
            HoldingFilter::Mint(mint) => self.parsed_token_accounts_of_mint(&mint).await,
            HoldingFilter::Owner(owner) => {
                RetryIf::spawn(
                    self.retry_strategy(),
                    || {
                        self.rpc_client.get_token_accounts_by_owner(
                            &owner,
                            TokenAccountsFilter::ProgramId(spl_token::id()),
                        )
                    },
                    is_transient,
                )
                .await
            }
        }
        .map_err(classify)?;

        Ok(into_holdings(accounts))
    }

    async fn list_recent_signatures(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureRecord>, GatewayError> {
        let statuses = RetryIf::spawn(
            self.retry_strategy(),
            || {
                self.rpc_client.get_signatures_for_address_with_config(
                    address,
                    GetConfirmedSignaturesForAddress2Config {
                        before: None,
                        until: None,
                        limit: Some(limit),
                        commitment: Some(CommitmentConfig::confirmed()),
                    },
                )
            },
            is_transient,
        )
        .await
        .map_err(classify)?;

        Ok(statuses
            .into_iter()
            .take(limit)
            .map(|status| SignatureRecord {
                signature: status.signature,
                block_time: status
                    .block_time
                    .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0)),
                errored: status.err.is_some(),
            })
            .collect())
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, GatewayError> {
        RetryIf::spawn(
            self.retry_strategy(),
            || self.rpc_client.get_latest_blockhash(),
            is_transient,
        )
        .await
        .map_err(classify)
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool, GatewayError> {
        let response = RetryIf::spawn(
            self.retry_strategy(),
            || {
                self.rpc_client
                    .get_account_with_commitment(address, CommitmentConfig::confirmed())
            },
            is_transient,
        )
        .await
        .map_err(classify)?;
        Ok(response.value.is_some())
    }

    async fn get_sol_balance(&self, owner: &Pubkey) -> Result<u64, GatewayError> {
        RetryIf::spawn(
            self.retry_strategy(),
            || self.rpc_client.get_balance(owner),
            is_transient,
        )
        .await
        .map_err(classify)
    }

    async fn submit_signed_transaction(&self, bytes: Vec<u8>) -> Result<Signature, GatewayError> {
        let transaction: Transaction = bincode::deserialize(&bytes)
            .map_err(|e| GatewayError::NodeRejected(format!("malformed transaction: {e}")))?;

        self.rpc_client
            .send_transaction_with_config(
                &transaction,
                RpcSendTransactionConfig {
                    preflight_commitment: Some(CommitmentLevel::Confirmed),
                    ..RpcSendTransactionConfig::default()
                },
            )
            .await
            .map_err(classify)
    }

    async fn confirm_transaction(&self, signature: &Signature) -> Result<(), GatewayError> {
        tokio::time::timeout(self.confirm_timeout, self.poll_until_confirmed(signature))
            .await
            .map_err(|_| {
                GatewayError::ConfirmationTimeout(format!(
                    "{signature} not confirmed after {}s",
                    self.confirm_timeout.as_secs()
                ))
            })?
    }

    async fn request_airdrop(
        &self,
        address: &Pubkey,
        lamports: u64,
    ) -> Result<Signature, GatewayError> {
        self.rpc_client
            .request_airdrop(address, lamports)
            .await
            .map_err(classify)
    }
}
