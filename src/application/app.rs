use std::sync::Arc;

use super::aggregator::TokenAggregator;
use super::analytics::{holdings_distribution, ordered_series, SyntheticHistory};
use super::submitter::TransactionSubmitter;
use super::transfer::{AccountResolution, TransferBuilder};
use crate::domain::errors::{ApiError, TransferError};
use crate::domain::models::{
    AccountCreation, ActivityEntry, FetchStatus, HistoricalDataSource, HistoricalPoint,
    MarketEntry, TokenSummary, TransactionOutcome, TransactionSigner, TransferRequest,
    WalletOverview,
};
use crate::infrastructure::bc_client::{parse_address, BcClient};
use solana_sdk::native_token::sol_to_lamports;

#[async_trait::async_trait]
pub trait Application {
    async fn token_summary(&self, mint: &str) -> TokenSummary;
    async fn token_activity(&self, mint: &str, limit: usize)
        -> Result<Vec<ActivityEntry>, ApiError>;
    async fn wallet_overview(&self, owner: &str) -> WalletOverview;
    async fn market(&self) -> Vec<MarketEntry>;
    async fn historical_data(&self, address: &str) -> Result<Vec<HistoricalPoint>, ApiError>;
    async fn send_tokens(
        &self,
        request: TransferRequest,
        creation: AccountCreation,
        signer: Option<&dyn TransactionSigner>,
    ) -> TransactionOutcome;
    async fn create_token_account(
        &self,
        owner: &str,
        mint: &str,
        signer: Option<&dyn TransactionSigner>,
    ) -> TransactionOutcome;
    async fn request_airdrop(&self, address: &str, sol: f64) -> TransactionOutcome;
}

/// Wires every component around one injected, read-only gateway handle.
pub struct App<C> {
    bc_client: Arc<C>,
    aggregator: TokenAggregator<Arc<C>>,
    transfers: TransferBuilder<Arc<C>>,
    submitter: TransactionSubmitter<Arc<C>>,
    history: Arc<dyn HistoricalDataSource>,
    listed_mints: Vec<String>,
}

impl<C> App<C>
where
    C: BcClient + Send + Sync + 'static,
{
    pub fn new(bc_client: C, listed_mints: Vec<String>, explorer_cluster: Option<String>) -> Self {
        let bc_client = Arc::new(bc_client);
        Self {
            aggregator: TokenAggregator::builder()
                .bc_client(bc_client.clone())
                .explorer_cluster(explorer_cluster)
                .build(),
            transfers: TransferBuilder::builder()
                .bc_client(bc_client.clone())
                .build(),
            submitter: TransactionSubmitter::builder()
                .bc_client(bc_client.clone())
                .build(),
            bc_client,
            history: Arc::new(SyntheticHistory::default()),
            listed_mints,
        }
    }

    /// Replaces the placeholder balance history with a real source.
    pub fn with_history(mut self, history: Arc<dyn HistoricalDataSource>) -> Self {
        self.history = history;
        self
    }
}

#[async_trait::async_trait]
impl<C> Application for App<C>
where
    C: BcClient + Send + Sync + 'static,
{
    async fn token_summary(&self, mint: &str) -> TokenSummary {
        tracing::info!("Computing summary for mint {}", mint);
        self.aggregator.compute_token_summary(mint).await
    }

    async fn token_activity(
        &self,
        mint: &str,
        limit: usize,
    ) -> Result<Vec<ActivityEntry>, ApiError> {
        tracing::info!("Getting recent activity of {}", mint);
        Ok(self.aggregator.recent_activity(mint, limit).await?)
    }

    async fn wallet_overview(&self, owner: &str) -> WalletOverview {
        tracing::info!("Getting wallet overview of {}", owner);
        let holdings = self.aggregator.compute_wallet_holdings(owner).await;
        let lamports = match (&holdings.status, parse_address(owner)) {
            (FetchStatus::Fetched, Ok(owner)) => self.aggregator.sol_balance(&owner).await,
            _ => None,
        };
        WalletOverview {
            lamports,
            distribution: holdings_distribution(&holdings.holdings),
            holdings,
        }
    }

    async fn market(&self) -> Vec<MarketEntry> {
        tracing::info!("Getting market overview of {} listed mints", self.listed_mints.len());
        self.aggregator.market_overview(&self.listed_mints).await
    }

    async fn historical_data(&self, address: &str) -> Result<Vec<HistoricalPoint>, ApiError> {
        let owner = parse_address(address).map_err(|_| ApiError::InvalidAddress)?;
        let points = self.history.history(&owner).await.map_err(|e| {
            tracing::error!("Error fetching historical data for {}: {}", owner, e);
            ApiError::Internal
        })?;

        let points = ordered_series(points);
        if points.is_empty() {
            return Err(ApiError::NoData);
        }
        Ok(points)
    }

    async fn send_tokens(
        &self,
        request: TransferRequest,
        creation: AccountCreation,
        signer: Option<&dyn TransactionSigner>,
    ) -> TransactionOutcome {
        tracing::info!(
            "Sending {} of {} from {} to {}",
            request.ui_amount,
            request.mint,
            request.sender,
            request.recipient
        );
        if signer.is_none() {
            return TransactionOutcome::failure(TransferError::InsufficientContext);
        }

        match self.transfers.build_transfer(&request, creation).await {
            Ok(built) => {
                self.submitter
                    .submit(built, signer, "Transfer completed successfully!")
                    .await
            }
            Err(e) => {
                tracing::error!("Error building transfer: {}", e);
                TransactionOutcome::failure(e)
            }
        }
    }

    async fn create_token_account(
        &self,
        owner: &str,
        mint: &str,
        signer: Option<&dyn TransactionSigner>,
    ) -> TransactionOutcome {
        tracing::info!("Creating token account of {} for {}", mint, owner);
        if signer.is_none() {
            return TransactionOutcome::failure(TransferError::InsufficientContext);
        }

        match self.transfers.build_create_account(owner, mint).await {
            Ok(AccountResolution::Existing(account)) => TransactionOutcome {
                success: true,
                message: "Token account already exists".to_string(),
                signature: None,
                token_account: None,
            }
            .with_token_account(account),
            Ok(AccountResolution::ToCreate(built)) => {
                self.submitter
                    .submit(built, signer, "Token account created successfully!")
                    .await
            }
            Err(e) => {
                tracing::error!("Error creating token account: {}", e);
                TransactionOutcome::failure(e)
            }
        }
    }

    async fn request_airdrop(&self, address: &str, sol: f64) -> TransactionOutcome {
        tracing::info!("Requesting airdrop of {} SOL for {}", sol, address);
        let recipient = match parse_address(address) {
            Ok(recipient) => recipient,
            Err(e) => return TransactionOutcome::failure(e),
        };
        if !sol.is_finite() || sol <= 0.0 {
            return TransactionOutcome::failure(TransferError::InvalidAmount(format!(
                "airdrop amount must be positive, got {sol}"
            )));
        }

        let result = async {
            let signature = self
                .bc_client
                .request_airdrop(&recipient, sol_to_lamports(sol))
                .await?;
            self.bc_client.confirm_transaction(&signature).await?;
            Ok::<_, crate::domain::errors::GatewayError>(signature)
        }
        .await;

        match result {
            Ok(signature) => TransactionOutcome::success(
                format!("{sol} SOL airdropped successfully!"),
                signature.to_string(),
            ),
            Err(e) => {
                tracing::error!("Error requesting airdrop: {}", e);
                TransactionOutcome::failure(e)
            }
        }
    }
}
