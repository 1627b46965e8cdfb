use crate::domain::{
    errors::GatewayError,
    models::{
        ActivityEntry, ActivityStatus, AddressLabels, FetchStatus, HoldingAccount, HoldingFilter,
        MarketEntry, SignatureRecord, TokenLabel, TokenLabelResolver, TokenSummary, WalletHolding,
        WalletHoldings,
    },
};
use crate::infrastructure::bc_client::{parse_address, BcClient};
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashSet;
use std::sync::Arc;
use typed_builder::TypedBuilder;

/// How many signatures are scanned when counting recent activity.
pub const SIGNATURE_SCAN_LIMIT: usize = 1000;

/// Trailing window counted as recent activity.
pub fn activity_window() -> Duration {
    Duration::hours(24)
}

/// Derives per-mint statistics and per-wallet balances from the gateway.
///
/// Nothing is kept between calls. Read failures degrade to zero-valued results marked
/// [`FetchStatus::Unknown`] so a dashboard never hard-fails on partial data.
#[derive(Clone, TypedBuilder)]
pub struct TokenAggregator<C> {
    bc_client: C,
    #[builder(default = Arc::new(AddressLabels) as Arc<dyn TokenLabelResolver>)]
    labels: Arc<dyn TokenLabelResolver>,
    /// Cluster name appended to explorer links, `None` for mainnet
    #[builder(default = Some("devnet".to_string()))]
    explorer_cluster: Option<String>,
}

impl<C> TokenAggregator<C>
where
    C: BcClient + Send + Sync,
{
    /// Computes the summary of `mint_address`, degrading to an unknown zero summary on failure.
    pub async fn compute_token_summary(&self, mint_address: &str) -> TokenSummary {
        self.compute_token_summary_at(mint_address, Utc::now()).await
    }

    pub async fn compute_token_summary_at(
        &self,
        mint_address: &str,
        now: DateTime<Utc>,
    ) -> TokenSummary {
        let result = match parse_address(mint_address) {
            Ok(mint) => self.try_compute_token_summary(&mint, now).await,
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            tracing::warn!("Token summary for {} degraded: {}", mint_address, e);
            TokenSummary::unknown(mint_address, e.to_string())
        })
    }

    /// Strict variant of [`Self::compute_token_summary_at`] that propagates gateway errors.
    pub async fn try_compute_token_summary(
        &self,
        mint: &Pubkey,
        now: DateTime<Utc>,
    ) -> Result<TokenSummary, GatewayError> {
        let (descriptor, holders, signatures) = futures::try_join!(
            self.bc_client.get_mint_descriptor(mint),
            self.bc_client.list_holding_accounts(HoldingFilter::Mint(*mint)),
            self.bc_client.list_recent_signatures(mint, SIGNATURE_SCAN_LIMIT),
        )?;

        let summary = TokenSummary::fetched(
            &descriptor,
            count_holders(&holders),
            count_recent(&signatures, now),
        );
        tracing::info!(
            "Summary for {}: {} holders, {} recent transactions",
            mint,
            summary.holder_count,
            summary.recent_activity_count
        );
        Ok(summary)
    }

    /// Lists the holdings of `owner_address` with a display label for each mint.
    pub async fn compute_wallet_holdings(&self, owner_address: &str) -> WalletHoldings {
        let result = match parse_address(owner_address) {
            Ok(owner) => self
                .bc_client
                .list_holding_accounts(HoldingFilter::Owner(owner))
                .await,
            Err(e) => Err(e),
        };

        match result {
            Ok(accounts) => WalletHoldings {
                owner: owner_address.to_string(),
                holdings: accounts
                    .into_iter()
                    .map(|account| self.label_holding(account))
                    .collect(),
                status: FetchStatus::Fetched,
            },
            Err(e) => {
                tracing::warn!("Holdings for {} degraded: {}", owner_address, e);
                WalletHoldings {
                    owner: owner_address.to_string(),
                    holdings: Vec::new(),
                    status: FetchStatus::Unknown {
                        reason: e.to_string(),
                    },
                }
            }
        }
    }

    /// Native balance of `owner`, `None` when it cannot be fetched.
    pub async fn sol_balance(&self, owner: &Pubkey) -> Option<u64> {
        match self.bc_client.get_sol_balance(owner).await {
            Ok(lamports) => Some(lamports),
            Err(e) => {
                tracing::warn!("SOL balance for {} unavailable: {}", owner, e);
                None
            }
        }
    }

    /// Most recent transactions referencing `address`, newest first.
    pub async fn recent_activity(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<ActivityEntry>, GatewayError> {
        let address = parse_address(address)?;
        let signatures = self
            .bc_client
            .list_recent_signatures(&address, limit)
            .await?;

        Ok(signatures
            .into_iter()
            .map(|record| ActivityEntry {
                explorer_url: self.explorer_url(&record.signature),
                status: if record.errored {
                    ActivityStatus::Failed
                } else {
                    ActivityStatus::Success
                },
                signature: record.signature,
                block_time: record.block_time,
            })
            .collect())
    }

    /// Labelled summaries of every listed mint, fetched concurrently. Failed mints come back
    /// unknown.
    pub async fn market_overview(&self, mints: &[String]) -> Vec<MarketEntry> {
        join_all(mints.iter().map(|mint| async move {
            MarketEntry {
                label: self.label_for(mint),
                summary: self.compute_token_summary(mint).await,
            }
        }))
        .await
    }

    fn label_holding(&self, account: HoldingAccount) -> WalletHolding {
        WalletHolding {
            label: self.labels.resolve(&account.mint),
            ui_balance: account.ui_balance(),
            account,
        }
    }

    fn label_for(&self, mint: &str) -> TokenLabel {
        match parse_address(mint) {
            Ok(mint) => self.labels.resolve(&mint),
            Err(_) => TokenLabel {
                name: mint.to_string(),
                symbol: String::new(),
            },
        }
    }

    fn explorer_url(&self, signature: &str) -> String {
        match &self.explorer_cluster {
            Some(cluster) => format!("https://explorer.solana.com/tx/{signature}?cluster={cluster}"),
            None => format!("https://explorer.solana.com/tx/{signature}"),
        }
    }
}

/// Distinct owners across the accounts, zero-balance accounts included.
pub fn count_holders(accounts: &[HoldingAccount]) -> usize {
    accounts
        .iter()
        .map(|account| account.owner)
        .collect::<HashSet<_>>()
        .len()
}

/// Signatures whose block time falls inside the trailing window ending at `now`. Entries
/// without a block time are not counted.
pub fn count_recent(signatures: &[SignatureRecord], now: DateTime<Utc>) -> usize {
    let cutoff = now - activity_window();
    signatures
        .iter()
        .filter(|record| record.block_time.is_some_and(|time| time > cutoff))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::MintDescriptor;
    use crate::infrastructure::bc_client::MockBcClient;

    fn holding(owner: Pubkey, mint: Pubkey, raw_amount: u64) -> HoldingAccount {
        HoldingAccount {
            address: Pubkey::new_unique(),
            owner,
            mint,
            raw_amount,
            decimals: 6,
        }
    }

    fn signature(name: &str, block_time: Option<DateTime<Utc>>) -> SignatureRecord {
        SignatureRecord {
            signature: name.to_string(),
            block_time,
            errored: false,
        }
    }

    fn aggregator(mock: MockBcClient) -> TokenAggregator<MockBcClient> {
        TokenAggregator::builder().bc_client(mock).build()
    }

    #[tokio::test]
    async fn test_summary_counts_distinct_holders_and_recent_activity() {
        let now = Utc::now();
        let mint = Pubkey::new_unique();
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();

        let mut mock = MockBcClient::new();
        mock.expect_get_mint_descriptor().returning(|mint| {
            Ok(MintDescriptor {
                address: *mint,
                decimals: 6,
                raw_supply: 5_000_000,
            })
        });
        mock.expect_list_holding_accounts()
            .withf(move |filter| *filter == HoldingFilter::Mint(mint))
            .returning(move |_| {
                Ok(vec![
                    holding(alice, mint, 10),
                    holding(alice, mint, 20),
                    // zero-balance accounts still count as holders
                    holding(bob, mint, 0),
                ])
            });
        mock.expect_list_recent_signatures()
            .withf(|_, limit| *limit == SIGNATURE_SCAN_LIMIT)
            .returning(move |_, _| {
                Ok(vec![
                    signature("a", Some(now - Duration::hours(1))),
                    signature("b", Some(now - Duration::hours(23))),
                    signature("c", Some(now - Duration::hours(25))),
                ])
            });

        let summary = aggregator(mock)
            .compute_token_summary_at(&mint.to_string(), now)
            .await;

        assert_eq!(summary.status, FetchStatus::Fetched);
        assert_eq!(summary.holder_count, 2);
        assert_eq!(summary.recent_activity_count, 2);
        assert_eq!(summary.ui_supply, rust_decimal::Decimal::from(5));
    }

    #[tokio::test]
    async fn test_summary_of_mint_without_holders_is_zero() {
        let mut mock = MockBcClient::new();
        mock.expect_get_mint_descriptor().returning(|mint| {
            Ok(MintDescriptor {
                address: *mint,
                decimals: 9,
                raw_supply: 0,
            })
        });
        mock.expect_list_holding_accounts()
            .returning(|_| Ok(Vec::new()));
        mock.expect_list_recent_signatures()
            .returning(|_, _| Ok(Vec::new()));

        let summary = aggregator(mock)
            .compute_token_summary(&Pubkey::new_unique().to_string())
            .await;

        assert_eq!(summary.holder_count, 0);
        assert_eq!(summary.recent_activity_count, 0);
        assert!(!summary.status.is_unknown());
    }

    #[tokio::test]
    async fn test_summary_degrades_to_unknown_on_fetch_failure() {
        let mut mock = MockBcClient::new();
        mock.expect_get_mint_descriptor()
            .returning(|_| Err(GatewayError::Network("connection reset".to_string())));
        mock.expect_list_holding_accounts()
            .returning(|_| Ok(Vec::new()));
        mock.expect_list_recent_signatures()
            .returning(|_, _| Ok(Vec::new()));

        let mint = Pubkey::new_unique().to_string();
        let summary = aggregator(mock).compute_token_summary(&mint).await;

        assert_eq!(summary.mint_address, mint);
        assert_eq!(summary.holder_count, 0);
        assert!(summary.status.is_unknown());
    }

    #[tokio::test]
    async fn test_summary_of_malformed_address_never_reaches_the_gateway() {
        let mock = MockBcClient::new();
        let summary = aggregator(mock).compute_token_summary("xyz").await;
        match summary.status {
            FetchStatus::Unknown { reason } => assert!(reason.starts_with("InvalidAddress")),
            FetchStatus::Fetched => panic!("expected unknown summary"),
        }
    }

    #[tokio::test]
    async fn test_strict_summary_propagates_errors() {
        let mut mock = MockBcClient::new();
        mock.expect_get_mint_descriptor()
            .returning(|mint| Err(GatewayError::NotFound(mint.to_string())));
        mock.expect_list_holding_accounts()
            .returning(|_| Ok(Vec::new()));
        mock.expect_list_recent_signatures()
            .returning(|_, _| Ok(Vec::new()));

        let result = aggregator(mock)
            .try_compute_token_summary(&Pubkey::new_unique(), Utc::now())
            .await;
        assert!(matches!(result, Err(GatewayError::NotFound(_))));
    }

    #[test]
    fn test_signatures_without_block_time_are_not_recent() {
        let now = Utc::now();
        let records = vec![
            signature("a", None),
            signature("b", Some(now)),
            signature("c", Some(now - Duration::hours(24))),
        ];
        assert_eq!(count_recent(&records, now), 1);
    }

    #[tokio::test]
    async fn test_wallet_holdings_are_labelled() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let mut mock = MockBcClient::new();
        mock.expect_list_holding_accounts()
            .withf(move |filter| *filter == HoldingFilter::Owner(owner))
            .returning(move |_| Ok(vec![holding(owner, mint, 2_500_000)]));

        let holdings = aggregator(mock)
            .compute_wallet_holdings(&owner.to_string())
            .await;

        assert_eq!(holdings.status, FetchStatus::Fetched);
        assert_eq!(holdings.holdings.len(), 1);
        let first = &holdings.holdings[0];
        assert_eq!(first.ui_balance, rust_decimal::Decimal::new(25, 1));
        assert_eq!(first.label, AddressLabels.resolve(&mint));
    }

    #[tokio::test]
    async fn test_wallet_holdings_degrade_on_failure() {
        let mut mock = MockBcClient::new();
        mock.expect_list_holding_accounts()
            .returning(|_| Err(GatewayError::Network("timeout".to_string())));

        let holdings = aggregator(mock)
            .compute_wallet_holdings(&Pubkey::new_unique().to_string())
            .await;
        assert!(holdings.holdings.is_empty());
        assert!(holdings.status.is_unknown());
    }

    #[tokio::test]
    async fn test_recent_activity_marks_failures_and_links_explorer() {
        let mut mock = MockBcClient::new();
        mock.expect_list_recent_signatures()
            .withf(|_, limit| *limit == 10)
            .returning(|_, _| {
                Ok(vec![
                    SignatureRecord {
                        signature: "sig1".to_string(),
                        block_time: None,
                        errored: true,
                    },
                    SignatureRecord {
                        signature: "sig2".to_string(),
                        block_time: None,
                        errored: false,
                    },
                ])
            });

        let activity = aggregator(mock)
            .recent_activity(&Pubkey::new_unique().to_string(), 10)
            .await
            .unwrap();

        assert_eq!(activity[0].status, ActivityStatus::Failed);
        assert_eq!(activity[1].status, ActivityStatus::Success);
        assert_eq!(
            activity[0].explorer_url,
            "https://explorer.solana.com/tx/sig1?cluster=devnet"
        );
    }

    #[tokio::test]
    async fn test_market_overview_keeps_failed_mints_as_unknown() {
        let good = Pubkey::new_unique();
        let mut mock = MockBcClient::new();
        mock.expect_get_mint_descriptor().returning(|mint| {
            Ok(MintDescriptor {
                address: *mint,
                decimals: 2,
                raw_supply: 100,
            })
        });
        mock.expect_list_holding_accounts()
            .returning(|_| Ok(Vec::new()));
        mock.expect_list_recent_signatures()
            .returning(|_, _| Ok(Vec::new()));

        let overview = aggregator(mock)
            .market_overview(&[good.to_string(), "bad".to_string()])
            .await;

        assert_eq!(overview.len(), 2);
        assert!(!overview[0].summary.status.is_unknown());
        assert!(overview[1].summary.status.is_unknown());
        assert_eq!(overview[0].label, AddressLabels.resolve(&good));
        assert_eq!(overview[1].label.name, "bad");
    }

    struct ListedLabels;

    impl TokenLabelResolver for ListedLabels {
        fn resolve(&self, _mint: &Pubkey) -> TokenLabel {
            TokenLabel {
                name: "Pato Token".to_string(),
                symbol: "PATO".to_string(),
            }
        }
    }

    #[tokio::test]
    async fn test_market_entries_use_injected_labels() {
        let mut mock = MockBcClient::new();
        mock.expect_get_mint_descriptor()
            .returning(|mint| Err(GatewayError::NotFound(mint.to_string())));
        mock.expect_list_holding_accounts()
            .returning(|_| Ok(Vec::new()));
        mock.expect_list_recent_signatures()
            .returning(|_, _| Ok(Vec::new()));

        let aggregator = TokenAggregator::builder()
            .bc_client(mock)
            .labels(Arc::new(ListedLabels) as Arc<dyn TokenLabelResolver>)
            .build();
        let overview = aggregator
            .market_overview(&[Pubkey::new_unique().to_string()])
            .await;

        assert_eq!(overview[0].label.symbol, "PATO");
        let json = serde_json::to_value(&overview[0]).unwrap();
        assert_eq!(json["name"], "Pato Token");
        assert_eq!(json["status"], "unknown");
    }

    #[tokio::test]
    async fn test_summary_of_mint_with_extreme_decimals_does_not_panic() {
        let mut mock = MockBcClient::new();
        mock.expect_get_mint_descriptor().returning(|mint| {
            Ok(MintDescriptor {
                address: *mint,
                decimals: 200,
                raw_supply: u64::MAX,
            })
        });
        mock.expect_list_holding_accounts().returning(|_| {
            Ok(vec![HoldingAccount {
                address: Pubkey::new_unique(),
                owner: Pubkey::new_unique(),
                mint: Pubkey::new_unique(),
                raw_amount: u64::MAX,
                decimals: u8::MAX,
            }])
        });
        mock.expect_list_recent_signatures()
            .returning(|_, _| Ok(Vec::new()));

        let summary = aggregator(mock)
            .compute_token_summary(&Pubkey::new_unique().to_string())
            .await;

        assert_eq!(summary.status, FetchStatus::Fetched);
        assert_eq!(summary.decimals, 200);
        assert_eq!(summary.ui_supply, rust_decimal::Decimal::ZERO);
        assert_eq!(summary.holder_count, 1);
    }
}
