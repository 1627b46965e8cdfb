use super::amount::to_ui_amount;
use super::errors::{GatewayError, SignerError};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, transaction::Transaction};

/// Serializes public keys as their base58 text instead of raw bytes.
pub(crate) mod base58 {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let text = String::deserialize(deserializer)?;
        Pubkey::from_str(&text).map_err(D::Error::custom)
    }
}

/// The on-chain record defining a token type.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct MintDescriptor {
    /// Address of the mint account
    #[serde(with = "base58")]
    pub address: Pubkey,
    /// Number of decimal places of one display unit
    pub decimals: u8,
    /// Total supply in base units
    pub raw_supply: u64,
}

impl MintDescriptor {
    pub fn ui_supply(&self) -> Decimal {
        to_ui_amount(self.raw_supply, self.decimals)
    }
}

/// One owner's balance of one mint.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct HoldingAccount {
    /// Address of the holding account itself
    #[serde(with = "base58")]
    pub address: Pubkey,
    /// Wallet that owns the balance
    #[serde(with = "base58")]
    pub owner: Pubkey,
    /// Mint the balance is denominated in
    #[serde(with = "base58")]
    pub mint: Pubkey,
    /// Balance in base units
    pub raw_amount: u64,
    pub decimals: u8,
}

impl HoldingAccount {
    pub fn ui_balance(&self) -> Decimal {
        to_ui_amount(self.raw_amount, self.decimals)
    }
}

/// Which side of a holding account a listing is keyed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoldingFilter {
    /// Every holding account of a mint, across all owners
    Mint(Pubkey),
    /// Every holding account of one wallet, across all mints
    Owner(Pubkey),
}

/// A confirmed transaction signature referencing an address.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SignatureRecord {
    pub signature: String,
    pub block_time: Option<DateTime<Utc>>,
    pub errored: bool,
}

/// Whether a read-path result reflects the node or is a zero-valued fallback.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchStatus {
    Fetched,
    Unknown { reason: String },
}

impl FetchStatus {
    pub fn is_unknown(&self) -> bool {
        matches!(self, FetchStatus::Unknown { .. })
    }
}

/// Summary statistics for one mint, recomputed on every request.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct TokenSummary {
    pub mint_address: String,
    pub decimals: u8,
    pub raw_supply: u64,
    pub ui_supply: Decimal,
    /// Distinct owners, zero-balance accounts included
    pub holder_count: usize,
    /// Signatures with a block time inside the trailing 24 hours
    pub recent_activity_count: usize,
    #[serde(flatten)]
    pub status: FetchStatus,
}

impl TokenSummary {
    pub fn fetched(mint: &MintDescriptor, holder_count: usize, recent_activity_count: usize) -> Self {
        Self {
            mint_address: mint.address.to_string(),
            decimals: mint.decimals,
            raw_supply: mint.raw_supply,
            ui_supply: mint.ui_supply(),
            holder_count,
            recent_activity_count,
            status: FetchStatus::Fetched,
        }
    }

    /// Zero-valued summary standing in for one that could not be fetched.
    pub fn unknown(mint_address: &str, reason: impl Into<String>) -> Self {
        Self {
            mint_address: mint_address.to_string(),
            decimals: crate::infrastructure::parsed_account::FALLBACK_DECIMALS,
            raw_supply: 0,
            ui_supply: Decimal::ZERO,
            holder_count: 0,
            recent_activity_count: 0,
            status: FetchStatus::Unknown {
                reason: reason.into(),
            },
        }
    }
}

/// Display name of a mint.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct TokenLabel {
    pub name: String,
    pub symbol: String,
}

/// A listed mint as shown on the market page. No price is attached.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct MarketEntry {
    #[serde(flatten)]
    pub label: TokenLabel,
    #[serde(flatten)]
    pub summary: TokenSummary,
}

/// A wallet balance ready for display.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct WalletHolding {
    #[serde(flatten)]
    pub account: HoldingAccount,
    pub ui_balance: Decimal,
    #[serde(flatten)]
    pub label: TokenLabel,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct WalletHoldings {
    pub owner: String,
    pub holdings: Vec<WalletHolding>,
    #[serde(flatten)]
    pub status: FetchStatus,
}

/// A user's request to move tokens.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct TransferRequest {
    pub sender: String,
    pub recipient: String,
    pub mint: String,
    pub ui_amount: Decimal,
}

/// Whether resolving a holding account may create it at the fee payer's expense.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccountCreation {
    #[default]
    CreateIfMissing,
    RequireExisting,
}

/// An unsigned transaction together with what it will do once signed.
#[derive(Clone, Debug)]
pub struct BuiltTransaction {
    pub transaction: Transaction,
    /// Base units that will move, zero for account creation
    pub raw_amount: u64,
    /// Holding account the instructions act on (the recipient's for transfers)
    pub target_account: Pubkey,
    /// Holding accounts this transaction creates, paid for by the fee payer
    pub created_accounts: Vec<Pubkey>,
}

/// Terminal result of a write operation.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_account: Option<String>,
}

impl TransactionOutcome {
    pub fn success(message: impl Into<String>, signature: String) -> Self {
        Self {
            success: true,
            message: message.into(),
            signature: Some(signature),
            token_account: None,
        }
    }

    pub fn failure(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            signature: None,
            token_account: None,
        }
    }

    pub fn with_token_account(mut self, account: Pubkey) -> Self {
        self.token_account = Some(account.to_string());
        self
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct HistoricalPoint {
    pub date: NaiveDate,
    pub balance: f64,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct DistributionSlice {
    pub label: String,
    pub mint: Option<String>,
    pub percentage: f64,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Success,
    Failed,
}

/// One line of a token or wallet activity feed.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ActivityEntry {
    pub signature: String,
    pub block_time: Option<DateTime<Utc>>,
    pub status: ActivityStatus,
    pub explorer_url: String,
}

/// Holdings of a wallet plus what the dashboard derives from them.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct WalletOverview {
    pub lamports: Option<u64>,
    #[serde(flatten)]
    pub holdings: WalletHoldings,
    pub distribution: Vec<DistributionSlice>,
}

/// External signing capability. Key material never crosses this boundary.
#[async_trait::async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Signs a transaction whose message, fee payer and blockhash are already set.
    async fn sign(&self, transaction: Transaction) -> Result<Transaction, SignerError>;
}

/// Resolves a display label for a mint.
pub trait TokenLabelResolver: Send + Sync {
    fn resolve(&self, mint: &Pubkey) -> TokenLabel;
}

/// Labels a mint from its own address text until a metadata service is wired in.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddressLabels;

impl TokenLabelResolver for AddressLabels {
    fn resolve(&self, mint: &Pubkey) -> TokenLabel {
        let text = mint.to_string();
        let symbol: String = text.chars().take(4).collect::<String>().to_uppercase();
        TokenLabel {
            name: format!("Token {}…", &text[..8.min(text.len())]),
            symbol,
        }
    }
}

/// Source of a wallet's balance history, oldest point first with strictly increasing dates.
#[async_trait::async_trait]
pub trait HistoricalDataSource: Send + Sync {
    async fn history(&self, owner: &Pubkey) -> Result<Vec<HistoricalPoint>, GatewayError>;
}
