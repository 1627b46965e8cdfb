//! Decoding of the `jsonParsed` payloads the node returns for token program accounts.

use crate::domain::models::{HoldingAccount, MintDescriptor};
use serde::Deserialize;
use serde_json::Value;
use solana_account_decoder::UiAccountData;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

/// Decimals assumed when a mint's state cannot be parsed.
pub const FALLBACK_DECIMALS: u8 = 9;

#[derive(Deserialize)]
struct Parsed<T> {
    info: T,
}

#[derive(Deserialize)]
struct MintInfo {
    decimals: Option<u8>,
    supply: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAccountInfo {
    mint: String,
    owner: String,
    token_amount: TokenAmount,
}

#[derive(Deserialize)]
struct TokenAmount {
    amount: String,
    decimals: u8,
}

fn parsed_value(data: &UiAccountData) -> Option<&Value> {
    match data {
        UiAccountData::Json(account) => Some(&account.parsed),
        _ => None,
    }
}

/// Builds a mint descriptor from account data, falling back to [`FALLBACK_DECIMALS`] and a zero
/// supply for whatever cannot be read.
pub fn mint_from_account_data(address: Pubkey, data: &UiAccountData) -> MintDescriptor {
    let info = parsed_value(data)
        .and_then(|value| serde_json::from_value::<Parsed<MintInfo>>(value.clone()).ok())
        .map(|parsed| parsed.info);

    let (decimals, raw_supply) = match info {
        Some(info) => {
            let decimals = info.decimals.unwrap_or_else(|| {
                tracing::warn!(
                    "Mint {} reports no decimals, assuming {}",
                    address,
                    FALLBACK_DECIMALS
                );
                FALLBACK_DECIMALS
            });
            let raw_supply = match info.supply.as_deref().map(str::parse::<u64>) {
                Some(Ok(supply)) => supply,
                _ => {
                    tracing::warn!("Mint {} reports no readable supply, assuming 0", address);
                    0
                }
            };
            (decimals, raw_supply)
        }
        None => {
            tracing::warn!(
                "Unparseable mint state for {}, assuming {} decimals",
                address,
                FALLBACK_DECIMALS
            );
            (FALLBACK_DECIMALS, 0)
        }
    };

    MintDescriptor {
        address,
        decimals,
        raw_supply,
    }
}

/// Builds a holding account from account data. Returns `None` for anything that is not a
/// parsed token account.
pub fn holding_from_account_data(address: Pubkey, data: &UiAccountData) -> Option<HoldingAccount> {
    let value = parsed_value(data)?;
    holding_from_parsed(address, value)
}

fn holding_from_parsed(address: Pubkey, value: &Value) -> Option<HoldingAccount> {
    let parsed: Parsed<TokenAccountInfo> = serde_json::from_value(value.clone()).ok()?;
    let info = parsed.info;
    Some(HoldingAccount {
        address,
        owner: Pubkey::from_str(&info.owner).ok()?,
        mint: Pubkey::from_str(&info.mint).ok()?,
        raw_amount: info.token_amount.amount.parse().ok()?,
        decimals: info.token_amount.decimals,
    })
}
