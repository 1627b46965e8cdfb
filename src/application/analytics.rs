//! Presentation-ready series derived from aggregator output.

use crate::domain::{
    errors::GatewayError,
    models::{DistributionSlice, HistoricalDataSource, HistoricalPoint, WalletHolding},
};
use chrono::{Duration, NaiveDate, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use solana_sdk::pubkey::Pubkey;

/// Number of daily points in a balance history.
pub const HISTORY_WINDOW_DAYS: usize = 30;

pub const EMPTY_DISTRIBUTION_LABEL: &str = "No tokens";

/// Share of each holding in the wallet's total display balance.
///
/// A wallet with nothing to show gets one synthetic 100% slice so charts always have data.
pub fn holdings_distribution(holdings: &[WalletHolding]) -> Vec<DistributionSlice> {
    let total: Decimal = holdings.iter().map(|holding| holding.ui_balance).sum();
    if total <= Decimal::ZERO {
        return vec![DistributionSlice {
            label: EMPTY_DISTRIBUTION_LABEL.to_string(),
            mint: None,
            percentage: 100.0,
        }];
    }

    holdings
        .iter()
        .map(|holding| DistributionSlice {
            label: holding.label.symbol.clone(),
            mint: Some(holding.account.mint.to_string()),
            percentage: (holding.ui_balance * Decimal::ONE_HUNDRED / total)
                .to_f64()
                .unwrap_or(0.0),
        })
        .collect()
}

/// Sorts points by date and keeps the last point seen for any repeated date.
pub fn ordered_series(mut points: Vec<HistoricalPoint>) -> Vec<HistoricalPoint> {
    points.sort_by_key(|point| point.date);
    let mut ordered: Vec<HistoricalPoint> = Vec::with_capacity(points.len());
    for point in points {
        match ordered.last_mut() {
            Some(last) if last.date == point.date => *last = point,
            _ => ordered.push(point),
        }
    }
    ordered
}

/// Placeholder balance history with random values over the last [`HISTORY_WINDOW_DAYS`] days.
///
/// Stands in until a time-series store is available; swapping it for a real
/// [`HistoricalDataSource`] needs no change to callers.
#[derive(Clone, Debug, Default)]
pub struct SyntheticHistory {
    seed: Option<u64>,
}

impl SyntheticHistory {
    /// Deterministic series, for demos and tests.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    pub fn series_ending(&self, today: NaiveDate) -> Vec<HistoricalPoint> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        (0..HISTORY_WINDOW_DAYS)
            .rev()
            .map(|days_back| HistoricalPoint {
                date: today - Duration::days(days_back as i64),
                balance: rng.gen_range(0.0..1000.0),
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl HistoricalDataSource for SyntheticHistory {
    async fn history(&self, owner: &Pubkey) -> Result<Vec<HistoricalPoint>, GatewayError> {
        tracing::debug!("Synthesizing balance history for {}", owner);
        Ok(self.series_ending(Utc::now().date_naive()))
    }
}
