//! Conversions between display amounts and the integer base units stored on chain.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::errors::TransferError;

// rust_decimal carries at most 28 fractional digits.
const MAX_SCALE: u8 = 28;

fn pow10(exp: u8) -> Decimal {
    Decimal::from_i128_with_scale(10i128.pow(exp as u32), 0)
}

/// Converts a display amount into base units, truncating any remainder smaller than one unit.
/// Amounts that truncate to zero are rejected.
///
/// The same `(ui_amount, decimals)` pair always yields the same result.
pub fn to_raw_amount(ui_amount: Decimal, decimals: u8) -> Result<u64, TransferError> {
    if ui_amount <= Decimal::ZERO {
        return Err(TransferError::InvalidAmount(format!(
            "amount must be positive, got {ui_amount}"
        )));
    }
    if decimals > MAX_SCALE {
        return Err(TransferError::InvalidAmount(format!(
            "mints with {decimals} decimals are not supported"
        )));
    }

    let scaled = ui_amount
        .checked_mul(pow10(decimals))
        .ok_or_else(|| TransferError::InvalidAmount(format!("{ui_amount} is too large")))?;

    let raw_amount = scaled
        .trunc()
        .to_u64()
        .ok_or_else(|| TransferError::InvalidAmount(format!("{ui_amount} is too large")))?;
    if raw_amount == 0 {
        return Err(TransferError::InvalidAmount(format!(
            "{ui_amount} is smaller than one base unit at {decimals} decimals"
        )));
    }
    Ok(raw_amount)
}

/// Converts base units into a display amount (`raw / 10^decimals`).
pub fn to_ui_amount(raw_amount: u64, decimals: u8) -> Decimal {
    if decimals <= MAX_SCALE {
        return Decimal::from_i128_with_scale(raw_amount as i128, decimals as u32);
    }
    // Anything past 28 digits is below what a Decimal can represent.
    match 10i128.checked_pow((decimals - MAX_SCALE) as u32) {
        Some(divisor) => {
            Decimal::from_i128_with_scale(raw_amount as i128 / divisor, MAX_SCALE as u32)
        }
        None => Decimal::ZERO,
    }
}
