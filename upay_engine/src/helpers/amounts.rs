use rust_decimal::Decimal;
use upg_common::{Amount, AmountError};

use crate::db_types::ExchangeRate;

/// The largest decimal exponent a raw on-chain amount may be scaled by.
const MAX_EXPONENT: u32 = 28;

/// Scales a raw integer token amount into an [`Amount`]: `round(raw / 10^exponent, 2)`.
///
/// The arithmetic is exact. `raw` must be a non-negative decimal integer string, as explorers report it.
pub fn normalize_raw_amount(raw: &str, exponent: u32) -> Result<Amount, AmountError> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::InvalidFormat(format!("'{raw}' is not a raw integer amount")));
    }
    if exponent > MAX_EXPONENT {
        return Err(AmountError::OutOfRange(format!("decimal exponent {exponent} is too large")));
    }
    let value = raw.parse::<i128>().map_err(|e| AmountError::OutOfRange(format!("{raw}. {e}")))?;
    let scaled = Decimal::try_from_i128_with_scale(value, exponent)
        .map_err(|e| AmountError::OutOfRange(format!("{raw} at scale {exponent}. {e}")))?;
    Amount::from_decimal(scaled)
}

/// Converts a quote amount into on-chain units at the given rate: `round(quote / rate, 2)`.
///
/// The caller is responsible for checking that the rate is usable.
pub fn convert_quote(quote: Amount, rate: &ExchangeRate) -> Result<Amount, AmountError> {
    let converted = quote
        .to_decimal()
        .checked_div(rate.value())
        .ok_or_else(|| AmountError::OutOfRange(format!("{quote} / {rate}")))?;
    Amount::from_decimal(converted)
}
