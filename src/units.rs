//! Raw on-chain integers to human coin amounts

use crate::chain::Chain;

/// Convert a raw balance into coins using the chain's fixed-point scale.
///
/// Lossy for very large balances; use [`format_units`] for display.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn to_coin(chain: Chain, raw: u128) -> f64 {
    raw as f64 / 10f64.powi(chain.decimals() as i32)
}

/// Exact decimal rendering of `raw` with `decimals` fractional digits,
/// trailing zeros trimmed (`1500000, 6` → `"1.5"`).
#[must_use]
pub fn format_units(raw: u128, decimals: u32) -> String {
    if raw == 0 {
        return "0".to_string();
    }

    // Past 38 decimals the scale exceeds every u128, so all of `raw` is fraction
    let (whole, fraction) = match 10u128.checked_pow(decimals) {
        Some(scale) => (raw / scale, raw % scale),
        None => (0, raw),
    };

    if fraction == 0 {
        return whole.to_string();
    }

    let fraction_str = format!("{:0width$}", fraction, width = decimals as usize);
    let trimmed = fraction_str.trim_end_matches('0');

    format!("{}.{}", whole, trimmed)
}

/// [`format_units`] with the chain's own scale
#[must_use]
pub fn format_balance(chain: Chain, raw: u128) -> String {
    format_units(raw, chain.decimals())
}
