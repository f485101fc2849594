// Unit conversion between human-readable major units and ledger amounts
//
// The ledger only ever sees integers in the smallest unit. "1.5" with 18
// decimals is 1_500_000_000_000_000_000. No floating point anywhere.

use crate::ledger::Amount;
use thiserror::Error;

/// Decimal places of the default unit (same as ether / wei)
pub const DEFAULT_DECIMALS: u8 = 18;

/// Largest supported number of decimal places (10^38 still fits in u128)
pub const MAX_DECIMALS: u8 = 38;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("Empty amount")]
    Empty,

    #[error("Invalid amount '{0}': expected digits with an optional fractional part")]
    InvalidFormat(String),

    #[error("Too many decimal places in '{input}': at most {decimals} allowed")]
    TooPrecise { input: String, decimals: u8 },

    #[error("Amount '{0}' does not fit in the ledger's integer range")]
    Overflow(String),

    #[error("Unsupported decimals {0}: at most 38")]
    UnsupportedDecimals(u8),
}

fn scale(decimals: u8) -> Result<Amount, UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::UnsupportedDecimals(decimals));
    }
    Ok((10 as Amount).pow(decimals as u32))
}

/// Parse a major-unit decimal string into smallest units
pub fn parse_units(input: &str, decimals: u8) -> Result<Amount, UnitsError> {
    let scale = scale(decimals)?;
    let text = input.trim();
    if text.is_empty() {
        return Err(UnitsError::Empty);
    }

    let (whole, fraction) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text, ""),
    };

    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(UnitsError::InvalidFormat(text.to_string()));
    }

    // Trailing zeros past the precision are harmless ("1.50" with 1 decimal)
    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(UnitsError::TooPrecise {
            input: text.to_string(),
            decimals,
        });
    }

    let overflow = || UnitsError::Overflow(text.to_string());

    let whole_value = if whole.is_empty() {
        0
    } else {
        whole.parse::<Amount>().map_err(|_| overflow())?
    };

    let fraction_value = if fraction.is_empty() {
        0
    } else {
        let digits = fraction.parse::<Amount>().map_err(|_| overflow())?;
        digits * (10 as Amount).pow((decimals as usize - fraction.len()) as u32)
    };

    whole_value
        .checked_mul(scale)
        .and_then(|v| v.checked_add(fraction_value))
        .ok_or_else(overflow)
}

/// Format smallest units as a major-unit decimal string
///
/// Always keeps at least one fractional digit: 0 -> "0.0", 1.5 -> "1.5".
pub fn format_units(amount: Amount, decimals: u8) -> Result<String, UnitsError> {
    let scale = scale(decimals)?;
    let whole = amount / scale;
    let fraction = amount % scale;

    if decimals == 0 {
        return Ok(whole.to_string());
    }

    let padded = format!("{:0width$}", fraction, width = decimals as usize);
    let trimmed = padded.trim_end_matches('0');
    let fraction_text = if trimmed.is_empty() { "0" } else { trimmed };

    Ok(format!("{}.{}", whole, fraction_text))
}
