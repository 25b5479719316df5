//! Decimal amount parsing and formatting.
//!
//! Amounts are stored as base units; one display unit is `10^18` base units.

use arbiter_state::Amount;

use super::error::{ArbiterError, Result};

pub const DECIMALS: u32 = 18;

/// Base units per display unit.
pub const UNIT: Amount = 1_000_000_000_000_000_000;

/// Parse `"1.5"` into base units. More than 18 fractional digits is an error.
pub fn parse_amount(input: &str) -> Result<Amount> {
    let s = input.trim();
    let invalid = || ArbiterError::InvalidArgument(format!("invalid amount: {input}"));

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac.len() > DECIMALS as usize {
        return Err(ArbiterError::InvalidArgument(format!(
            "amount {input} has more than {DECIMALS} decimal places"
        )));
    }

    let whole_units: Amount = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac_units: Amount = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<width$}", width = DECIMALS as usize);
        padded.parse().map_err(|_| invalid())?
    };

    whole_units
        .checked_mul(UNIT)
        .and_then(|v| v.checked_add(frac_units))
        .ok_or(ArbiterError::Overflow("amount"))
}

/// Format base units as a trimmed decimal string (`3425000000000000000` → `"3.425"`).
pub fn format_amount(amount: Amount) -> String {
    let whole = amount / UNIT;
    let frac = amount % UNIT;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:0>width$}", width = DECIMALS as usize);
    format!("{whole}.{}", digits.trim_end_matches('0'))
}
