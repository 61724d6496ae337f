//! Exact nanoton <-> TON conversions
//!
//! All amounts are integers in nanoton internally. Conversions to and
//! from the display unit go through decimal string arithmetic so the
//! authoritative value is never rounded through a float.

use crate::error::{Error, Result};

/// Nanotons per TON
pub const NANOS_PER_TON: u64 = 1_000_000_000;

/// Maximum number of decimal places in a TON amount
const TON_DECIMALS: usize = 9;

/// Parse a decimal TON amount into nanotons
///
/// Accepts "1", "0.5", ".5", "1.", with at most 9 fractional digits.
pub fn to_nano(amount: &str) -> Result<u64> {
    let amount = amount.trim();
    if amount.is_empty() || amount == "." {
        return Err(Error::Validation("empty amount".to_string()));
    }
    if amount.starts_with('-') || amount.starts_with('+') {
        return Err(Error::Validation(format!("amount must be unsigned: {}", amount)));
    }

    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };

    if frac.len() > TON_DECIMALS {
        return Err(Error::Validation(format!(
            "amount has more than {} decimal places: {}",
            TON_DECIMALS, amount
        )));
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| Error::Validation(format!("malformed amount: {}", amount)))?
    };

    // Right-pad the fraction to 9 digits: "5" -> 500_000_000
    let mut frac_nano: u64 = 0;
    if !frac.is_empty() {
        let padded: u64 = frac
            .parse()
            .map_err(|_| Error::Validation(format!("malformed amount: {}", amount)))?;
        frac_nano = padded * 10u64.pow((TON_DECIMALS - frac.len()) as u32);
    }

    whole
        .checked_mul(NANOS_PER_TON)
        .and_then(|n| n.checked_add(frac_nano))
        .ok_or_else(|| Error::Validation(format!("amount out of range: {}", amount)))
}

/// Format nanotons as a decimal TON string, trailing zeros trimmed
pub fn from_nano(nano: u64) -> String {
    let whole = nano / NANOS_PER_TON;
    let frac = nano % NANOS_PER_TON;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:09}", frac);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
