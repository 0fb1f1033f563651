// Valores monetários em centavos (u64) em todo o sistema; strings com duas
// casas decimais apenas na borda.

use crate::error::ValidationError;

/// Parses a decimal currency string ("67.90", "67,90", "150") into cents.
/// Rejects more than two decimal places rather than rounding.
pub fn parse_amount(raw: &str) -> Result<u64, ValidationError> {
    let normalized = raw.trim().replace(',', ".");
    if normalized.is_empty() {
        return Err(ValidationError::new("amount", "amount is empty"));
    }

    let (int_part, frac_part) = match normalized.split_once('.') {
        Some((i, f)) => (i, f),
        None => (normalized.as_str(), ""),
    };

    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::new(
            "amount",
            format!("'{raw}' is not a valid amount"),
        ));
    }
    if frac_part.len() > 2 || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::new(
            "amount",
            format!("'{raw}' must have at most 2 decimal places"),
        ));
    }

    let units: u64 = int_part
        .parse()
        .map_err(|_| ValidationError::new("amount", format!("'{raw}' is out of range")))?;
    let mut cents_frac: u64 = if frac_part.is_empty() {
        0
    } else {
        frac_part
            .parse()
            .map_err(|_| ValidationError::new("amount", format!("'{raw}' is not a valid amount")))?
    };
    if frac_part.len() == 1 {
        cents_frac *= 10;
    }

    units
        .checked_mul(100)
        .and_then(|c| c.checked_add(cents_frac))
        .ok_or_else(|| ValidationError::new("amount", format!("'{raw}' is out of range")))
}

/// Formats cents as the two-decimal string the PIX wire format expects.
pub fn format_cents(cents: u64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

/// Retention percentage over the gross plus the fixed fee, in cents.
pub fn calculate_fee(gross_cents: u64, retention_percentage: f64, fixed_fee_cents: u64) -> u64 {
    let retention = (gross_cents as f64 * retention_percentage / 100.0).round() as u64;
    retention + fixed_fee_cents
}
