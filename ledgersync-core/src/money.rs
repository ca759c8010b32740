//! Amount and VAT parsing for ledger cells.
//!
//! Ledger cells come in German notation (`1.234,56 €`), plain decimal
//! (`420.17`) or accounting negatives (`(12,00)`).

use crate::error::{LedgerError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Round to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn thousands_only_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,3}(\.\d{3})+$").expect("literal regex"))
}

/// Parse a money cell. Empty cells are an error; use [`parse_amount_or_zero`]
/// for optional columns.
pub fn parse_amount(raw: &str) -> Result<f64> {
    let invalid = || LedgerError::InvalidAmount(raw.to_string());

    let mut s: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€' && *c != '\u{a0}')
        .collect();
    s = s.trim_end_matches("EUR").to_string();
    if s.is_empty() {
        return Err(invalid());
    }

    let mut negative = false;
    if s.starts_with('(') && s.ends_with(')') {
        negative = true;
        s = s[1..s.len() - 1].to_string();
    }
    if let Some(rest) = s.strip_prefix('-') {
        negative = !negative;
        s = rest.to_string();
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest.to_string();
    }

    let normalized = match (s.rfind(','), s.rfind('.')) {
        // 1.234,56
        (Some(c), Some(d)) if c > d => s.replace('.', "").replace(',', "."),
        // 1,234.56
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) => s.replace(',', "."),
        (None, Some(_)) if thousands_only_re().is_match(&s) => s.replace('.', ""),
        _ => s.clone(),
    };

    let value: f64 = normalized.parse().map_err(|_| invalid())?;
    if !value.is_finite() {
        return Err(invalid());
    }
    Ok(if negative { -value } else { value })
}

/// Like [`parse_amount`] but an empty cell reads as zero.
pub fn parse_amount_or_zero(raw: &str) -> Result<f64> {
    if raw.trim().is_empty() {
        Ok(0.0)
    } else {
        parse_amount(raw)
    }
}

/// Parse a VAT cell into a percentage (`19`, `19 %`, `0,19` all give 19.0).
pub fn parse_vat_percent(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    let has_percent = trimmed.ends_with('%');
    let value = parse_amount(trimmed.trim_end_matches('%'))?;
    if value < 0.0 {
        return Err(LedgerError::InvalidAmount(raw.to_string()));
    }
    if !has_percent && value > 0.0 && value < 1.0 {
        Ok(round2(value * 100.0))
    } else {
        Ok(value)
    }
}

/// Gross amount (absolute) from a net amount and a VAT percentage.
pub fn gross_abs(net: f64, vat_percent: f64) -> f64 {
    round2(net.abs() * (1.0 + vat_percent / 100.0))
}

/// Render an amount the way the ledgers store it: `1234,56`.
pub fn format_amount(value: f64) -> String {
    format!("{:.2}", round2(value)).replace('.', ",")
}
