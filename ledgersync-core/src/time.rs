//! Date utilities: ledger cells use day.month.year, exports use ISO.

use crate::error::{LedgerError, Result};
use chrono::NaiveDate;

/// Output format for every date written back to a ledger.
pub const LEDGER_DATE_FORMAT: &str = "%d.%m.%Y";

/// Parse a ledger date cell (`24.03.2024`, `24.03.24`, `2024-03-24`).
pub fn parse_ledger_date(raw: &str) -> Result<NaiveDate> {
    let s = raw.trim();
    let invalid = || LedgerError::InvalidDate(raw.to_string());

    if s.contains('-') {
        // ISO, optionally with a time suffix ("2024-03-24T00:00:00")
        let day_part = s.split(['T', ' ']).next().unwrap_or(s);
        return NaiveDate::parse_from_str(day_part, "%Y-%m-%d").map_err(|_| invalid());
    }

    let sep = if s.contains('.') { '.' } else { '/' };
    let year_len = s.rsplit(sep).next().map(str::len).unwrap_or(0);
    let fmt = match (sep, year_len) {
        ('.', 2) => "%d.%m.%y",
        ('.', 4) => "%d.%m.%Y",
        ('/', 4) => "%d/%m/%Y",
        _ => return Err(invalid()),
    };
    NaiveDate::parse_from_str(s, fmt).map_err(|_| invalid())
}

/// Render a date for a ledger cell.
pub fn format_ledger_date(date: NaiveDate) -> String {
    date.format(LEDGER_DATE_FORMAT).to_string()
}

/// Re-render a cell in ledger format so differently written but equal dates
/// compare equal. Unparseable cells are returned trimmed.
pub fn canonical_date_cell(raw: &str) -> String {
    match parse_ledger_date(raw) {
        Ok(d) => format_ledger_date(d),
        Err(_) => raw.trim().to_string(),
    }
}
