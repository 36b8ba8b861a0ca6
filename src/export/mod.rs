use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use std::fmt::Display;
use std::io::Write;
use std::path::Path;

use crate::models::Transaction;

pub const CSV_HEADER: [&str; 5] = ["Date", "Type", "Category", "Amount", "Note"];

/// Write `transactions` as CSV, dates shown in the local time zone.
/// Returns the number of rows written, excluding the header.
pub fn write_csv<W: Write>(writer: W, transactions: &[Transaction]) -> Result<usize> {
    write_csv_in(writer, transactions, &Local)
}

/// Like [`write_csv`], rendering dates in `tz`.
pub fn write_csv_in<W, Tz>(writer: W, transactions: &[Transaction], tz: &Tz) -> Result<usize>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::NonNumeric)
        .from_writer(writer);
    wtr.write_record(CSV_HEADER)?;

    for txn in transactions {
        let date = txn.date.with_timezone(tz).format("%m/%d/%Y").to_string();
        wtr.write_record([
            date.as_str(),
            txn.kind.as_str(),
            txn.category.as_str(),
            txn.amount.to_string().as_str(),
            txn.note_or_empty(),
        ])?;
    }

    wtr.flush()?;
    Ok(transactions.len())
}

/// Export to a file at `path`, replacing it if present.
pub fn export_to_path(path: &Path, transactions: &[Transaction]) -> Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create export file: {}", path.display()))?;
    let count = write_csv(file, transactions)
        .with_context(|| format!("Failed to write export file: {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = count, "exported transactions");
    Ok(count)
}
