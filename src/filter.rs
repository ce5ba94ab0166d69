// src/filter.rs

use anyhow::{bail, Result};
use chrono::NaiveDate;

use crate::process::{Row, UnifiedTable};

/// Rows dated within `[start, end]` (inclusive), in table order.
/// Rows without a date are never included.
pub fn filter_range(table: &UnifiedTable, start: NaiveDate, end: NaiveDate) -> Result<Vec<&Row>> {
    if start > end {
        bail!("range start {} is after end {}", start, end);
    }
    Ok(table
        .rows
        .iter()
        .filter(|r| r.date.is_some_and(|d| d >= start && d <= end))
        .collect())
}

/// Like `filter_range`, with either end defaulting to the table's bounds.
pub fn filter_range_or_bounds(
    table: &UnifiedTable,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(NaiveDate, NaiveDate, Vec<&Row>)> {
    let Some((min, max)) = table.date_bounds() else {
        bail!("no rows carry a date");
    };
    let start = start.unwrap_or(min);
    let end = end.unwrap_or(max);
    let rows = filter_range(table, start, end)?;
    Ok((start, end, rows))
}
