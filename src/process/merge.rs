use chrono::NaiveDate;
use tracing::info;

use crate::process::normalize::{NormalizedTable, Row};

/// Every normalized row from every upload, in upload order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnifiedTable {
    pub rows: Vec<Row>,
}

impl UnifiedTable {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Smallest and largest non-null dates, if any row has one.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.rows.iter().filter_map(|r| r.date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Rows ordered by date; rows without a date go last. Stable.
    pub fn sorted_by_date(&self) -> Vec<&Row> {
        let mut rows: Vec<&Row> = self.rows.iter().collect();
        rows.sort_by_key(|r| (r.date.is_none(), r.date));
        rows
    }
}

/// Concatenate tables, keeping table order and row order within each table.
pub fn merge_tables<I>(tables: I) -> UnifiedTable
where
    I: IntoIterator<Item = NormalizedTable>,
{
    let mut rows = Vec::new();
    let mut count = 0usize;
    for table in tables {
        count += 1;
        rows.extend(table.rows);
    }
    info!(tables = count, rows = rows.len(), "merged tables");
    UnifiedTable { rows }
}
