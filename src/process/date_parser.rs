use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

use crate::process::utils::clean_str;

/// Date-only layouts tried in order. Year-first forms are unambiguous.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d", "%d %B %Y", "%d %b %Y", "%B %d, %Y",
    "%b %d, %Y", "%B %d %Y", "%b %d %Y",
];

/// Datetime layouts; the time part is discarded.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Field order of numeric `a/b/yyyy` dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayOrder {
    MonthFirst,
    DayFirst,
}

impl DayOrder {
    /// Day-first if any `a/b/yyyy` cell has a leading number above 12,
    /// otherwise month-first.
    pub fn detect<'a, I>(cells: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let day_first = cells.into_iter().any(|c| {
            split_numeric_date(&clean_str(c)).is_some_and(|(a, _, _)| a > 12)
        });
        if day_first {
            DayOrder::DayFirst
        } else {
            DayOrder::MonthFirst
        }
    }
}

/// Best-effort parse of a single cell into a calendar date.
///
/// Accepts ISO dates and datetimes (with or without an offset), slashed or
/// dotted year-first dates, compact `YYYYMMDD`, spelled-out month names, and
/// numeric day/month forms such as `03/04/2024`. The numeric forms are read
/// month-first unless the first number can only be a day (`25/12/2024`).
/// Use `parse_date_column` to read a whole column with one layout.
///
/// Returns `None` for anything else, including empty cells.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let order = DayOrder::detect([raw]);
    parse_date_with(raw, order)
}

/// Parse every cell of a column, reading numeric `a/b/yyyy` dates with the
/// single layout detected over the whole column.
pub fn parse_date_column<'a, I>(cells: I) -> Vec<Option<NaiveDate>>
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: Clone,
{
    let cells = cells.into_iter();
    let order = DayOrder::detect(cells.clone());
    cells.map(|c| parse_date_with(c, order)).collect()
}

/// Parse one cell, reading numeric `a/b/yyyy` forms in `order` only.
pub fn parse_date_with(raw: &str, order: DayOrder) -> Option<NaiveDate> {
    let s = clean_str(raw);
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Some(dt.naive_local().date());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(&s, fmt) {
            return Some(d);
        }
    }

    let (a, b, year) = split_numeric_date(&s)?;
    match order {
        DayOrder::MonthFirst => NaiveDate::from_ymd_opt(year, a, b),
        DayOrder::DayFirst => NaiveDate::from_ymd_opt(year, b, a),
    }
}

/// `a/b/yyyy` or `a-b-yyyy` split into its numbers.
fn split_numeric_date(s: &str) -> Option<(u32, u32, i32)> {
    let sep = if s.contains('/') { '/' } else { '-' };
    let parts: Vec<&str> = s.split(sep).collect();
    if parts.len() != 3 || parts[2].len() != 4 {
        return None;
    }
    let a: u32 = parts[0].parse().ok()?;
    let b: u32 = parts[1].parse().ok()?;
    let year: i32 = parts[2].parse().ok()?;
    Some((a, b, year))
}

/// `len` consecutive daily dates starting at `epoch`.
pub fn placeholder_dates(epoch: NaiveDate, len: usize) -> Vec<NaiveDate> {
    (0..len)
        .map(|i| epoch + Duration::days(i as i64))
        .collect()
}
