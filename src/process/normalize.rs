use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

use crate::process::{date_parser, utils, RawTable, Region};
use crate::schema::{detect_columns, ColumnMap, FieldKey};

/// A summable cell.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Back-filled because the table had no column for this field.
    Zero,
    /// Copied verbatim from the source column.
    Raw(String),
}

impl FieldValue {
    /// Numeric reading of the cell; unparseable or empty counts as 0.
    pub fn as_number(&self) -> f64 {
        match self {
            FieldValue::Zero => 0.0,
            FieldValue::Raw(s) => utils::parse_number(s).unwrap_or(0.0),
        }
    }

    /// Like `as_number`, but `None` for cells that are not numbers.
    pub fn try_number(&self) -> Option<f64> {
        match self {
            FieldValue::Zero => Some(0.0),
            FieldValue::Raw(s) => utils::parse_number(s),
        }
    }

    /// Text written to CSV.
    pub fn as_text(&self) -> &str {
        match self {
            FieldValue::Zero => "0",
            FieldValue::Raw(s) => s,
        }
    }
}

/// One normalized record: a date, a region, and every numeric field.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub date: Option<NaiveDate>,
    pub region: Region,
    /// One value per `FieldKey::NUMERIC`, in that order.
    pub values: Vec<FieldValue>,
}

impl Row {
    pub fn get(&self, key: FieldKey) -> Option<&FieldValue> {
        key.numeric_index().and_then(|i| self.values.get(i))
    }

    pub fn number(&self, key: FieldKey) -> f64 {
        self.get(key).map(FieldValue::as_number).unwrap_or(0.0)
    }
}

/// Non-fatal problems surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// No date column; rows were given placeholder dates.
    MissingDateColumn { file: String },
    /// The file could not be parsed and was skipped.
    Unreadable { file: String, reason: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingDateColumn { file } => write!(
                f,
                "No date column detected in file {}. Using default sequential index as date.",
                file
            ),
            Warning::Unreadable { file, reason } => {
                write!(f, "Could not read {}: {}", file, reason)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub source: String,
    pub column_map: ColumnMap,
    pub rows: Vec<Row>,
    pub warning: Option<Warning>,
}

impl NormalizedTable {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}

/// Detect columns in `raw` and project it onto the canonical fields.
///
/// - `region`: caller-supplied label; `None` infers it from the file name.
/// - `epoch`: first placeholder date when the table has no date column.
#[tracing::instrument(level = "info", skip(raw, region, epoch), fields(file = %raw.source))]
pub fn normalize_table(raw: &RawTable, region: Option<Region>, epoch: NaiveDate) -> NormalizedTable {
    let column_map = detect_columns(&raw.headers);
    normalize_with_map(raw, column_map, region, epoch)
}

/// Same as `normalize_table` with an already computed mapping.
pub fn normalize_with_map(
    raw: &RawTable,
    column_map: ColumnMap,
    region: Option<Region>,
    epoch: NaiveDate,
) -> NormalizedTable {
    let n = raw.num_rows();
    let region = region.unwrap_or_else(|| Region::from_filename(&raw.source));

    let (dates, warning): (Vec<Option<NaiveDate>>, Option<Warning>) =
        match column_map.index_of(FieldKey::Date) {
            Some(col) => {
                let dates = date_parser::parse_date_column((0..n).map(|r| raw.cell(r, col)));
                let bad = dates.iter().filter(|d| d.is_none()).count();
                if bad > 0 {
                    debug!(file = %raw.source, unparsed = bad, "rows with unparseable dates");
                }
                (dates, None)
            }
            None => {
                warn!(file = %raw.source, "no date column, using placeholder dates");
                let dates = date_parser::placeholder_dates(epoch, n)
                    .into_iter()
                    .map(Some)
                    .collect();
                (
                    dates,
                    Some(Warning::MissingDateColumn {
                        file: raw.source.clone(),
                    }),
                )
            }
        };

    let sources: Vec<Option<usize>> = FieldKey::NUMERIC
        .iter()
        .map(|k| column_map.index_of(*k))
        .collect();

    let rows = dates
        .into_iter()
        .enumerate()
        .map(|(r, date)| Row {
            date,
            region: region.clone(),
            values: sources
                .iter()
                .map(|src| match src {
                    Some(col) => FieldValue::Raw(raw.cell(r, *col).to_string()),
                    None => FieldValue::Zero,
                })
                .collect(),
        })
        .collect();

    NormalizedTable {
        source: raw.source.clone(),
        column_map,
        rows,
        warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> NaiveDate {
        NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
    }

    fn raw(source: &str, headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            source: source.into(),
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn unmapped_fields_are_zero_filled() {
        let t = raw(
            "daily_gaza.csv",
            &["Date", "Killed"],
            &[&["2024-01-01", "5"], &["2024-01-02", "7"], &["2024-01-03", "2"]],
        );
        let norm = normalize_table(&t, None, epoch());
        assert_eq!(norm.num_rows(), 3);
        for key in FieldKey::NUMERIC {
            if key == FieldKey::Killed {
                continue;
            }
            for row in &norm.rows {
                assert_eq!(row.get(key), Some(&FieldValue::Zero), "{key}");
            }
        }
        assert_eq!(norm.rows[1].get(FieldKey::Killed), Some(&FieldValue::Raw("7".into())));
        assert_eq!(norm.rows[0].region, Region::Gaza);
        assert!(norm.warning.is_none());
    }

    #[test]
    fn mapped_values_are_copied_verbatim() {
        let t = raw("x.csv", &["date", "injured"], &[&["2024-01-01", " 1,024 "]]);
        let norm = normalize_table(&t, None, epoch());
        let v = norm.rows[0].get(FieldKey::Injured).unwrap();
        assert_eq!(v.as_text(), " 1,024 ");
        assert_eq!(v.as_number(), 1024.0);
    }

    #[test]
    fn missing_date_column_synthesizes_sequence_and_warns() {
        let t = raw("press.csv", &["killed"], &[&["1"], &["2"]]);
        let norm = normalize_table(&t, None, epoch());
        let dates: Vec<_> = norm.rows.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![
                Some(epoch()),
                NaiveDate::from_ymd_opt(2000, 1, 2)
            ]
        );
        assert_eq!(
            norm.warning,
            Some(Warning::MissingDateColumn {
                file: "press.csv".into()
            })
        );
        assert_eq!(norm.rows[0].region, Region::PressGaza);
    }

    #[test]
    fn bad_dates_become_null_but_rows_stay() {
        let t = raw(
            "x.csv",
            &["day", "killed"],
            &[&["2024-01-01", "1"], &["not a date", "2"], &["", "3"]],
        );
        let norm = normalize_table(&t, None, epoch());
        assert_eq!(norm.num_rows(), 3);
        assert!(norm.rows[0].date.is_some());
        assert!(norm.rows[1].date.is_none());
        assert!(norm.rows[2].date.is_none());
        assert_eq!(norm.rows[2].number(FieldKey::Killed), 3.0);
    }

    #[test]
    fn date_column_is_read_with_one_layout() {
        let t = raw(
            "x.csv",
            &["date", "killed"],
            &[&["25/12/2024", "1"], &["01/02/2025", "2"]],
        );
        let norm = normalize_table(&t, None, epoch());
        let dates: Vec<_> = norm.rows.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 12, 25),
                NaiveDate::from_ymd_opt(2025, 2, 1)
            ]
        );
    }

    #[test]
    fn caller_region_overrides_file_name() {
        let t = raw("west_bank.csv", &["date"], &[&["2024-01-01"]]);
        let norm = normalize_table(&t, Some(Region::Labelled("Gaza".into())), epoch());
        assert_eq!(norm.rows[0].region.as_str(), "Gaza");
    }

    #[test]
    fn short_rows_read_as_empty_cells() {
        let t = raw("x.csv", &["date", "killed"], &[&["2024-01-01"]]);
        let norm = normalize_table(&t, None, epoch());
        assert_eq!(norm.rows[0].get(FieldKey::Killed), Some(&FieldValue::Raw(String::new())));
        assert_eq!(norm.rows[0].number(FieldKey::Killed), 0.0);
    }

    #[test]
    fn warning_message_names_the_file() {
        let w = Warning::MissingDateColumn { file: "a.csv".into() };
        assert!(w.to_string().contains("a.csv"));
    }
}
