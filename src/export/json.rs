use anyhow::Result;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::process::{FieldValue, Row};
use crate::schema::{arrow::REGION_COLUMN, FieldKey};

/// JSON value for a cell: a number when it reads as one, `null` when empty,
/// otherwise the original text.
fn cell_value(v: &FieldValue) -> Value {
    match v {
        FieldValue::Zero => Value::from(0),
        FieldValue::Raw(s) if s.trim().is_empty() => Value::Null,
        FieldValue::Raw(s) => match v.try_number() {
            Some(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Value::from(n as i64),
            Some(n) => Value::from(n),
            None => Value::from(s.as_str()),
        },
    }
}

/// One record, keys in column order.
struct Record<'a>(&'a Row);

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let row = self.0;
        let mut map = serializer.serialize_map(Some(FieldKey::ALL.len() + 1))?;
        map.serialize_entry(FieldKey::Date.as_str(), &row.date.map(|d| d.to_string()))?;
        map.serialize_entry(REGION_COLUMN, row.region.as_str())?;
        for (key, v) in FieldKey::NUMERIC.iter().zip(&row.values) {
            map.serialize_entry(key.as_str(), &cell_value(v))?;
        }
        map.end()
    }
}

struct Records<'a>(&'a [&'a Row]);

impl Serialize for Records<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for row in self.0 {
            seq.serialize_element(&Record(row))?;
        }
        seq.end()
    }
}

/// Record-oriented JSON array; non-ASCII text is written as-is.
pub fn to_json_bytes(rows: &[&Row]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&Records(rows))?)
}

pub fn write_json(dir: &Path, name: &str, rows: &[&Row]) -> Result<PathBuf> {
    let path = dir.join(name);
    super::write_atomically(&path, |w| {
        serde_json::to_writer(w, &Records(rows))?;
        Ok(())
    })?;
    info!(path = %path.display(), rows = rows.len(), "wrote json");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Region;
    use chrono::NaiveDate;

    fn row(date: Option<NaiveDate>, region: Region, cells: &[&str]) -> Row {
        let mut values = vec![FieldValue::Zero; FieldKey::NUMERIC.len()];
        for (i, c) in cells.iter().enumerate() {
            values[i] = FieldValue::Raw(c.to_string());
        }
        Row {
            date,
            region,
            values,
        }
    }

    #[test]
    fn records_keep_column_order_and_types() -> Result<()> {
        let r = row(
            NaiveDate::from_ymd_opt(2024, 1, 2),
            Region::WestBank,
            &["3", "1.5", "", "n/a"],
        );
        let text = String::from_utf8(to_json_bytes(&[&r])?)?;
        assert!(text.starts_with(r#"[{"date":"2024-01-02","region":"West Bank","killed":3,"#));
        assert!(text.contains(r#""children_killed":1.5,"women_killed":null,"injured":"n/a","#));
        assert!(text.ends_with(r#""infrastructure":0}]"#));
        Ok(())
    }

    #[test]
    fn non_ascii_is_preserved_and_null_dates_are_null() -> Result<()> {
        let r = row(None, Region::Labelled("غزة".into()), &[]);
        let text = String::from_utf8(to_json_bytes(&[&r])?)?;
        assert!(text.contains(r#""region":"غزة""#));
        assert!(text.contains(r#""date":null"#));
        assert!(!text.contains("\\u"));
        Ok(())
    }

    #[test]
    fn writes_parseable_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let r = row(NaiveDate::from_ymd_opt(2024, 1, 2), Region::Gaza, &["4"]);
        let path = write_json(dir.path(), "merged_gaza.json", &[&r])?;
        let parsed: Vec<serde_json::Value> = serde_json::from_slice(&std::fs::read(path)?)?;
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["killed"], 4);
        Ok(())
    }
}
