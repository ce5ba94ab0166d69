// src/schema/arrow.rs

use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Date32Builder, Float64Builder, StringBuilder},
    datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema},
    record_batch::RecordBatch,
};
use chrono::NaiveDate;
use std::sync::Arc;

use super::types::FieldKey;
use crate::process::Row;

pub const REGION_COLUMN: &str = "region";

/// Arrow type for a canonical field.
///
/// - date      → Date32 (nullable; unparseable dates are null)
/// - numerics  → Float64 (nullable; non-numeric cells are null)
pub fn map_to_arrow_type(key: FieldKey) -> DataType {
    match key {
        FieldKey::Date => DataType::Date32,
        _ => DataType::Float64,
    }
}

/// `date, region, <numeric fields…>`.
pub fn build_arrow_schema() -> Arc<ArrowSchema> {
    let mut fields = Vec::with_capacity(FieldKey::ALL.len() + 1);
    fields.push(ArrowField::new(
        FieldKey::Date.as_str(),
        map_to_arrow_type(FieldKey::Date),
        true,
    ));
    fields.push(ArrowField::new(REGION_COLUMN, DataType::Utf8, false));
    for key in FieldKey::NUMERIC {
        fields.push(ArrowField::new(key.as_str(), map_to_arrow_type(key), true));
    }
    Arc::new(ArrowSchema::new(fields))
}

fn days_since_unix_epoch(d: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (d - epoch).num_days() as i32
}

/// Columnar copy of `rows` matching `build_arrow_schema`.
pub fn to_record_batch(rows: &[&Row]) -> Result<RecordBatch> {
    let mut dates = Date32Builder::with_capacity(rows.len());
    let mut regions = StringBuilder::new();
    let mut numerics: Vec<Float64Builder> = FieldKey::NUMERIC
        .iter()
        .map(|_| Float64Builder::with_capacity(rows.len()))
        .collect();

    for row in rows {
        dates.append_option(row.date.map(days_since_unix_epoch));
        regions.append_value(row.region.as_str());
        for (b, v) in numerics.iter_mut().zip(&row.values) {
            b.append_option(v.try_number());
        }
    }

    let mut cols: Vec<ArrayRef> = Vec::with_capacity(FieldKey::ALL.len() + 1);
    cols.push(Arc::new(dates.finish()));
    cols.push(Arc::new(regions.finish()));
    for mut b in numerics {
        cols.push(Arc::new(b.finish()));
    }

    RecordBatch::try_new(build_arrow_schema(), cols).context("building unified RecordBatch")
}
