use anyhow::{Context, Result};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::process::Row;
use crate::schema::{build_arrow_schema, to_record_batch};

/// Write `rows` as a single-batch, Snappy-compressed Parquet file.
pub fn write_parquet(dir: &Path, name: &str, rows: &[&Row]) -> Result<PathBuf> {
    let path = dir.join(name);
    let batch = to_record_batch(rows)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    super::write_atomically(&path, |w| {
        let mut writer = ArrowWriter::try_new(w, build_arrow_schema(), Some(props))
            .context("creating Arrow writer")?;
        writer.write(&batch).context("writing batch")?;
        writer.close().context("closing parquet writer")?;
        Ok(())
    })?;
    info!(path = %path.display(), rows = rows.len(), "wrote parquet");
    Ok(path)
}
