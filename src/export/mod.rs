// src/export/mod.rs

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use crate::process::Row;
use crate::schema::{arrow::REGION_COLUMN, FieldKey};

pub mod json;
pub mod parquet_file;

pub use self::json::{to_json_bytes, write_json};
pub use self::parquet_file::write_parquet;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

static UNSAFE_FILE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[/\\:*?"<>|]"#).expect("static regex"));

/// How the merged export file is named.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportName {
    /// `<prefix>_<region>`, e.g. `merged_west_bank`.
    Region(String),
    /// `<prefix>_palestine_<YYYYMMDD_HHMMSS>`.
    Timestamped(NaiveDateTime),
}

impl ExportName {
    /// File name (without directory) for `prefix` and extension `ext`.
    pub fn file_name(&self, prefix: &str, ext: &str) -> String {
        let stem = match self {
            ExportName::Region(label) => {
                let slug = label.to_lowercase().replace(' ', "_");
                format!("{}_{}", prefix, UNSAFE_FILE_CHARS.replace_all(&slug, ""))
            }
            ExportName::Timestamped(ts) => {
                format!("{}_palestine_{}", prefix, ts.format("%Y%m%d_%H%M%S"))
            }
        };
        format!("{}.{}", stem, ext)
    }
}

/// Header row of every CSV export.
pub fn csv_headers() -> Vec<&'static str> {
    let mut h = Vec::with_capacity(FieldKey::ALL.len() + 1);
    h.push(FieldKey::Date.as_str());
    h.push(REGION_COLUMN);
    h.extend(FieldKey::NUMERIC.iter().map(|k| k.as_str()));
    h
}

/// Write `rows` as CSV (with a leading UTF-8 BOM) to `w`.
pub fn write_csv<W: Write>(mut w: W, rows: &[&Row]) -> Result<()> {
    w.write_all(UTF8_BOM)?;
    let mut wtr = csv::Writer::from_writer(w);
    wtr.write_record(csv_headers())?;
    for row in rows {
        let date = row.date.map(|d| d.to_string()).unwrap_or_default();
        let mut record: Vec<&str> = Vec::with_capacity(FieldKey::ALL.len() + 1);
        record.push(&date);
        record.push(row.region.as_str());
        record.extend(row.values.iter().map(|v| v.as_text()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_csv_bytes(rows: &[&Row]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(&mut buf, rows)?;
    Ok(buf)
}

/// Write to a hidden temp file next to `path`, then rename over it.
pub(crate) fn write_atomically<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut io::BufWriter<fs::File>) -> Result<()>,
{
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "export".into());
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let result = (|| -> Result<()> {
        let file = fs::File::create(&tmp_path)
            .with_context(|| format!("creating {}", tmp_path.display()))?;
        let mut w = io::BufWriter::new(file);
        fill(&mut w)?;
        w.flush()?;
        drop(w);

        fs::rename(&tmp_path, path)
            .with_context(|| format!("renaming {} -> {}", tmp_path.display(), path.display()))
    })();

    if result.is_err() && tmp_path.exists() {
        if let Err(e) = fs::remove_file(&tmp_path) {
            warn!(path = %tmp_path.display(), "failed to remove temp file: {}", e);
        }
    }
    result
}

/// Rows grouped by region label, regions in order of first appearance.
pub fn split_by_region<'a>(rows: &[&'a Row]) -> Vec<(String, Vec<&'a Row>)> {
    let mut groups: Vec<(String, Vec<&'a Row>)> = Vec::new();
    for row in rows {
        let label = row.region.as_str();
        match groups.iter_mut().find(|(l, _)| l == label) {
            Some((_, group)) => group.push(*row),
            None => groups.push((label.to_string(), vec![*row])),
        }
    }
    groups
}

/// Write one `<prefix>_<region>.<ext>` file per region, each holding only
/// that region's rows.
pub fn write_per_region<F>(
    dir: &Path,
    prefix: &str,
    ext: &str,
    rows: &[&Row],
    write: F,
) -> Result<Vec<PathBuf>>
where
    F: Fn(&Path, &str, &[&Row]) -> Result<PathBuf>,
{
    split_by_region(rows)
        .into_iter()
        .map(|(label, group)| {
            let name = ExportName::Region(label).file_name(prefix, ext);
            write(dir, &name, &group)
        })
        .collect()
}

/// Write the merged CSV into `dir`, returning its path.
pub fn write_csv_file(dir: &Path, name: &str, rows: &[&Row]) -> Result<PathBuf> {
    let path = dir.join(name);
    write_atomically(&path, |w| write_csv(w, rows))?;
    info!(path = %path.display(), rows = rows.len(), "wrote merged csv");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{FieldValue, Region};
    use chrono::NaiveDate;

    fn sample() -> Vec<Row> {
        let mut values = vec![FieldValue::Zero; FieldKey::NUMERIC.len()];
        values[0] = FieldValue::Raw("1,200".into());
        vec![
            Row {
                date: NaiveDate::from_ymd_opt(2024, 1, 1),
                region: Region::Gaza,
                values: values.clone(),
            },
            Row {
                date: None,
                region: Region::Labelled("الضفة".into()),
                values,
            },
        ]
    }

    #[test]
    fn region_and_timestamp_names() {
        assert_eq!(
            ExportName::Region("West Bank".into()).file_name("merged", "csv"),
            "merged_west_bank.csv"
        );
        assert_eq!(
            ExportName::Region("a/b".into()).file_name("merged", "json"),
            "merged_ab.json"
        );
        let ts = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap();
        assert_eq!(
            ExportName::Timestamped(ts).file_name("merged", "csv"),
            "merged_palestine_20240309_140507.csv"
        );
    }

    #[test]
    fn csv_has_bom_header_and_verbatim_cells() -> Result<()> {
        let rows = sample();
        let refs: Vec<&Row> = rows.iter().collect();
        let bytes = to_csv_bytes(&refs)?;
        assert!(bytes.starts_with(UTF8_BOM));

        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec())?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("date,region,killed,children_killed,"));
        assert!(lines[0].ends_with(",settler_attacks,infrastructure"));
        assert!(lines[1].starts_with("2024-01-01,Gaza,\"1,200\",0,"));
        assert!(lines[2].starts_with(",الضفة,"));
        Ok(())
    }

    #[test]
    fn per_region_files_hold_only_their_region() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut rows = sample();
        rows[1].region = Region::WestBank;
        rows.push(Row {
            region: Region::Gaza,
            ..rows[0].clone()
        });
        let refs: Vec<&Row> = rows.iter().collect();

        let paths = write_per_region(dir.path(), "merged", "csv", &refs, write_csv_file)?;
        assert_eq!(
            paths,
            vec![
                dir.path().join("merged_gaza.csv"),
                dir.path().join("merged_west_bank.csv")
            ]
        );

        for (path, region, count) in [(&paths[0], "Gaza", 2), (&paths[1], "West Bank", 1)] {
            let bytes = fs::read(path)?;
            let mut rdr = csv::Reader::from_reader(&bytes[UTF8_BOM.len()..]);
            let regions: Vec<String> = rdr
                .records()
                .map(|r| r.map(|r| r[1].to_string()))
                .collect::<std::result::Result<_, _>>()?;
            assert_eq!(regions.len(), count);
            assert!(regions.iter().all(|r| r == region));
        }
        Ok(())
    }

    #[test]
    fn failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged_gaza.csv");
        let res = write_atomically(&path, |w| {
            w.write_all(b"partial")?;
            anyhow::bail!("serialisation failed")
        });
        assert!(res.is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn csv_file_is_written_atomically() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let rows = sample();
        let refs: Vec<&Row> = rows.iter().collect();
        let path = write_csv_file(&dir.path().join("nested"), "merged_gaza.csv", &refs)?;

        assert!(path.exists());
        let names: Vec<_> = fs::read_dir(path.parent().unwrap())?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["merged_gaza.csv"]);
        Ok(())
    }
}
