// src/session.rs

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::Path;
use tracing::{error, info, warn};

use crate::aggregate::{table_totals, Totals};
use crate::config::Config;
use crate::process::{
    load_csv_bytes, merge_tables, normalize_table, Region, UnifiedTable, Warning,
};
use crate::schema::ColumnMap;

/// An uploaded file and, optionally, the region slot it was uploaded into.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub data: Vec<u8>,
    pub region: Option<Region>,
}

impl Upload {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            region: None,
        }
    }

    /// Tag the upload with a caller-chosen region instead of inferring it.
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data =
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, data))
    }
}

/// Result of one full recomputation.
#[derive(Debug, Clone, Default)]
pub struct Build {
    /// `None` when nothing was uploaded or every file was unreadable.
    pub unified: Option<UnifiedTable>,
    /// Detected mapping per readable file, in upload order.
    pub column_maps: Vec<(String, ColumnMap)>,
    pub warnings: Vec<Warning>,
}

/// Rebuild the unified table from scratch.
///
/// Unreadable files are skipped with a warning; the remaining files still merge.
pub fn build_unified(uploads: &[Upload], epoch: NaiveDate) -> Build {
    let mut build = Build::default();
    let mut tables = Vec::with_capacity(uploads.len());

    for upload in uploads {
        let raw = match load_csv_bytes(&upload.name, &upload.data) {
            Ok(raw) => raw,
            Err(e) => {
                error!(file = %upload.name, "skipping unreadable file: {:#}", e);
                build.warnings.push(Warning::Unreadable {
                    file: upload.name.clone(),
                    reason: format!("{:#}", e),
                });
                continue;
            }
        };
        let norm = normalize_table(&raw, upload.region.clone(), epoch);
        if let Some(w) = &norm.warning {
            build.warnings.push(w.clone());
        }
        build
            .column_maps
            .push((norm.source.clone(), norm.column_map.clone()));
        tables.push(norm);
    }

    if !tables.is_empty() {
        build.unified = Some(merge_tables(tables));
    }
    build
}

/// One user's uploads and everything derived from them.
#[derive(Debug, Clone)]
pub struct Session {
    config: Config,
    uploads: Vec<Upload>,
    /// Files that could not be read from disk.
    rejected: Vec<Warning>,
    build: Build,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            uploads: Vec::new(),
            rejected: Vec::new(),
            build: Build::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn uploads(&self) -> &[Upload] {
        &self.uploads
    }

    /// Add a file and recompute.
    pub fn add(&mut self, upload: Upload) {
        info!(file = %upload.name, bytes = upload.data.len(), "upload");
        self.uploads.push(upload);
        self.recompute();
    }

    pub fn extend<I: IntoIterator<Item = Upload>>(&mut self, uploads: I) {
        self.uploads.extend(uploads);
        self.recompute();
    }

    /// Read each path as an upload (tagged with its region, if given) and
    /// recompute once. Paths that cannot be read become `Unreadable` warnings.
    pub fn add_paths<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = (P, Option<Region>)>,
        P: AsRef<Path>,
    {
        for (path, region) in paths {
            let path = path.as_ref();
            match Upload::from_path(path) {
                Ok(upload) => self.uploads.push(match &region {
                    Some(r) => upload.with_region(r.clone()),
                    None => upload,
                }),
                Err(e) => self.rejected.push(Warning::Unreadable {
                    file: path.display().to_string(),
                    reason: format!("{:#}", e),
                }),
            }
        }
        self.recompute();
    }

    pub fn clear(&mut self) {
        self.uploads.clear();
        self.rejected.clear();
        self.recompute();
    }

    pub fn recompute(&mut self) {
        self.build = build_unified(&self.uploads, self.config.placeholder_epoch);
        self.build.warnings.splice(0..0, self.rejected.iter().cloned());
        for w in &self.build.warnings {
            warn!("{}", w);
        }
    }

    pub fn unified(&self) -> Option<&UnifiedTable> {
        self.build.unified.as_ref()
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.build.warnings
    }

    pub fn column_maps(&self) -> &[(String, ColumnMap)] {
        &self.build.column_maps
    }

    /// Totals over the whole unified table, if there is one.
    pub fn totals(&self) -> Option<Totals> {
        self.unified().map(table_totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKey;

    #[test]
    fn empty_session_has_no_table() {
        let s = Session::new(Config::default());
        assert!(s.unified().is_none());
        assert!(s.totals().is_none());
    }

    #[test]
    fn each_add_rebuilds_from_scratch() {
        let mut s = Session::new(Config::default());
        s.add(Upload::new("gaza_daily.csv", "date,killed\n2024-01-01,5\n"));
        assert_eq!(s.unified().unwrap().len(), 1);

        s.add(Upload::new("west_bank.csv", "report_date,deaths\n2024-01-02,3\n"));
        let t = s.unified().unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(s.totals().unwrap().get(FieldKey::Killed), 8.0);
        assert_eq!(s.column_maps().len(), 2);

        s.clear();
        assert!(s.unified().is_none());
    }

    #[test]
    fn missing_date_column_warns_but_merges() {
        let mut s = Session::new(Config::default());
        s.add(Upload::new("summary.csv", "killed\n1\n2\n"));
        assert_eq!(
            s.warnings(),
            &[Warning::MissingDateColumn {
                file: "summary.csv".into()
            }]
        );
        let t = s.unified().unwrap();
        assert_eq!(t.rows[1].date, NaiveDate::from_ymd_opt(2000, 1, 2));
    }

    #[test]
    fn configured_epoch_is_used() {
        let mut cfg = Config::default();
        cfg.placeholder_epoch = NaiveDate::from_ymd_opt(2023, 10, 7).unwrap();
        let mut s = Session::new(cfg);
        s.add(Upload::new("x.csv", "killed\n1\n"));
        assert_eq!(
            s.unified().unwrap().rows[0].date,
            NaiveDate::from_ymd_opt(2023, 10, 7)
        );
    }

    #[test]
    fn unreadable_file_is_skipped() {
        let mut s = Session::new(Config::default());
        s.extend(vec![
            Upload::new("broken.csv", ""),
            Upload::new("ok.csv", "date,killed\n2024-01-01,2\n"),
        ]);
        assert_eq!(s.unified().unwrap().len(), 1);
        assert!(matches!(s.warnings()[0], Warning::Unreadable { .. }));
    }

    #[test]
    fn missing_path_is_skipped_with_warning() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let good = dir.path().join("west_bank.csv");
        std::fs::write(&good, "date,killed\n2024-01-01,3\n")?;
        let missing = dir.path().join("gone.csv");

        let mut s = Session::new(Config::default());
        s.add_paths([(missing.clone(), None), (good, None)]);
        let t = s.unified().unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows[0].region, Region::WestBank);
        match &s.warnings()[0] {
            Warning::Unreadable { file, .. } => assert_eq!(file, &missing.display().to_string()),
            other => panic!("unexpected warning {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn rejected_path_is_reported_once_across_recomputes() {
        let mut s = Session::new(Config::default());
        s.add_paths([("no/such/file.csv", None)]);
        assert_eq!(s.warnings().len(), 1);
        s.add(Upload::new("west_bank.csv", "date,killed\n2024-01-01,3\n"));
        s.recompute();
        assert_eq!(s.warnings().len(), 1);
        s.clear();
        assert!(s.warnings().is_empty());
    }

    #[test]
    fn path_slot_region_is_applied() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("any.csv");
        std::fs::write(&path, "date,killed\n2024-01-01,3\n")?;
        let mut s = Session::new(Config::default());
        s.add_paths([(path, Some(Region::Gaza))]);
        assert_eq!(s.unified().unwrap().rows[0].region, Region::Gaza);
        Ok(())
    }

    #[test]
    fn only_unreadable_files_means_no_table() {
        let mut s = Session::new(Config::default());
        s.add(Upload::new("broken.csv", ""));
        assert!(s.unified().is_none());
    }

    #[test]
    fn upload_slot_region_wins() {
        let mut s = Session::new(Config::default());
        s.add(
            Upload::new("west_bank.csv", "date,killed\n2024-01-01,1\n")
                .with_region(Region::Labelled("Gaza".into())),
        );
        assert_eq!(s.unified().unwrap().rows[0].region.as_str(), "Gaza");
    }
}
