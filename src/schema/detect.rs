// src/schema/detect.rs

use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use tracing::{debug, trace};

use super::types::FieldKey;

/// How a header name is matched against a field.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Lowercased, trimmed name equals one of these.
    Exact(&'static [&'static str]),
    /// Lowercased, trimmed name contains every one of these, in any order.
    ContainsAll(&'static [&'static str]),
}

impl Rule {
    pub fn matches(&self, header: &str) -> bool {
        let name = normalize_header(header);
        match self {
            Rule::Exact(names) => names.iter().any(|n| *n == name),
            Rule::ContainsAll(parts) => parts.iter().all(|p| name.contains(p)),
        }
    }
}

/// Detection rules, evaluated once per table in this order.
pub static RULES: Lazy<Vec<(FieldKey, Rule)>> = Lazy::new(|| {
    vec![
        (
            FieldKey::Date,
            Rule::Exact(&["date", "day", "datetime", "report_date"]),
        ),
        (
            FieldKey::Killed,
            Rule::Exact(&["killed", "casualties", "death", "deaths", "killed_cum"]),
        ),
        (FieldKey::ChildrenKilled, Rule::ContainsAll(&["child", "kill"])),
        (FieldKey::WomenKilled, Rule::ContainsAll(&["women", "kill"])),
        (FieldKey::Injured, Rule::ContainsAll(&["injur"])),
        (FieldKey::AidSeekerKilled, Rule::ContainsAll(&["aid", "kill"])),
        (FieldKey::Starved, Rule::ContainsAll(&["starv"])),
        (FieldKey::MedicalKilled, Rule::ContainsAll(&["medic", "kill"])),
        (
            FieldKey::JournalistsKilled,
            Rule::ContainsAll(&["journalist", "kill"]),
        ),
        (
            FieldKey::FirstRespondersKilled,
            Rule::ContainsAll(&["first", "respond", "kill"]),
        ),
        (
            FieldKey::SettlerAttacks,
            Rule::ContainsAll(&["settler", "attack"]),
        ),
        (FieldKey::Infrastructure, Rule::ContainsAll(&["infra"])),
    ]
});

/// A matched source column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceColumn {
    pub index: usize,
    pub name: String,
}

/// Which source column (if any) feeds each field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    entries: BTreeMap<FieldKey, SourceColumn>,
}

impl ColumnMap {
    pub fn get(&self, key: FieldKey) -> Option<&SourceColumn> {
        self.entries.get(&key)
    }

    pub fn index_of(&self, key: FieldKey) -> Option<usize> {
        self.entries.get(&key).map(|c| c.index)
    }

    pub fn name_of(&self, key: FieldKey) -> Option<&str> {
        self.entries.get(&key).map(|c| c.name.as_str())
    }

    pub fn is_mapped(&self, key: FieldKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Keys with no matching column.
    pub fn missing(&self) -> Vec<FieldKey> {
        FieldKey::ALL
            .into_iter()
            .filter(|k| !self.entries.contains_key(k))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Trim whitespace and a stray BOM, then lowercase.
fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// Map each field to the first header (in column order) satisfying its rule.
pub fn detect_columns(headers: &[String]) -> ColumnMap {
    let mut map = ColumnMap::default();
    for (key, rule) in RULES.iter() {
        if let Some((index, name)) = headers
            .iter()
            .enumerate()
            .find(|(_, h)| rule.matches(h))
        {
            trace!(field = %key, column = %name, index, "matched column");
            map.entries.insert(
                *key,
                SourceColumn {
                    index,
                    name: name.clone(),
                },
            );
        }
    }
    debug!(
        mapped = map.len(),
        missing = ?map.missing(),
        "detected column mapping"
    );
    map
}
