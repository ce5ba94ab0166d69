// src/aggregate.rs

use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Add;

use crate::process::{utils::format_thousands, Region, Row, UnifiedTable};
use crate::schema::FieldKey;

/// Labels shown next to each key figure, in display order.
pub const KEY_FIGURES: &[(FieldKey, &str)] = &[
    (FieldKey::AidSeekerKilled, "Attacked Seeking Aid"),
    (FieldKey::Injured, "Injured"),
    (FieldKey::ChildrenKilled, "Children Killed"),
    (FieldKey::Starved, "Starved to Death"),
    (FieldKey::WomenKilled, "Women Killed"),
    (FieldKey::MedicalKilled, "Medical Personnel Killed"),
    (FieldKey::JournalistsKilled, "Journalists Killed"),
    (FieldKey::FirstRespondersKilled, "First Responders Killed"),
    (FieldKey::SettlerAttacks, "Settler Attacks"),
];

/// Column sums for every numeric field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    #[serde(flatten)]
    sums: BTreeMap<FieldKey, f64>,
}

impl Default for Totals {
    fn default() -> Self {
        Self {
            sums: FieldKey::NUMERIC.iter().map(|k| (*k, 0.0)).collect(),
        }
    }
}

impl Totals {
    pub fn get(&self, key: FieldKey) -> f64 {
        self.sums.get(&key).copied().unwrap_or(0.0)
    }

    fn add_row(&mut self, row: &Row) {
        for key in FieldKey::NUMERIC {
            *self.sums.entry(key).or_insert(0.0) += row.number(key);
        }
    }

    /// `(label, formatted total)` pairs for display.
    pub fn key_figures(&self) -> Vec<(&'static str, String)> {
        KEY_FIGURES
            .iter()
            .map(|(key, label)| (*label, format_thousands(self.get(*key))))
            .collect()
    }
}

impl Add for Totals {
    type Output = Totals;

    fn add(mut self, rhs: Totals) -> Totals {
        for (key, v) in rhs.sums {
            *self.sums.entry(key).or_insert(0.0) += v;
        }
        self
    }
}

/// Sum every numeric field over `rows`; missing or unparseable cells count as 0.
pub fn totals<'a, I>(rows: I) -> Totals
where
    I: IntoIterator<Item = &'a Row>,
{
    let mut t = Totals::default();
    for row in rows {
        t.add_row(row);
    }
    t
}

pub fn table_totals(table: &UnifiedTable) -> Totals {
    totals(&table.rows)
}

/// Totals per region, keyed by region label.
pub fn totals_by_region(table: &UnifiedTable) -> BTreeMap<String, Totals> {
    let mut out: BTreeMap<String, Totals> = BTreeMap::new();
    for row in &table.rows {
        out.entry(region_key(&row.region)).or_default().add_row(row);
    }
    out
}

fn region_key(region: &Region) -> String {
    region.as_str().to_string()
}
