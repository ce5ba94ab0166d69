// src/schema/types.rs

use serde::{Deserialize, Serialize};
use anyhow::anyhow;
use std::{fmt, str::FromStr};

/// One of the canonical semantic columns tracked for every row.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    Date,
    Killed,
    ChildrenKilled,
    WomenKilled,
    Injured,
    AidSeekerKilled,
    Starved,
    MedicalKilled,
    JournalistsKilled,
    FirstRespondersKilled,
    SettlerAttacks,
    Infrastructure,
}

impl FieldKey {
    /// Every key, in output column order.
    pub const ALL: [FieldKey; 12] = [
        FieldKey::Date,
        FieldKey::Killed,
        FieldKey::ChildrenKilled,
        FieldKey::WomenKilled,
        FieldKey::Injured,
        FieldKey::AidSeekerKilled,
        FieldKey::Starved,
        FieldKey::MedicalKilled,
        FieldKey::JournalistsKilled,
        FieldKey::FirstRespondersKilled,
        FieldKey::SettlerAttacks,
        FieldKey::Infrastructure,
    ];

    /// The summable keys (everything but `date`).
    pub const NUMERIC: [FieldKey; 11] = [
        FieldKey::Killed,
        FieldKey::ChildrenKilled,
        FieldKey::WomenKilled,
        FieldKey::Injured,
        FieldKey::AidSeekerKilled,
        FieldKey::Starved,
        FieldKey::MedicalKilled,
        FieldKey::JournalistsKilled,
        FieldKey::FirstRespondersKilled,
        FieldKey::SettlerAttacks,
        FieldKey::Infrastructure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::Date => "date",
            FieldKey::Killed => "killed",
            FieldKey::ChildrenKilled => "children_killed",
            FieldKey::WomenKilled => "women_killed",
            FieldKey::Injured => "injured",
            FieldKey::AidSeekerKilled => "aid_seeker_killed",
            FieldKey::Starved => "starved",
            FieldKey::MedicalKilled => "medical_killed",
            FieldKey::JournalistsKilled => "journalists_killed",
            FieldKey::FirstRespondersKilled => "first_responders_killed",
            FieldKey::SettlerAttacks => "settler_attacks",
            FieldKey::Infrastructure => "infrastructure",
        }
    }

    /// Position of a numeric key inside `NUMERIC` (and inside `Row::values`).
    pub fn numeric_index(&self) -> Option<usize> {
        FieldKey::NUMERIC.iter().position(|k| k == self)
    }
}

impl FromStr for FieldKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        FieldKey::ALL
            .into_iter()
            .find(|k| k.as_str() == name)
            .ok_or_else(|| anyhow!("unknown field `{}`", s.trim()))
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
