use serde::{Serialize, Serializer};
use std::fmt;

/// Source label attached to every row of a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    Gaza,
    WestBank,
    PressGaza,
    Summary,
    Infrastructure,
    Other,
    /// Supplied by the caller instead of inferred from the file name.
    Labelled(String),
}

impl Region {
    /// Infer a region from a file name. Checks run in priority order, so
    /// `gaza_daily_west.csv` is `Gaza`.
    pub fn from_filename(file_name: &str) -> Self {
        let name = file_name.to_lowercase();
        if name.contains("gaza") && name.contains("daily") {
            Region::Gaza
        } else if name.contains("west") {
            Region::WestBank
        } else if name.contains("press") {
            Region::PressGaza
        } else if name.contains("summary") {
            Region::Summary
        } else if name.contains("infrastructure") {
            Region::Infrastructure
        } else {
            Region::Other
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Region::Gaza => "Gaza",
            Region::WestBank => "West Bank",
            Region::PressGaza => "Press (Gaza)",
            Region::Summary => "Summary",
            Region::Infrastructure => "Infrastructure",
            Region::Other => "Other",
            Region::Labelled(label) => label,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Region {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
