pub mod aggregate;
pub mod chart;
pub mod config;
pub mod export;
pub mod filter;
pub mod process;
pub mod schema;
pub mod session;

pub use aggregate::{table_totals, totals, totals_by_region, Totals};
pub use config::Config;
pub use process::{Region, RawTable, Row, UnifiedTable};
pub use schema::{detect_columns, ColumnMap, FieldKey};
pub use session::{build_unified, Session, Upload};
