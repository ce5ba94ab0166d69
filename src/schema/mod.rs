pub mod arrow;
pub mod detect;
pub mod types;

pub use self::arrow::{build_arrow_schema, to_record_batch};
pub use detect::{detect_columns, ColumnMap, Rule, SourceColumn, RULES};
pub use types::FieldKey;
