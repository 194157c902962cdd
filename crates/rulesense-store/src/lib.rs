//! Storage layer: rule source reading (text, markdown, Excel) and result export.

mod error;
pub use error::StoreError;

pub mod export;
pub mod source;

pub use export::{
    JSON_MIME, RESULTS_FILE, UPDATED_RULES_FILE, XLSX_MIME, read_results, results_json,
    rule_table_xlsx, write_results, write_rule_table,
};
pub use source::{ACCEPTED_EXTENSIONS, SourceKind, load_rules, load_rules_from_bytes, read_rules};
