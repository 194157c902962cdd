pub mod apply;
pub mod document;
pub mod error;
pub mod extract;
pub mod patch;
pub mod table;

pub use apply::apply_patch;
pub use document::RuleDocument;
pub use error::TableError;
pub use extract::{Extraction, extract_json, parse_patch};
pub use patch::{Addition, Modification, RulePatch};
pub use table::{RATIONALE, RULE, RULE_ID, RuleTable};
