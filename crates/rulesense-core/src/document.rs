use crate::table::RuleTable;

/// A rule source after normalization: free text, or a table of rules.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleDocument {
    Text(String),
    Table(RuleTable),
}

impl RuleDocument {
    /// The text handed to the model. Tables are flattened row by row.
    pub fn prompt_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Table(table) => table.flatten(),
        }
    }

    /// The table, when the source was a spreadsheet.
    pub fn as_table(&self) -> Option<&RuleTable> {
        match self {
            Self::Text(_) => None,
            Self::Table(table) => Some(table),
        }
    }

    pub fn is_tabular(&self) -> bool {
        matches!(self, Self::Table(_))
    }
}
