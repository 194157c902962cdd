use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("row {row} has {found} cells, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("column '{name}' is {data_type}, rule tables hold text only")]
    NonTextColumn { name: String, data_type: String },

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}
