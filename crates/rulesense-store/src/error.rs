use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no rules file given")]
    NoFile,

    #[error("unsupported rules file type: {0}")]
    UnsupportedType(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rules file is not valid UTF-8 text")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("rules file is empty")]
    Empty,

    #[error("spreadsheet error: {0}")]
    Workbook(String),

    #[error("spreadsheet has no worksheets")]
    NoSheets,

    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("table error: {0}")]
    Table(#[from] rulesense_core::TableError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
