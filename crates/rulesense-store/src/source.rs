//! Rule source reader: turns an uploaded rules file into a [`RuleDocument`].
//!
//! The file type comes from the trailing extension of the file name:
//! `txt`/`md` are read as UTF-8 text, `xlsx`/`xls` as a spreadsheet whose
//! first worksheet holds a header row followed by one rule per row.

use std::fmt::Display;
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Range, Reader, Xls, Xlsx};
use rulesense_core::{RuleDocument, RuleTable};
use tracing::{info, warn};

use crate::StoreError;

/// Extensions accepted by the reader, lowercase.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["txt", "md", "xlsx", "xls"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Text,
    Xlsx,
    Xls,
}

impl SourceKind {
    /// Infer the kind from a file name's trailing extension, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let file_name = Path::new(name).file_name()?.to_str()?;
        let (_, ext) = file_name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "txt" | "md" => Some(Self::Text),
            "xlsx" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            _ => None,
        }
    }
}

/// Read a rules file, or `None` when there is no file or it cannot be read.
///
/// The reason for a failed read is logged, not returned. Use [`load_rules`]
/// when the caller needs it.
pub fn read_rules(path: Option<&Path>) -> Option<RuleDocument> {
    let path = path?;
    match load_rules(path) {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read rules file");
            None
        }
    }
}

/// Read and normalize a rules file from disk.
pub fn load_rules(path: &Path) -> Result<RuleDocument, StoreError> {
    let name = path.to_string_lossy();
    let kind = SourceKind::from_name(&name)
        .ok_or_else(|| StoreError::UnsupportedType(path.to_path_buf()))?;
    let bytes = std::fs::read(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc = load_rules_from_bytes(kind, bytes)?;
    info!(
        path = %path.display(),
        kind = ?kind,
        tabular = doc.is_tabular(),
        "read rules file"
    );
    Ok(doc)
}

/// Normalize uploaded bytes of a known kind.
///
/// A source that yields no text at all counts as unreadable.
pub fn load_rules_from_bytes(kind: SourceKind, bytes: Vec<u8>) -> Result<RuleDocument, StoreError> {
    let doc = match kind {
        SourceKind::Text => RuleDocument::Text(String::from_utf8(bytes)?),
        SourceKind::Xlsx => {
            let workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).map_err(workbook_err)?;
            RuleDocument::Table(table_from_range(&first_sheet(workbook)?)?)
        }
        SourceKind::Xls => {
            let workbook: Xls<_> = Xls::new(Cursor::new(bytes)).map_err(workbook_err)?;
            RuleDocument::Table(table_from_range(&first_sheet(workbook)?)?)
        }
    };

    if doc.prompt_text().trim().is_empty() {
        return Err(StoreError::Empty);
    }
    Ok(doc)
}

fn first_sheet<R>(mut workbook: R) -> Result<Range<Data>, StoreError>
where
    R: Reader<Cursor<Vec<u8>>>,
    R::Error: Display,
{
    workbook
        .worksheet_range_at(0)
        .ok_or(StoreError::NoSheets)?
        .map_err(workbook_err)
}

fn workbook_err(e: impl Display) -> StoreError {
    StoreError::Workbook(e.to_string())
}

/// Build a rule table from a worksheet range: first row is the header.
///
/// Blank headers become `column_<n>` (1-based) and repeated headers get a
/// `.1`, `.2` suffix so every column stays addressable by name. Data rows
/// with no content are dropped.
fn table_from_range(range: &Range<Data>) -> Result<RuleTable, StoreError> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(RuleTable::from_rows(Vec::new(), Vec::new())?);
    };

    let mut columns: Vec<String> = Vec::with_capacity(header.len());
    for (idx, cell) in header.iter().enumerate() {
        let raw = cell_text(cell).trim().to_string();
        let base = if raw.is_empty() {
            format!("column_{}", idx + 1)
        } else {
            raw
        };
        let mut name = base.clone();
        let mut n = 0;
        while columns.contains(&name) {
            n += 1;
            name = format!("{base}.{n}");
        }
        columns.push(name);
    }

    let data: Vec<Vec<String>> = rows
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
        .filter(|cells| cells.iter().any(|c| !c.trim().is_empty()))
        .collect();

    info!(
        columns = columns.len(),
        rows = data.len(),
        "parsed rules worksheet"
    );
    Ok(RuleTable::from_rows(columns, data)?)
}

/// Stringify a cell the way it reads in a spreadsheet UI.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(n) => {
            // Integers without decimals
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) if dt.is_duration() => dt.as_f64().to_string(),
        Data::DateTime(dt) => {
            // The date honours the workbook's 1904 flag; the time is rounded
            // to the second since calamine truncates it.
            let (y, mo, d, ..) = dt.to_ymd_hms_milli();
            let date = format!("{y:04}-{mo:02}-{d:02}");
            let secs = ((dt.as_f64().fract() * 86_400.0).round() as u32).min(86_399);
            if secs == 0 {
                date
            } else {
                let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
                format!("{date} {h:02}:{m:02}:{s:02}")
            }
        }
    }
}
