//! Result export: `results.json` for the patch, `updated_rules.xlsx` for
//! the patched table.

use std::path::Path;

use rulesense_core::{RulePatch, RuleTable};
use rust_xlsxwriter::{Format, Workbook};
use tracing::info;

use crate::StoreError;

pub const RESULTS_FILE: &str = "results.json";
pub const UPDATED_RULES_FILE: &str = "updated_rules.xlsx";

pub const JSON_MIME: &str = "application/json";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const SHEET_NAME: &str = "Rules";

/// Pretty-printed JSON for a patch, with all three keys present.
pub fn results_json(patch: &RulePatch) -> Result<String, StoreError> {
    Ok(serde_json::to_string_pretty(patch)?)
}

pub fn write_results(path: &Path, patch: &RulePatch) -> Result<(), StoreError> {
    std::fs::write(path, results_json(patch)?).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "wrote results");
    Ok(())
}

/// Load a previously exported `results.json`.
pub fn read_results(path: &Path) -> Result<RulePatch, StoreError> {
    let text = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Encode a rule table as an `.xlsx` workbook in memory.
pub fn rule_table_xlsx(table: &RuleTable) -> Result<Vec<u8>, StoreError> {
    Ok(build_workbook(table)?.save_to_buffer()?)
}

pub fn write_rule_table(path: &Path, table: &RuleTable) -> Result<(), StoreError> {
    build_workbook(table)?.save(path)?;
    info!(
        path = %path.display(),
        rows = table.num_rows(),
        columns = table.num_columns(),
        "wrote rule table"
    );
    Ok(())
}

/// One worksheet: bold header row, then every cell as a string.
fn build_workbook(table: &RuleTable) -> Result<Workbook, StoreError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, name) in table.columns().iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, name, &header)?;
    }
    for row in 0..table.num_rows() {
        for (col, value) in table.row(row).into_iter().enumerate() {
            // Leave empty cells unwritten so they read back as blanks.
            if !value.is_empty() {
                sheet.write_string(row as u32 + 1, col as u16, value)?;
            }
        }
    }

    Ok(workbook)
}
