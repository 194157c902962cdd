//! Apply a [`RulePatch`] to a tabular rule set.
//!
//! Modifications rewrite every row whose `rule_id` matches, then additions
//! are appended as new rows. The input table is never mutated; a new table
//! is built from a row-major working copy.

use tracing::{debug, info};

use crate::error::TableError;
use crate::patch::RulePatch;
use crate::table::{RATIONALE, RULE, RULE_ID, RuleTable};

/// Row-major working copy that can grow columns on demand.
struct Grid {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Grid {
    fn find(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Index of `name`, appending an empty column if it does not exist yet.
    fn ensure(&mut self, name: &str) -> usize {
        if let Some(idx) = self.find(name) {
            return idx;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.columns.len() - 1
    }
}

/// Produce a patched copy of `original`.
///
/// - Each modification sets `rule` to `suggested` (when non-empty) and
///   `rationale` (when present) on all rows with a matching `rule_id`.
///   Entries matching no row are skipped.
/// - Each addition appends one row with `rule_id`, `rule` and `rationale`
///   filled in and every other column empty.
///
/// `rule` and `rationale` columns are created the first time they are written.
pub fn apply_patch(original: &RuleTable, patch: &RulePatch) -> Result<RuleTable, TableError> {
    let mut grid = Grid {
        columns: original.columns(),
        rows: original.to_rows(),
    };

    let mut touched = 0usize;
    for m in &patch.modifications {
        let matches: Vec<usize> = match grid.find(RULE_ID) {
            Some(id_col) => grid
                .rows
                .iter()
                .enumerate()
                .filter(|(_, row)| row[id_col] == m.rule_id)
                .map(|(i, _)| i)
                .collect(),
            None => Vec::new(),
        };
        if matches.is_empty() {
            debug!(rule_id = %m.rule_id, "modification matches no rule, skipped");
            continue;
        }

        if !m.suggested.is_empty() {
            let col = grid.ensure(RULE);
            for &i in &matches {
                grid.rows[i][col].clone_from(&m.suggested);
            }
        }
        if let Some(rationale) = &m.rationale {
            let col = grid.ensure(RATIONALE);
            for &i in &matches {
                grid.rows[i][col].clone_from(rationale);
            }
        }
        touched += matches.len();
    }

    for a in &patch.additions {
        let id_col = grid.ensure(RULE_ID);
        let rule_col = grid.ensure(RULE);
        let rationale_col = grid.ensure(RATIONALE);

        let mut row = vec![String::new(); grid.columns.len()];
        row[id_col].clone_from(&a.rule_id);
        row[rule_col].clone_from(&a.rule);
        row[rationale_col].clone_from(&a.rationale);
        grid.rows.push(row);
    }

    info!(
        rows_modified = touched,
        rows_added = patch.additions.len(),
        columns = grid.columns.len(),
        "applied rule patch"
    );
    RuleTable::from_rows(grid.columns, grid.rows)
}
