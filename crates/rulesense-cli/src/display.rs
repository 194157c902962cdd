//! Terminal rendering for analysis results.
//!
//! The suggestion report is grouped into sections like a card: modifications,
//! additions, then Jira stories. Rule tables go through Arrow's pretty printer.

use std::io::Write;

use arrow::util::pretty::pretty_format_batches;
use rulesense_core::{Addition, Modification, RulePatch, RuleTable};

use crate::session::{Outcome, Session};

pub const MISSING_INPUT: &str = "Please upload rules and specify a requirement.";
pub const UNREADABLE_SOURCE: &str = "Could not read the uploaded file. Please check the format.";
pub const NO_JSON: &str = "No JSON object found in AI output. Raw response:";
pub const MALFORMED: &str = "Failed to parse AI output. Raw response:";

// ── Public API ──

/// Render the three suggestion sections. Empty sections are still listed.
pub fn format_report(patch: &RulePatch) -> String {
    let mut out = String::new();

    let modifications = patch.modifications.iter().map(modification_line);
    section(&mut out, "Suggested Modifications", modifications);
    let additions = patch.additions.iter().map(addition_line);
    section(&mut out, "Suggested Additions", additions);
    let stories = patch.stories.iter().map(|s| format!("- {s}"));
    section(&mut out, "Jira Stories", stories);

    out
}

pub fn format_table(table: &RuleTable) -> anyhow::Result<String> {
    Ok(pretty_format_batches(&[table.batch().clone()])?.to_string())
}

/// Write what the user should see after an analyze action.
pub fn render_outcome(
    out: &mut impl Write,
    session: &Session,
    outcome: &Outcome,
) -> anyhow::Result<()> {
    match outcome {
        Outcome::MissingInput => writeln!(out, "{MISSING_INPUT}")?,
        Outcome::UnreadableSource => writeln!(out, "{UNREADABLE_SOURCE}")?,
        Outcome::RemoteFailure(e) => writeln!(out, "Model request failed: {e}")?,
        Outcome::NoJson { raw } => writeln!(out, "{NO_JSON}\n{raw}")?,
        Outcome::Malformed { raw, error } => {
            writeln!(out, "{MALFORMED}\n{raw}")?;
            writeln!(out, "(parse error: {error})")?;
        }
        Outcome::PatchFailed(e) => {
            writeln!(out, "Could not apply suggestions to the rule table: {e}")?
        }
        Outcome::Ready => {
            let Some(analysis) = &session.analysis else {
                return Ok(());
            };
            write!(out, "{}", format_report(&analysis.patch))?;
            if let Some(table) = &analysis.patched {
                writeln!(out, "Updated Rules")?;
                writeln!(out, "{}", format_table(table)?)?;
            }
        }
    }
    Ok(())
}

// ── Section rendering ──

fn section(out: &mut String, header: &str, lines: impl Iterator<Item = String>) {
    out.push_str(header);
    out.push('\n');
    let mut empty = true;
    for line in lines {
        empty = false;
        out.push_str("  ");
        out.push_str(&line);
        out.push('\n');
    }
    if empty {
        out.push_str("  (none)\n");
    }
    out.push('\n');
}

fn modification_line(m: &Modification) -> String {
    let mut line = format!("- {}: {} → {}", m.rule_id, m.current, m.suggested);
    if let Some(rationale) = m.rationale.as_deref().filter(|r| !r.is_empty()) {
        line.push_str(&format!(" ({rationale})"));
    }
    line
}

fn addition_line(a: &Addition) -> String {
    if a.rationale.is_empty() {
        format!("- {}: {}", a.rule_id, a.rule)
    } else {
        format!("- {}: {} ({})", a.rule_id, a.rule, a.rationale)
    }
}
