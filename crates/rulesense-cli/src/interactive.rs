//! Line-driven session: set a rules file and a requirement, analyze, export.
//!
//! Nothing the user does ends the loop except `quit` or end of input; every
//! failure is printed and the session carries on.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use rulesense_ai::RuleAdvisor;
use rulesense_store::{ACCEPTED_EXTENSIONS, SourceKind};

use crate::display::{format_table, render_outcome};
use crate::session::Session;

const HELP: &str = "\
Commands:
  file <path>        rules file to analyze (.txt, .md, .xlsx, .xls)
  req <text>         business requirement
  analyze            ask the model for rule changes
  export [dir]       write results.json (and updated_rules.xlsx)
  table              show the updated rule table
  raw                show the model's last raw response
  show               show the current file and requirement
  help               this list
  quit               leave";

pub async fn run<R, W, A>(
    mut input: R,
    out: &mut W,
    advisor: &A,
    out_dir: &Path,
) -> anyhow::Result<()>
where
    R: BufRead,
    W: Write,
    A: RuleAdvisor + ?Sized,
{
    let mut session = Session::new();

    writeln!(out, "RuleSense: AI-powered business rule change analysis")?;
    writeln!(out, "Type `help` for commands.")?;
    prompt(out)?;

    // Bytes that are not UTF-8 are replaced rather than ending the session.
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim();
        let (command, arg) = line
            .split_once(char::is_whitespace)
            .map(|(c, a)| (c, a.trim()))
            .unwrap_or((line, ""));

        match command {
            "" => {}
            "file" | "rules" => {
                if arg.is_empty() {
                    writeln!(out, "usage: file <path>")?;
                } else if SourceKind::from_name(arg).is_none() {
                    writeln!(
                        out,
                        "Unsupported file type. Accepted: {}",
                        ACCEPTED_EXTENSIONS.join(", ")
                    )?;
                } else {
                    session = session.with_rules(arg);
                    writeln!(out, "Rules file: {arg}")?;
                }
            }
            "req" | "requirement" => {
                session = session.with_requirement(arg);
                writeln!(out, "Requirement set.")?;
            }
            "analyze" => {
                let mut progress = Ok(());
                let (next, outcome) = session
                    .analyze_with_progress(advisor, |name| {
                        progress = writeln!(out, "Analyzing rules using {name}...");
                    })
                    .await;
                progress?;
                session = next;
                render_outcome(out, &session, &outcome)?;
            }
            "export" => {
                let dir = if arg.is_empty() {
                    out_dir.to_path_buf()
                } else {
                    PathBuf::from(arg)
                };
                match session.export(&dir) {
                    Ok(paths) => {
                        for path in paths {
                            writeln!(out, "Wrote {}", path.display())?;
                        }
                    }
                    Err(e) => writeln!(out, "Export failed: {e:#}")?,
                }
            }
            "table" => match session.analysis.as_ref().and_then(|a| a.patched.as_ref()) {
                Some(table) => writeln!(out, "{}", format_table(table)?)?,
                None => writeln!(out, "No updated table; analyze a spreadsheet first.")?,
            },
            "show" => {
                let file = session
                    .rules_path
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(none)".to_string());
                writeln!(out, "File:        {file}")?;
                writeln!(out, "Requirement: {}", session.requirement)?;
                let analysis = match &session.analysis {
                    Some(a) if a.document.is_tabular() => "ready (spreadsheet)",
                    Some(_) => "ready (text)",
                    None => "none",
                };
                writeln!(out, "Analysis:    {analysis}")?;
            }
            "raw" => match &session.analysis {
                Some(a) => writeln!(out, "{}", a.raw_response)?,
                None => writeln!(out, "No analysis yet.")?,
            },
            "help" => writeln!(out, "{HELP}")?,
            "quit" | "exit" => break,
            other => writeln!(out, "Unknown command `{other}`. Type `help` for commands.")?,
        }
        prompt(out)?;
    }

    Ok(())
}

fn prompt(out: &mut impl Write) -> std::io::Result<()> {
    write!(out, "> ")?;
    out.flush()
}
