mod display;
mod interactive;
mod session;

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rulesense_ai::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiClient, GeminiConfig};
use rulesense_core::{Extraction, apply_patch, parse_patch};
use rulesense_store::{
    UPDATED_RULES_FILE, load_rules, read_results, results_json, write_rule_table,
};
use tracing::Level;

use crate::display::{MALFORMED, NO_JSON, format_table, render_outcome};
use crate::session::{Outcome, Session};

#[derive(Parser)]
#[command(
    name = "rulesense",
    version,
    about = "AI-powered business rule change analysis"
)]
struct Cli {
    /// Log verbosity on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask the model how the rules should change for a requirement
    Analyze {
        /// Rules file (.txt, .md, .xlsx, .xls)
        #[arg(long)]
        rules: PathBuf,
        /// Business requirement in plain language
        #[arg(long)]
        requirement: String,
        /// Directory for exported files
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Write results.json (and updated_rules.xlsx for spreadsheets)
        #[arg(long)]
        export: bool,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Apply a saved results.json to a spreadsheet of rules
    Apply {
        #[arg(long)]
        rules: PathBuf,
        #[arg(long)]
        results: PathBuf,
        /// Output workbook [default: updated_rules.xlsx]
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Extract the JSON patch from a saved model response (stdin if no file)
    Extract { file: Option<PathBuf> },
    /// Show the rules text as it would be sent to the model
    Read {
        #[arg(long)]
        rules: PathBuf,
    },
    /// Prompt-driven session on stdin/stdout
    Interactive {
        /// Default directory for `export`
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(Args)]
struct ModelArgs {
    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, env = "RULESENSE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,
    #[arg(long, env = "RULESENSE_API_BASE", default_value = DEFAULT_BASE_URL)]
    api_base: String,
}

impl ModelArgs {
    fn client(self) -> GeminiClient {
        GeminiClient::new(
            GeminiConfig::new(self.api_key)
                .with_model(self.model)
                .with_base_url(self.api_base),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!("rulesense v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Analyze {
            rules,
            requirement,
            out_dir,
            export,
            model,
        } => cmd_analyze(rules, requirement, out_dir, export, model).await,
        Command::Apply {
            rules,
            results,
            out,
        } => cmd_apply(rules, results, out),
        Command::Extract { file } => cmd_extract(file),
        Command::Read { rules } => cmd_read(rules),
        Command::Interactive { out_dir, model } => {
            let advisor = model.client();
            let mut stdout = std::io::stdout();
            interactive::run(std::io::stdin().lock(), &mut stdout, &advisor, &out_dir).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn cmd_analyze(
    rules: PathBuf,
    requirement: String,
    out_dir: PathBuf,
    export: bool,
    model: ModelArgs,
) -> anyhow::Result<ExitCode> {
    let advisor = model.client();
    let session = Session::new()
        .with_rules(rules)
        .with_requirement(requirement);

    let (session, outcome) = session
        .analyze_with_progress(&advisor, |name| {
            eprintln!("Analyzing rules using {name}...");
        })
        .await;
    let outcome = match outcome {
        Outcome::RemoteFailure(e) => {
            return Err(anyhow::Error::new(e).context("model request failed"));
        }
        other => other,
    };

    let mut stdout = std::io::stdout().lock();
    render_outcome(&mut stdout, &session, &outcome)?;
    if !outcome.is_ready() {
        return Ok(ExitCode::FAILURE);
    }

    if export {
        for path in session.export(&out_dir)? {
            writeln!(stdout, "Wrote {}", path.display())?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_apply(rules: PathBuf, results: PathBuf, out: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    let document =
        load_rules(&rules).with_context(|| format!("reading rules from {}", rules.display()))?;
    let table = document
        .as_table()
        .with_context(|| format!("{} is not a spreadsheet", rules.display()))?;
    let patch = read_results(&results)
        .with_context(|| format!("reading results from {}", results.display()))?;

    let patched = apply_patch(table, &patch)?;
    let out = out.unwrap_or_else(|| PathBuf::from(UPDATED_RULES_FILE));
    write_rule_table(&out, &patched).with_context(|| format!("writing {}", out.display()))?;

    println!("{}", format_table(&patched)?);
    println!("Wrote {}", out.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_extract(file: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    let raw = match &file {
        Some(path) => {
            let context = || format!("reading {}", path.display());
            std::fs::read_to_string(path).with_context(context)?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            buf
        }
    };

    match parse_patch(&raw) {
        Extraction::Parsed(patch) => {
            println!("{}", results_json(&patch)?);
            Ok(ExitCode::SUCCESS)
        }
        Extraction::NotFound => {
            println!("{NO_JSON}\n{raw}");
            Ok(ExitCode::FAILURE)
        }
        Extraction::Malformed { error, .. } => {
            println!("{MALFORMED}\n{raw}");
            eprintln!("parse error: {error}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn cmd_read(rules: PathBuf) -> anyhow::Result<ExitCode> {
    let document =
        load_rules(&rules).with_context(|| format!("reading rules from {}", rules.display()))?;
    println!("{}", document.prompt_text());
    Ok(ExitCode::SUCCESS)
}
