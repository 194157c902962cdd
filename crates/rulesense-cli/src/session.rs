//! One user's analysis session.
//!
//! A [`Session`] holds what the user has supplied (rules file, requirement)
//! and the result of the last analysis. Actions take the session by value and
//! hand it back, so the same flow drives both the one-shot `analyze` command
//! and the interactive loop without any global state.

use std::path::{Path, PathBuf};

use anyhow::Context;
use rulesense_ai::{AiError, RuleAdvisor};
use rulesense_core::{
    Extraction, RuleDocument, RulePatch, RuleTable, TableError, apply_patch, parse_patch,
};
use rulesense_store::{
    RESULTS_FILE, UPDATED_RULES_FILE, read_rules, write_results, write_rule_table,
};
use tracing::info;

#[derive(Debug, Default)]
pub struct Session {
    pub rules_path: Option<PathBuf>,
    pub requirement: String,
    pub analysis: Option<Analysis>,
}

/// Result of the last successful analysis.
#[derive(Debug)]
pub struct Analysis {
    pub document: RuleDocument,
    pub raw_response: String,
    pub patch: RulePatch,
    /// Only for spreadsheet sources.
    pub patched: Option<RuleTable>,
}

/// How an analyze action ended. Only `Ready` leaves an [`Analysis`] behind.
#[derive(Debug)]
pub enum Outcome {
    MissingInput,
    UnreadableSource,
    RemoteFailure(AiError),
    NoJson { raw: String },
    Malformed { raw: String, error: String },
    PatchFailed(TableError),
    Ready,
}

impl Outcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(mut self, path: impl Into<PathBuf>) -> Self {
        self.rules_path = Some(path.into());
        self
    }

    pub fn with_requirement(mut self, requirement: impl Into<String>) -> Self {
        self.requirement = requirement.into();
        self
    }

    /// Read the rules, ask the advisor, and parse its answer.
    ///
    /// Any previous analysis is discarded first, so a failed run never leaves
    /// stale results around to export.
    pub async fn analyze<A>(self, advisor: &A) -> (Self, Outcome)
    where
        A: RuleAdvisor + ?Sized,
    {
        self.analyze_with_progress(advisor, |_| {}).await
    }

    /// Like [`Session::analyze`], calling `on_request` with the advisor's name
    /// once the inputs are valid and the request is about to be sent.
    pub async fn analyze_with_progress<A, F>(
        mut self,
        advisor: &A,
        on_request: F,
    ) -> (Self, Outcome)
    where
        A: RuleAdvisor + ?Sized,
        F: FnOnce(&str),
    {
        self.analysis = None;

        if self.rules_path.is_none() || self.requirement.trim().is_empty() {
            return (self, Outcome::MissingInput);
        }
        let Some(document) = read_rules(self.rules_path.as_deref()) else {
            return (self, Outcome::UnreadableSource);
        };

        on_request(advisor.name());
        let raw = match advisor
            .advise(&document.prompt_text(), &self.requirement)
            .await
        {
            Ok(raw) => raw,
            Err(e) => return (self, Outcome::RemoteFailure(e)),
        };

        let patch = match parse_patch(&raw) {
            Extraction::Parsed(patch) => patch,
            Extraction::NotFound => return (self, Outcome::NoJson { raw }),
            Extraction::Malformed { error, .. } => {
                return (self, Outcome::Malformed { raw, error });
            }
        };

        let patched = match document.as_table().map(|t| apply_patch(t, &patch)) {
            None => None,
            Some(Ok(table)) => Some(table),
            Some(Err(e)) => return (self, Outcome::PatchFailed(e)),
        };

        info!(
            modifications = patch.modifications.len(),
            additions = patch.additions.len(),
            stories = patch.stories.len(),
            tabular = patched.is_some(),
            "analysis complete"
        );
        self.analysis = Some(Analysis {
            document,
            raw_response: raw,
            patch,
            patched,
        });
        (self, Outcome::Ready)
    }

    /// Write `results.json`, plus `updated_rules.xlsx` for spreadsheet sources,
    /// into `dir`. Returns the paths written.
    pub fn export(&self, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let analysis = self
            .analysis
            .as_ref()
            .context("nothing to export; run analyze first")?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;

        let mut written = Vec::with_capacity(2);

        let results = dir.join(RESULTS_FILE);
        write_results(&results, &analysis.patch)?;
        written.push(results);

        if let Some(table) = &analysis.patched {
            let path = dir.join(UPDATED_RULES_FILE);
            write_rule_table(&path, table)?;
            written.push(path);
        }

        Ok(written)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use rulesense_store::{load_rules, read_results};
    use std::sync::Mutex;

    /// Advisor that replays a canned answer and records what it was asked.
    pub(crate) struct ScriptedAdvisor {
        reply: Result<String, String>,
        pub(crate) calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedAdvisor {
        pub(crate) fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(body: &str) -> Self {
            Self {
                reply: Err(body.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RuleAdvisor for ScriptedAdvisor {
        fn name(&self) -> &str {
            "Scripted"
        }

        async fn advise(&self, rules_text: &str, requirement: &str) -> Result<String, AiError> {
            self.calls
                .lock()
                .unwrap()
                .push((rules_text.to_string(), requirement.to_string()));
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(body) => Err(AiError::Server {
                    status: 500,
                    body: body.clone(),
                }),
            }
        }
    }

    pub(crate) const PATCH_REPLY: &str = r#"Here is my analysis:
```json
{
  "modifications": [
    {"rule_id": "R1", "current": "Mobile OTP", "suggested": "Mobile OTP and Aadhaar check", "rationale": "KYC"}
  ],
  "additions": [
    {"rule_id": "R3", "rule": "Aadhaar check on profile update", "rationale": "compliance"}
  ],
  "stories": ["As a compliance officer I want Aadhaar verified on profile update"]
}
```"#;

    pub(crate) fn write_text_rules(dir: &Path) -> PathBuf {
        let path = dir.join("rules.txt");
        std::fs::write(&path, "R1: Mobile OTP\nR2: Email verification\n").unwrap();
        path
    }

    pub(crate) fn write_sheet_rules(dir: &Path) -> PathBuf {
        let table = RuleTable::from_rows(
            vec!["rule_id".into(), "rule".into()],
            vec![
                vec!["R1".into(), "Mobile OTP".into()],
                vec!["R2".into(), "Email verification".into()],
            ],
        )
        .unwrap();
        let path = dir.join("rules.xlsx");
        write_rule_table(&path, &table).unwrap();
        path
    }

    #[tokio::test]
    async fn missing_input_skips_model() {
        let advisor = ScriptedAdvisor::replying("{}");

        let (session, outcome) = Session::new().with_requirement("x").analyze(&advisor).await;
        assert!(matches!(outcome, Outcome::MissingInput));

        let (_, outcome) = session
            .with_rules("rules.txt")
            .with_requirement("   ")
            .analyze(&advisor)
            .await;
        assert!(matches!(outcome, Outcome::MissingInput));
        assert_eq!(advisor.call_count(), 0);
    }

    #[tokio::test]
    async fn progress_fires_only_when_model_is_asked() {
        let dir = tempfile::tempdir().unwrap();
        let advisor = ScriptedAdvisor::replying("{}");

        let mut notified = Vec::new();
        let (session, outcome) = Session::new()
            .with_rules(dir.path().join("missing.txt"))
            .with_requirement("x")
            .analyze_with_progress(&advisor, |name| notified.push(name.to_string()))
            .await;
        assert!(matches!(outcome, Outcome::UnreadableSource));
        assert!(notified.is_empty());

        let (_, outcome) = session
            .with_rules(write_text_rules(dir.path()))
            .analyze_with_progress(&advisor, |name| notified.push(name.to_string()))
            .await;
        assert!(outcome.is_ready());
        assert_eq!(notified, vec!["Scripted"]);
    }

    #[tokio::test]
    async fn unreadable_source_skips_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.pdf");
        std::fs::write(&path, "%PDF").unwrap();
        let advisor = ScriptedAdvisor::replying("{}");

        let (session, outcome) = Session::new()
            .with_rules(&path)
            .with_requirement("Add Aadhaar check")
            .analyze(&advisor)
            .await;

        assert!(matches!(outcome, Outcome::UnreadableSource));
        assert!(session.analysis.is_none());
        assert_eq!(advisor.call_count(), 0);
    }

    #[tokio::test]
    async fn text_source_yields_patch_without_table() {
        let dir = tempfile::tempdir().unwrap();
        let advisor = ScriptedAdvisor::replying(PATCH_REPLY);

        let (session, outcome) = Session::new()
            .with_rules(write_text_rules(dir.path()))
            .with_requirement("Add Aadhaar check on profile update")
            .analyze(&advisor)
            .await;

        assert!(outcome.is_ready());
        let analysis = session.analysis.as_ref().unwrap();
        assert_eq!(analysis.patch.modifications[0].rule_id, "R1");
        assert_eq!(analysis.patch.stories.len(), 1);
        assert!(analysis.patched.is_none());
        assert_eq!(analysis.raw_response, PATCH_REPLY);

        let calls = advisor.calls.lock().unwrap();
        assert_eq!(calls[0].0, "R1: Mobile OTP\nR2: Email verification\n");
        assert_eq!(calls[0].1, "Add Aadhaar check on profile update");
    }

    #[tokio::test]
    async fn spreadsheet_source_is_flattened_and_patched() {
        let dir = tempfile::tempdir().unwrap();
        let advisor = ScriptedAdvisor::replying(PATCH_REPLY);

        let (session, outcome) = Session::new()
            .with_rules(write_sheet_rules(dir.path()))
            .with_requirement("Add Aadhaar check")
            .analyze(&advisor)
            .await;

        assert!(outcome.is_ready());
        assert_eq!(
            advisor.calls.lock().unwrap()[0].0,
            "R1 | Mobile OTP\nR2 | Email verification"
        );

        let patched = session.analysis.unwrap().patched.unwrap();
        assert_eq!(patched.num_rows(), 3);
        assert_eq!(
            patched.row(0),
            vec!["R1", "Mobile OTP and Aadhaar check", "KYC"]
        );
        assert_eq!(patched.row(1), vec!["R2", "Email verification", ""]);
        assert_eq!(
            patched.row(2),
            vec!["R3", "Aadhaar check on profile update", "compliance"]
        );
    }

    #[tokio::test]
    async fn prose_only_reply_is_no_json() {
        let dir = tempfile::tempdir().unwrap();
        let advisor = ScriptedAdvisor::replying("I cannot help with that.");

        let (session, outcome) = Session::new()
            .with_rules(write_text_rules(dir.path()))
            .with_requirement("x")
            .analyze(&advisor)
            .await;

        match outcome {
            Outcome::NoJson { raw } => assert_eq!(raw, "I cannot help with that."),
            other => panic!("expected NoJson, got {other:?}"),
        }
        assert!(session.analysis.is_none());
    }

    #[tokio::test]
    async fn broken_json_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let advisor = ScriptedAdvisor::replying("see {modifications} above");

        let (_, outcome) = Session::new()
            .with_rules(write_text_rules(dir.path()))
            .with_requirement("x")
            .analyze(&advisor)
            .await;

        match outcome {
            Outcome::Malformed { raw, .. } => assert_eq!(raw, "see {modifications} above"),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn remote_failure_keeps_session_usable() {
        let dir = tempfile::tempdir().unwrap();
        let rules = write_text_rules(dir.path());

        let (session, outcome) = Session::new()
            .with_rules(&rules)
            .with_requirement("x")
            .analyze(&ScriptedAdvisor::failing("quota exceeded"))
            .await;
        assert!(matches!(
            outcome,
            Outcome::RemoteFailure(AiError::Server { status: 500, .. })
        ));
        assert_eq!(session.requirement, "x");

        let (session, outcome) = session
            .with_requirement("y")
            .analyze(&ScriptedAdvisor::replying("{}"))
            .await;
        assert!(outcome.is_ready());
        assert!(session.analysis.unwrap().patch.is_empty());
    }

    #[tokio::test]
    async fn new_analysis_replaces_previous() {
        let dir = tempfile::tempdir().unwrap();
        let (session, _) = Session::new()
            .with_rules(write_text_rules(dir.path()))
            .with_requirement("x")
            .analyze(&ScriptedAdvisor::replying(PATCH_REPLY))
            .await;
        assert!(session.analysis.is_some());

        let (session, outcome) = session
            .analyze(&ScriptedAdvisor::replying("no json here"))
            .await;
        assert!(matches!(outcome, Outcome::NoJson { .. }));
        assert!(session.analysis.is_none());
    }

    #[tokio::test]
    async fn export_writes_json_and_sheet_for_tabular_source() {
        let dir = tempfile::tempdir().unwrap();
        let (session, _) = Session::new()
            .with_rules(write_sheet_rules(dir.path()))
            .with_requirement("x")
            .analyze(&ScriptedAdvisor::replying(PATCH_REPLY))
            .await;

        let out = dir.path().join("out");
        let written = session.export(&out).unwrap();
        assert_eq!(
            written,
            vec![out.join(RESULTS_FILE), out.join(UPDATED_RULES_FILE)]
        );

        let patch = read_results(&written[0]).unwrap();
        assert_eq!(patch, session.analysis.as_ref().unwrap().patch);

        let sheet = load_rules(&written[1]).unwrap();
        assert_eq!(sheet.as_table().unwrap().num_rows(), 3);
    }

    #[tokio::test]
    async fn export_writes_only_json_for_text_source() {
        let dir = tempfile::tempdir().unwrap();
        let (session, _) = Session::new()
            .with_rules(write_text_rules(dir.path()))
            .with_requirement("x")
            .analyze(&ScriptedAdvisor::replying(PATCH_REPLY))
            .await;

        let written = session.export(dir.path()).unwrap();
        assert_eq!(written, vec![dir.path().join(RESULTS_FILE)]);
    }

    #[test]
    fn export_without_analysis_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Session::new().export(dir.path()).is_err());
    }
}
