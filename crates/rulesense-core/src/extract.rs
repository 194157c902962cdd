//! Salvage a JSON object from free-form model output.
//!
//! Models often wrap the requested JSON in prose or markdown fences even when
//! told not to. Extraction takes everything from the first `{` to the last
//! `}` and hands it to the JSON parser. It does not check brace balance, so
//! text like `see {modifications} above` yields a snippet that then fails to
//! parse, which callers report differently from finding no braces at all.

use serde_json::Value;
use tracing::debug;

use crate::patch::RulePatch;

/// Outcome of extracting and parsing a [`RulePatch`] from model output.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// No `{` anywhere in the text.
    NotFound,
    /// A `{...}` snippet was found but is not a valid patch object.
    Malformed { snippet: String, error: String },
    Parsed(RulePatch),
}

impl Extraction {
    pub fn patch(&self) -> Option<&RulePatch> {
        match self {
            Self::Parsed(patch) => Some(patch),
            _ => None,
        }
    }

    pub fn into_patch(self) -> Option<RulePatch> {
        match self {
            Self::Parsed(patch) => Some(patch),
            _ => None,
        }
    }
}

/// Return the span from the first `{` through the last `}`, verbatim.
///
/// If no `}` follows the first `{`, the span runs to the end of `text`.
/// Returns `None` only when `text` contains no `{`.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text
        .rfind('}')
        .filter(|&end| end > start)
        .map_or(text.len(), |end| end + 1);
    Some(&text[start..end])
}

/// Extract the JSON snippet from `text` and parse it as a [`RulePatch`].
pub fn parse_patch(text: &str) -> Extraction {
    let Some(snippet) = extract_json(text) else {
        debug!(len = text.len(), "no JSON object in model output");
        return Extraction::NotFound;
    };

    let malformed = |error: String| Extraction::Malformed {
        snippet: snippet.to_string(),
        error,
    };

    let value: Value = match serde_json::from_str(snippet) {
        Ok(v) => v,
        Err(e) => return malformed(e.to_string()),
    };
    if !value.is_object() {
        return malformed("expected a JSON object".to_string());
    }

    match serde_json::from_value::<RulePatch>(value) {
        Ok(patch) => {
            debug!(
                modifications = patch.modifications.len(),
                additions = patch.additions.len(),
                stories = patch.stories.len(),
                "parsed rule patch"
            );
            Extraction::Parsed(patch)
        }
        Err(e) => malformed(e.to_string()),
    }
}
