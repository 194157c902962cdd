//! The rule patch a model returns for one requirement.
//!
//! Models omit fields, emit `null`, and write numeric rule IDs despite being
//! asked for strings, so every field here deserializes leniently: absent and
//! `null` become empty, scalars are stringified. Serialization always writes
//! the full shape with string values.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Modifications, additions and backlog stories proposed for a rule set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulePatch {
    #[serde(default, deserialize_with = "list_or_null")]
    pub modifications: Vec<Modification>,
    #[serde(default, deserialize_with = "list_or_null")]
    pub additions: Vec<Addition>,
    #[serde(default, deserialize_with = "stories")]
    pub stories: Vec<String>,
}

impl RulePatch {
    pub fn is_empty(&self) -> bool {
        self.modifications.is_empty() && self.additions.is_empty() && self.stories.is_empty()
    }
}

/// A proposed change to an existing rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Modification {
    #[serde(default, deserialize_with = "text")]
    pub rule_id: String,
    #[serde(default, deserialize_with = "text")]
    pub current: String,
    #[serde(default, deserialize_with = "text")]
    pub suggested: String,
    /// `None` when the model left the key out (or sent `null`). An empty
    /// string still counts as present and clears the rationale cell.
    #[serde(
        default,
        deserialize_with = "optional_text",
        serialize_with = "text_or_empty"
    )]
    pub rationale: Option<String>,
}

/// A proposed new rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Addition {
    #[serde(default, deserialize_with = "text")]
    pub rule_id: String,
    #[serde(default, deserialize_with = "text")]
    pub rule: String,
    #[serde(default, deserialize_with = "text")]
    pub rationale: String,
}

fn value_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(value_text(Value::deserialize(d)?))
}

fn optional_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Null => None,
        other => Some(value_text(other)),
    })
}

fn list_or_null<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

fn stories<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<Value>>::deserialize(d)?
        .unwrap_or_default()
        .into_iter()
        .map(value_text)
        .collect())
}

fn text_or_empty<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(value.as_deref().unwrap_or_default())
}
