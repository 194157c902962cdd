//! Prompt template for rule analysis.

const RESPONSE_FORMAT: &str = "\
Format your answer as JSON with keys: modifications, additions, stories.
{
  \"modifications\": [
    {\"rule_id\": \"id of the existing rule\", \"current\": \"current rule text\", \"suggested\": \"proposed rule text\", \"rationale\": \"why\"}
  ],
  \"additions\": [
    {\"rule_id\": \"id for the new rule\", \"rule\": \"new rule text\", \"rationale\": \"why\"}
  ],
  \"stories\": [\"Jira-style user story\"]
}
Respond ONLY with valid JSON, no explanation or extra text.";

/// Build the analysis prompt. Rules text and requirement are embedded verbatim.
pub fn build_prompt(rules_text: &str, requirement: &str) -> String {
    format!(
        "Here are existing profile update rules:\n\
         \n\
         {rules_text}\n\
         \n\
         Requirement: {requirement}\n\
         \n\
         Please propose:\n\
         1. Modified rules (with rationale)\n\
         2. New rules\n\
         3. Suggested Jira-style user stories\n\
         {RESPONSE_FORMAT}\n"
    )
}
