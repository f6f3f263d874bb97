//! Review generation: flatten the structured diff into per-line changes,
//! prompt the completion service, and parse its candidate comments.
//!
//! The completion service is a black box that returns a JSON list of
//! candidate comments; everything here is tolerant of its mistakes — a
//! malformed entry is dropped with a warning, never fatal.

pub mod llm;
pub mod prompt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{LgtmResult, LlmError};
use crate::github::types::PullRequest;
use crate::parser::{DiffFile, DiffLineKind};
use llm::LlmClient;

/// Change kind claimed by the completion service for a candidate comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Addition,
    Deletion,
    Modification,
}

/// Severity assigned by the completion service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One candidate comment produced by the completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewComment {
    pub file: String,
    pub line_number: u32,
    pub line_content: String,
    pub change_type: ChangeType,
    pub severity: Severity,
    /// Markdown body, possibly multi-line.
    pub comment: String,
}

/// Full response of one completion call.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewResponse {
    pub comments: Vec<ReviewComment>,
}

/// One flattened diff line handed to the prompt.
#[derive(Debug, Clone, Serialize)]
pub struct FlatChange {
    pub file: String,
    pub line_number: u32,
    pub line_content: String,
    pub change_type: ChangeType,
}

/// Flattens the structured diff into the per-line change list the prompt is
/// built from. Context lines are structural and never appear here.
pub fn flatten_changes(diff: &[DiffFile]) -> Vec<FlatChange> {
    let mut changes = Vec::new();
    for file in diff {
        for hunk in &file.hunks {
            for change in &hunk.changes {
                let change_type = match change.kind {
                    DiffLineKind::Addition => ChangeType::Addition,
                    DiffLineKind::Deletion => ChangeType::Deletion,
                    DiffLineKind::Context => continue,
                };
                changes.push(FlatChange {
                    file: file.path.clone(),
                    line_number: change.line,
                    line_content: change.content.clone(),
                    change_type,
                });
            }
        }
    }
    changes
}

/// Asks the completion service for review comments on the given changes.
///
/// The raw response is expected to be a JSON array of comment objects (the
/// prompt contract), but an object wrapped as `{"comments": [...]}` is also
/// accepted. Entries that fail to deserialize are skipped.
pub async fn generate_comments(
    client: &LlmClient,
    pr: &PullRequest,
    changes: &[FlatChange],
) -> LgtmResult<ReviewResponse> {
    let system_prompt = prompt::render(pr, changes)?;
    let raw = client.generate(&system_prompt, prompt::USER_QUERY).await?;
    debug!("llm raw response: {} chars", raw.len());
    let comments = parse_comments(&raw)?;
    Ok(ReviewResponse { comments })
}

/// Parses the completion service's JSON into comments, dropping entries
/// that do not match the contract.
fn parse_comments(raw: &str) -> Result<Vec<ReviewComment>, LlmError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| LlmError::InvalidResponse(format!("not valid JSON: {e}")))?;

    let entries = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("comments") {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                return Err(LlmError::InvalidResponse(
                    "expected an array or a {\"comments\": [...]} object".into(),
                ));
            }
        },
        _ => {
            return Err(LlmError::InvalidResponse(
                "expected an array or a {\"comments\": [...]} object".into(),
            ));
        }
    };

    let mut comments = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<ReviewComment>(entry) {
            Ok(c) => comments.push(c),
            Err(e) => warn!("dropping malformed comment entry: {e}"),
        }
    }
    Ok(comments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    #[test]
    fn flatten_preserves_diff_order_and_kinds() {
        let raw = "\
diff --git a/a.py b/a.py
@@ -1,3 +1,4 @@
 x=1
+y=2
-z=3
";
        let diff = parser::parse(raw);
        let flat = flatten_changes(&diff);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0].change_type, ChangeType::Addition);
        assert_eq!(flat[0].line_number, 2);
        assert_eq!(flat[1].change_type, ChangeType::Deletion);
        assert_eq!(flat[1].line_content, "z=3");
    }

    #[test]
    fn parse_comments_accepts_bare_array() {
        let raw = r#"[
            {"file":"a.py","line_number":2,"line_content":"y=2",
             "change_type":"addition","severity":"warning","comment":"Name it."}
        ]"#;
        let comments = parse_comments(raw).unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].severity, Severity::Warning);
    }

    #[test]
    fn parse_comments_accepts_wrapped_object() {
        let raw = r#"{"comments":[
            {"file":"a.py","line_number":2,"line_content":"y=2",
             "change_type":"deletion","severity":"info","comment":"ok"}
        ]}"#;
        let comments = parse_comments(raw).unwrap();
        assert_eq!(comments[0].change_type, ChangeType::Deletion);
    }

    #[test]
    fn parse_comments_drops_malformed_entries() {
        let raw = r#"[
            {"file":"a.py","line_number":2,"line_content":"y=2",
             "change_type":"addition","severity":"error","comment":"keep"},
            {"file":"a.py","line_number":"not a number"}
        ]"#;
        let comments = parse_comments(raw).unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].comment, "keep");
    }

    #[test]
    fn parse_comments_rejects_non_json() {
        assert!(parse_comments("sorry, I cannot").is_err());
    }
}
