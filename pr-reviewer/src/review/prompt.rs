//! System prompt for the review completion call.
//!
//! The output contract (field names and enum strings) must stay in lockstep
//! with [`crate::review::ReviewComment`] — the parser on the other side is
//! only as tolerant as `parse_comments` allows.

use serde::Serialize;

use crate::errors::LgtmResult;
use crate::github::types::PullRequest;
use crate::review::FlatChange;

/// Fixed user turn sent with every review request.
pub const USER_QUERY: &str =
    "Analyze the following changes with right line number and provide feedback on the code.";

const PR_REVIEW_PROMPT: &str = r#"
You are a helpful assistant expert in software development and reviews pull requests and provides feedback on the code.
Pull Request metadata information
{pr_metadata}

You will be given a diff of a pull request -
{changes}

Based on the diff, you will provide a Output JSON Format of comments in the following format

[{
    "file": "path/to/file.py",
    "line_number": 10,
    "line_content": "The function is not working as expected.",
    "change_type": "deletion",
    "severity": "error",
    "comment": "The function is not working as expected."
}]

The change_type can be one of the following:
- deletion
- addition
- modification

The severity can be one of the following:
- error
- warning
- info

NOTE:
- The comment should be a short and concise explanation of the change with necessary code snippets.
- The code snippets should be in markdown code block format.
- The comment should be in the same tone, style, format, and structure as the code.
- The comment should have the right line where the changes are made.
- The comment should be in the same logic and clean code.
- The comment with code snippets should follow the software development best practices like SOLID, DRY, KISS, YAGNI, etc.
"#;

#[derive(Serialize)]
struct PrMetadata<'a> {
    title: &'a str,
    body: &'a str,
}

/// Renders the system prompt with PR metadata and the flattened change list.
pub fn render(pr: &PullRequest, changes: &[FlatChange]) -> LgtmResult<String> {
    let metadata = PrMetadata {
        title: &pr.title,
        body: pr.body.as_deref().unwrap_or(""),
    };
    let metadata_json = serde_json::to_string_pretty(&metadata)
        .map_err(|e| crate::errors::Error::Validation(format!("metadata render: {e}")))?;
    let changes_json = serde_json::to_string_pretty(changes)
        .map_err(|e| crate::errors::Error::Validation(format!("changes render: {e}")))?;

    Ok(PR_REVIEW_PROMPT
        .replace("{pr_metadata}", &metadata_json)
        .replace("{changes}", &changes_json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::ChangeType;

    #[test]
    fn render_embeds_metadata_and_changes() {
        let pr = PullRequest::stub("Add parser", Some("Implements the diff parser."));
        let changes = vec![FlatChange {
            file: "src/parser.rs".into(),
            line_number: 42,
            line_content: "let x = 1;".into(),
            change_type: ChangeType::Addition,
        }];
        let prompt = render(&pr, &changes).unwrap();
        assert!(prompt.contains("Add parser"));
        assert!(prompt.contains("src/parser.rs"));
        assert!(prompt.contains("\"line_number\": 42"));
        // The literal JSON example must survive the placeholder substitution.
        assert!(prompt.contains("\"change_type\": \"deletion\""));
    }
}
