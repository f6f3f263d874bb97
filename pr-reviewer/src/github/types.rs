//! GitHub REST response/request shapes (subset of fields we actually use).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::position::Side;

/// Pull request metadata as returned by `GET /repos/:owner/:repo/pulls/:n`.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
    pub html_url: String,
    pub head: CommitRef,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Head/base ref of a pull request. Only the sha matters to us: comment
/// anchors are valid against it and go stale otherwise.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

impl PullRequest {
    #[cfg(test)]
    pub fn stub(title: &str, body: Option<&str>) -> Self {
        Self {
            number: 1,
            title: title.to_string(),
            body: body.map(|s| s.to_string()),
            state: "open".into(),
            html_url: String::new(),
            head: CommitRef {
                sha: "deadbeef".into(),
            },
            created_at: None,
            updated_at: None,
        }
    }
}

/// One comment inside a batched review request.
///
/// Exactly one coordinate set is populated: `position` for the legacy
/// backend, or `line`/`side` (optionally with `start_line`/`start_side`)
/// for line-and-side anchors.
#[derive(Debug, Clone, Serialize)]
pub struct DraftReviewComment {
    pub path: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_side: Option<Side>,
}

/// Batched review: `POST /repos/:owner/:repo/pulls/:n/reviews`.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewRequest {
    pub commit_id: String,
    pub body: String,
    pub event: String,
    pub comments: Vec<DraftReviewComment>,
}

/// Standalone review comment: `POST /repos/:owner/:repo/pulls/:n/comments`.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewCommentRequest {
    pub body: String,
    pub commit_id: String,
    pub path: String,
    pub side: Side,
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_side: Option<Side>,
}

/// Minimal identifiers of a created comment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedComment {
    pub id: u64,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Existing review comment, listed for idempotency checks.
#[derive(Debug, Clone, Deserialize)]
pub struct ExistingComment {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
}
