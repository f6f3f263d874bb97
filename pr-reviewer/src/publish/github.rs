//! GitHub publisher.
//!
//! Maps each candidate comment through the configured position backend and
//! posts the survivors. Unmapped candidates are logged and skipped so one
//! hallucinated line never aborts the batch.

use std::collections::HashSet;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::errors::{Error, LgtmResult};
use crate::github::{DraftReviewComment, GitHubClient, ReviewCommentRequest, ReviewRequest};
use crate::parser::DiffFile;
use crate::position::{AnchorLoc, AnchorTarget, MappedPosition, PositionBackend};
use crate::publish::{PublishConfig, PublishedComment};
use crate::review::ReviewComment;

const REVIEW_BODY: &str = "Automated review by Auto-LGTM.";

lazy_static! {
    /// Matches the hidden idempotency marker embedded in comment bodies.
    static ref MARKER_RE: Regex =
        Regex::new(r"<!--\s*auto-lgtm:key=([^;>]+);hash=([0-9a-f]+);ver=\d+\s*-->").unwrap();
}

pub async fn publish_github(
    client: &GitHubClient,
    repo: &str,
    number: u64,
    head_sha: &str,
    diff: &[DiffFile],
    comments: &[ReviewComment],
    cfg: &PublishConfig,
) -> LgtmResult<Vec<PublishedComment>> {
    // Existing markers for idempotency. Skipped in dry-run: no network.
    let existing = if cfg.dry_run {
        HashSet::new()
    } else {
        load_existing_markers(client, repo, number).await?
    };
    debug!("publish: existing markers={}", existing.len());

    let mut results = Vec::with_capacity(comments.len());
    let mut mapped: Vec<(MappedPosition, ReviewComment, String)> = Vec::new();

    for comment in comments {
        let target = AnchorTarget {
            file: &comment.file,
            line: comment.line_number,
            change_type: comment.change_type,
        };
        match cfg.backend.resolve(diff, &target, &comment.comment, head_sha) {
            Some(position) => {
                let (marker, key) = make_marker_and_key(comment);
                if existing.contains(&key) {
                    debug!("publish: skip duplicate key={key}");
                    results.push(PublishedComment {
                        path: comment.file.clone(),
                        line: comment.line_number,
                        performed: false,
                        skipped_reason: Some("duplicate".into()),
                    });
                    continue;
                }
                mapped.push((position, comment.clone(), marker));
            }
            None => {
                warn!(
                    "could not map {}:{} to a diff position, skipping comment",
                    comment.file, comment.line_number
                );
                results.push(PublishedComment {
                    path: comment.file.clone(),
                    line: comment.line_number,
                    performed: false,
                    skipped_reason: Some("unmapped".into()),
                });
            }
        }
    }

    if mapped.is_empty() {
        return Ok(results);
    }

    if cfg.dry_run {
        for (position, comment, _) in &mapped {
            debug!("publish: dry-run would post {:?}", position);
            results.push(PublishedComment {
                path: comment.file.clone(),
                line: comment.line_number,
                performed: false,
                skipped_reason: Some("dry-run".into()),
            });
        }
        return Ok(results);
    }

    match cfg.backend {
        PositionBackend::LegacyPosition => {
            results.extend(post_batched_review(client, repo, number, head_sha, mapped).await?);
        }
        PositionBackend::LineAndSide => {
            results.extend(
                post_individual_comments(client, repo, number, mapped, cfg.max_concurrency).await?,
            );
        }
    }

    Ok(results)
}

/// Legacy backend: one review submission carrying all diff positions.
async fn post_batched_review(
    client: &GitHubClient,
    repo: &str,
    number: u64,
    head_sha: &str,
    mapped: Vec<(MappedPosition, ReviewComment, String)>,
) -> LgtmResult<Vec<PublishedComment>> {
    let mut drafts = Vec::with_capacity(mapped.len());
    let mut results = Vec::with_capacity(mapped.len());

    for (position, comment, marker) in &mapped {
        let MappedPosition::Legacy { path, position } = position else {
            continue;
        };
        drafts.push(DraftReviewComment {
            path: path.clone(),
            body: format!("{}\n\n{}", comment.comment, marker),
            position: Some(*position),
            line: None,
            side: None,
            start_line: None,
            start_side: None,
        });
        results.push(PublishedComment {
            path: comment.file.clone(),
            line: comment.line_number,
            performed: true,
            skipped_reason: None,
        });
    }

    let review = ReviewRequest {
        commit_id: head_sha.to_string(),
        body: REVIEW_BODY.to_string(),
        event: "COMMENT".to_string(),
        comments: drafts,
    };
    client.post_review(repo, number, &review).await?;
    Ok(results)
}

/// Line-and-side backend: individual comment posts, bounded concurrency.
async fn post_individual_comments(
    client: &GitHubClient,
    repo: &str,
    number: u64,
    mapped: Vec<(MappedPosition, ReviewComment, String)>,
    max_concurrency: usize,
) -> LgtmResult<Vec<PublishedComment>> {
    let sem = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut futs = Vec::with_capacity(mapped.len());

    for (position, comment, marker) in mapped {
        let MappedPosition::LineAndSide(anchor) = position else {
            continue;
        };
        let (line, start_line) = match anchor.loc {
            AnchorLoc::Line(line) => (line, None),
            // GitHub ranges put the last line in `line` and the first in
            // `start_line`.
            AnchorLoc::Range { start, end } => (end, Some(start)),
        };
        let req = ReviewCommentRequest {
            body: format!("{}\n\n{}", comment.comment, marker),
            commit_id: anchor.commit_id.clone(),
            path: anchor.path.clone(),
            side: anchor.side,
            line,
            start_line,
            start_side: start_line.map(|_| anchor.side),
        };

        let client = client.clone();
        let repo = repo.to_string();
        let sem = sem.clone();
        futs.push(tokio::spawn(async move {
            let _permit = sem.acquire_owned().await.expect("semaphore closed");
            let res = client.post_review_comment(&repo, number, &req).await;
            (comment, res)
        }));
    }

    let mut results = Vec::with_capacity(futs.len());
    for fut in futs {
        let (comment, res) = fut
            .await
            .map_err(|e| Error::Validation(format!("join error: {e}")))?;
        match res {
            Ok(created) => {
                debug!(
                    "publish: posted comment id={} at {}:{}",
                    created.id, comment.file, comment.line_number
                );
                results.push(PublishedComment {
                    path: comment.file,
                    line: comment.line_number,
                    performed: true,
                    skipped_reason: None,
                });
            }
            Err(e) => {
                // One failed post must not abort the rest of the batch.
                warn!(
                    "publish: failed to post {}:{}: {e}",
                    comment.file, comment.line_number
                );
                results.push(PublishedComment {
                    path: comment.file,
                    line: comment.line_number,
                    performed: false,
                    skipped_reason: Some(format!("post failed: {e}")),
                });
            }
        }
    }
    Ok(results)
}

/// Lists existing review comments and extracts their idempotency keys.
/// `list_review_comments` walks every page, so the scan covers the full
/// comment history of the PR.
async fn load_existing_markers(
    client: &GitHubClient,
    repo: &str,
    number: u64,
) -> LgtmResult<HashSet<String>> {
    let existing = client.list_review_comments(repo, number).await?;
    Ok(extract_marker_keys(&existing))
}

/// Pulls idempotency keys out of comment bodies.
fn extract_marker_keys(comments: &[crate::github::ExistingComment]) -> HashSet<String> {
    let mut set = HashSet::new();
    for comment in comments {
        if let Some(body) = &comment.body {
            if let Some(caps) = MARKER_RE.captures(body) {
                let key = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                let hash = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
                set.insert(format!("{key}#{hash}"));
            }
        }
    }
    set
}

/// Builds the hidden marker and the full idempotency key for one candidate.
///
/// key format: `<path>:<line>#<hash>` where the hash covers the quoted line
/// and the comment text.
fn make_marker_and_key(comment: &ReviewComment) -> (String, String) {
    let mut hasher = Sha256::new();
    hasher.update(comment.line_content.as_bytes());
    hasher.update(comment.comment.as_bytes());
    let digest = hasher.finalize();
    let hash: String = digest
        .iter()
        .take(6)
        .map(|b| format!("{b:02x}"))
        .collect();

    let key = format!("{}:{}", comment.file, comment.line_number);
    let marker = format!("<!-- auto-lgtm:key={key};hash={hash};ver=1 -->");
    (marker, format!("{key}#{hash}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::{ChangeType, Severity};

    fn candidate() -> ReviewComment {
        ReviewComment {
            file: "src/lib.rs".into(),
            line_number: 7,
            line_content: "let x = 1;".into(),
            change_type: ChangeType::Addition,
            severity: Severity::Info,
            comment: "Consider a descriptive name.".into(),
        }
    }

    #[test]
    fn marker_round_trips_through_the_regex() {
        let (marker, key) = make_marker_and_key(&candidate());
        let body = format!("Consider a descriptive name.\n\n{marker}");
        let caps = MARKER_RE.captures(&body).expect("marker must match");
        let extracted = format!("{}#{}", &caps[1], &caps[2]);
        assert_eq!(extracted, key);
    }

    #[test]
    fn marker_key_is_stable_and_content_sensitive() {
        let (_, key_a) = make_marker_and_key(&candidate());
        let (_, key_b) = make_marker_and_key(&candidate());
        assert_eq!(key_a, key_b);

        let mut other = candidate();
        other.comment = "Different feedback.".into();
        let (_, key_c) = make_marker_and_key(&other);
        assert_ne!(key_a, key_c);
    }

    #[test]
    fn marker_scan_sees_keys_beyond_the_first_hundred_comments() {
        use crate::github::ExistingComment;

        let (marker, key) = make_marker_and_key(&candidate());

        // 150 unmarked comments first, so the marked one lands on page two
        // of a per_page=100 listing.
        let mut history: Vec<ExistingComment> = (0..150)
            .map(|id| ExistingComment {
                id,
                body: Some(format!("human comment {id}")),
            })
            .collect();
        history.push(ExistingComment {
            id: 150,
            body: Some(format!("Consider a descriptive name.\n\n{marker}")),
        });
        history.push(ExistingComment { id: 151, body: None });

        let keys = extract_marker_keys(&history);
        assert!(keys.contains(&key));
        assert_eq!(keys.len(), 1);
    }
}
