//! Publisher: posts mapped review comments back to the pull request.
//!
//! - Line-and-side backend: one review-comment POST per mapped candidate,
//!   bounded by a semaphore.
//! - Legacy backend: a single batched review carrying diff positions.
//! - Idempotency: a hidden marker is embedded in each body and duplicates
//!   are skipped.
//! - Dry-run: compute and log actions without calling the API.
//!
//! An unmappable candidate is skipped and counted, never fatal; the worst
//! outcome of a publish run is an empty review.

pub mod github;

use std::time::Instant;

use tracing::info;

use crate::errors::LgtmResult;
use crate::github::GitHubClient;
use crate::parser::DiffFile;
use crate::position::PositionBackend;
use crate::review::ReviewComment;

/// Configuration for the publishing step.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// If true, do not actually send anything; just log what would be posted.
    pub dry_run: bool,
    /// Coordinate system required by the target platform.
    pub backend: PositionBackend,
    /// Concurrency for individual comment posts.
    pub max_concurrency: usize,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            dry_run: env_bool("AUTO_LGTM_DRY_RUN", false),
            backend: match std::env::var("AUTO_LGTM_POSITION_BACKEND").as_deref() {
                Ok("position") => PositionBackend::LegacyPosition,
                _ => PositionBackend::LineAndSide,
            },
            max_concurrency: env_usize("AUTO_LGTM_PUBLISH_CONCURRENCY", 2),
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Result for a single candidate comment.
#[derive(Debug, Clone)]
pub struct PublishedComment {
    pub path: String,
    pub line: u32,
    /// Was a network POST performed (false in dry-run or when skipped)?
    pub performed: bool,
    /// Reason if skipped (unmapped, duplicate, dry-run).
    pub skipped_reason: Option<String>,
}

/// Publish all candidate comments for a PR.
///
/// Returns per-candidate results and logs an INFO summary.
pub async fn publish(
    client: &GitHubClient,
    repo: &str,
    number: u64,
    head_sha: &str,
    diff: &[DiffFile],
    comments: &[ReviewComment],
    cfg: &PublishConfig,
) -> LgtmResult<Vec<PublishedComment>> {
    let t0 = Instant::now();
    info!(
        "publish start backend={:?} candidates={} dry_run={}",
        cfg.backend,
        comments.len(),
        cfg.dry_run
    );

    let results = github::publish_github(client, repo, number, head_sha, diff, comments, cfg).await?;

    let posted = results.iter().filter(|r| r.performed).count();
    let skipped = results.iter().filter(|r| r.skipped_reason.is_some()).count();
    info!(
        "publish done posted={} skipped={} in {} ms",
        posted,
        skipped,
        t0.elapsed().as_millis()
    );

    Ok(results)
}
