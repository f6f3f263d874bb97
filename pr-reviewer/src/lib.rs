//! Public entry for the auto-lgtm review pipeline.
//!
//! Single high-level function to review one pull request:
//!
//! 1) **Step 1 — Provider I/O**: fetch PR metadata (head sha) and the raw
//!    unified diff.
//! 2) **Step 2 — Parse**: structure the diff into per-file hunks/lines and
//!    flatten it into the per-line change list.
//! 3) **Step 3 — Generate**: ask the completion service for candidate
//!    comments.
//! 4) **Step 4 — Map & publish**: resolve each candidate to a comment
//!    coordinate and post the survivors; unmapped candidates are skipped,
//!    never fatal.
//!
//! Each PR is processed strictly sequentially; the parse and mapping stages
//! are pure functions, so unrelated PRs can be reviewed concurrently by
//! independent callers. Errors are unified by the crate-level error type.

pub mod errors;
pub mod github;
pub mod parser;
pub mod position;
pub mod publish;
pub mod review;
pub mod secrets;

use std::time::Instant;

use tracing::{debug, info};

use github::{GitHubClient, GitHubConfig};
use publish::PublishConfig;
use review::llm::{LlmClient, LlmConfig};

/// Summary of one review run.
#[derive(Debug, Clone, Copy)]
pub struct ReviewOutcome {
    /// Candidate comments returned by the completion service.
    pub generated: usize,
    /// Comments successfully mapped and posted.
    pub published: usize,
    /// Candidates dropped (unmapped, duplicate, or failed to post).
    pub skipped: usize,
}

/// Run the whole pipeline for a single pull request.
pub async fn run_review(
    gh_cfg: &GitHubConfig,
    repo: &str,
    number: u64,
    llm_cfg: &LlmConfig,
    publish_cfg: &PublishConfig,
) -> LgtmResult<ReviewOutcome> {
    let t0 = Instant::now();
    info!("reviewing {}/{repo}#{number}", gh_cfg.owner);

    // ---------------------------
    // Step 1: provider I/O
    // ---------------------------
    let client = GitHubClient::new(gh_cfg.clone())?;
    debug!("step1: fetch PR meta");
    let pr = client.get_pull(repo, number).await?;
    let head_sha = pr.head.sha.clone();
    debug!("step1: meta ok, head_sha={head_sha}");

    debug!("step1: fetch raw diff");
    let raw_diff = client.get_diff(repo, number).await?;
    debug!(
        "step1: diff fetched, {} bytes ({} ms)",
        raw_diff.len(),
        t0.elapsed().as_millis()
    );

    // ---------------------------
    // Step 2: parse & flatten
    // ---------------------------
    let diff = parser::parse(&raw_diff);
    let changes = review::flatten_changes(&diff);
    debug!(
        "step2: parsed files={} changed_lines={}",
        diff.len(),
        changes.len()
    );

    // ---------------------------
    // Step 3: completion call
    // ---------------------------
    let t3 = Instant::now();
    let llm = LlmClient::new(llm_cfg.clone())?;
    let response = review::generate_comments(&llm, &pr, &changes).await?;
    info!(
        "step3: generated {} candidate comments ({} ms)",
        response.comments.len(),
        t3.elapsed().as_millis()
    );

    // ---------------------------
    // Step 4: map & publish
    // ---------------------------
    let results = publish::publish(
        &client,
        repo,
        number,
        &head_sha,
        &diff,
        &response.comments,
        publish_cfg,
    )
    .await?;

    let published = results.iter().filter(|r| r.performed).count();
    let outcome = ReviewOutcome {
        generated: response.comments.len(),
        published,
        skipped: results.len() - published,
    };
    info!(
        "review done generated={} published={} skipped={} in {} ms",
        outcome.generated,
        outcome.published,
        outcome.skipped,
        t0.elapsed().as_millis()
    );
    Ok(outcome)
}

// -----------------------------------------------------------------------------
// Convenience re-exports for downstream users
// -----------------------------------------------------------------------------

pub use errors::{Error, LgtmResult};
pub use parser::{DiffFile, DiffHunk, DiffLine, DiffLineKind};
pub use position::{AnchorLoc, AnchorTarget, CommentAnchor, PositionBackend, Side};
pub use review::{ChangeType, ReviewComment, ReviewResponse, Severity};
