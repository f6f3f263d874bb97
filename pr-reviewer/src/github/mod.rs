//! GitHub REST v3 client for PR metadata, raw diffs and review comments.
//!
//! Endpoints used:
//! - GET  /repos/:owner/:repo/pulls                      (list open PRs)
//! - GET  /repos/:owner/:repo/pulls/:n                   (meta, incl. head sha)
//! - GET  /repos/:owner/:repo/pulls/:n  (diff media type) (raw unified diff)
//! - GET  /repos/:owner/:repo/pulls/:n/comments          (existing comments)
//! - POST /repos/:owner/:repo/pulls/:n/comments          (single comment)
//! - POST /repos/:owner/:repo/pulls/:n/reviews           (batched review)

pub mod types;
pub use types::*;

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::debug;

use crate::errors::{Error, LgtmResult, ProviderError};

const DEFAULT_BASE_API: &str = "https://api.github.com";
const ACCEPT_JSON: &str = "application/vnd.github+json";
const ACCEPT_DIFF: &str = "application/vnd.github.v3.diff";
const PER_PAGE: usize = 100;

/// Runtime configuration for the GitHub client.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// API base, e.g. "https://api.github.com".
    pub base_api: String,
    /// Repository owner (user or organization).
    pub owner: String,
    /// Personal access token or app token.
    pub token: String,
}

impl GitHubConfig {
    pub fn new(owner: String, token: String) -> Self {
        Self {
            base_api: std::env::var("GITHUB_API_BASE")
                .unwrap_or_else(|_| DEFAULT_BASE_API.to_string()),
            owner,
            token,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    cfg: GitHubConfig,
}

impl GitHubClient {
    /// Constructs a client with connection pooling and sane timeouts.
    pub fn new(cfg: GitHubConfig) -> LgtmResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent("auto-lgtm/0.1")
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http, cfg })
    }

    fn headers(&self, accept: &'static str) -> LgtmResult<HeaderMap> {
        let mut h = HeaderMap::new();
        h.insert(USER_AGENT, HeaderValue::from_static("auto-lgtm/0.1"));
        h.insert(ACCEPT, HeaderValue::from_static(accept));
        h.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("token {}", self.cfg.token))
                .map_err(|e| Error::Validation(format!("bad token: {e}")))?,
        );
        Ok(h)
    }

    fn url(&self, repo: &str, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.cfg.base_api.trim_end_matches('/'),
            self.cfg.owner,
            repo,
            tail
        )
    }

    /// Lists pull requests in the given state ("open" by default upstream).
    pub async fn list_pulls(&self, repo: &str, state: &str) -> LgtmResult<Vec<PullRequest>> {
        let url = self.url(repo, "/pulls");
        debug!("GET {url} state={state}");
        let resp = self
            .http
            .get(&url)
            .headers(self.headers(ACCEPT_JSON)?)
            .query(&[("state", state)])
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    /// Fetches PR metadata (title, body, head sha).
    pub async fn get_pull(&self, repo: &str, number: u64) -> LgtmResult<PullRequest> {
        let url = self.url(repo, &format!("/pulls/{number}"));
        debug!("GET {url}");
        let resp = self
            .http
            .get(&url)
            .headers(self.headers(ACCEPT_JSON)?)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    /// Fetches the raw unified diff for a PR via the diff media type.
    pub async fn get_diff(&self, repo: &str, number: u64) -> LgtmResult<String> {
        let url = self.url(repo, &format!("/pulls/{number}"));
        debug!("GET {url} (diff)");
        let resp = self
            .http
            .get(&url)
            .headers(self.headers(ACCEPT_DIFF)?)
            .send()
            .await?;
        Ok(check(resp).await?.text().await?)
    }

    /// Lists existing review comments on the PR (used for idempotency).
    /// Walks every page; the duplicate scan must see old comments too.
    pub async fn list_review_comments(
        &self,
        repo: &str,
        number: u64,
    ) -> LgtmResult<Vec<ExistingComment>> {
        let url = self.url(repo, &format!("/pulls/{number}/comments"));
        let mut all = Vec::new();
        let mut page: u32 = 1;
        loop {
            debug!("GET {url} page={page}");
            let resp = self
                .http
                .get(&url)
                .headers(self.headers(ACCEPT_JSON)?)
                .query(&[("per_page", &PER_PAGE.to_string()), ("page", &page.to_string())])
                .send()
                .await?;
            let batch: Vec<ExistingComment> = check(resp).await?.json().await?;
            let fetched = batch.len();
            all.extend(batch);
            if fetched < PER_PAGE {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    /// Creates one standalone line-and-side review comment.
    pub async fn post_review_comment(
        &self,
        repo: &str,
        number: u64,
        comment: &ReviewCommentRequest,
    ) -> LgtmResult<CreatedComment> {
        let url = self.url(repo, &format!("/pulls/{number}/comments"));
        debug!(
            "POST {url} path={} line={} side={:?}",
            comment.path, comment.line, comment.side
        );
        let resp = self
            .http
            .post(&url)
            .headers(self.headers(ACCEPT_JSON)?)
            .json(comment)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    /// Submits one batched review with all mapped comments.
    pub async fn post_review(
        &self,
        repo: &str,
        number: u64,
        review: &ReviewRequest,
    ) -> LgtmResult<CreatedComment> {
        let url = self.url(repo, &format!("/pulls/{number}/reviews"));
        debug!("POST {url} comments={}", review.comments.len());
        let resp = self
            .http
            .post(&url)
            .headers(self.headers(ACCEPT_JSON)?)
            .json(review)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }
}

/// Maps an unsuccessful response to a provider error, pulling the API's
/// message and field errors out of 422 bodies.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let code = status.as_u16();
    if code == 422 {
        #[derive(Deserialize)]
        struct ApiError {
            #[serde(default)]
            message: Option<String>,
            #[serde(default)]
            errors: Vec<FieldError>,
        }
        #[derive(Deserialize)]
        struct FieldError {
            #[serde(default)]
            field: Option<String>,
            #[serde(default)]
            code: Option<String>,
        }
        let detail = match resp.json::<ApiError>().await {
            Ok(e) => {
                let mut msg = e.message.unwrap_or_else(|| "validation failed".into());
                for err in e.errors {
                    msg.push_str(&format!(
                        "\n- {}: {}",
                        err.field.unwrap_or_default(),
                        err.code.unwrap_or_default()
                    ));
                }
                msg
            }
            Err(_) => "validation failed".into(),
        };
        return Err(ProviderError::Unprocessable(detail));
    }
    Err(match code {
        401 => ProviderError::Unauthorized,
        403 => ProviderError::Forbidden,
        404 => ProviderError::NotFound,
        429 => ProviderError::RateLimited {
            retry_after_secs: resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok()),
        },
        500..=599 => ProviderError::Server(code),
        _ => ProviderError::HttpStatus(code),
    })
}
