//! GitHub webhook endpoint.
//!
//! Steps:
//! 1. Verify the HMAC-SHA256 signature against the configured secret.
//! 2. Filter to `pull_request` / `opened` events.
//! 3. Spawn the review as a background task and answer immediately.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use tracing::{error, info, warn};

use pr_reviewer::github::GitHubConfig;

use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    pull_request: Option<PullRequestRef>,
    #[serde(default)]
    repository: Option<RepositoryRef>,
}

#[derive(Debug, Deserialize)]
struct PullRequestRef {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct RepositoryRef {
    name: String,
    owner: OwnerRef,
}

#[derive(Debug, Deserialize)]
struct OwnerRef {
    login: String,
}

pub async fn github_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if let Err(e) = verify_signature(&body, &state.webhook_secret, signature) {
        warn!("webhook signature verification failed: {e}");
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid signature" })))
            .into_response();
    }

    let event = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if event != "pull_request" {
        return Json(json!({ "message": "Not a pull request event" })).into_response();
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!("failed to parse webhook payload: {e}");
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid JSON" })))
                .into_response();
        }
    };

    if payload.action.as_deref() != Some("opened") {
        return Json(json!({ "message": "Not a PR open event" })).into_response();
    }

    let (Some(repository), Some(pull_request)) = (payload.repository, payload.pull_request) else {
        warn!("missing required fields in webhook payload");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing required fields in payload" })),
        )
            .into_response();
    };
    let repo = repository.name;
    let owner = repository.owner.login;
    let pr_number = pull_request.number;

    info!("webhook accepted: {owner}/{repo}#{pr_number}");

    let state = state.clone();
    let response = json!({
        "message": "Review process triggered successfully",
        "repo": repo,
        "pr_number": pr_number,
    });
    tokio::spawn(async move {
        let gh = GitHubConfig::new(owner, state.github_token.clone());
        if let Err(e) =
            pr_reviewer::run_review(&gh, &repo, pr_number, &state.llm, &state.publish).await
        {
            error!("webhook review failed for {repo}#{pr_number}: {e}");
        }
    });

    Json(response).into_response()
}

/// Verifies the `sha256=<hex>` webhook signature over the raw body.
fn verify_signature(body: &[u8], secret: &str, signature_header: &str) -> Result<(), String> {
    if secret.is_empty() {
        return Err("webhook secret not configured".into());
    }
    let signature_hex = signature_header
        .strip_prefix("sha256=")
        .ok_or_else(|| "missing sha256= prefix".to_string())?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| format!("invalid HMAC key: {e}"))?;
    mac.update(body);

    let expected =
        hex::decode(signature_hex).map_err(|e| format!("invalid hex in signature: {e}"))?;

    // Constant-time compare.
    mac.verify_slice(&expected)
        .map_err(|_| "HMAC verification failed".to_string())
}
