//! Shared application state for the webhook server.

use pr_reviewer::errors::ConfigError;
use pr_reviewer::publish::PublishConfig;
use pr_reviewer::review::llm::LlmConfig;
use pr_reviewer::secrets::SecretStore;

/// Everything a webhook-triggered review needs, resolved once at startup so
/// a missing secret fails the boot, not the first delivery.
#[derive(Debug, Clone)]
pub struct AppState {
    /// GitHub token used for all repositories this server reviews.
    pub github_token: String,
    /// Secret the webhook signature is verified against.
    pub webhook_secret: String,
    pub llm: LlmConfig,
    pub publish: PublishConfig,
}

impl AppState {
    pub fn from_env() -> Result<Self, ConfigError> {
        let secrets = SecretStore::Env;
        Ok(Self {
            github_token: secrets.get("github_token")?,
            webhook_secret: secrets.get("webhook_secret")?,
            llm: LlmConfig::from_env(&secrets)?,
            publish: PublishConfig::default(),
        })
    }
}
