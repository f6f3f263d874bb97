use std::error::Error;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pr_reviewer::github::{GitHubClient, GitHubConfig};
use pr_reviewer::publish::PublishConfig;
use pr_reviewer::review::llm::LlmConfig;
use pr_reviewer::secrets::SecretStore;

/// Auto LGTM — automated pull-request review.
#[derive(Debug, Parser)]
#[command(name = "auto-lgtm", about = "Automated code review for pull requests")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Review a single pull request and post the generated comments.
    Review {
        /// Repository name (without the owner prefix).
        #[arg(long)]
        repo: String,
        /// Pull request number.
        #[arg(long)]
        pr: u64,
        /// Repository owner (user or organization).
        #[arg(long, env = "GITHUB_OWNER")]
        owner: String,
        /// Read secrets from a JSON file instead of the environment.
        #[arg(long)]
        secrets_file: Option<std::path::PathBuf>,
    },
    /// List pull requests in a repository.
    List {
        /// Repository name (without the owner prefix).
        #[arg(long)]
        repo: String,
        /// Repository owner (user or organization).
        #[arg(long, env = "GITHUB_OWNER")]
        owner: String,
        /// PR state filter: open, closed or all.
        #[arg(long, default_value = "open")]
        state: String,
        /// Read secrets from a JSON file instead of the environment.
        #[arg(long)]
        secrets_file: Option<std::path::PathBuf>,
    },
    /// Run the webhook server (reviews PRs as they are opened).
    Serve,
}

fn secret_store(secrets_file: Option<std::path::PathBuf>) -> SecretStore {
    match secrets_file {
        Some(path) => SecretStore::JsonFile(path),
        None => SecretStore::Env,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from .env if present; fall back to the
    // process environment otherwise.
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("{}", "Auto LGTM — Automated Code Review".bold().cyan());

    let cli = Cli::parse();
    match cli.command {
        Command::Review {
            repo,
            pr,
            owner,
            secrets_file,
        } => {
            let secrets = secret_store(secrets_file);
            let token = secrets.get("github_token")?;
            let gh = GitHubConfig::new(owner, token);
            let llm = LlmConfig::from_env(&secrets)?;
            let publish = PublishConfig::default();

            info!("reviewing {repo}#{pr}");
            let outcome = pr_reviewer::run_review(&gh, &repo, pr, &llm, &publish).await?;
            info!(
                "review finished: generated={} published={} skipped={}",
                outcome.generated, outcome.published, outcome.skipped
            );
        }
        Command::List {
            repo,
            owner,
            state,
            secrets_file,
        } => {
            let secrets = secret_store(secrets_file);
            let token = secrets.get("github_token")?;
            let client = GitHubClient::new(GitHubConfig::new(owner, token))?;
            let pulls = client.list_pulls(&repo, &state).await?;
            info!("{} {state} pull requests in {repo}", pulls.len());
            for pr in pulls {
                println!("{:>6}  {}  {}", format!("#{}", pr.number).green(), pr.state, pr.title);
            }
        }
        Command::Serve => {
            api::start().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_subcommand_parses() {
        let cli = Cli::try_parse_from([
            "auto-lgtm", "review", "--repo", "demo", "--pr", "7", "--owner", "acme",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Review { pr: 7, .. }
        ));
    }

    #[test]
    fn list_subcommand_parses_with_default_state() {
        let cli = Cli::try_parse_from([
            "auto-lgtm", "list", "--repo", "demo", "--owner", "acme",
        ])
        .unwrap();
        let Command::List { repo, state, .. } = cli.command else {
            panic!("expected list subcommand");
        };
        assert_eq!(repo, "demo");
        assert_eq!(state, "open");
    }

    #[test]
    fn missing_required_args_are_rejected() {
        assert!(Cli::try_parse_from(["auto-lgtm", "review", "--repo", "demo"]).is_err());
    }
}
