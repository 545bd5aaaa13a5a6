use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tracing::{debug, info};

use crate::config::{
    AppConfig, DEFAULT_API_URL, DEFAULT_CROSSREF_FILE, DEFAULT_REQUEST_DELAY_MS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_STATE_FILE,
};
use crate::context::AppContext;
use crate::error::AppResult;
use crate::infra::github::GithubClient;
use crate::workflow::interrupt::InterruptFlag;
use crate::workflow::runner::{MigrationReport, MigrationRunner};

#[derive(Args, Debug, Clone)]
pub struct MigrateArgs {
    /// GitHub login used for authentication.
    #[arg(short, long, env = "TRAC2GH_USERNAME")]
    pub username: String,
    /// Organization or user owning the project (defaults to the username).
    #[arg(short, long, env = "TRAC2GH_OWNER", default_value = "")]
    pub owner: String,
    /// GitHub project (repository) name.
    #[arg(short, long, env = "TRAC2GH_PROJECT")]
    pub project: String,
    /// GitHub auth token.
    #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub auth: String,
    /// Trac tickets as CSV, exported from a report with all fields enabled.
    #[arg(value_name = "TICKETS.CSV")]
    pub tickets: PathBuf,
    /// Trac comments as CSV: ticket id, unix time, author, body.
    #[arg(value_name = "COMMENTS.CSV")]
    pub comments: Option<PathBuf>,
    /// Where progress is saved on failure; its presence resumes a migration.
    #[arg(long, default_value = DEFAULT_STATE_FILE)]
    pub state_file: PathBuf,
    /// Append-only log of ticket id to issue number pairs.
    #[arg(long, default_value = DEFAULT_CROSSREF_FILE)]
    pub crossref_file: PathBuf,
    #[arg(long, env = "TRAC2GH_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
    /// Pause before every request to the GitHub API.
    #[arg(long, default_value_t = DEFAULT_REQUEST_DELAY_MS)]
    pub request_delay_ms: u64,
    /// Give up on a GitHub request that has not completed after this long.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,
}

impl MigrateArgs {
    pub fn into_config(self) -> AppResult<AppConfig> {
        AppConfig {
            api_url: self.api_url,
            owner: self.owner,
            project: self.project,
            username: self.username,
            token: self.auth,
            tickets_path: self.tickets,
            comments_path: self.comments,
            state_path: self.state_file,
            crossref_path: self.crossref_file,
            request_delay: Duration::from_millis(self.request_delay_ms),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
        .validated()
    }
}

pub async fn run(args: MigrateArgs) -> AppResult<MigrationReport> {
    let config = args.into_config()?;
    debug!(?config, "resolved configuration");
    info!(repo = %config.repo_slug(), "migrating Trac tickets");

    let issue_tracker = Arc::new(GithubClient::new(&config)?);
    let context = AppContext::new(config, issue_tracker, InterruptFlag::install());

    let mut runner = MigrationRunner::load_or_build(&context).await?;
    info!(
        tickets = runner.tickets().len(),
        resumed = runner.is_resumed(),
        "working set ready"
    );
    runner.run().await
}
