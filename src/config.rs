use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, AppResult};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_STATE_FILE: &str = "migration.state";
pub const DEFAULT_CROSSREF_FILE: &str = "crossref.txt";
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub owner: String,
    pub project: String,
    pub username: String,
    pub token: String,
    pub tickets_path: PathBuf,
    pub comments_path: Option<PathBuf>,
    pub state_path: PathBuf,
    pub crossref_path: PathBuf,
    pub request_delay: Duration,
    pub request_timeout: Duration,
}

impl AppConfig {
    /// Trims every credential field, falls back to the username when no
    /// owner is given and rejects empty values.
    pub fn validated(mut self) -> AppResult<Self> {
        self.username = required("username", &self.username)?;
        self.project = required("project", &self.project)?;
        self.token = required("auth token", &self.token)?;
        self.owner = match self.owner.trim() {
            "" => self.username.clone(),
            owner => owner.to_string(),
        };
        self.api_url = match self.api_url.trim().trim_end_matches('/') {
            "" => DEFAULT_API_URL.to_string(),
            url => url.to_string(),
        };
        Ok(self)
    }

    pub fn repo_slug(&self) -> String {
        format!("{}/{}", self.owner, self.project)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_url", &self.api_url)
            .field("owner", &self.owner)
            .field("project", &self.project)
            .field("username", &self.username)
            .field("token", &mask_secret(&self.token))
            .field("tickets_path", &self.tickets_path)
            .field("comments_path", &self.comments_path)
            .field("state_path", &self.state_path)
            .field("crossref_path", &self.crossref_path)
            .field("request_delay", &self.request_delay)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn required(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Configuration(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

pub fn mask_secret(value: &str) -> String {
    match value {
        token if token.chars().count() > 6 => {
            let prefix: String = token.chars().take(3).collect();
            let suffix: String = token.chars().skip(token.chars().count() - 3).collect();
            format!("{prefix}***{suffix}")
        }
        token if !token.is_empty() => "***".to_string(),
        _ => "<not set>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            api_url: "https://api.github.com/".to_string(),
            owner: String::new(),
            project: " widgets ".to_string(),
            username: "alice".to_string(),
            token: "ghp_abcdef123456".to_string(),
            tickets_path: PathBuf::from("tickets.csv"),
            comments_path: None,
            state_path: PathBuf::from(DEFAULT_STATE_FILE),
            crossref_path: PathBuf::from(DEFAULT_CROSSREF_FILE),
            request_delay: Duration::ZERO,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    #[test]
    fn owner_defaults_to_username() {
        let cfg = config().validated().unwrap();
        assert_eq!(cfg.owner, "alice");
        assert_eq!(cfg.project, "widgets");
        assert_eq!(cfg.api_url, "https://api.github.com");
        assert_eq!(cfg.repo_slug(), "alice/widgets");
    }

    #[test]
    fn rejects_missing_token() {
        let mut cfg = config();
        cfg.token = "  ".to_string();
        assert!(matches!(cfg.validated(), Err(AppError::Configuration(_))));
    }

    #[test]
    fn debug_output_masks_token() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("ghp_abcdef123456"));
        assert!(rendered.contains("ghp***456"));
    }

    #[test]
    fn masks_non_ascii_tokens_by_character() {
        assert_eq!(mask_secret("ääääöööüüü"), "äää***üüü");
        assert_eq!(mask_secret("äöü"), "***");
    }
}
