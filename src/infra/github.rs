use async_trait::async_trait;
use base64::prelude::{BASE64_STANDARD, Engine as _};
use reqwest::{
    Client, Method,
    header::{ACCEPT, AUTHORIZATION, USER_AGENT},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::services::{IssueDraft, IssueState, IssueTrackerService, RemoteIssue};

const PAGE_SIZE: usize = 100;
const GITHUB_ACCEPT: &str = "application/vnd.github+json";

pub struct GithubClient {
    http: Client,
    api_url: String,
    owner: String,
    project: String,
    auth_header: String,
}

impl GithubClient {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| {
                AppError::Configuration(format!("failed to build GitHub HTTP client: {err}"))
            })?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            project: config.project.clone(),
            auth_header: Self::auth_header(&config.username, &config.token),
        })
    }

    fn auth_header(login: &str, token: &str) -> String {
        let credentials = format!("{login}:{token}");
        let encoded = BASE64_STANDARD.encode(credentials);
        format!("Basic {encoded}")
    }

    fn issues_endpoint(&self) -> String {
        format!("{}/repos/{}/{}/issues", self.api_url, self.owner, self.project)
    }

    fn issue_endpoint(&self, issue: u64) -> String {
        format!("{}/{issue}", self.issues_endpoint())
    }

    /// Sends one request and returns the response body. Any failure, be it
    /// transport or a non-2xx status, comes back as `TransientRequest`.
    async fn send<B: Serialize + Sync + ?Sized>(
        &self,
        method: Method,
        endpoint: String,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> AppResult<String> {
        let payload = body
            .map(|body| serde_json::to_string(body).unwrap_or_default())
            .unwrap_or_default();
        let transient = |reason: String| AppError::TransientRequest {
            endpoint: format!("{method} {endpoint}"),
            payload: payload.clone(),
            reason,
        };

        let mut request = self
            .http
            .request(method.clone(), &endpoint)
            .header(AUTHORIZATION, &self.auth_header)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(USER_AGENT, concat!("trac2gh/", env!("CARGO_PKG_VERSION")))
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                transient(format!("GitHub did not answer in time: {err}"))
            } else {
                transient(format!("failed to call GitHub: {err}"))
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "<unable to read response>".to_string());
        if !status.is_success() {
            return Err(transient(format!("GitHub responded with {status}: {text}")));
        }
        debug!(%method, %endpoint, %status, "GitHub request succeeded");
        Ok(text)
    }
}

#[async_trait]
impl IssueTrackerService for GithubClient {
    async fn list_issues(&self, state: IssueState) -> AppResult<Vec<RemoteIssue>> {
        let mut issues = Vec::new();
        let mut page = 1usize;
        loop {
            let query = [
                ("state", state.as_str().to_string()),
                ("per_page", PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ];
            let body = self
                .send::<()>(Method::GET, self.issues_endpoint(), &query, None)
                .await?;
            let batch: Vec<GithubIssue> = serde_json::from_str(&body).map_err(|err| {
                AppError::TransientRequest {
                    endpoint: self.issues_endpoint(),
                    payload: String::new(),
                    reason: format!("failed to parse issue list: {err}"),
                }
            })?;
            // The issues endpoint lists pull requests too.
            let fetched = batch.len();
            issues.extend(
                batch
                    .into_iter()
                    .filter(|issue| issue.pull_request.is_none())
                    .map(|issue| RemoteIssue {
                        number: issue.number,
                        title: issue.title,
                    }),
            );
            if fetched < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        Ok(issues)
    }

    async fn create_issue(&self, draft: &IssueDraft) -> AppResult<Value> {
        let request = CreateIssueRequest {
            title: &draft.title,
            body: &draft.body,
        };
        let body = self
            .send(Method::POST, self.issues_endpoint(), &[], Some(&request))
            .await?;
        // An unparsable body is handed back as a string so the caller can
        // report it when no issue number turns up.
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }

    async fn add_label(&self, issue: u64, label: &str) -> AppResult<()> {
        let request = AddLabelsRequest {
            labels: [label],
        };
        let endpoint = format!("{}/labels", self.issue_endpoint(issue));
        self.send(Method::POST, endpoint, &[], Some(&request))
            .await
            .map(|_| ())
    }

    async fn close_issue(&self, issue: u64) -> AppResult<()> {
        let request = UpdateStateRequest { state: "closed" };
        self.send(Method::PATCH, self.issue_endpoint(issue), &[], Some(&request))
            .await
            .map(|_| ())
    }

    async fn add_comment(&self, issue: u64, body: &str) -> AppResult<()> {
        let request = CommentRequest { body };
        let endpoint = format!("{}/comments", self.issue_endpoint(issue));
        self.send(Method::POST, endpoint, &[], Some(&request))
            .await
            .map(|_| ())
    }
}

#[derive(Serialize)]
struct CreateIssueRequest<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Serialize)]
struct AddLabelsRequest<'a> {
    labels: [&'a str; 1],
}

#[derive(Serialize)]
struct UpdateStateRequest {
    state: &'static str,
}

#[derive(Serialize)]
struct CommentRequest<'a> {
    body: &'a str,
}

#[derive(Deserialize)]
struct GithubIssue {
    number: u64,
    title: String,
    #[serde(default)]
    pull_request: Option<Value>,
}
