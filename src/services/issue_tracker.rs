use async_trait::async_trait;
use serde_json::Value;

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteIssue {
    pub number: u64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDraft {
    pub title: String,
    pub body: String,
}

/// Transport to the remote tracker. Implementations report a failed call as
/// `AppError::TransientRequest`; deciding whether that is fatal is up to the
/// caller.
#[async_trait]
pub trait IssueTrackerService: Send + Sync {
    async fn list_issues(&self, state: IssueState) -> AppResult<Vec<RemoteIssue>>;
    /// Returns the decoded response body as is.
    async fn create_issue(&self, draft: &IssueDraft) -> AppResult<Value>;
    async fn add_label(&self, issue: u64, label: &str) -> AppResult<()>;
    async fn close_issue(&self, issue: u64) -> AppResult<()>;
    async fn add_comment(&self, issue: u64, body: &str) -> AppResult<()>;
}
