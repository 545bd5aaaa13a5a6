use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{AppError, AppResult};
use crate::services::{IssueDraft, IssueState, IssueTrackerService, RemoteIssue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(IssueState),
    Create { title: String, body: String },
    Label { issue: u64, label: String },
    Close { issue: u64 },
    Comment { issue: u64, body: String },
}

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    /// Behaves like a failed HTTP call.
    Transient,
    /// Behaves like Ctrl-C arriving during the call.
    Interrupt,
}

/// In-memory tracker that records every call and hands out issue numbers
/// starting at `next_number`.
pub struct FakeTracker {
    inner: Mutex<FakeState>,
}

struct FakeState {
    existing: Vec<(IssueState, RemoteIssue)>,
    next_number: u64,
    calls: Vec<Call>,
    failures: HashMap<usize, Failure>,
    create_response: Option<Value>,
}

impl FakeTracker {
    pub fn new(next_number: u64) -> Self {
        Self {
            inner: Mutex::new(FakeState {
                existing: Vec::new(),
                next_number,
                calls: Vec::new(),
                failures: HashMap::new(),
                create_response: None,
            }),
        }
    }

    pub fn with_existing(self, state: IssueState, number: u64, title: &str) -> Self {
        self.inner.lock().unwrap().existing.push((
            state,
            RemoteIssue {
                number,
                title: title.to_string(),
            },
        ));
        self
    }

    /// Fails the `n`th call (zero based, counting every call).
    pub fn fail_call(self, n: usize, failure: Failure) -> Self {
        self.inner.lock().unwrap().failures.insert(n, failure);
        self
    }

    pub fn with_create_response(self, response: Value) -> Self {
        self.inner.lock().unwrap().create_response = Some(response);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    fn enter(&self, call: Call) -> AppResult<()> {
        let mut state = self.inner.lock().unwrap();
        let index = state.calls.len();
        state.calls.push(call);
        match state.failures.get(&index) {
            None => Ok(()),
            Some(Failure::Interrupt) => Err(AppError::Interrupted),
            Some(Failure::Transient) => Err(AppError::TransientRequest {
                endpoint: "fake".to_string(),
                payload: String::new(),
                reason: format!("scripted failure of call {index}"),
            }),
        }
    }
}

#[async_trait]
impl IssueTrackerService for FakeTracker {
    async fn list_issues(&self, state: IssueState) -> AppResult<Vec<RemoteIssue>> {
        self.enter(Call::List(state))?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .existing
            .iter()
            .filter(|(s, _)| *s == state)
            .map(|(_, issue)| issue.clone())
            .collect())
    }

    async fn create_issue(&self, draft: &IssueDraft) -> AppResult<Value> {
        self.enter(Call::Create {
            title: draft.title.clone(),
            body: draft.body.clone(),
        })?;
        let mut inner = self.inner.lock().unwrap();
        if let Some(response) = inner.create_response.clone() {
            return Ok(response);
        }
        let number = inner.next_number;
        inner.next_number += 1;
        Ok(json!({ "number": number, "title": draft.title }))
    }

    async fn add_label(&self, issue: u64, label: &str) -> AppResult<()> {
        self.enter(Call::Label {
            issue,
            label: label.to_string(),
        })
    }

    async fn close_issue(&self, issue: u64) -> AppResult<()> {
        self.enter(Call::Close { issue })
    }

    async fn add_comment(&self, issue: u64, body: &str) -> AppResult<()> {
        self.enter(Call::Comment {
            issue,
            body: body.to_string(),
        })
    }
}
