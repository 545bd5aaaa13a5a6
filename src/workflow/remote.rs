use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::services::{IssueDraft, IssueState, IssueTrackerService, RemoteIssue};
use crate::workflow::interrupt::InterruptFlag;

/// Every remote call made during a migration goes through here: a fixed
/// courtesy delay, an interrupt check on both sides of the delay, and the
/// split between failed requests (logged, empty result) and everything else
/// (propagated).
pub struct RemoteGate {
    tracker: Arc<dyn IssueTrackerService>,
    delay: Duration,
    interrupt: InterruptFlag,
}

impl RemoteGate {
    pub fn new(
        tracker: Arc<dyn IssueTrackerService>,
        delay: Duration,
        interrupt: InterruptFlag,
    ) -> Self {
        Self {
            tracker,
            delay,
            interrupt,
        }
    }

    pub fn interrupt(&self) -> &InterruptFlag {
        &self.interrupt
    }

    /// Waits out the courtesy delay. Fails with `Interrupted` when the
    /// interrupt flag is raised before or during the wait.
    pub async fn pace(&self) -> AppResult<()> {
        self.interrupt.check()?;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.interrupt.check()
    }

    /// Listing feeds deduplication, so a failure here is not swallowed.
    pub async fn list_issues(&self, state: IssueState) -> AppResult<Vec<RemoteIssue>> {
        self.pace().await?;
        self.tracker.list_issues(state).await
    }

    pub async fn create_issue(&self, ticket: u64, draft: &IssueDraft) -> AppResult<Option<Value>> {
        self.pace().await?;
        swallow_transient(ticket, self.tracker.create_issue(draft).await)
    }

    pub async fn add_label(&self, ticket: u64, issue: u64, label: &str) -> AppResult<Option<()>> {
        self.pace().await?;
        swallow_transient(ticket, self.tracker.add_label(issue, label).await)
    }

    pub async fn close_issue(&self, ticket: u64, issue: u64) -> AppResult<Option<()>> {
        self.pace().await?;
        swallow_transient(ticket, self.tracker.close_issue(issue).await)
    }

    /// Unlike the other calls this one does not pace itself: the comment
    /// queue is committed between `pace` and the request.
    pub async fn send_comment(&self, ticket: u64, issue: u64, body: &str) -> AppResult<Option<()>> {
        swallow_transient(ticket, self.tracker.add_comment(issue, body).await)
    }
}

fn swallow_transient<T>(ticket: u64, result: AppResult<T>) -> AppResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(AppError::TransientRequest {
            endpoint,
            payload,
            reason,
        }) => {
            warn!(ticket, %endpoint, %payload, %reason, "remote request failed");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fake::{Call, Failure, FakeTracker};

    #[tokio::test]
    async fn transient_failure_yields_empty_result() {
        let fake = Arc::new(FakeTracker::new(1).fail_call(0, Failure::Transient));
        let gate = RemoteGate::new(fake.clone(), Duration::ZERO, InterruptFlag::new());

        assert_eq!(gate.close_issue(3, 40).await.unwrap(), None);
        assert_eq!(gate.close_issue(3, 40).await.unwrap(), Some(()));
        assert_eq!(fake.calls().len(), 2);
    }

    #[tokio::test]
    async fn raised_interrupt_blocks_the_call() {
        let fake = Arc::new(FakeTracker::new(1));
        let interrupt = InterruptFlag::new();
        let gate = RemoteGate::new(fake.clone(), Duration::ZERO, interrupt.clone());

        interrupt.raise();
        assert!(matches!(gate.pace().await, Err(AppError::Interrupted)));
        assert!(matches!(
            gate.add_label(3, 40, "ui").await,
            Err(AppError::Interrupted)
        ));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn listing_failures_propagate() {
        let fake = Arc::new(FakeTracker::new(1).fail_call(0, Failure::Transient));
        let gate = RemoteGate::new(fake.clone(), Duration::ZERO, InterruptFlag::new());

        assert!(gate.list_issues(IssueState::Open).await.is_err());
        assert_eq!(fake.calls(), vec![Call::List(IssueState::Open)]);
    }
}
