pub mod issue_tracker;

#[cfg(test)]
pub mod fake;

pub use issue_tracker::{IssueDraft, IssueState, IssueTrackerService, RemoteIssue};
