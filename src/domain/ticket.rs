use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// One Trac ticket on its way to the remote tracker.
///
/// Progress is carried by the fields themselves: `description` is cleared
/// once the issue exists, `tags` and `status` are cleared once applied and
/// `comments` is drained from the front. Re-running any step on a partially
/// migrated ticket only redoes what is still present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,
    #[serde(default)]
    pub remote_issue_id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    pub reporter: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub comments: VecDeque<Comment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    /// Unix seconds, UTC.
    pub timestamp: i64,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    CreationPending,
    TagsPending,
    StatusPending,
    CommentsPending,
    Done,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::CreationPending,
        Phase::TagsPending,
        Phase::StatusPending,
        Phase::CommentsPending,
        Phase::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::CreationPending => "creation pending",
            Phase::TagsPending => "tags pending",
            Phase::StatusPending => "status pending",
            Phase::CommentsPending => "comments pending",
            Phase::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    New,
    Accepted,
    Assigned,
    Reopened,
    Closed,
}

impl TicketStatus {
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim() {
            "new" => Ok(TicketStatus::New),
            "accepted" => Ok(TicketStatus::Accepted),
            "assigned" => Ok(TicketStatus::Assigned),
            "reopened" => Ok(TicketStatus::Reopened),
            "closed" => Ok(TicketStatus::Closed),
            other => Err(AppError::UnknownStatus(other.to_string())),
        }
    }

    /// Issues are created open, so these need no remote call.
    pub fn is_open(&self) -> bool {
        !matches!(self, TicketStatus::Closed)
    }
}

impl Ticket {
    pub fn phase(&self) -> Phase {
        if self.remote_issue_id.is_none() {
            Phase::CreationPending
        } else if !self.tags.is_empty() {
            Phase::TagsPending
        } else if self.status.is_some() {
            Phase::StatusPending
        } else if !self.comments.is_empty() {
            Phase::CommentsPending
        } else {
            Phase::Done
        }
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("<untitled>")
    }

    /// Marks the ticket as created upstream. Returns false when it already
    /// carries a different issue number, which is left untouched.
    pub fn adopt_remote_issue(&mut self, issue: u64) -> bool {
        match self.remote_issue_id {
            Some(existing) if existing != issue => false,
            _ => {
                self.remote_issue_id = Some(issue);
                self.description = None;
                true
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_ticket(id: u64) -> Ticket {
    Ticket {
        id,
        remote_issue_id: None,
        title: Some(format!("Ticket {id}")),
        reporter: "reporter".to_string(),
        description: Some(format!("Description of {id}")),
        tags: Vec::new(),
        status: None,
        comments: VecDeque::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_follows_drained_fields() {
        let mut ticket = sample_ticket(3);
        ticket.tags = vec!["defect".to_string()];
        ticket.status = Some("closed".to_string());
        ticket.comments.push_back(Comment {
            author: "bob".to_string(),
            timestamp: 0,
            body: "hi".to_string(),
        });
        assert_eq!(ticket.phase(), Phase::CreationPending);

        assert!(ticket.adopt_remote_issue(40));
        assert_eq!(ticket.description, None);
        assert_eq!(ticket.phase(), Phase::TagsPending);

        ticket.tags.clear();
        assert_eq!(ticket.phase(), Phase::StatusPending);
        ticket.status = None;
        assert_eq!(ticket.phase(), Phase::CommentsPending);
        ticket.comments.clear();
        assert_eq!(ticket.phase(), Phase::Done);
    }

    #[test]
    fn remote_issue_is_set_once() {
        let mut ticket = sample_ticket(3);
        assert!(ticket.adopt_remote_issue(40));
        assert!(ticket.adopt_remote_issue(40));
        assert!(!ticket.adopt_remote_issue(41));
        assert_eq!(ticket.remote_issue_id, Some(40));
    }

    #[test]
    fn parses_status_vocabulary() {
        assert_eq!(TicketStatus::parse("new").unwrap(), TicketStatus::New);
        assert!(TicketStatus::parse("reopened").unwrap().is_open());
        assert!(!TicketStatus::parse("closed").unwrap().is_open());
        assert!(matches!(
            TicketStatus::parse("frobnicated"),
            Err(AppError::UnknownStatus(status)) if status == "frobnicated"
        ));
    }
}
