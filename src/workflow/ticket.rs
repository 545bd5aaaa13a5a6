use chrono::DateTime;
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::crossref::CrossrefTable;
use crate::domain::markup::TextRewriter;
use crate::domain::ticket::{Comment, Ticket, TicketStatus};
use crate::error::{AppError, AppResult};
use crate::services::IssueDraft;
use crate::workflow::remote::RemoteGate;

const IGNORED_TAGS: [&str; 2] = ["", "--"];

/// What a ticket needs from the runner while it uploads itself.
pub struct UploadContext<'a> {
    pub remote: &'a RemoteGate,
    pub rewriter: &'a TextRewriter,
    pub crossref: &'a mut CrossrefTable,
}

impl Ticket {
    /// Creates the remote issue. Does nothing once the description has
    /// been uploaded.
    pub async fn upload_ticket(&mut self, cx: &mut UploadContext<'_>) -> AppResult<()> {
        let Some(description) = self.description.as_deref() else {
            return Ok(());
        };

        let description = cx.rewriter.rewrite(cx.crossref, description);
        let draft = IssueDraft {
            title: self
                .title
                .clone()
                .unwrap_or_else(|| format!("Trac ticket #{}", self.id)),
            body: ticket_body(&self.reporter, self.id, &description),
        };

        let response = cx.remote.create_issue(self.id, &draft).await?;
        let issue = response.as_ref().and_then(issue_number).ok_or_else(|| {
            let content = response
                .map(|value| value.to_string())
                .unwrap_or_else(|| "no response".to_string());
            AppError::Upload(format!(
                "creating an issue for ticket #{} returned no issue number: {content}",
                self.id
            ))
        })?;

        self.remote_issue_id = Some(issue);
        self.description = None;
        info!(ticket = self.id, issue, "uploaded as remote issue");

        cx.crossref.record(self.id, issue)
    }

    pub async fn upload_tags(&mut self, cx: &mut UploadContext<'_>) -> AppResult<()> {
        if self.tags.is_empty() {
            return Ok(());
        }
        let issue = self.require_issue()?;

        for tag in &self.tags {
            let tag = tag.trim();
            if IGNORED_TAGS.contains(&tag) {
                info!(ticket = self.id, tag, "ignoring tag");
                continue;
            }
            let label = normalize_tag(tag);
            match cx.remote.add_label(self.id, issue, &label).await {
                Ok(Some(())) => info!(ticket = self.id, label = %label, "added tag"),
                Ok(None) => {}
                Err(err) => {
                    warn!(ticket = self.id, label = %label, "failed to add tag");
                    return Err(err);
                }
            }
        }

        self.tags.clear();
        Ok(())
    }

    pub async fn upload_status(&mut self, cx: &mut UploadContext<'_>) -> AppResult<()> {
        let Some(raw) = self.status.as_deref() else {
            return Ok(());
        };

        let status = TicketStatus::parse(raw)?;
        if !status.is_open() {
            let issue = self.require_issue()?;
            if cx.remote.close_issue(self.id, issue).await?.is_some() {
                info!(ticket = self.id, issue, "marked as closed");
            }
        }

        self.status = None;
        Ok(())
    }

    /// Posts queued comments oldest first and returns how many went
    /// through. A comment leaves the queue just before its request is sent,
    /// so a failure during the request loses it rather than repeating it.
    pub async fn upload_comments(&mut self, cx: &mut UploadContext<'_>) -> AppResult<usize> {
        if self.comments.is_empty() {
            return Ok(0);
        }
        let issue = self.require_issue()?;

        let mut posted = 0;
        while let Some(comment) = self.comments.front() {
            let body = comment_body(comment, &cx.rewriter.rewrite(cx.crossref, &comment.body));
            cx.remote.pace().await?;
            self.comments.pop_front();
            if cx.remote.send_comment(self.id, issue, &body).await?.is_some() {
                posted += 1;
            }
        }

        if posted > 0 {
            info!(ticket = self.id, issue, count = posted, "added comments");
        }
        Ok(posted)
    }

    fn require_issue(&self) -> AppResult<u64> {
        self.remote_issue_id.ok_or_else(|| {
            AppError::Upload(format!("ticket #{} has no remote issue yet", self.id))
        })
    }
}

fn issue_number(response: &Value) -> Option<u64> {
    response.get("number").and_then(Value::as_u64)
}

pub fn normalize_tag(tag: &str) -> String {
    tag.replace(" / ", " ").replace('/', " ")
}

fn ticket_body(reporter: &str, id: u64, description: &str) -> String {
    format!(
        "```\nAutomatically imported from Trac.\nOriginally reported by '{reporter}' as #{id}.\n```\n\n{description}\n"
    )
}

fn comment_body(comment: &Comment, text: &str) -> String {
    format!(
        "```\nOriginally written by '{}' at {}:\n```\n\n{text}",
        comment.author,
        format_timestamp(comment.timestamp)
    )
}

/// RFC 1123 style, always in UTC.
fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|at| at.format("%a, %d %b %Y %H:%M:%S +0000").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
