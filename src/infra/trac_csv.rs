use std::collections::{HashMap, VecDeque};
use std::io::Read;

use serde::Deserialize;

use crate::domain::ticket::{Comment, Ticket};
use crate::error::{AppError, AppResult};

/// One row of a Trac ticket report exported with all fields. Columns not
/// listed here, priority included, are ignored.
#[derive(Debug, Deserialize)]
pub struct TicketRecord {
    pub id: u64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub reporter: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub milestone: String,
    #[serde(default)]
    pub status: String,
}

impl TicketRecord {
    /// Type, component and milestone become tags in that order. An empty
    /// status counts as nothing to apply.
    pub fn into_ticket(self, comments: VecDeque<Comment>) -> Ticket {
        let title = Some(self.summary).filter(|summary| !summary.is_empty());
        Ticket {
            id: self.id,
            remote_issue_id: None,
            title,
            reporter: self.reporter,
            description: Some(self.description),
            tags: vec![self.kind, self.component, self.milestone],
            status: Some(self.status).filter(|status| !status.trim().is_empty()),
            comments,
        }
    }
}

pub fn read_tickets<R: Read>(reader: R) -> AppResult<Vec<TicketRecord>> {
    let mut rows = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);
    rows.deserialize::<TicketRecord>()
        .enumerate()
        .map(|(index, row)| {
            row.map_err(|err| AppError::Source(format!("ticket row {}: {err}", index + 1)))
        })
        .collect()
}

/// Reads header-less `ticket_id,timestamp,author,body` rows and groups them
/// by ticket, keeping file order and dropping empty bodies.
pub fn read_comments<R: Read>(reader: R) -> AppResult<HashMap<u64, VecDeque<Comment>>> {
    let mut grouped: HashMap<u64, VecDeque<Comment>> = HashMap::new();
    let mut rows = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(reader);
    for (index, row) in rows.deserialize::<(u64, i64, String, String)>().enumerate() {
        let (ticket_id, timestamp, author, body) =
            row.map_err(|err| AppError::Source(format!("comment row {}: {err}", index + 1)))?;
        let body = body.trim();
        if body.is_empty() {
            continue;
        }
        grouped.entry(ticket_id).or_default().push_back(Comment {
            author,
            timestamp,
            body: body.to_string(),
        });
    }
    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_ticket_report_and_folds_tags() {
        let csv = "\
id,summary,reporter,description,type,component,milestone,priority,status,owner
7,Crash on start,alice,\"Broken\nsince #3\",defect,core / ui,1.0,major,new,bob
8,,carol,,task,--,,minor,closed,
";
        let records = read_tickets(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);

        let ticket = records.into_iter().next().unwrap().into_ticket(VecDeque::new());
        assert_eq!(ticket.id, 7);
        assert_eq!(ticket.title.as_deref(), Some("Crash on start"));
        assert_eq!(ticket.description.as_deref(), Some("Broken\nsince #3"));
        assert_eq!(ticket.tags, vec!["defect", "core / ui", "1.0"]);
        assert_eq!(ticket.status.as_deref(), Some("new"));
        assert_eq!(ticket.remote_issue_id, None);
    }

    #[test]
    fn empty_summary_means_no_title() {
        let csv = "id,summary,reporter,description,status\n8,,carol,,closed\n";
        let ticket = read_tickets(csv.as_bytes())
            .unwrap()
            .remove(0)
            .into_ticket(VecDeque::new());
        assert_eq!(ticket.title, None);
        assert_eq!(ticket.description.as_deref(), Some(""));
    }

    #[test]
    fn groups_comments_and_drops_empty_bodies() {
        let csv = "\
7,1300000000,alice,first
8,1300000001,bob,
7,1300000002,carol,\" second \"
";
        let comments = read_comments(csv.as_bytes()).unwrap();
        assert!(!comments.contains_key(&8));
        let bodies: Vec<_> = comments[&7].iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
        assert_eq!(comments[&7][1].author, "carol");
    }

    #[test]
    fn reports_malformed_rows() {
        let csv = "id,summary\nseven,oops\n";
        assert!(matches!(
            read_tickets(csv.as_bytes()),
            Err(AppError::Source(_))
        ));
    }
}
