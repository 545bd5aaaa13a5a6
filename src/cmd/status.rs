use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;

use crate::config::DEFAULT_STATE_FILE;
use crate::domain::ticket::Phase;
use crate::error::AppResult;
use crate::state::{MigrationState, StateFile};

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = DEFAULT_STATE_FILE)]
    pub state_file: PathBuf,
}

pub fn run(args: StatusArgs) -> AppResult<()> {
    let file = StateFile::new(args.state_file);
    let Some(state) = file.load()? else {
        println!("No saved state at {}; the next migration starts fresh.", file.path().display());
        return Ok(());
    };

    println!("State file: {}", file.path().display());
    for line in summarize(&state) {
        println!("{line}");
    }
    Ok(())
}

fn summarize(state: &MigrationState) -> Vec<String> {
    let mut counts: BTreeMap<Phase, usize> = BTreeMap::new();
    let mut queued_comments = 0;
    for ticket in &state.tickets {
        *counts.entry(ticket.phase()).or_default() += 1;
        queued_comments += ticket.comments.len();
    }

    let mut lines = vec![format!("Tickets: {}", state.tickets.len())];
    lines.extend(
        Phase::ALL
            .iter()
            .map(|phase| format!("  {}: {}", phase.as_str(), counts.get(phase).unwrap_or(&0))),
    );
    lines.push(format!("Queued comments: {queued_comments}"));
    lines.push(format!("Crossreferences: {}", state.crossref.len()));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ticket::{Comment, sample_ticket};

    #[test]
    fn summarizes_phases() {
        let mut done = sample_ticket(1);
        done.adopt_remote_issue(10);
        let mut commenting = sample_ticket(2);
        commenting.adopt_remote_issue(11);
        commenting.comments.push_back(Comment {
            author: "ann".to_string(),
            timestamp: 0,
            body: "queued".to_string(),
        });
        let state = MigrationState {
            tickets: vec![done, commenting, sample_ticket(3)],
            crossref: BTreeMap::from([(1, 10), (2, 11)]),
        };

        assert_eq!(
            summarize(&state),
            vec![
                "Tickets: 3",
                "  creation pending: 1",
                "  tags pending: 0",
                "  status pending: 0",
                "  comments pending: 1",
                "  done: 1",
                "Queued comments: 1",
                "Crossreferences: 2",
            ]
        );
    }
}
