use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;

use tracing::{debug, error, info};

use crate::config::AppConfig;
use crate::context::AppContext;
use crate::domain::crossref::CrossrefTable;
use crate::domain::markup::TextRewriter;
use crate::domain::ticket::Ticket;
use crate::error::{AppError, AppResult};
use crate::infra::trac_csv::{read_comments, read_tickets};
use crate::services::IssueState;
use crate::state::{MigrationState, StateFile};
use crate::workflow::remote::RemoteGate;
use crate::workflow::ticket::UploadContext;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub tickets: usize,
    pub created: usize,
    pub comments: usize,
}

/// Owns the working set for the lifetime of a migration and writes it back
/// to the state file whenever a pass fails.
pub struct MigrationRunner {
    tickets: Vec<Ticket>,
    crossref: CrossrefTable,
    rewriter: TextRewriter,
    remote: RemoteGate,
    state_file: StateFile,
    resumed: bool,
}

impl MigrationRunner {
    /// Resumes from the state file when one exists, otherwise ingests the
    /// CSV exports and drops tickets whose title already exists upstream.
    pub async fn load_or_build(ctx: &AppContext) -> AppResult<Self> {
        let config = &ctx.config;
        let remote = RemoteGate::new(
            ctx.issue_tracker.clone(),
            config.request_delay,
            ctx.interrupt.clone(),
        );
        let mut crossref = CrossrefTable::open(&config.crossref_path)?;
        let state_file = StateFile::new(&config.state_path);

        let (tickets, resumed) = match state_file.load()? {
            Some(state) => {
                info!(
                    path = %state_file.path().display(),
                    tickets = state.tickets.len(),
                    "resuming from saved state, remove the file to start over"
                );
                crossref.merge(&state.crossref)?;
                (state.tickets, true)
            }
            None => (build_working_set(&remote, config, &crossref).await?, false),
        };

        let mut runner = Self {
            tickets,
            crossref,
            rewriter: TextRewriter::new(),
            remote,
            state_file,
            resumed,
        };
        runner.adopt_known_issues();
        Ok(runner)
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    pub async fn run(&mut self) -> AppResult<MigrationReport> {
        let created = self.run_creation_pass().await?;
        let comments = self.run_comment_pass().await?;
        self.persist()?;
        Ok(MigrationReport {
            tickets: self.tickets.len(),
            created,
            comments,
        })
    }

    /// Creates, tags and sets the status of every ticket in order. Returns
    /// the number of issues created.
    pub async fn run_creation_pass(&mut self) -> AppResult<usize> {
        let result = self.creation_pass().await;
        self.persist_on_failure(result)
    }

    /// Posts the queued comments of every ticket. Returns the number of
    /// comments posted.
    pub async fn run_comment_pass(&mut self) -> AppResult<usize> {
        let result = self.comment_pass().await;
        self.persist_on_failure(result)
    }

    pub fn persist(&self) -> AppResult<()> {
        let state = MigrationState {
            tickets: self.tickets.clone(),
            crossref: self.crossref.entries().clone(),
        };
        self.state_file.save(&state)?;
        info!(path = %self.state_file.path().display(), "saved migration state");
        Ok(())
    }

    async fn creation_pass(&mut self) -> AppResult<usize> {
        let mut created = 0;
        for ticket in &mut self.tickets {
            self.remote.interrupt().check()?;
            info!(ticket = ticket.id, title = ticket.display_title(), "processing ticket");

            let mut cx = UploadContext {
                remote: &self.remote,
                rewriter: &self.rewriter,
                crossref: &mut self.crossref,
            };
            let pending = ticket.description.is_some();
            ticket.upload_ticket(&mut cx).await?;
            if pending {
                created += 1;
            }
            ticket.upload_tags(&mut cx).await?;
            ticket.upload_status(&mut cx).await?;
        }
        Ok(created)
    }

    async fn comment_pass(&mut self) -> AppResult<usize> {
        let mut posted = 0;
        for ticket in &mut self.tickets {
            self.remote.interrupt().check()?;
            if ticket.comments.is_empty() {
                continue;
            }
            info!(ticket = ticket.id, title = ticket.display_title(), "processing comments");

            let mut cx = UploadContext {
                remote: &self.remote,
                rewriter: &self.rewriter,
                crossref: &mut self.crossref,
            };
            posted += ticket.upload_comments(&mut cx).await?;
        }
        Ok(posted)
    }

    fn persist_on_failure<T>(&self, result: AppResult<T>) -> AppResult<T> {
        if let Err(err) = &result {
            error!(error = %err, "migration aborted, saving state");
            if let Err(save_err) = self.persist() {
                error!(error = %save_err, "failed to save migration state");
            }
        }
        result
    }

    /// A ticket whose issue was created but whose state was never saved
    /// still has its description; the crossref log knows better.
    fn adopt_known_issues(&mut self) {
        for ticket in &mut self.tickets {
            if ticket.description.is_none() {
                continue;
            }
            if let Ok(issue) = self.crossref.resolve(ticket.id) {
                if ticket.adopt_remote_issue(issue) {
                    info!(ticket = ticket.id, issue, "already created upstream, skipping creation");
                }
            }
        }
    }
}

/// Tickets already in the crossref log were created by an earlier run that
/// never saved its state, so their title matching upstream is expected.
async fn build_working_set(
    remote: &RemoteGate,
    config: &AppConfig,
    crossref: &CrossrefTable,
) -> AppResult<Vec<Ticket>> {
    let mut existing = HashSet::new();
    for state in [IssueState::Open, IssueState::Closed] {
        let issues = remote.list_issues(state).await.inspect_err(|err| {
            error!(state = state.as_str(), error = %err, "failed to read existing issues");
        })?;
        for issue in issues {
            debug!(issue = issue.number, title = %issue.title, "existing remote issue");
            existing.insert(issue.title);
        }
    }
    info!(count = existing.len(), "fetched existing remote issue titles");

    let mut comments = match &config.comments_path {
        Some(path) => read_comments(open_source(path)?)?,
        None => HashMap::new(),
    };

    let mut tickets = Vec::new();
    for record in read_tickets(open_source(&config.tickets_path)?)? {
        let migrated_before = crossref.resolve(record.id).is_ok();
        if existing.contains(&record.summary) && !migrated_before {
            info!(ticket = record.id, title = %record.summary, "already exists upstream, skipping");
            continue;
        }
        let queued = comments.remove(&record.id).unwrap_or_default();
        tickets.push(record.into_ticket(queued));
    }
    info!(count = tickets.len(), "built working set from source records");
    Ok(tickets)
}

fn open_source(path: &Path) -> AppResult<File> {
    File::open(path).map_err(|err| AppError::Source(format!("{}: {err}", path.display())))
}
