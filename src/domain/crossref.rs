use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

/// Old Trac ticket id to new remote issue number.
///
/// When opened on a log file every new pair is appended to it before
/// `record` returns, so an issue created right before a crash is still known
/// on the next run.
#[derive(Debug, Default)]
pub struct CrossrefTable {
    forward: BTreeMap<u64, u64>,
    reverse: BTreeMap<u64, u64>,
    log: Option<CrossrefLog>,
}

#[derive(Debug)]
struct CrossrefLog {
    path: PathBuf,
    file: File,
}

impl CrossrefTable {
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads every `old,new` line from `path` and keeps the file open for
    /// appending. A missing file starts an empty table.
    pub fn open(path: &Path) -> AppResult<Self> {
        let mut table = Self::default();
        match fs::read_to_string(path) {
            Ok(contents) => {
                for (index, line) in contents.lines().enumerate() {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let (old, new) = parse_line(line).ok_or_else(|| {
                        AppError::State(format!(
                            "{}:{}: malformed crossreference line \"{line}\"",
                            path.display(),
                            index + 1
                        ))
                    })?;
                    table.insert(old, new)?;
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(AppError::Io(err)),
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        debug!(path = %path.display(), entries = table.len(), "opened crossreference log");
        table.log = Some(CrossrefLog {
            path: path.to_path_buf(),
            file,
        });
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn resolve(&self, old: u64) -> AppResult<u64> {
        self.forward
            .get(&old)
            .copied()
            .ok_or(AppError::CrossrefMiss(old))
    }

    pub fn entries(&self) -> &BTreeMap<u64, u64> {
        &self.forward
    }

    /// Records `old -> new` and appends it to the log. Re-recording the same
    /// pair is a no-op; mapping either side to something else is an error.
    pub fn record(&mut self, old: u64, new: u64) -> AppResult<()> {
        if !self.insert(old, new)? {
            return Ok(());
        }
        if let Some(log) = self.log.as_mut() {
            writeln!(log.file, "{old},{new}")?;
            log.file.flush()?;
            debug!(path = %log.path.display(), old, new, "appended crossreference");
        }
        Ok(())
    }

    /// Folds in pairs from a state snapshot. The log is authoritative, so a
    /// snapshot pair that disagrees with it is dropped with a warning.
    pub fn merge(&mut self, snapshot: &BTreeMap<u64, u64>) -> AppResult<()> {
        for (&old, &new) in snapshot {
            match self.record(old, new) {
                Ok(()) => {}
                Err(AppError::CrossrefConflict(reason)) => {
                    warn!(old, new, %reason, "ignoring snapshot crossreference");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn insert(&mut self, old: u64, new: u64) -> AppResult<bool> {
        if let Some(&existing) = self.forward.get(&old) {
            if existing == new {
                return Ok(false);
            }
            return Err(AppError::CrossrefConflict(format!(
                "ticket #{old} already maps to issue #{existing}, not #{new}"
            )));
        }
        if let Some(&owner) = self.reverse.get(&new) {
            return Err(AppError::CrossrefConflict(format!(
                "issue #{new} already belongs to ticket #{owner}, not #{old}"
            )));
        }
        self.forward.insert(old, new);
        self.reverse.insert(new, old);
        Ok(true)
    }
}

fn parse_line(line: &str) -> Option<(u64, u64)> {
    let (old, new) = line.split_once(',')?;
    Some((old.trim().parse().ok()?, new.trim().parse().ok()?))
}
