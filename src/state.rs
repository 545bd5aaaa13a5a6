use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::ticket::Ticket;
use crate::error::{AppError, AppResult};

/// Everything needed to pick a migration back up: the working set in
/// ingestion order plus the crossreferences known when it was written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationState {
    pub tickets: Vec<Ticket>,
    #[serde(default)]
    pub crossref: BTreeMap<u64, u64>,
}

pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> AppResult<Option<MigrationState>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str::<MigrationState>(&contents)
                .map(Some)
                .map_err(|err| {
                    AppError::State(format!("invalid state file {}: {err}", self.path.display()))
                }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(AppError::Io(err)),
        }
    }

    /// Writes to a sibling temp file first and renames it over the old
    /// snapshot, so readers only ever see a complete state.
    pub fn save(&self, state: &MigrationState) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(state)
            .map_err(|err| AppError::State(format!("failed to serialize state: {err}")))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
