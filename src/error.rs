use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A single remote call failed. Callers in `workflow::remote` log it and
    /// carry on with an empty result.
    #[error("request to {endpoint} failed: {reason}")]
    TransientRequest {
        endpoint: String,
        payload: String,
        reason: String,
    },
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("unknown ticket status \"{0}\"")]
    UnknownStatus(String),
    #[error("no crossreference known for ticket #{0}")]
    CrossrefMiss(u64),
    #[error("crossreference conflict: {0}")]
    CrossrefConflict(String),
    #[error("source records: {0}")]
    Source(String),
    #[error("migration state: {0}")]
    State(String),
    #[error("interrupted")]
    Interrupted,
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
