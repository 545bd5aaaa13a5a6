use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{error, warn};

use crate::error::{AppError, AppResult};

/// Set once Ctrl-C arrives. The migration checks it between steps and
/// before every remote call, so an in-flight request always completes.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    raised: Arc<AtomicBool>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a flag raised by the first Ctrl-C. A second Ctrl-C exits
    /// the process at once. Must be called inside a tokio runtime.
    pub fn install() -> Self {
        let flag = Self::new();
        let signal = flag.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            warn!("interrupt received, stopping after the current request (Ctrl-C again to quit now)");
            signal.raise();
            if tokio::signal::ctrl_c().await.is_ok() {
                error!("second interrupt received, exiting without saving state");
                std::process::exit(130);
            }
        });
        flag
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> AppResult<()> {
        if self.is_raised() {
            Err(AppError::Interrupted)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let flag = InterruptFlag::new();
        let other = flag.clone();
        assert!(flag.check().is_ok());
        other.raise();
        assert!(matches!(flag.check(), Err(AppError::Interrupted)));
    }
}
