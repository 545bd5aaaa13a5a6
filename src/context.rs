use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::IssueTrackerService;
use crate::workflow::interrupt::InterruptFlag;

#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub issue_tracker: Arc<dyn IssueTrackerService>,
    pub interrupt: InterruptFlag,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        issue_tracker: Arc<dyn IssueTrackerService>,
        interrupt: InterruptFlag,
    ) -> Self {
        Self {
            config,
            issue_tracker,
            interrupt,
        }
    }
}
