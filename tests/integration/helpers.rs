//! Shared helpers for the integration tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use soft_verify::{MemoryStepLogger, Session, VerifyConfig};

/// Session whose step lines are kept in memory instead of logged
pub fn quiet_session(config: VerifyConfig) -> (Session, Arc<MemoryStepLogger>) {
    let logger = Arc::new(MemoryStepLogger::new());
    (Session::with_logger(config, logger.clone()), logger)
}

/// Default config with the given `[general]` options set
pub fn config_with(options: &[(&str, &str)]) -> VerifyConfig {
    let mut config = VerifyConfig::default();
    for (name, value) in options {
        config
            .set_option(name, value)
            .expect("Failed to set test option");
    }
    config
}

/// Shared flag set from inside a test body
#[derive(Clone, Default)]
pub struct Flag(Arc<AtomicBool>);

impl Flag {
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
