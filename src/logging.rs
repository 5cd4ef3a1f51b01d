//! Step logging and diagnostics setup.
//!
//! The host's step logger is reached through [`StepLogger`]: the engine asks
//! it for the current high-level caption, emits one line per verification
//! and writes the session report through it. Diagnostics of the engine
//! itself go to `tracing` targets named after the debug flags.

use std::sync::{Mutex, PoisonError};

use tracing_subscriber::EnvFilter;

use crate::config::VerifyConfig;

/// Level of a high-level step caption
pub const HIGH_LEVEL: u8 = 1;
/// Level of a detail step
pub const DETAIL_LEVEL: u8 = 2;

pub trait StepLogger: Send + Sync {
    /// Caption of the last high-level step
    fn current_step(&self) -> Option<String>;

    /// Level of the last line logged
    fn current_level(&self) -> u8;

    fn step(&self, message: &str, level: u8);

    fn high_level_step(&self, message: &str);

    fn detail_step(&self, message: &str) {
        self.step(message, DETAIL_LEVEL);
    }
}

#[derive(Debug)]
struct StepState {
    caption: Option<String>,
    level: u8,
}

impl Default for StepState {
    fn default() -> Self {
        Self {
            caption: None,
            level: HIGH_LEVEL,
        }
    }
}

/// Default logger: remembers captions and forwards lines to `tracing`
#[derive(Debug, Default)]
pub struct TracingStepLogger {
    state: Mutex<StepState>,
}

impl TracingStepLogger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StepLogger for TracingStepLogger {
    fn current_step(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .caption
            .clone()
    }

    fn current_level(&self) -> u8 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).level
    }

    fn step(&self, message: &str, level: u8) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).level = level;
        let indent = "  ".repeat(usize::from(level.saturating_sub(1)));
        tracing::info!(target: "soft_verify::steps", level, "{indent}{message}");
    }

    fn high_level_step(&self, message: &str) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.caption = Some(message.to_string());
            state.level = HIGH_LEVEL;
        }
        tracing::info!(target: "soft_verify::steps", level = HIGH_LEVEL, "{message}");
    }
}

/// Logger that keeps every line in memory, for hosts that render the report
/// themselves and for tests.
#[derive(Debug, Default)]
pub struct MemoryStepLogger {
    state: Mutex<StepState>,
    lines: Mutex<Vec<(u8, String)>>,
}

impl MemoryStepLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(level, line)` logged so far
    pub fn lines(&self) -> Vec<(u8, String)> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Text of every line logged so far
    pub fn messages(&self) -> Vec<String> {
        self.lines().into_iter().map(|(_, line)| line).collect()
    }

    fn push(&self, level: u8, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }
}

impl StepLogger for MemoryStepLogger {
    fn current_step(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .caption
            .clone()
    }

    fn current_level(&self) -> u8 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).level
    }

    fn step(&self, message: &str, level: u8) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).level = level;
        self.push(level, message);
    }

    fn high_level_step(&self, message: &str) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.caption = Some(message.to_string());
            state.level = HIGH_LEVEL;
        }
        self.push(HIGH_LEVEL, message);
    }
}

/// Tracing filter directives for the enabled debug flags.
///
/// Step lines are always shown at `info`; each enabled debug flag turns on
/// `debug` output for its `soft_verify::<flag>` target.
pub fn filter_directives(config: &VerifyConfig) -> String {
    let mut directives = vec!["soft_verify=info".to_string()];
    for (flag, enabled) in config.debug.entries() {
        if enabled {
            directives.push(format!("soft_verify::{}=debug", flag.replace('-', "_")));
        }
    }
    directives.join(",")
}

/// Install a `tracing` subscriber; `RUST_LOG` wins over the config flags.
///
/// Calling this when a subscriber is already installed is not an error.
pub fn init_logging(config: &VerifyConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
