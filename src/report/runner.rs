//! Reports produced by the test runner itself, independent of verification
//! results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::models::{Phase, TestId};

/// Native outcome of one phase as the runner saw it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Passed,
    Failed,
    Error,
    Skipped,
    XFailed,
    XPassed,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportKind::Passed => write!(f, "passed"),
            ReportKind::Failed => write!(f, "failed"),
            ReportKind::Error => write!(f, "error"),
            ReportKind::Skipped => write!(f, "skipped"),
            ReportKind::XFailed => write!(f, "xfailed"),
            ReportKind::XPassed => write!(f, "xpassed"),
        }
    }
}

/// The runner's report for one phase of one test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerReport {
    pub test: TestId,
    pub phase: Phase,
    pub kind: ReportKind,
    pub duration: Duration,
    /// Skip or expected-failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RunnerReport {
    pub fn new(test: TestId, phase: Phase, kind: ReportKind, duration: Duration) -> Self {
        Self {
            test,
            phase,
            kind,
            duration,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Session-level reports that do not belong to a test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SessionNotice {
    CollectionError { node: String, message: String },
    FrameworkWarning { node: String, message: String },
}

impl SessionNotice {
    /// Line shown in the short summary info section
    pub fn summary_line(&self) -> String {
        match self {
            SessionNotice::CollectionError { node, message } => {
                format!("COLLECTION ERROR {node} {message}")
            }
            SessionNotice::FrameworkWarning { node, message } => {
                format!("FRAMEWORK-WARNING {node} {message}")
            }
        }
    }
}
