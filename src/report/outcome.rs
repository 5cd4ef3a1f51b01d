//! Outcome hierarchy used to resolve phase and test results

use serde::Serialize;
use std::fmt;

use crate::models::Phase;

/// Consolidated outcome of a test or a session-level report.
///
/// Declaration order is the priority order: the overall result of a test
/// is the first of these found among its phase results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Outcome {
    #[serde(rename = "setup skipped")]
    SetupSkipped,
    #[serde(rename = "skipped")]
    Skipped,
    #[serde(rename = "teardown skipped")]
    TeardownSkipped,
    #[serde(rename = "setup error")]
    SetupError,
    #[serde(rename = "failure")]
    Failure,
    #[serde(rename = "teardown error")]
    TeardownError,
    #[serde(rename = "warning")]
    Warning,
    #[serde(rename = "setup warning")]
    SetupWarning,
    #[serde(rename = "teardown warning")]
    TeardownWarning,
    #[serde(rename = "expected failure")]
    ExpectedFailure,
    #[serde(rename = "unexpected pass")]
    UnexpectedPass,
    #[serde(rename = "passed")]
    Passed,
    #[serde(rename = "framework warning")]
    FrameworkWarning,
    #[serde(rename = "collection error")]
    CollectionError,
    #[serde(rename = "unknown result")]
    Unknown,
}

/// Outcomes that decide a test result, in priority order
const DECISIVE: usize = 11;

impl Outcome {
    /// The full hierarchy in priority order
    pub fn all() -> &'static [Outcome] {
        &[
            Outcome::SetupSkipped,
            Outcome::Skipped,
            Outcome::TeardownSkipped,
            Outcome::SetupError,
            Outcome::Failure,
            Outcome::TeardownError,
            Outcome::Warning,
            Outcome::SetupWarning,
            Outcome::TeardownWarning,
            Outcome::ExpectedFailure,
            Outcome::UnexpectedPass,
            Outcome::Passed,
            Outcome::FrameworkWarning,
            Outcome::CollectionError,
            Outcome::Unknown,
        ]
    }

    /// Whether the outcome counts against the run
    pub fn is_problem(&self) -> bool {
        matches!(
            self,
            Outcome::SetupError
                | Outcome::Failure
                | Outcome::TeardownError
                | Outcome::CollectionError
                | Outcome::UnexpectedPass
                | Outcome::Unknown
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Outcome::SetupSkipped => "setup skipped",
            Outcome::Skipped => "skipped",
            Outcome::TeardownSkipped => "teardown skipped",
            Outcome::SetupError => "setup error",
            Outcome::Failure => "failure",
            Outcome::TeardownError => "teardown error",
            Outcome::Warning => "warning",
            Outcome::SetupWarning => "setup warning",
            Outcome::TeardownWarning => "teardown warning",
            Outcome::ExpectedFailure => "expected failure",
            Outcome::UnexpectedPass => "unexpected pass",
            Outcome::Passed => "passed",
            Outcome::FrameworkWarning => "framework warning",
            Outcome::CollectionError => "collection error",
            Outcome::Unknown => "unknown result",
        };
        write!(f, "{label}")
    }
}

/// Result of one phase of one test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseResult {
    /// The runner never reported the phase
    NotRun,
    Skipped,
    ExpectedFailure,
    UnexpectedPass,
    Failure,
    Warning,
    Passed,
}

impl PhaseResult {
    /// Label qualified with the phase; setup and teardown failures read as
    /// errors.
    pub fn label(&self, phase: Phase) -> String {
        let base = match self {
            PhaseResult::NotRun => return "not run (no report)".to_string(),
            PhaseResult::Skipped => "skipped",
            PhaseResult::ExpectedFailure => "expected failure",
            PhaseResult::UnexpectedPass => "unexpected pass",
            PhaseResult::Failure if phase == Phase::Call => "failure",
            PhaseResult::Failure => "error",
            PhaseResult::Warning => "warning",
            PhaseResult::Passed => "passed",
        };
        match phase {
            Phase::Call => base.to_string(),
            Phase::Setup | Phase::Teardown => format!("{phase} {base}"),
        }
    }

    /// The hierarchy entry this phase result stands for, if any
    pub fn outcome(&self, phase: Phase) -> Option<Outcome> {
        let outcome = match (phase, self) {
            (_, PhaseResult::NotRun) => return None,
            (Phase::Setup, PhaseResult::Skipped) => Outcome::SetupSkipped,
            (Phase::Setup, PhaseResult::Failure) => Outcome::SetupError,
            (Phase::Setup, PhaseResult::Warning) => Outcome::SetupWarning,
            (Phase::Teardown, PhaseResult::Skipped) => Outcome::TeardownSkipped,
            (Phase::Teardown, PhaseResult::Failure) => Outcome::TeardownError,
            (Phase::Teardown, PhaseResult::Warning) => Outcome::TeardownWarning,
            (Phase::Call, PhaseResult::Skipped) => Outcome::Skipped,
            (Phase::Call, PhaseResult::Failure) => Outcome::Failure,
            (Phase::Call, PhaseResult::Warning) => Outcome::Warning,
            (Phase::Call, PhaseResult::ExpectedFailure) => Outcome::ExpectedFailure,
            (Phase::Call, PhaseResult::UnexpectedPass) => Outcome::UnexpectedPass,
            (Phase::Call, PhaseResult::Passed) => Outcome::Passed,
            (_, _) => return None,
        };
        Some(outcome)
    }
}

/// Overall test result from its three phase results.
///
/// The first decisive hierarchy entry present in any phase wins. A test
/// whose phases all passed has passed; anything else is unknown.
pub fn test_outcome(setup: PhaseResult, call: PhaseResult, teardown: PhaseResult) -> Outcome {
    let present = [
        setup.outcome(Phase::Setup),
        call.outcome(Phase::Call),
        teardown.outcome(Phase::Teardown),
    ];

    if let Some(outcome) = Outcome::all()[..DECISIVE]
        .iter()
        .find(|outcome| present.contains(&Some(**outcome)))
    {
        return *outcome;
    }

    if [setup, call, teardown]
        .iter()
        .all(|result| *result == PhaseResult::Passed)
    {
        Outcome::Passed
    } else {
        Outcome::Unknown
    }
}
