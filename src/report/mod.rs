//! Report Aggregator
//!
//! At the end of a session the saved results are merged with the runner's
//! own phase reports into one outcome per test, then rendered: the results
//! table, the saved tracebacks, a per-test breakdown, short summary info and
//! a one-line count of outcomes.

mod aggregate;
mod outcome;
mod runner;
mod table;


pub use aggregate::{
    aggregate, phase_result, type_counts, Aggregate, FixtureSummary, PhaseSummary, TestSummary,
};
pub use outcome::{test_outcome, Outcome, PhaseResult};
pub use runner::{ReportKind, RunnerReport, SessionNotice};
pub use table::{heading, render, result_row, Row, DEFAULT_COLUMN_ORDER, EXTRA_LEGEND};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::VerifyConfig;
use crate::logging::StepLogger;
use crate::models::{display_opt, TestId, Traceback, TypeCode, VerificationResult};
use crate::session::Session;

/// Everything known at the end of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    /// Wall clock time since the session started
    pub session_duration_secs: f64,
    /// Sum of every phase duration the runner reported
    pub phase_duration_secs: f64,
    pub run_order: Vec<TestId>,
    pub test_fixtures: BTreeMap<String, Vec<String>>,
    pub results: Vec<VerificationResult>,
    pub tracebacks: Vec<Traceback>,
    pub tests: Vec<TestSummary>,
    pub counts: BTreeMap<Outcome, usize>,
    pub short_summary: Vec<String>,
}

impl SessionReport {
    /// Outcome counts in hierarchy order, e.g. `3 passed, 1 failure`
    pub fn summary_line(&self) -> String {
        if self.counts.is_empty() {
            return "no tests ran".to_string();
        }
        self.counts
            .iter()
            .map(|(outcome, count)| format!("{count} {outcome}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The summary line with each part coloured by severity
    pub fn colored_summary_line(&self) -> String {
        if self.counts.is_empty() {
            return "no tests ran".yellow().to_string();
        }
        self.counts
            .iter()
            .map(|(outcome, count)| {
                let part = format!("{count} {outcome}");
                match outcome {
                    Outcome::Passed => part.green().to_string(),
                    o if o.is_problem() => part.red().bold().to_string(),
                    _ => part.yellow().to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Number of tests with `outcome`
    pub fn count(&self, outcome: Outcome) -> usize {
        self.counts.get(&outcome).copied().unwrap_or(0)
    }

    pub fn test(&self, name: &str) -> Option<&TestSummary> {
        self.tests.iter().find(|t| t.test.name == name)
    }

    /// Results table lines
    pub fn table_lines(&self, column_order: &[&str], extra: bool) -> Vec<String> {
        let rows: Vec<Row> = self
            .results
            .iter()
            .enumerate()
            .map(|(index, result)| result_row(index, result, &self.tracebacks, extra))
            .collect();
        tracing::debug!(
            target: "soft_verify::print_saved",
            results = rows.len(),
            tracebacks = self.tracebacks.len(),
            extra,
            "printing saved results"
        );
        render(&rows, column_order)
    }

    /// Frame lines of every saved traceback, each closed by `<kind>: <message>`
    pub fn traceback_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for traceback in &self.tracebacks {
            lines.extend(traceback.formatted());
            let message = self
                .results
                .get(traceback.result)
                .map(|r| r.message.as_str())
                .unwrap_or_else(|| traceback.raw.message());
            lines.push(format!("{}: {message}", traceback.exception_kind));
        }
        lines
    }

    /// Per-test breakdown: one line per fixture, one per phase and one for
    /// the test result.
    pub fn breakdown_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for summary in &self.tests {
            let name = summary.test.name.as_str();
            for phase in summary.phases() {
                for fixture in &phase.fixtures {
                    let (scope, fixture_name) = match (&fixture.scope, &fixture.fixture_name) {
                        (None, None) => ("-".to_string(), "no fixture".to_string()),
                        (scope, fixture_name) => (display_opt(scope), display_opt(fixture_name)),
                    };
                    lines.push(format!(
                        "{:<20}{:<10}{:<10}{:<25}{:<40}{:?}",
                        name,
                        phase.phase.to_string(),
                        scope,
                        fixture_name,
                        format_counts(&fixture.counts),
                        fixture.results
                    ));
                }
                if phase.fixtures.is_empty() && !phase.results.is_empty() {
                    lines.push(format!(
                        "{:<20}{:<10}{:<10}{:<25}{:<40}{:?}",
                        name,
                        phase.phase.to_string(),
                        "overall",
                        "saved results",
                        format_counts(&phase.counts),
                        phase.results
                    ));
                }
                lines.push(format!(
                    "{:<20}{:<10}{:<10}{:<25}{}",
                    name,
                    phase.phase.to_string(),
                    "overall",
                    "-",
                    phase.label()
                ));
            }
            lines.push(format!(
                "{:<20}{:<10}{:<10}{:<25}{}",
                name, "overall", "-", "-", summary.outcome
            ));
        }
        lines
    }

    /// Write the report through the step logger
    pub fn emit(&self, logger: &dyn StepLogger, config: &VerifyConfig) {
        let extra = config.debug.summary;

        if !self.results.is_empty() {
            logger.high_level_step("Saved results");
            for line in self.table_lines(DEFAULT_COLUMN_ORDER, extra) {
                logger.detail_step(&line);
            }
            if extra {
                logger.detail_step(EXTRA_LEGEND);
            }
        }

        if !self.tracebacks.is_empty() {
            logger.high_level_step("Saved tracebacks");
            for line in self.traceback_lines() {
                logger.detail_step(&line);
            }
        }

        if !self.tests.is_empty() {
            logger.high_level_step("Test results");
            for line in self.breakdown_lines() {
                logger.detail_step(&line);
            }
        }

        if !self.short_summary.is_empty() {
            logger.high_level_step("Short test summary info");
            for line in &self.short_summary {
                logger.detail_step(line);
            }
        }

        tracing::debug!(
            target: "soft_verify::summary",
            session = self.session_duration_secs,
            phases = self.phase_duration_secs,
            "session duration (s)"
        );
        for (test, fixtures) in &self.test_fixtures {
            tracing::debug!(
                target: "soft_verify::summary",
                "{test} depends on setup fixtures: {}",
                fixtures.join(", ")
            );
        }

        logger.high_level_step(&self.colored_summary_line());
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize session report")
    }
}

/// `{P: 2, F: 1}` style rendering of type counts
pub fn format_counts(counts: &BTreeMap<TypeCode, usize>) -> String {
    let parts: Vec<String> = counts
        .iter()
        .map(|(code, count)| format!("{code}: {count}"))
        .collect();
    format!("{{{}}}", parts.join(", "))
}

fn short_summary(reports: &[RunnerReport], notices: &[SessionNotice]) -> Vec<String> {
    let mut lines = Vec::new();
    for (label, kind) in [
        ("XFAIL", ReportKind::XFailed),
        ("XPASS", ReportKind::XPassed),
        ("SKIPPED", ReportKind::Skipped),
    ] {
        for report in reports.iter().filter(|r| r.kind == kind) {
            let line = match &report.reason {
                Some(reason) => format!("{label} {} {reason}", report.test),
                None => format!("{label} {}", report.test),
            };
            lines.push(line);
        }
    }
    lines.extend(notices.iter().map(SessionNotice::summary_line));
    lines
}

impl Session {
    /// Build the session report without side effects
    pub fn report(&self) -> SessionReport {
        let state = self.lock();
        let rolled_up = aggregate(&state.store, &state.status, &state.reports, &state.notices);
        let finished_at = Local::now();
        let session_duration = (finished_at - state.started_at)
            .to_std()
            .unwrap_or_default();

        SessionReport {
            started_at: state.started_at,
            finished_at,
            session_duration_secs: session_duration.as_secs_f64(),
            phase_duration_secs: rolled_up.phase_duration.as_secs_f64(),
            run_order: state.status.run_order.clone(),
            test_fixtures: state.status.test_fixtures.clone(),
            results: state.store.results().to_vec(),
            tracebacks: state.store.tracebacks().to_vec(),
            tests: rolled_up.tests,
            counts: rolled_up.counts,
            short_summary: short_summary(&state.reports, &state.notices),
        }
    }

    /// End the session: log the report and mark every result printed.
    pub fn finish(&self) -> SessionReport {
        let report = self.report();
        report.emit(self.logger(), self.config());

        let mut state = self.lock();
        for index in 0..state.store.len() {
            state.store.mark_printed(index);
        }
        report
    }

    /// Write the session report as JSON
    pub fn export_json(&self, path: &Path) -> Result<()> {
        let json = self.report().to_json()?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))
    }
}
