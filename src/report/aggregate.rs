//! Per-test roll-up of saved results and runner reports

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use super::outcome::{test_outcome, Outcome, PhaseResult};
use super::runner::{ReportKind, RunnerReport, SessionNotice};
use crate::models::{Phase, Scope, TestId, TypeCode, VerificationResult};
use crate::session::SessionStatus;
use crate::store::{ran_during, ResultStore};

/// Scope order in which setup results are collated
const SETUP_SCOPES: [Scope; 4] = [Scope::Session, Scope::Module, Scope::Class, Scope::Function];

/// Results of one fixture in one phase. Results recorded outside any
/// fixture scope form a group with neither a scope nor a fixture name.
#[derive(Debug, Clone, Serialize)]
pub struct FixtureSummary {
    pub scope: Option<Scope>,
    pub fixture_name: Option<String>,
    /// Indices into the result store
    pub results: Vec<usize>,
    pub counts: BTreeMap<TypeCode, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseSummary {
    pub phase: Phase,
    /// Per-fixture breakdown; empty for the call phase
    pub fixtures: Vec<FixtureSummary>,
    pub results: Vec<usize>,
    pub counts: BTreeMap<TypeCode, usize>,
    pub report: Option<RunnerReport>,
    pub result: PhaseResult,
}

impl PhaseSummary {
    fn new(
        phase: Phase,
        fixtures: Vec<FixtureSummary>,
        results: Vec<usize>,
        store: &ResultStore,
        report: Option<RunnerReport>,
    ) -> Self {
        let counts = type_counts(results.iter().filter_map(|i| store.result(*i)));
        let result = phase_result(report.as_ref(), &counts);
        Self {
            phase,
            fixtures,
            results,
            counts,
            report,
            result,
        }
    }

    pub fn label(&self) -> String {
        self.result.label(self.phase)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TestSummary {
    pub test: TestId,
    pub fixtures: Vec<String>,
    pub setup: PhaseSummary,
    pub call: PhaseSummary,
    pub teardown: PhaseSummary,
    pub outcome: Outcome,
}

impl TestSummary {
    pub fn phases(&self) -> [&PhaseSummary; 3] {
        [&self.setup, &self.call, &self.teardown]
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Aggregate {
    pub tests: Vec<TestSummary>,
    /// Number of tests and session notices per outcome, in hierarchy order
    pub counts: BTreeMap<Outcome, usize>,
    /// Sum of every reported phase duration
    pub phase_duration: Duration,
}

/// Count results by type code
pub fn type_counts<'a, I>(results: I) -> BTreeMap<TypeCode, usize>
where
    I: IntoIterator<Item = &'a VerificationResult>,
{
    let mut counts = BTreeMap::new();
    for result in results {
        *counts.entry(result.type_code).or_insert(0) += 1;
    }
    counts
}

/// Resolve one phase from the runner's report and the saved result counts.
///
/// Priority: skipped, expected failure, unexpected pass, any `F`/`A`/`O`,
/// any `W`, then passed. A phase the runner never reported was not run.
pub fn phase_result(
    report: Option<&RunnerReport>,
    counts: &BTreeMap<TypeCode, usize>,
) -> PhaseResult {
    let Some(report) = report else {
        return PhaseResult::NotRun;
    };

    match report.kind {
        ReportKind::Skipped => PhaseResult::Skipped,
        ReportKind::XFailed => PhaseResult::ExpectedFailure,
        ReportKind::XPassed => PhaseResult::UnexpectedPass,
        _ if counts.keys().any(TypeCode::is_failure) => PhaseResult::Failure,
        _ if counts.contains_key(&TypeCode::Warning) => PhaseResult::Warning,
        _ => PhaseResult::Passed,
    }
}

/// Roll up every test in run order.
pub fn aggregate(
    store: &ResultStore,
    status: &SessionStatus,
    reports: &[RunnerReport],
    notices: &[SessionNotice],
) -> Aggregate {
    let mut aggregate = Aggregate {
        phase_duration: reports.iter().map(|r| r.duration).sum(),
        ..Aggregate::default()
    };

    for test in &status.run_order {
        let summary = summarize_test(store, status, reports, test);
        tracing::debug!(
            target: "soft_verify::summary",
            test = %test,
            setup = %summary.setup.label(),
            call = %summary.call.label(),
            teardown = %summary.teardown.label(),
            outcome = %summary.outcome,
            "test result"
        );
        *aggregate.counts.entry(summary.outcome).or_insert(0) += 1;
        aggregate.tests.push(summary);
    }

    for notice in notices {
        let outcome = match notice {
            SessionNotice::CollectionError { .. } => Outcome::CollectionError,
            SessionNotice::FrameworkWarning { .. } => Outcome::FrameworkWarning,
        };
        *aggregate.counts.entry(outcome).or_insert(0) += 1;
    }

    aggregate
}

fn summarize_test(
    store: &ResultStore,
    status: &SessionStatus,
    reports: &[RunnerReport],
    test: &TestId,
) -> TestSummary {
    let report_for = |phase: Phase| {
        reports
            .iter()
            .rev()
            .find(|r| r.test == *test && r.phase == phase)
            .cloned()
    };

    let fixture_phase = |phase: Phase| {
        let scopes: Vec<Scope> = match phase {
            Phase::Teardown => SETUP_SCOPES.iter().rev().copied().collect(),
            _ => SETUP_SCOPES.to_vec(),
        };
        let mut fixtures: Vec<FixtureSummary> = scopes
            .into_iter()
            .flat_map(|scope| by_fixture(store, scope, test, phase))
            .collect();
        let unscoped: Vec<usize> = store
            .unscoped_phase(test, phase)
            .into_iter()
            .map(|(index, _)| index)
            .collect();
        if !unscoped.is_empty() {
            fixtures.push(FixtureSummary {
                scope: None,
                fixture_name: None,
                counts: type_counts(unscoped.iter().filter_map(|i| store.result(*i))),
                results: unscoped,
            });
        }
        let mut results: Vec<usize> = fixtures
            .iter()
            .flat_map(|f| f.results.iter().copied())
            .collect();
        results.sort_unstable();
        PhaseSummary::new(phase, fixtures, results, store, report_for(phase))
    };

    let setup = fixture_phase(Phase::Setup);
    let teardown = fixture_phase(Phase::Teardown);

    let call_results: Vec<usize> = store
        .by_phase(Phase::Call)
        .into_iter()
        .filter(|(_, r)| ran_during(r, test))
        .map(|(index, _)| index)
        .collect();
    let call = PhaseSummary::new(
        Phase::Call,
        Vec::new(),
        call_results,
        store,
        report_for(Phase::Call),
    );

    let outcome = test_outcome(setup.result, call.result, teardown.result);
    TestSummary {
        test: test.clone(),
        fixtures: status.test_fixtures.get(&test.name).cloned().unwrap_or_default(),
        setup,
        call,
        teardown,
        outcome,
    }
}

/// Results of one scope and phase grouped by fixture, in first-seen order
fn by_fixture(
    store: &ResultStore,
    scope: Scope,
    test: &TestId,
    phase: Phase,
) -> Vec<FixtureSummary> {
    let mut groups: Vec<FixtureSummary> = Vec::new();
    for (index, result) in store.by_scope_phase(scope, test, phase) {
        match groups.iter_mut().find(|g| g.fixture_name == result.fixture_name) {
            Some(group) => group.results.push(index),
            None => groups.push(FixtureSummary {
                scope: Some(scope),
                fixture_name: result.fixture_name.clone(),
                results: vec![index],
                counts: BTreeMap::new(),
            }),
        }
    }

    for group in &mut groups {
        group.counts = type_counts(group.results.iter().filter_map(|i| store.result(*i)));
    }
    groups
}
