//! Test Harness
//!
//! A minimal runner that drives fixtures and test bodies through the
//! session's phase hooks: setup, call and teardown, each timed and
//! reported. Panics and errors escaping a phase are captured and handed to
//! the hooks like any other phase error.
//!
//! ```no_run
//! use soft_verify::harness::{run_suite, Fixture, TestCase};
//! use soft_verify::models::{Scope, TestId};
//! use soft_verify::Session;
//!
//! let session = Session::default();
//! let case = TestCase::new(TestId::new("test_reading").in_module("sensors"), |s| {
//!     s.check(2 < 3, "reading in range").no_raise().run()?;
//!     Ok(())
//! })
//! .fixture(Fixture::new("probe", Scope::Function).setup(|s| {
//!     s.verify(true, "probe connected")?;
//!     Ok(())
//! }));
//!
//! let report = run_suite(&session, vec![case]);
//! println!("{}", report.summary_line());
//! ```

mod panic;

#[cfg(test)]
mod tests;

pub use panic::{install_capture_hook, take_last_panic, PanicSite};

use std::time::Instant;

use crate::error::{CapturedError, VerifyError};
use crate::models::{FixtureDef, Phase, Scope, TestId};
use crate::report::{ReportKind, RunnerReport, SessionReport};
use crate::session::Session;

/// Fixture or test body run by the harness
pub type PhaseFn = Box<dyn FnOnce(&Session) -> anyhow::Result<()> + Send>;

/// A fixture with optional setup and teardown callbacks
pub struct Fixture {
    def: FixtureDef,
    setup: Option<PhaseFn>,
    teardown: Option<PhaseFn>,
}

impl Fixture {
    pub fn new(name: impl Into<String>, scope: Scope) -> Self {
        Self {
            def: FixtureDef::new(name, scope),
            setup: None,
            teardown: None,
        }
    }

    pub fn setup<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&Session) -> anyhow::Result<()> + Send + 'static,
    {
        self.setup = Some(Box::new(setup));
        self
    }

    pub fn teardown<F>(mut self, teardown: F) -> Self
    where
        F: FnOnce(&Session) -> anyhow::Result<()> + Send + 'static,
    {
        self.teardown = Some(Box::new(teardown));
        self
    }

    pub fn def(&self) -> &FixtureDef {
        &self.def
    }
}

/// One test: its identity, fixtures in setup order and its body
pub struct TestCase {
    id: TestId,
    fixtures: Vec<Fixture>,
    body: PhaseFn,
    skip: Option<String>,
    xfail: Option<String>,
}

impl TestCase {
    pub fn new<F>(id: TestId, body: F) -> Self
    where
        F: FnOnce(&Session) -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            id,
            fixtures: Vec::new(),
            body: Box::new(body),
            skip: None,
            xfail: None,
        }
    }

    pub fn fixture(mut self, fixture: Fixture) -> Self {
        self.fixtures.push(fixture);
        self
    }

    /// Skip the test during setup
    pub fn skip(mut self, reason: impl Into<String>) -> Self {
        self.skip = Some(reason.into());
        self
    }

    /// Expect the body to fail
    pub fn xfail(mut self, reason: impl Into<String>) -> Self {
        self.xfail = Some(reason.into());
        self
    }

    pub fn id(&self) -> &TestId {
        &self.id
    }
}

/// What the harness reported for one test
#[derive(Debug, Clone)]
pub struct TestRun {
    pub test: TestId,
    pub reports: Vec<RunnerReport>,
    /// Errors the phase hooks delivered, in phase order
    pub errors: Vec<VerifyError>,
}

impl TestRun {
    fn new(test: TestId) -> Self {
        Self {
            test,
            reports: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Report kind of `phase`, `None` if the phase did not run
    pub fn kind(&self, phase: Phase) -> Option<ReportKind> {
        self.reports
            .iter()
            .find(|r| r.phase == phase)
            .map(|r| r.kind)
    }

    fn record(&mut self, session: &Session, report: RunnerReport) {
        session.record_runner_report(report.clone());
        self.reports.push(report);
    }
}

/// Run a test's setup, call and teardown phases through the session hooks.
pub fn run_test(session: &Session, case: TestCase) -> TestRun {
    let TestCase {
        id,
        fixtures,
        body,
        skip,
        xfail,
    } = case;
    let mut run = TestRun::new(id.clone());

    let names: Vec<&str> = fixtures.iter().map(|f| f.def.name.as_str()).collect();
    session.on_setup_start(id.clone(), &names);

    let started = Instant::now();
    let mut ready: Vec<Fixture> = Vec::new();
    let setup_passed = if let Some(reason) = skip {
        tracing::debug!(target: "soft_verify::phases", test = %id, %reason, "skipping test");
        let elapsed = started.elapsed();
        let report = RunnerReport::new(id.clone(), Phase::Setup, ReportKind::Skipped, elapsed)
            .with_reason(reason);
        run.record(session, report);
        false
    } else {
        let mut raised = None;
        for mut fixture in fixtures {
            let outcome = match fixture.setup.take() {
                Some(fixturefunc) => {
                    let _scope = session.set_scope(fixture.def.clone());
                    invoke(|| fixturefunc(session))
                }
                None => Ok(()),
            };
            match outcome {
                Ok(()) => ready.push(fixture),
                Err(err) => {
                    raised = Some(blame(err, &fixture.def));
                    break;
                }
            }
        }

        let delivered = session.on_setup_end(raised);
        let kind = match delivered {
            Ok(()) => ReportKind::Passed,
            Err(_) => ReportKind::Error,
        };
        run.errors.extend(delivered.err());
        run.record(session, RunnerReport::new(id.clone(), Phase::Setup, kind, started.elapsed()));
        kind == ReportKind::Passed
    };

    if setup_passed {
        session.on_call_start();
        let started = Instant::now();
        let testfunction = body;
        let raised = invoke(|| testfunction(session)).err();
        let delivered = session.on_call_end(raised);

        let kind = match (&xfail, delivered.is_err()) {
            (Some(_), true) => ReportKind::XFailed,
            (Some(_), false) => ReportKind::XPassed,
            (None, true) => ReportKind::Failed,
            (None, false) => ReportKind::Passed,
        };
        run.errors.extend(delivered.err());
        let mut report = RunnerReport::new(id.clone(), Phase::Call, kind, started.elapsed());
        if let Some(reason) = &xfail {
            report = report.with_reason(reason.clone());
        }
        run.record(session, report);
    }

    session.on_teardown_start();
    let started = Instant::now();
    let mut first_error: Option<VerifyError> = None;
    let mut keep = |err: VerifyError| {
        session.record_exception(&err);
        if first_error.is_none() {
            first_error = Some(err);
        }
    };

    for fixture in ready.into_iter().rev() {
        let Some(fixturefunc) = fixture.teardown else {
            continue;
        };
        let _scope = session.set_scope(fixture.def.clone());
        if let Err(err) = invoke(|| fixturefunc(session)) {
            keep(blame(err, &fixture.def));
        }
    }
    for finalizer in session.take_finalizers() {
        if let Err(err) = invoke(finalizer) {
            keep(err);
        }
    }

    let delivered = session.on_teardown_end(first_error);
    let kind = match delivered {
        Ok(()) => ReportKind::Passed,
        Err(_) => ReportKind::Error,
    };
    run.errors.extend(delivered.err());
    run.record(session, RunnerReport::new(id, Phase::Teardown, kind, started.elapsed()));

    run
}

/// Run every case in order, then end the session and return its report.
pub fn run_suite<I>(session: &Session, cases: I) -> SessionReport
where
    I: IntoIterator<Item = TestCase>,
{
    for case in cases {
        let run = run_test(session, case);
        tracing::debug!(
            target: "soft_verify::phases",
            test = %run.test,
            errors = run.errors.len(),
            "test finished"
        );
    }
    session.finish()
}

/// Run a fixture callback or test body, turning a returned error or a panic
/// into a phase error.
fn invoke<F>(f: F) -> Result<(), VerifyError>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match panic::capture(f) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(VerifyError::from_anyhow(&err)),
        Err(payload) => {
            let (location, backtrace) = match take_last_panic() {
                Some(site) => (site.location, Some(site.backtrace)),
                None => (None, None),
            };
            Err(CapturedError::from_panic(payload.as_ref(), location, backtrace).into())
        }
    }
}

/// Attribute a captured error to the fixture it escaped from
fn blame(err: VerifyError, fixture: &FixtureDef) -> VerifyError {
    match err {
        VerifyError::Captured(captured) if captured.fixture.is_none() => {
            VerifyError::Captured(captured.with_fixture(fixture.clone()))
        }
        other => other,
    }
}
