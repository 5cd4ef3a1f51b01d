//! Session-scoped context shared by the verification engine, the phase
//! hooks and the report aggregator.
//!
//! A [`Session`] is a cheap, cloneable handle. All mutable state sits
//! behind one mutex which is never held while user code runs, so a handle
//! may be passed freely into fixtures and test bodies.

mod hooks;


use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::VerifyConfig;
use crate::error::VerifyError;
use crate::logging::{StepLogger, TracingStepLogger, DETAIL_LEVEL};
use crate::models::{FixtureDef, Phase, Status, TestId, Traceback, VerificationResult};
use crate::report::{RunnerReport, SessionNotice};
use crate::stack::SourceCache;
use crate::store::ResultStore;

/// Name of the runner-injected context argument, never a real fixture
const RUNNER_CONTEXT_FIXTURE: &str = "request";

/// Teardown callback registered from a fixture or test body
pub type Finalizer = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

/// Where the session is in the run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStatus {
    /// Current phase, `None` before the first test starts
    pub phase: Option<Phase>,
    /// Tests in execution order
    pub run_order: Vec<TestId>,
    /// Test name to the fixtures it depends on
    pub test_fixtures: BTreeMap<String, Vec<String>>,
    /// Test whose phases are running
    pub current_test: Option<TestId>,
}

pub(crate) struct SessionState {
    pub(crate) status: SessionStatus,
    pub(crate) store: ResultStore,
    pub(crate) sources: SourceCache,
    pub(crate) scopes: Vec<FixtureDef>,
    pub(crate) finalizers: Vec<Finalizer>,
    pub(crate) reports: Vec<RunnerReport>,
    pub(crate) notices: Vec<SessionNotice>,
    pub(crate) started_at: DateTime<Local>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            status: SessionStatus::default(),
            store: ResultStore::new(),
            sources: SourceCache::new(),
            scopes: Vec::new(),
            finalizers: Vec::new(),
            reports: Vec::new(),
            notices: Vec::new(),
            started_at: Local::now(),
        }
    }

    pub(crate) fn active_fixture(&self) -> Option<&FixtureDef> {
        self.scopes.last()
    }
}

#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
    config: Arc<VerifyConfig>,
    logger: Arc<dyn StepLogger>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(VerifyConfig::default())
    }
}

impl Session {
    /// Start a session that logs steps through `tracing`
    pub fn new(config: VerifyConfig) -> Self {
        Self::with_logger(config, Arc::new(TracingStepLogger::new()))
    }

    pub fn with_logger(config: VerifyConfig, logger: Arc<dyn StepLogger>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            config: Arc::new(config),
            logger,
        }
    }

    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    pub fn logger(&self) -> &dyn StepLogger {
        self.logger.as_ref()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> Option<Phase> {
        self.lock().status.phase
    }

    /// Snapshot of the session status
    pub fn status(&self) -> SessionStatus {
        self.lock().status.clone()
    }

    pub fn run_order(&self) -> Vec<TestId> {
        self.lock().status.run_order.clone()
    }

    /// Every saved result and traceback, in recording order
    pub fn get_saved_results(&self) -> (Vec<VerificationResult>, Vec<Traceback>) {
        let state = self.lock();
        (
            state.store.results().to_vec(),
            state.store.tracebacks().to_vec(),
        )
    }

    /// Results not returned by a previous call; marks them retrieved
    pub fn retrieve_new_results(&self) -> Vec<VerificationResult> {
        let mut state = self.lock();
        let mut fresh = Vec::new();
        for result in state.store.results_mut() {
            if !result.retrieved {
                result.retrieved = true;
                fresh.push(result.clone());
            }
        }
        fresh
    }

    /// Log the results of `phase` that have not been printed yet and mark
    /// them printed.
    pub fn print_new_results(&self, phase: Phase) -> Vec<VerificationResult> {
        let printed: Vec<VerificationResult> = {
            let mut state = self.lock();
            let mut printed = Vec::new();
            for (index, result) in state.store.results_mut().iter_mut().enumerate() {
                if result.phase == Some(phase) && !result.printed {
                    result.printed = true;
                    tracing::debug!(
                        target: "soft_verify::scopes",
                        index,
                        key = %result.fixture_key(),
                        "new result"
                    );
                    printed.push(result.clone());
                }
            }
            printed
        };
        tracing::debug!(
            target: "soft_verify::print_saved",
            %phase,
            count = printed.len(),
            "printing new results"
        );

        for result in &printed {
            self.logger
                .step(&format!("{} - {}", result.message, result.status), DETAIL_LEVEL);
        }
        printed
    }

    /// Enter a fixture's scope; the returned guard leaves it on drop.
    ///
    /// Results recorded outside the call phase while a scope is active are
    /// attributed to the innermost fixture.
    pub fn set_scope(&self, fixture: FixtureDef) -> ScopeGuard {
        tracing::debug!(
            target: "soft_verify::scopes",
            fixture = %fixture.name,
            scope = %fixture.scope,
            "entering fixture scope"
        );
        let mut state = self.lock();
        state.scopes.push(fixture);
        ScopeGuard {
            session: self.clone(),
            depth: state.scopes.len(),
        }
    }

    /// Fixture the next setup or teardown result would be attributed to
    pub fn active_fixture(&self) -> Option<FixtureDef> {
        self.lock().active_fixture().cloned()
    }

    /// Register a callback to run during the current test's teardown
    pub fn add_finalizer<F>(&self, finalizer: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.lock().finalizers.push(Box::new(finalizer));
    }

    /// Registered finalizers in the order they must run (last added first)
    pub(crate) fn take_finalizers(&self) -> Vec<Finalizer> {
        let mut finalizers = std::mem::take(&mut self.lock().finalizers);
        finalizers.reverse();
        finalizers
    }

    pub fn record_runner_report(&self, report: RunnerReport) {
        tracing::debug!(
            target: "soft_verify::phases",
            test = %report.test,
            phase = %report.phase,
            kind = %report.kind,
            "runner report"
        );
        self.lock().reports.push(report);
    }

    pub fn record_notice(&self, notice: SessionNotice) {
        self.lock().notices.push(notice);
    }

    pub fn runner_reports(&self) -> Vec<RunnerReport> {
        self.lock().reports.clone()
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.lock().started_at
    }

    /// Number of saved results with the given status
    pub fn count(&self, status: Status) -> usize {
        self.lock()
            .store
            .results()
            .iter()
            .filter(|r| r.status == status)
            .count()
    }

    /// Forget everything recorded so far and start a new session
    pub fn reset(&self) {
        let mut state = self.lock();
        state.store.clear();
        state.status = SessionStatus::default();
        state.scopes.clear();
        state.finalizers.clear();
        state.reports.clear();
        state.notices.clear();
        state.started_at = Local::now();
    }

    /// Record a non-verification error escaping a phase, unless the same
    /// capture was already recorded. Every outstanding traceback is marked
    /// raised since this error supersedes them.
    ///
    /// Returns whether a new result was recorded.
    pub fn record_exception(&self, err: &VerifyError) -> bool {
        let VerifyError::Captured(captured) = err else {
            return false;
        };
        let options = self.walk_options(false);

        let mut state = self.lock();
        if state.store.contains_capture(captured.id) {
            tracing::debug!(
                target: "soft_verify::not_plugin",
                id = %captured.id,
                "exception already saved"
            );
            return false;
        }

        let frames = crate::stack::exception_frames(
            captured.backtrace.as_deref(),
            captured.location.as_deref(),
            &options,
            &mut state.sources,
        );
        let fixture = captured
            .fixture
            .clone()
            .or_else(|| state.active_fixture().cloned());

        let mut result = VerificationResult::new(
            captured.message.clone(),
            Status::Fail,
            captured.kind.type_code(),
        );
        result.raise_immediately = true;
        self.attribute(&state.status, &mut result, fixture.as_ref());
        if let Some(last) = frames.last() {
            result.source.module_function_line = last.location.clone();
            result.source.code = last.source.last().cloned().into_iter().collect();
        }

        tracing::debug!(
            target: "soft_verify::not_plugin",
            kind = %captured.kind,
            message = %captured.message,
            frames = frames.len(),
            "saving caught exception"
        );

        let index = state.store.record_result(result);
        let mut traceback = Traceback::new(err.clone(), frames, index);
        traceback.raised = true;
        state.store.record_traceback(traceback);
        state.store.mark_all_raised();
        true
    }

    /// Fill in the phase, test identity and fixture of a new result
    pub(crate) fn attribute(
        &self,
        status: &SessionStatus,
        result: &mut VerificationResult,
        fixture: Option<&FixtureDef>,
    ) {
        result.phase = status.phase;
        if let Some(test) = &status.current_test {
            result.module = test.module.clone();
            result.class_name = test.class_name.clone();
            result.test_function = Some(test.name.clone());
        }
        if let Some(fixture) = fixture {
            result.fixture_name = Some(fixture.name.clone());
            result.scope = Some(fixture.scope);
        }
    }

    pub(crate) fn walk_options(&self, full_trace: bool) -> crate::stack::WalkOptions {
        crate::stack::WalkOptions {
            stop_at_boundary: self.config.general.traceback_stops_at_test_functions,
            full_trace,
            max_depth: self.config.general.maximum_traceback_depth,
        }
    }

    fn leave_scope(&self, depth: usize) {
        let mut state = self.lock();
        if state.scopes.len() >= depth {
            if let Some(fixture) = state.scopes.get(depth - 1) {
                tracing::debug!(
                    target: "soft_verify::scopes",
                    fixture = %fixture.name,
                    "leaving fixture scope"
                );
            }
            state.scopes.truncate(depth - 1);
        }
    }

    pub(crate) fn fixture_names(names: &[&str]) -> Vec<String> {
        names
            .iter()
            .filter(|name| **name != RUNNER_CONTEXT_FIXTURE)
            .map(|name| name.to_string())
            .collect()
    }
}

/// Active fixture scope; leaving it is tied to drop
#[must_use = "the scope ends as soon as the guard is dropped"]
pub struct ScopeGuard {
    session: Session,
    depth: usize,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.session.leave_scope(self.depth);
    }
}
