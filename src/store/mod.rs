//! Result Store
//!
//! Append-only, ordered collections of verification results and of the
//! tracebacks of failing, warning and captured results. Results and
//! tracebacks are linked by index in both directions. Nothing is removed
//! during a session; [`ResultStore::clear`] is only used between sessions.


use uuid::Uuid;

use crate::models::{ExceptionKind, Phase, Scope, TestId, Traceback, VerificationResult};

#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    results: Vec<VerificationResult>,
    tracebacks: Vec<Traceback>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result, returning its index
    pub fn record_result(&mut self, result: VerificationResult) -> usize {
        self.results.push(result);
        self.results.len() - 1
    }

    /// Append a traceback and link its owning result back to it
    pub fn record_traceback(&mut self, traceback: Traceback) -> usize {
        let index = self.tracebacks.len();
        if let Some(result) = self.results.get_mut(traceback.result) {
            result.traceback = Some(index);
        }
        self.tracebacks.push(traceback);
        index
    }

    pub fn results(&self) -> &[VerificationResult] {
        &self.results
    }

    pub fn tracebacks(&self) -> &[Traceback] {
        &self.tracebacks
    }

    pub fn result(&self, index: usize) -> Option<&VerificationResult> {
        self.results.get(index)
    }

    pub fn traceback(&self, index: usize) -> Option<&Traceback> {
        self.tracebacks.get(index)
    }

    /// The traceback linked to a result, if the result has one
    pub fn traceback_for(&self, result_index: usize) -> Option<&Traceback> {
        self.results
            .get(result_index)
            .and_then(|r| r.traceback)
            .and_then(|tb| self.tracebacks.get(tb))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Mark every outstanding traceback as delivered
    pub fn mark_all_raised(&mut self) {
        for traceback in &mut self.tracebacks {
            traceback.raised = true;
        }
    }

    /// Earliest traceback of `kind` not yet delivered
    pub fn first_unraised(&self, kind: ExceptionKind) -> Option<usize> {
        self.tracebacks
            .iter()
            .position(|tb| tb.exception_kind == kind && !tb.raised)
    }

    /// Whether a captured error has already been recorded
    pub fn contains_capture(&self, id: Uuid) -> bool {
        self.tracebacks.iter().any(|tb| tb.capture_id == Some(id))
    }

    pub fn mark_printed(&mut self, index: usize) {
        if let Some(result) = self.results.get_mut(index) {
            result.printed = true;
        }
    }

    pub fn mark_retrieved(&mut self, index: usize) {
        if let Some(result) = self.results.get_mut(index) {
            result.retrieved = true;
        }
    }

    pub fn by_phase(&self, phase: Phase) -> Vec<(usize, &VerificationResult)> {
        self.filter(|r| r.phase == Some(phase))
    }

    pub fn by_scope(&self, scope: Scope) -> Vec<(usize, &VerificationResult)> {
        self.filter(|r| r.scope == Some(scope))
    }

    pub fn by_fixture(&self, fixture_name: &str) -> Vec<(usize, &VerificationResult)> {
        self.filter(|r| r.fixture_name.as_deref() == Some(fixture_name))
    }

    pub fn by_test_function(&self, test_function: &str) -> Vec<(usize, &VerificationResult)> {
        self.filter(|r| r.test_function.as_deref() == Some(test_function))
    }

    /// Results of one phase recorded in fixtures of `scope` that belong to
    /// `test`.
    ///
    /// Module and class fixtures are shared by every test of the same module
    /// or class. Function and session fixtures, and shared fixtures of a test
    /// with no module or class, belong to the test during which they ran.
    pub fn by_scope_phase(
        &self,
        scope: Scope,
        test: &TestId,
        phase: Phase,
    ) -> Vec<(usize, &VerificationResult)> {
        self.filter(|r| {
            r.scope == Some(scope) && r.phase == Some(phase) && owned_by(r, scope, test)
        })
    }

    /// Results of one phase recorded during `test` outside any fixture scope
    pub fn unscoped_phase(&self, test: &TestId, phase: Phase) -> Vec<(usize, &VerificationResult)> {
        self.filter(|r| r.scope.is_none() && r.phase == Some(phase) && ran_during(r, test))
    }

    fn filter<F>(&self, predicate: F) -> Vec<(usize, &VerificationResult)>
    where
        F: Fn(&VerificationResult) -> bool,
    {
        self.results
            .iter()
            .enumerate()
            .filter(|(_, r)| predicate(r))
            .collect()
    }

    pub(crate) fn results_mut(&mut self) -> &mut [VerificationResult] {
        &mut self.results
    }

    /// Drop everything; only valid between sessions
    pub fn clear(&mut self) {
        self.results.clear();
        self.tracebacks.clear();
    }
}

/// Whether `result` was recorded while `test` was the current test
pub fn ran_during(result: &VerificationResult, test: &TestId) -> bool {
    result.test_function.as_deref() == Some(test.name.as_str())
        && result.module == test.module
        && result.class_name == test.class_name
}

fn owned_by(result: &VerificationResult, scope: Scope, test: &TestId) -> bool {
    let shared = match scope {
        Scope::Module => test
            .module
            .as_deref()
            .map(|module| result.module.as_deref() == Some(module)),
        Scope::Class => test.class_name.as_deref().map(|class| {
            result.module == test.module && result.class_name.as_deref() == Some(class)
        }),
        Scope::Function | Scope::Session => None,
    };
    shared.unwrap_or_else(|| ran_during(result, test))
}
