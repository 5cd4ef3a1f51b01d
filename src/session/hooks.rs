//! Phase hooks called by the runner around setup, call and teardown.
//!
//! The `*_end` hooks take the error the phase returned, if any. A
//! non-verification error is saved and handed back. Otherwise the first
//! failure not yet delivered is returned, then the first warning when
//! warnings are raised. Returning the error is how the runner is made to
//! fail the phase.

use crate::error::VerifyError;
use crate::models::{ExceptionKind, Phase, TestId};

use super::Session;

/// Which saved tracebacks a phase end may redeliver
#[derive(Debug, Clone, Copy)]
struct Redelivery {
    failures: bool,
    warnings: bool,
}

impl Session {
    /// A test's setup is about to run.
    ///
    /// `fixture_names` are the fixtures the test depends on; the runner's
    /// own context argument is dropped from the list.
    pub fn on_setup_start(&self, test: TestId, fixture_names: &[&str]) {
        tracing::debug!(
            target: "soft_verify::phases",
            test = %test,
            fixtures = ?fixture_names,
            "SETUP - starting"
        );

        let mut state = self.lock();
        let status = &mut state.status;
        status
            .test_fixtures
            .insert(test.name.clone(), Self::fixture_names(fixture_names));
        status.run_order.push(test.clone());
        status.current_test = Some(test);
        self.enter_phase(status, Phase::Setup);
    }

    /// Setup finished, with `raised` holding the error it returned.
    pub fn on_setup_end(&self, raised: Option<VerifyError>) -> Result<(), VerifyError> {
        let general = &self.config().general;
        let redelivery = Redelivery {
            failures: !general.continue_on_setup_failure,
            warnings: !general.continue_on_setup_warning && general.raise_warnings,
        };

        let outcome = self.finish_phase(Phase::Setup, raised, redelivery);

        let mut state = self.lock();
        self.enter_phase(&mut state.status, Phase::Call);
        outcome
    }

    pub fn on_call_start(&self) {
        let mut state = self.lock();
        tracing::debug!(
            target: "soft_verify::phases",
            test = ?state.status.current_test.as_ref().map(|t| t.to_string()),
            "CALL - starting"
        );
        self.enter_phase(&mut state.status, Phase::Call);
    }

    /// The test body finished, with `raised` holding the error it returned.
    pub fn on_call_end(&self, raised: Option<VerifyError>) -> Result<(), VerifyError> {
        let redelivery = Redelivery {
            failures: true,
            warnings: self.config().general.raise_warnings,
        };
        self.finish_phase(Phase::Call, raised, redelivery)
    }

    pub fn on_teardown_start(&self) {
        let mut state = self.lock();
        tracing::debug!(target: "soft_verify::phases", "TEARDOWN - starting");
        self.enter_phase(&mut state.status, Phase::Teardown);
    }

    /// Teardown finished, with `raised` holding the error it returned.
    pub fn on_teardown_end(&self, raised: Option<VerifyError>) -> Result<(), VerifyError> {
        let redelivery = Redelivery {
            failures: true,
            warnings: self.config().general.raise_warnings,
        };
        self.finish_phase(Phase::Teardown, raised, redelivery)
    }

    fn finish_phase(
        &self,
        phase: Phase,
        raised: Option<VerifyError>,
        redelivery: Redelivery,
    ) -> Result<(), VerifyError> {
        tracing::debug!(
            target: "soft_verify::phases",
            %phase,
            raised = ?raised.as_ref().map(|e| e.to_string()),
            "phase complete"
        );

        if let Some(err) = raised {
            if !err.is_verification() && !self.record_exception(&err) {
                tracing::debug!(
                    target: "soft_verify::phases",
                    %phase,
                    "exception already saved by its fixture scope"
                );
            }
            return Err(err);
        }

        if redelivery.failures {
            if let Some(err) = self.raise_first(ExceptionKind::VerificationFailure) {
                return Err(err);
            }
        }
        if redelivery.warnings {
            if let Some(err) = self.raise_first(ExceptionKind::VerificationWarning) {
                return Err(err);
            }
        }
        Ok(())
    }

    /// Redeliver the earliest saved traceback of `kind` that has not been
    /// raised. Every outstanding traceback is marked raised on delivery.
    pub(crate) fn raise_first(&self, kind: ExceptionKind) -> Option<VerifyError> {
        let err = {
            let mut state = self.lock();
            let index = state.store.first_unraised(kind)?;
            let err = state.store.traceback(index)?.raw.clone();
            state.store.mark_all_raised();
            err
        };

        tracing::debug!(
            target: "soft_verify::verify",
            %kind,
            message = err.message(),
            "re-raising first saved traceback"
        );
        self.logger()
            .detail_step(&format!("Re-raising first saved {kind}: {}", err.message()));
        Some(err)
    }

    fn enter_phase(&self, status: &mut super::SessionStatus, next: Phase) {
        if let Some(current) = status.phase {
            if let Err(err) = current.try_transition(next) {
                tracing::warn!(target: "soft_verify::phases", "{err}");
            }
        }
        status.phase = Some(next);
    }
}
