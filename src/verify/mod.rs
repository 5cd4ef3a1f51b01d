//! Verification Engine
//!
//! Evaluates a condition (and an optional narrower warning condition),
//! classifies the outcome, records it with its reconstructed traceback and
//! decides whether the test must stop right away.
//!
//! ```no_run
//! # use soft_verify::Session;
//! # fn demo(session: &Session) -> Result<(), soft_verify::VerifyError> {
//! let reading = 3;
//! session
//!     .check(0 < reading && reading < 4, "reading in range")
//!     .warn_if(1 < reading && reading < 3, "reading in narrow range")
//!     .local("reading", &reading)
//!     .run()?;
//! # Ok(())
//! # }
//! ```


use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe, Location};
use std::path::Path;

use crate::error::VerifyError;
use crate::logging::DETAIL_LEVEL;
use crate::models::{Frame, Phase, SourceInfo, Status, Traceback, TypeCode, VerificationResult};
use crate::session::Session;
use crate::stack::{
    call_source, enclosing_function, function_source, reconstruct, CallStack, SourceCache,
    WalkOptions,
};

/// Outcome of a check.
///
/// | condition | warning | warn condition | outcome |
/// |-----------|---------|----------------|---------|
/// | false     | false   | any            | FAIL    |
/// | false     | true    | any            | WARNING |
/// | true      | any     | absent / true  | PASS    |
/// | true      | any     | false          | WARNING |
pub fn classify(condition: bool, warning: bool, warn_condition: Option<bool>) -> Status {
    match (condition, warning, warn_condition) {
        (false, false, _) => Status::Fail,
        (false, true, _) => Status::Warning,
        (true, _, Some(false)) => Status::Warning,
        (true, _, _) => Status::Pass,
    }
}

fn type_code(status: Status) -> TypeCode {
    match status {
        Status::Pass => TypeCode::Pass,
        Status::Fail => TypeCode::Failure,
        Status::Warning => TypeCode::Warning,
    }
}

/// A pending verification, configured with builder methods and evaluated
/// by [`Check::run`].
#[must_use = "a check does nothing until `run` is called"]
pub struct Check<'s> {
    session: &'s Session,
    caller: &'static Location<'static>,
    condition: bool,
    message: String,
    raise_immediately: bool,
    warning: bool,
    warn: Option<(bool, String)>,
    full_method_trace: bool,
    stop_at_test: bool,
    log_level: Option<u8>,
    locals: Vec<(String, String)>,
}

impl Session {
    /// Start a check of `condition`; the caller's location anchors the
    /// traceback.
    #[track_caller]
    pub fn check(&self, condition: bool, message: impl Into<String>) -> Check<'_> {
        Check {
            session: self,
            caller: Location::caller(),
            condition,
            message: message.into(),
            raise_immediately: true,
            warning: false,
            warn: None,
            full_method_trace: false,
            stop_at_test: self.config().general.traceback_stops_at_test_functions,
            log_level: None,
            locals: Vec::new(),
        }
    }

    /// Check `condition` with the default options: a failure is returned as
    /// an error right away.
    ///
    /// Returns whether the condition held.
    #[track_caller]
    pub fn verify(&self, condition: bool, message: impl Into<String>) -> Result<bool, VerifyError> {
        self.check(condition, message).run()
    }
}

impl<'s> Check<'s> {
    /// Record a failure without stopping the test
    pub fn no_raise(self) -> Self {
        self.raise_immediately(false)
    }

    pub fn raise_immediately(mut self, raise: bool) -> Self {
        self.raise_immediately = raise;
        self
    }

    /// Classify a failed condition as a warning. Warnings never stop the
    /// test on their own.
    pub fn warning(mut self) -> Self {
        self.warning = true;
        self
    }

    /// Narrower condition checked when the main condition holds; when it
    /// does not hold the result is a warning with `message`.
    pub fn warn_if(mut self, condition: bool, message: impl Into<String>) -> Self {
        self.warn = Some((condition, message.into()));
        self
    }

    /// Show each calling function from its `fn` line down to the call
    pub fn full_method_trace(mut self) -> Self {
        self.full_method_trace = true;
        self
    }

    pub fn stop_at_test(mut self, stop: bool) -> Self {
        self.stop_at_test = stop;
        self
    }

    pub fn log_level(mut self, level: u8) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Snapshot a local variable into the innermost traceback frame.
    ///
    /// Ignored when local variable capture is disabled. A `Debug`
    /// implementation that panics is recorded as `<unprintable>`.
    pub fn local(mut self, name: &str, value: &dyn Debug) -> Self {
        if self.session.config().capture_verify_locals() {
            let rendered = panic::catch_unwind(AssertUnwindSafe(|| format!("{value:?}")))
                .unwrap_or_else(|_| "<unprintable>".to_string());
            self.locals.push((name.to_string(), rendered));
        }
        self
    }

    /// Evaluate, log and record the check.
    ///
    /// Returns whether the main condition held, or the failure when it must
    /// stop the test now.
    pub fn run(self) -> Result<bool, VerifyError> {
        let raise_immediately = self.raise_immediately && !self.warning;
        let warn_condition = self.warn.as_ref().map(|(condition, _)| *condition);
        let status = classify(self.condition, self.warning, warn_condition);

        let message = match (&self.warn, self.condition) {
            (Some((false, warn_message)), true) => warn_message.clone(),
            _ => self.message.clone(),
        };

        let logger = self.session.logger();
        let step = logger.current_step();
        let level = self
            .log_level
            .unwrap_or_else(|| logger.current_level().max(DETAIL_LEVEL));
        logger.step(&format!("{message} - {status}"), level);

        tracing::debug!(
            target: "soft_verify::verify",
            %status,
            caller = %self.caller,
            locals = ?self.locals,
            "performing verification"
        );

        let stack = (status != Status::Pass).then(CallStack::capture);
        let locals = self.locals_snapshot();

        let mut state = self.session.lock();
        let frames = match stack {
            Some(stack) => self.trace(stack, locals.as_deref(), &mut state.sources),
            None => vec![self.caller_frame(locals, &mut state.sources)],
        };

        let fixture = if state.status.phase != Some(Phase::Call) {
            state.active_fixture().cloned()
        } else {
            None
        };

        let mut result = VerificationResult::new(message.clone(), status, type_code(status));
        result.step = step;
        result.raise_immediately = raise_immediately;
        self.session
            .attribute(&state.status, &mut result, fixture.as_ref());
        if let Some(innermost) = frames.last() {
            result.source = SourceInfo {
                module_function_line: innermost.location.clone(),
                code: innermost.source.clone(),
                locals: innermost.locals.clone(),
            };
        }
        let index = state.store.record_result(result);

        let raw = match status {
            Status::Pass => return Ok(self.condition),
            Status::Fail => VerifyError::Failure {
                message: format!("{message} - {status}"),
                frames: frames.clone(),
            },
            Status::Warning => VerifyError::Warning {
                message: format!("{message} - {status}"),
                frames: frames.clone(),
            },
        };
        state
            .store
            .record_traceback(Traceback::new(raw.clone(), frames, index));

        if !self.condition && raise_immediately {
            state.store.mark_all_raised();
            return Err(raw);
        }
        Ok(self.condition)
    }

    fn locals_snapshot(&self) -> Option<String> {
        if self.locals.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .locals
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect();
        Some(format!("{{{}}}", pairs.join(", ")))
    }

    fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            stop_at_boundary: self.stop_at_test,
            full_trace: self.full_method_trace,
            max_depth: self.session.config().general.maximum_traceback_depth,
        }
    }

    /// Frames from the caller outward, outermost first
    fn trace(
        &self,
        mut stack: CallStack,
        locals: Option<&str>,
        sources: &mut SourceCache,
    ) -> Vec<Frame> {
        let options = self.walk_options();
        let frames = match stack.position_of_file(self.caller.file()) {
            Some(anchor) => {
                stack.set_line(anchor, self.caller.line());
                reconstruct(&stack, anchor, &options, locals, sources)
            }
            None => Vec::new(),
        };

        if frames.is_empty() {
            vec![self.caller_frame(locals.map(str::to_string), sources)]
        } else {
            frames
        }
    }

    /// A single frame built from the caller location alone
    fn caller_frame(&self, locals: Option<String>, sources: &mut SourceCache) -> Frame {
        let file = Path::new(self.caller.file());
        let Ok(line) = usize::try_from(self.caller.line()) else {
            return Frame::new(self.caller.to_string(), locals, Vec::new());
        };

        let Some(lines) = sources.lines(file) else {
            return Frame::new(format!("{}:{line}:?", file.display()), locals, Vec::new());
        };

        let function = enclosing_function(&lines, line).unwrap_or_else(|| "?".to_string());
        let source = if self.full_method_trace {
            function_source(&lines, line, &function).unwrap_or_else(|| call_source(&lines, line))
        } else {
            call_source(&lines, line)
        };
        Frame::new(format!("{}:{line}:{function}", file.display()), locals, source)
    }
}
