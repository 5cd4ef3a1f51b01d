//! Traceback records for failing, warning and captured results.

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use super::result::TypeCode;
use crate::error::VerifyError;

/// Logical exception class a traceback represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExceptionKind {
    /// A checked condition failed and was deliberately raised
    VerificationFailure,
    /// A checked condition failed but is non-fatal
    VerificationWarning,
    /// A built-in assertion failed outside the verification engine
    RawAssertion,
    /// Anything else escaping a test phase
    Other,
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExceptionKind::VerificationFailure => write!(f, "VerificationFailure"),
            ExceptionKind::VerificationWarning => write!(f, "VerificationWarning"),
            ExceptionKind::RawAssertion => write!(f, "RawAssertion"),
            ExceptionKind::Other => write!(f, "OtherException"),
        }
    }
}

impl ExceptionKind {
    /// Type code recorded on the owning result
    pub fn type_code(&self) -> TypeCode {
        match self {
            ExceptionKind::VerificationFailure => TypeCode::Failure,
            ExceptionKind::VerificationWarning => TypeCode::Warning,
            ExceptionKind::RawAssertion => TypeCode::Assertion,
            ExceptionKind::Other => TypeCode::Other,
        }
    }

    /// Whether this kind originates from the verification engine itself
    pub fn is_verification(&self) -> bool {
        matches!(
            self,
            ExceptionKind::VerificationFailure | ExceptionKind::VerificationWarning
        )
    }
}

/// One reconstructed stack frame: `file:line:function`, an optional locals
/// snapshot and the source lines around the call (call line prefixed `>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub location: String,
    pub locals: Option<String>,
    pub source: Vec<String>,
}

impl Frame {
    pub fn new(location: impl Into<String>, locals: Option<String>, source: Vec<String>) -> Self {
        Self {
            location: location.into(),
            locals,
            source,
        }
    }

    /// The call line (last source line), if any
    pub fn call_line(&self) -> Option<&str> {
        self.source.last().map(String::as_str)
    }

    /// Printable lines: location, locals (when captured), then source
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.location.clone()];
        if let Some(locals) = &self.locals {
            lines.push(locals.clone());
        }
        lines.extend(self.source.iter().cloned());
        lines
    }
}

/// Saved traceback of a failure, warning or captured exception.
///
/// `raised` is set exactly once, when the error is delivered to the runner,
/// and is never reset.
#[derive(Debug, Clone, Serialize)]
pub struct Traceback {
    pub exception_kind: ExceptionKind,
    /// Error value returned unchanged when this traceback is redelivered
    #[serde(skip)]
    pub raw: VerifyError,
    /// Frames ordered outermost to innermost
    pub frames: Vec<Frame>,
    pub raised: bool,
    /// Index of the owning result in the store
    pub result: usize,
    /// Identity of the captured error this traceback was built from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_id: Option<Uuid>,
}

impl Traceback {
    pub fn new(raw: VerifyError, frames: Vec<Frame>, result: usize) -> Self {
        Self {
            exception_kind: raw.kind(),
            capture_id: raw.capture_id(),
            raw,
            frames,
            raised: false,
            result,
        }
    }

    /// Printable lines of every frame, outermost first
    pub fn formatted(&self) -> Vec<String> {
        self.frames.iter().flat_map(Frame::lines).collect()
    }
}
