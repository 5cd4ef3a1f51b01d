//! Error values raised by verifications and captured at phase boundaries.

use std::any::Any;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ExceptionKind, FixtureDef, Frame};

/// A classified error delivered to the runner.
///
/// Redelivery returns a stored clone of this value unchanged, so the
/// reconstructed frames travel with it instead of the engine's own frames.
#[derive(Error, Debug, Clone)]
pub enum VerifyError {
    /// A checked condition failed
    #[error("{message}")]
    Failure { message: String, frames: Vec<Frame> },

    /// A checked condition failed but was classified as a warning
    #[error("{message}")]
    Warning { message: String, frames: Vec<Frame> },

    /// A panic or error that escaped a phase outside the engine
    #[error(transparent)]
    Captured(#[from] CapturedError),
}

impl VerifyError {
    pub fn kind(&self) -> ExceptionKind {
        match self {
            VerifyError::Failure { .. } => ExceptionKind::VerificationFailure,
            VerifyError::Warning { .. } => ExceptionKind::VerificationWarning,
            VerifyError::Captured(captured) => captured.kind,
        }
    }

    /// Whether the error is one of the engine's own kinds
    pub fn is_verification(&self) -> bool {
        self.kind().is_verification()
    }

    pub fn message(&self) -> &str {
        match self {
            VerifyError::Failure { message, .. } | VerifyError::Warning { message, .. } => message,
            VerifyError::Captured(captured) => &captured.message,
        }
    }

    /// Reconstructed frames carried by engine errors; empty for captured ones
    pub fn frames(&self) -> &[Frame] {
        match self {
            VerifyError::Failure { frames, .. } | VerifyError::Warning { frames, .. } => frames,
            VerifyError::Captured(_) => &[],
        }
    }

    pub fn capture_id(&self) -> Option<Uuid> {
        match self {
            VerifyError::Captured(captured) => Some(captured.id),
            _ => None,
        }
    }

    /// Recover a `VerifyError` from an error returned by a test body
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<VerifyError>() {
            Some(verify_err) => verify_err.clone(),
            None => VerifyError::Captured(CapturedError::from_error(err)),
        }
    }
}

/// A non-verification error or panic captured while a phase ran.
#[derive(Error, Debug, Clone)]
#[error("{kind}: {message}")]
pub struct CapturedError {
    /// Identity used to avoid recording the same capture twice
    pub id: Uuid,
    pub kind: ExceptionKind,
    pub message: String,
    /// Rendered `std::backtrace::Backtrace` taken where the error arose
    pub backtrace: Option<String>,
    /// `file:line:column` of the panic site, when known
    pub location: Option<String>,
    /// Fixture whose setup or teardown the error escaped from
    pub fixture: Option<FixtureDef>,
}

impl CapturedError {
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            backtrace: None,
            location: None,
            fixture: None,
        }
    }

    /// Build from a caught panic payload.
    ///
    /// Panics raised by `assert!`-family macros are classified as raw
    /// assertions; everything else is `Other`.
    pub fn from_panic(
        payload: &(dyn Any + Send),
        location: Option<String>,
        backtrace: Option<String>,
    ) -> Self {
        let message = panic_message(payload);
        let kind = if message.starts_with("assertion") {
            ExceptionKind::RawAssertion
        } else {
            ExceptionKind::Other
        };
        let mut captured = Self::new(kind, single_line(&message));
        captured.location = location;
        captured.backtrace = backtrace;
        captured
    }

    /// Build from an error returned by a test body or fixture
    pub fn from_error(err: &anyhow::Error) -> Self {
        let mut captured = Self::new(ExceptionKind::Other, single_line(&format!("{err:#}")));
        let backtrace = err.backtrace();
        if matches!(
            backtrace.status(),
            std::backtrace::BacktraceStatus::Captured
        ) {
            captured.backtrace = Some(backtrace.to_string());
        }
        captured
    }

    pub fn with_fixture(mut self, fixture: FixtureDef) -> Self {
        self.fixture = Some(fixture);
        self
    }
}

/// Extract a readable message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

fn single_line(message: &str) -> String {
    message.trim().replace('\n', " ")
}
