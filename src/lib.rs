//! Soft assertions for test suites.
//!
//! A [`Session`] records every verification made while a test's setup,
//! call and teardown phases run. Failures can be saved instead of stopping
//! the test; the phase hooks deliver the first one to the runner when the
//! phase ends, and the report rolls everything up into one outcome per
//! test.

pub mod commands;
pub mod config;
pub mod error;
pub mod harness;
pub mod logging;
pub mod models;
pub mod report;
pub mod session;
pub mod stack;
pub mod store;
pub mod verify;

pub use config::{ConfigError, VerifyArgs, VerifyConfig};
pub use error::{CapturedError, VerifyError};
pub use logging::{init_logging, MemoryStepLogger, StepLogger, TracingStepLogger};
pub use models::{FixtureDef, Phase, Scope, Status, TestId, TypeCode};
pub use report::{Outcome, SessionReport};
pub use session::{ScopeGuard, Session};
pub use verify::Check;

/// Verify a condition with the default options.
///
/// Without a message the condition's own source text is used.
///
/// ```no_run
/// # use soft_verify::{verify, Session};
/// # fn demo(session: &Session) -> Result<(), soft_verify::VerifyError> {
/// let retries = 2;
/// verify!(session, retries < 3)?;
/// verify!(session, retries > 0, "retried {retries} times")?;
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! verify {
    ($session:expr, $condition:expr $(,)?) => {
        $session.verify($condition, stringify!($condition))
    };
    ($session:expr, $condition:expr, $($message:tt)+) => {
        $session.verify($condition, format!($($message)+))
    };
}
