pub mod phase;
pub mod result;
pub mod traceback;


pub use phase::{FixtureDef, Phase, Scope, TestId};
pub use result::{SourceInfo, Status, TypeCode, VerificationResult};
pub(crate) use result::display_opt;
pub use traceback::{ExceptionKind, Frame, Traceback};
