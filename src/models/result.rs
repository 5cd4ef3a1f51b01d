//! Verification result records

use serde::Serialize;
use std::fmt;

use super::phase::{Phase, Scope};

/// Status shown in the results table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Fail,
    Warning,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Pass => write!(f, "PASS"),
            Status::Fail => write!(f, "FAIL"),
            Status::Warning => write!(f, "WARNING"),
        }
    }
}

/// Single-letter classification of a result.
///
/// - `P`: pass
/// - `F`: failed verification
/// - `W`: warning verification
/// - `A`: raw assertion caught at a phase boundary
/// - `O`: any other error caught at a phase boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TypeCode {
    #[serde(rename = "P")]
    Pass,
    #[serde(rename = "F")]
    Failure,
    #[serde(rename = "W")]
    Warning,
    #[serde(rename = "A")]
    Assertion,
    #[serde(rename = "O")]
    Other,
}

impl TypeCode {
    pub fn code(&self) -> char {
        match self {
            TypeCode::Pass => 'P',
            TypeCode::Failure => 'F',
            TypeCode::Warning => 'W',
            TypeCode::Assertion => 'A',
            TypeCode::Other => 'O',
        }
    }

    /// Codes that make a phase fail (`F`, `A`, `O`)
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TypeCode::Failure | TypeCode::Assertion | TypeCode::Other
        )
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Where a result came from: the innermost frame location, the call source
/// and the locals snapshot taken there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    pub module_function_line: String,
    pub code: Vec<String>,
    pub locals: Option<String>,
}

/// One row per evaluated condition or captured exception.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    /// High-level log caption active when the result was created
    pub step: Option<String>,
    pub message: String,
    pub status: Status,
    pub type_code: TypeCode,
    pub phase: Option<Phase>,
    pub scope: Option<Scope>,
    pub module: Option<String>,
    pub class_name: Option<String>,
    pub test_function: Option<String>,
    pub fixture_name: Option<String>,
    pub source: SourceInfo,
    pub raise_immediately: bool,
    pub printed: bool,
    pub retrieved: bool,
    /// Index of the linked traceback; present for every non-pass result
    pub traceback: Option<usize>,
}

impl VerificationResult {
    pub fn new(message: impl Into<String>, status: Status, type_code: TypeCode) -> Self {
        Self {
            step: None,
            message: message.into(),
            status,
            type_code,
            phase: None,
            scope: None,
            module: None,
            class_name: None,
            test_function: None,
            fixture_name: None,
            source: SourceInfo::default(),
            raise_immediately: false,
            printed: false,
            retrieved: false,
            traceback: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == Status::Pass
    }

    /// Grouping key used by the debug summary: `fixture:test:phase:scope`
    pub fn fixture_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            display_opt(&self.fixture_name),
            display_opt(&self.test_function),
            display_opt(&self.phase),
            display_opt(&self.scope)
        )
    }
}

pub(crate) fn display_opt<T: fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "None".to_string(),
    }
}
