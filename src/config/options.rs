//! Option catalogue shared by the config file, CLI overrides and help output

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    Int,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKind::Bool => write!(f, "bool"),
            OptionKind::Int => write!(f, "int"),
        }
    }
}

/// Name, value type and help text of one `[general]` option
#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub name: &'static str,
    pub kind: OptionKind,
    pub help: &'static str,
}

impl OptionSpec {
    /// Help text; boolean options also list the accepted spellings
    pub fn help_text(&self) -> String {
        match self.kind {
            OptionKind::Bool => format!(
                "{}. Enable: 1/yes/true/on. Disable: 0/no/false/off",
                self.help
            ),
            OptionKind::Int => self.help.to_string(),
        }
    }
}

pub const OPTIONS: &[OptionSpec] = &[
    OptionSpec {
        name: "include-verify-local-vars",
        kind: OptionKind::Bool,
        help: "Include local variables in tracebacks created by verify function",
    },
    OptionSpec {
        name: "include-all-local-vars",
        kind: OptionKind::Bool,
        help: "Include local variables in all verify tracebacks. Captured panics and \
               errors carry no locals, so this only widens the verify snapshots",
    },
    OptionSpec {
        name: "traceback-stops-at-test-functions",
        kind: OptionKind::Bool,
        help: "Stop the traceback at the test function",
    },
    OptionSpec {
        name: "raise-warnings",
        kind: OptionKind::Bool,
        help: "Raise warnings (enabled) or just save the result (disabled)",
    },
    OptionSpec {
        name: "maximum-traceback-depth",
        kind: OptionKind::Int,
        help: "Print up to the maximum limit (integer) of stack trace entries",
    },
    OptionSpec {
        name: "continue-on-setup-failure",
        kind: OptionKind::Bool,
        help: "Continue to the test call phase if the setup fails",
    },
    OptionSpec {
        name: "continue-on-setup-warning",
        kind: OptionKind::Bool,
        help: "Continue to the test call phase if the setup warns. To raise a setup \
               warning this must be disabled and raise-warnings enabled",
    },
];

pub const DEBUG_FLAGS: &[&str] = &[
    "print-saved",
    "verify",
    "not-plugin",
    "phases",
    "scopes",
    "summary",
];

/// Parse 1/yes/true/on and 0/no/false/off, case-insensitively
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}
