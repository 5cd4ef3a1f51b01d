//! Test phases, fixture scopes and test identities.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of a single test that the runner is currently executing.
///
/// Phase transitions:
/// - `Setup` -> `Call` (setup completed cleanly)
/// - `Setup` -> `Teardown` (setup raised, call is skipped)
/// - `Call` -> `Teardown`
/// - `Teardown` -> `Setup` (next test starts)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Setup,
    Call,
    Teardown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Setup => write!(f, "setup"),
            Phase::Call => write!(f, "call"),
            Phase::Teardown => write!(f, "teardown"),
        }
    }
}

impl Phase {
    /// All phases in execution order
    pub fn all() -> &'static [Phase] {
        &[Phase::Setup, Phase::Call, Phase::Teardown]
    }

    /// Check whether the runner may move from this phase to `next`.
    ///
    /// Re-entering the same phase is a no-op and always valid.
    pub fn can_transition_to(&self, next: &Phase) -> bool {
        if self == next {
            return true;
        }

        match self {
            Phase::Setup => matches!(next, Phase::Call | Phase::Teardown),
            Phase::Call => matches!(next, Phase::Teardown),
            Phase::Teardown => matches!(next, Phase::Setup),
        }
    }

    /// Attempt a transition, returning an error if the runner skipped a boundary.
    pub fn try_transition(&self, next: Phase) -> Result<Phase> {
        if self.can_transition_to(&next) {
            Ok(next)
        } else {
            bail!("Invalid phase transition: {self} -> {next}")
        }
    }
}

/// Lifetime tier at which a fixture's setup and teardown run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Session,
    Class,
    Module,
    Function,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Session => write!(f, "session"),
            Scope::Class => write!(f, "class"),
            Scope::Module => write!(f, "module"),
            Scope::Function => write!(f, "function"),
        }
    }
}

impl Scope {
    /// Scopes in the order the runner sets them up
    pub fn all() -> &'static [Scope] {
        &[Scope::Session, Scope::Class, Scope::Module, Scope::Function]
    }
}

/// A fixture definition handle: what the engine looks for to attribute a
/// setup/teardown result to a fixture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FixtureDef {
    pub name: String,
    pub scope: Scope,
}

impl FixtureDef {
    pub fn new(name: impl Into<String>, scope: Scope) -> Self {
        Self {
            name: name.into(),
            scope,
        }
    }
}

/// Identity of a test: its parent module, optional class and function name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestId {
    pub module: Option<String>,
    pub class_name: Option<String>,
    pub name: String,
}

impl TestId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            module: None,
            class_name: None,
            name: name.into(),
        }
    }

    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn in_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(module) = &self.module {
            write!(f, "{module}::")?;
        }
        if let Some(class_name) = &self.class_name {
            write!(f, "{class_name}::")?;
        }
        write!(f, "{}", self.name)
    }
}
