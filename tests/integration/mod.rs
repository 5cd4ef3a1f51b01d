//! Integration tests for soft-verify
//!
//! These tests drive whole tests through the harness and the phase hooks and
//! check the saved results, the redelivered errors and the session report.

pub mod config_overrides;
pub mod helpers;
pub mod panics;
pub mod reporting;
pub mod setup_priority;
pub mod soft_failures;
