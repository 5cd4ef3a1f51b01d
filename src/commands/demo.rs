//! Demo command: run a small sample suite through the harness
//! Usage: soft-verify demo [--json <path>]

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use crate::harness::{run_suite, Fixture, TestCase};
use crate::models::{Scope, TestId};
use crate::session::Session;

/// Sample suite covering passes, warnings, soft failures, a captured panic
/// and a skip.
pub fn sample_suite() -> Vec<TestCase> {
    let module = "demo_sensors";

    let reading = TestCase::new(TestId::new("test_reading").in_module(module), |s| {
        let reading = 3;
        s.check(0 < reading && reading < 5, "reading in range")
            .warn_if(reading < 3, "reading below 3")
            .local("reading", &reading)
            .run()?;
        Ok(())
    });

    let probe = Fixture::new("probe", Scope::Module)
        .setup(|s| {
            s.verify(true, "probe connected")?;
            Ok(())
        })
        .teardown(|s| {
            s.check(true, "probe released").run()?;
            Ok(())
        });
    let calibration = TestCase::new(TestId::new("test_calibration").in_module(module), |s| {
        let offsets = [0.1, 0.4, 0.05];
        for (channel, offset) in offsets.iter().enumerate() {
            s.check(*offset < 0.25, format!("channel {channel} offset below 0.25"))
                .no_raise()
                .local("offset", offset)
                .run()?;
        }
        Ok(())
    })
    .fixture(probe);

    let overflow = TestCase::new(TestId::new("test_overflow").in_module(module), |_| {
        let samples: Vec<u32> = Vec::new();
        let first = samples.first().copied().unwrap_or_default();
        if first == 0 {
            anyhow::bail!("no samples collected");
        }
        Ok(())
    });

    let legacy = TestCase::new(TestId::new("test_legacy_port").in_module(module), |_| Ok(()))
        .skip("legacy port not present");

    vec![reading, calibration, overflow, legacy]
}

/// Execute the demo command
pub fn execute(session: &Session, json: Option<&Path>) -> Result<()> {
    let report = run_suite(session, sample_suite());

    if let Some(path) = json {
        session.export_json(path)?;
        println!("Report written to {}", path.display());
    }

    println!("{}", report.colored_summary_line());
    let problems: usize = report
        .counts
        .iter()
        .filter(|(outcome, _)| outcome.is_problem())
        .map(|(_, count)| count)
        .sum();
    if problems > 0 {
        println!("{}", format!("{problems} test(s) did not pass, as intended").dimmed());
    }
    Ok(())
}
