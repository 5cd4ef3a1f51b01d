//! Session report: run order, roll-up, emitted lines and JSON export

use tempfile::TempDir;

use soft_verify::harness::{run_suite, Fixture, TestCase};
use soft_verify::{Outcome, Phase, Scope, TestId, VerifyConfig};

use super::helpers::quiet_session;

fn suite() -> Vec<TestCase> {
    let module = "it_report";
    vec![
        TestCase::new(TestId::new("test_a").in_module(module), |s| {
            s.verify(true, "a holds")?;
            Ok(())
        }),
        TestCase::new(TestId::new("test_b").in_module(module), |s| {
            s.check(false, "b holds").no_raise().run()?;
            Ok(())
        })
        .fixture(Fixture::new("request", Scope::Function))
        .fixture(Fixture::new("db", Scope::Function).setup(|s| {
            s.verify(true, "db ready")?;
            Ok(())
        })),
        TestCase::new(TestId::new("test_c").in_module(module), |s| {
            s.check(false, "c is fast").warning().run()?;
            Ok(())
        }),
    ]
}

#[test]
fn test_report_rolls_up_suite() {
    let (session, logger) = quiet_session(VerifyConfig::default());
    let report = run_suite(&session, suite());

    let order: Vec<&str> = report.run_order.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(order, vec!["test_a", "test_b", "test_c"]);
    assert_eq!(report.test_fixtures["test_b"], vec!["db".to_string()]);
    assert_eq!(report.summary_line(), "1 failure, 1 warning, 1 passed");

    let b = report.test("test_b").unwrap();
    assert_eq!(b.setup.label(), "setup passed");
    assert_eq!(b.setup.fixtures[0].fixture_name.as_deref(), Some("db"));
    assert_eq!(b.call.label(), "failure");

    let messages = logger.messages();
    for heading in ["Saved results", "Saved tracebacks", "Test results"] {
        assert!(messages.contains(&heading.to_string()), "missing {heading}");
    }
    assert!(messages.last().unwrap().contains("1 failure"));

    let (results, _) = session.get_saved_results();
    assert!(results.iter().all(|r| r.printed));
    assert!(session.print_new_results(Phase::Call).is_empty());
}

#[test]
fn test_report_table_lists_every_result() {
    let (session, _) = quiet_session(VerifyConfig::default());
    let report = run_suite(&session, suite());

    let table = report.table_lines(&["Step"], false);
    assert_eq!(table.len(), 4 + report.results.len());
    assert!(table[1].contains("Message"));
    assert!(table.iter().any(|line| line.contains("b holds") && line.contains("FAIL")));
    assert!(table.iter().any(|line| line.contains("c is fast") && line.contains("WARNING")));
}

#[test]
fn test_json_export() {
    let (session, _) = quiet_session(VerifyConfig::default());
    run_suite(&session, suite());

    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("session.json");
    session.export_json(&path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value["run_order"][1]["name"], "test_b");
    assert_eq!(value["counts"]["passed"], 1);
    assert_eq!(value["counts"]["warning"], 1);
    assert_eq!(value["tests"][2]["outcome"], "warning");
    assert_eq!(value["results"].as_array().unwrap().len(), 4);
}

#[test]
fn test_reset_starts_a_new_session() {
    let (session, _) = quiet_session(VerifyConfig::default());
    run_suite(&session, suite());
    session.reset();

    let report = session.report();
    assert!(report.results.is_empty());
    assert_eq!(report.summary_line(), "no tests ran");
    assert_eq!(report.count(Outcome::Passed), 0);
}
