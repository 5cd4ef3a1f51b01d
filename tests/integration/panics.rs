//! Panics and foreign errors escaping a phase

use serial_test::serial;

use soft_verify::harness::{run_test, TestCase};
use soft_verify::models::ExceptionKind;
use soft_verify::report::ReportKind;
use soft_verify::{Outcome, Phase, TestId, TypeCode, VerifyConfig};

use super::helpers::quiet_session;

#[test]
#[serial]
fn test_body_panic_supersedes_saved_failures() {
    let (session, _) = quiet_session(VerifyConfig::default());
    let case = TestCase::new(TestId::new("test_index").in_module("it_panics"), |s| {
        s.check(false, "soft").no_raise().run()?;
        let values: Vec<u8> = Vec::new();
        let index = values.len() + 3;
        let _value = values[index];
        Ok(())
    });

    let run = run_test(&session, case);
    assert_eq!(run.kind(Phase::Call), Some(ReportKind::Failed));
    assert_eq!(run.errors.len(), 1);
    assert_eq!(run.errors[0].kind(), ExceptionKind::Other);

    let (results, tracebacks) = session.get_saved_results();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].type_code, TypeCode::Failure);
    assert_eq!(results[1].type_code, TypeCode::Other);
    assert!(results[1].message.starts_with("index out of bounds"));
    assert!(tracebacks.iter().all(|t| t.raised));
    assert!(!tracebacks[1].frames.is_empty());

    let report = session.report();
    assert_eq!(report.test("test_index").unwrap().outcome, Outcome::Failure);
    assert_eq!(
        report.traceback_lines().last().unwrap(),
        &format!("OtherException: {}", results[1].message)
    );
}

#[test]
#[serial]
fn test_raw_assertion_is_classified() {
    let (session, _) = quiet_session(VerifyConfig::default());
    let case = TestCase::new(TestId::new("test_attempts"), |_| {
        let attempts = 2;
        assert_eq!(attempts, 3, "all attempts used");
        Ok(())
    });

    let run = run_test(&session, case);
    assert_eq!(run.errors[0].kind(), ExceptionKind::RawAssertion);

    let (results, _) = session.get_saved_results();
    assert_eq!(results[0].type_code, TypeCode::Assertion);
    assert!(results[0].message.contains("all attempts used"));
    assert_eq!(results[0].phase, Some(Phase::Call));
}

#[test]
fn test_returned_error_is_captured_once() {
    let (session, _) = quiet_session(VerifyConfig::default());
    let case = TestCase::new(TestId::new("test_connect"), |_| {
        Err(anyhow::anyhow!("connection refused"))
    });

    let run = run_test(&session, case);
    assert_eq!(run.kind(Phase::Call), Some(ReportKind::Failed));
    assert_eq!(run.kind(Phase::Teardown), Some(ReportKind::Passed));
    assert_eq!(run.errors[0].message(), "connection refused");

    let (results, _) = session.get_saved_results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].type_code, TypeCode::Other);
    assert_eq!(results[0].test_function.as_deref(), Some("test_connect"));
}
