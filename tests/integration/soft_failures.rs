//! Saved failures, immediate raises and warnings in the call phase

use soft_verify::harness::{run_test, TestCase};
use soft_verify::report::ReportKind;
use soft_verify::{verify, Phase, Session, Status, TestId, VerifyConfig};

use super::helpers::{config_with, quiet_session, Flag};

fn enter_call(session: &Session, name: &str) {
    session.on_setup_start(TestId::new(name).in_module("it_soft"), &[]);
    session.on_setup_end(None).expect("setup has nothing to redeliver");
    session.on_call_start();
}

#[test]
fn test_saved_failures_are_redelivered_at_call_end() {
    let (session, logger) = quiet_session(VerifyConfig::default());
    let case = TestCase::new(TestId::new("test_channels").in_module("it_soft"), |s| {
        for value in [1, 5, 2, 7] {
            s.check(value < 4, format!("value {value} below 4"))
                .no_raise()
                .run()?;
        }
        Ok(())
    });

    let run = run_test(&session, case);
    assert_eq!(run.kind(Phase::Call), Some(ReportKind::Failed));
    assert_eq!(run.errors.len(), 1);
    assert_eq!(run.errors[0].message(), "value 5 below 4 - FAIL");

    assert_eq!(session.count(Status::Pass), 2);
    assert_eq!(session.count(Status::Fail), 2);
    let (results, tracebacks) = session.get_saved_results();
    assert_eq!(tracebacks.len(), 2);
    assert!(tracebacks.iter().all(|t| t.raised));
    assert_eq!(results[1].traceback, Some(0));
    assert_eq!(results[3].traceback, Some(1));
    assert!(logger
        .messages()
        .contains(&"value 7 below 4 - FAIL".to_string()));
}

#[test]
fn test_immediate_failure_stops_the_body() {
    let (session, _) = quiet_session(VerifyConfig::default());
    let reached = Flag::default();
    let flag = reached.clone();

    let case = TestCase::new(TestId::new("test_stops"), move |s| {
        s.verify(false, "first")?;
        flag.set();
        Ok(())
    });

    let run = run_test(&session, case);
    assert!(!reached.is_set());
    assert_eq!(run.kind(Phase::Call), Some(ReportKind::Failed));
    assert_eq!(run.errors[0].message(), "first - FAIL");
    assert_eq!(session.count(Status::Fail), 1);
}

#[test]
fn test_verify_macro_messages() {
    let (session, _) = quiet_session(VerifyConfig::default());
    enter_call(&session, "test_macro");

    let retries = 2;
    assert!(verify!(session, retries < 3).unwrap());
    let err = verify!(session, retries > 5, "retried {} times", retries).unwrap_err();
    assert_eq!(err.message(), "retried 2 times - FAIL");

    let (results, tracebacks) = session.get_saved_results();
    assert_eq!(results[0].message, "retries < 3");
    assert_eq!(results[1].message, "retried 2 times");
    assert!(results[1]
        .source
        .module_function_line
        .contains("soft_failures.rs"));
    assert!(tracebacks[0].raised);
}

#[test]
fn test_narrow_warning_condition() {
    let (session, _) = quiet_session(VerifyConfig::default());
    enter_call(&session, "test_level");

    let level = 2.5;
    let held = session
        .check(level < 3.0, "level below limit")
        .warn_if(level < 2.0, "level below soft limit")
        .run()
        .unwrap();
    assert!(held);

    let (results, _) = session.get_saved_results();
    assert_eq!(results[0].status, Status::Warning);
    assert_eq!(results[0].message, "level below soft limit");

    let err = session.on_call_end(None).unwrap_err();
    assert_eq!(err.message(), "level below soft limit - WARNING");
}

#[test]
fn test_warnings_saved_only_when_not_raised() {
    let (session, _) = quiet_session(config_with(&[("raise-warnings", "off")]));
    enter_call(&session, "test_quiet_warning");

    session.check(false, "cache warm").warning().run().unwrap();
    assert!(session.on_call_end(None).is_ok());
    assert_eq!(session.count(Status::Warning), 1);

    let (_, tracebacks) = session.get_saved_results();
    assert!(!tracebacks[0].raised);
}

#[test]
fn test_failure_delivered_before_warning() {
    let (session, _) = quiet_session(VerifyConfig::default());
    enter_call(&session, "test_mixed");

    session.check(false, "slow response").warning().run().unwrap();
    session.check(false, "wrong payload").no_raise().run().unwrap();

    let err = session.on_call_end(None).unwrap_err();
    assert_eq!(err.message(), "wrong payload - FAIL");

    session.on_teardown_start();
    assert!(session.on_teardown_end(None).is_ok());
}
