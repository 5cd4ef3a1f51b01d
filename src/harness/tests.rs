use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serial_test::serial;

use super::*;
use crate::config::VerifyConfig;
use crate::logging::MemoryStepLogger;
use crate::models::{ExceptionKind, TypeCode};
use crate::report::Outcome;

fn quiet_session() -> Session {
    Session::with_logger(VerifyConfig::default(), Arc::new(MemoryStepLogger::new()))
}

#[test]
fn test_invoke_passes_through_success() {
    assert!(invoke(|| Ok(())).is_ok());
}

#[test]
fn test_invoke_captures_foreign_errors() {
    let err = invoke(|| Err(anyhow::anyhow!("connection refused"))).unwrap_err();
    assert_eq!(err.kind(), ExceptionKind::Other);
    assert_eq!(err.message(), "connection refused");
}

#[test]
fn test_invoke_keeps_verification_errors() {
    let session = quiet_session();
    let err = invoke(|| {
        session.verify(false, "value set")?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.kind(), ExceptionKind::VerificationFailure);
    assert_eq!(err.message(), "value set - FAIL");
}

#[test]
#[serial]
fn test_invoke_captures_panics() {
    let err = invoke(|| {
        assert_eq!(1 + 1, 3, "arithmetic");
        Ok(())
    })
    .unwrap_err();

    let VerifyError::Captured(captured) = err else {
        panic!("expected a captured error");
    };
    assert_eq!(captured.kind, ExceptionKind::RawAssertion);
    assert!(captured.message.contains("arithmetic"));
    assert!(captured
        .location
        .as_deref()
        .is_some_and(|l| l.contains("harness/tests.rs")));
    assert!(captured.backtrace.is_some());
    assert!(take_last_panic().is_none());
}

#[test]
fn test_blame_attributes_captured_errors_only() {
    let db = FixtureDef::new("db", Scope::Function);
    let server = FixtureDef::new("server", Scope::Module);

    let captured = VerifyError::from(CapturedError::new(ExceptionKind::Other, "boom"));
    let blamed = blame(captured, &db);
    let VerifyError::Captured(inner) = &blamed else {
        panic!("expected a captured error");
    };
    assert_eq!(inner.fixture.as_ref(), Some(&db));

    let reblamed = blame(blamed, &server);
    let VerifyError::Captured(inner) = &reblamed else {
        panic!("expected a captured error");
    };
    assert_eq!(inner.fixture.as_ref(), Some(&db));

    let failure = VerifyError::Failure {
        message: "x - FAIL".to_string(),
        frames: Vec::new(),
    };
    assert!(matches!(blame(failure, &db), VerifyError::Failure { .. }));
}

#[test]
#[serial]
fn test_fixture_panic_is_setup_error() {
    let session = quiet_session();
    let torn_down = Arc::new(AtomicBool::new(false));
    let flag = torn_down.clone();
    let body_ran = Arc::new(AtomicBool::new(false));
    let ran = body_ran.clone();

    let case = TestCase::new(TestId::new("test_db").in_module("test_store"), move |_| {
        ran.store(true, Ordering::SeqCst);
        Ok(())
    })
    .fixture(Fixture::new("server", Scope::Module).teardown(move |_| {
        flag.store(true, Ordering::SeqCst);
        Ok(())
    }))
    .fixture(
        Fixture::new("db", Scope::Function)
            .setup(|_| -> anyhow::Result<()> { panic!("db down") }),
    );

    let run = run_test(&session, case);
    assert_eq!(run.kind(Phase::Setup), Some(ReportKind::Error));
    assert_eq!(run.kind(Phase::Call), None);
    assert_eq!(run.kind(Phase::Teardown), Some(ReportKind::Passed));
    assert!(torn_down.load(Ordering::SeqCst));
    assert!(!body_ran.load(Ordering::SeqCst));
    assert_eq!(run.errors.len(), 1);

    let (results, tracebacks) = session.get_saved_results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].type_code, TypeCode::Other);
    assert_eq!(results[0].message, "db down");
    assert_eq!(results[0].fixture_name.as_deref(), Some("db"));
    assert_eq!(results[0].phase, Some(Phase::Setup));
    assert!(tracebacks[0].raised);

    let report = session.report();
    assert_eq!(report.test("test_db").unwrap().outcome, Outcome::SetupError);
}

#[test]
fn test_teardown_order_and_finalizers() {
    let session = quiet_session();
    let order = Arc::new(Mutex::new(Vec::new()));

    let push = |name: &'static str| {
        let order = order.clone();
        move |_: &Session| -> anyhow::Result<()> {
            order.lock().unwrap().push(name);
            Ok(())
        }
    };

    let finalizer_order = order.clone();
    let case = TestCase::new(TestId::new("test_order"), move |s| {
        for name in ["first", "second"] {
            let order = finalizer_order.clone();
            s.add_finalizer(move || {
                order.lock().unwrap().push(name);
                Ok(())
            });
        }
        Ok(())
    })
    .fixture(Fixture::new("a", Scope::Session).teardown(push("a")))
    .fixture(Fixture::new("b", Scope::Function).teardown(push("b")));

    let run = run_test(&session, case);
    assert_eq!(run.kind(Phase::Call), Some(ReportKind::Passed));
    assert_eq!(*order.lock().unwrap(), vec!["b", "a", "second", "first"]);
}

#[test]
fn test_first_teardown_error_is_delivered() {
    let session = quiet_session();
    let case = TestCase::new(TestId::new("test_teardown"), |s| {
        s.add_finalizer(|| Err(anyhow::anyhow!("finalizer failed")));
        Ok(())
    })
    .fixture(
        Fixture::new("db", Scope::Function)
            .teardown(|_| Err(anyhow::anyhow!("close failed"))),
    );

    let run = run_test(&session, case);
    assert_eq!(run.kind(Phase::Teardown), Some(ReportKind::Error));
    assert_eq!(run.errors.len(), 1);
    assert_eq!(run.errors[0].message(), "close failed");

    let (results, _) = session.get_saved_results();
    let messages: Vec<&str> = results.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(messages, vec!["close failed", "finalizer failed"]);
    assert_eq!(results[0].fixture_name.as_deref(), Some("db"));
    assert_eq!(results[1].fixture_name, None);

    let report = session.report();
    assert_eq!(report.test("test_teardown").unwrap().outcome, Outcome::TeardownError);
}

#[test]
fn test_failing_finalizer_is_teardown_error() {
    let session = quiet_session();
    let case = TestCase::new(TestId::new("test_cleanup").in_module("test_files"), |s| {
        s.add_finalizer(|| Err(anyhow::anyhow!("finalizer failed")));
        Ok(())
    });

    let run = run_test(&session, case);
    assert_eq!(run.kind(Phase::Call), Some(ReportKind::Passed));
    assert_eq!(run.kind(Phase::Teardown), Some(ReportKind::Error));

    let report = session.report();
    let summary = report.test("test_cleanup").unwrap();
    assert_eq!(summary.teardown.label(), "teardown error");
    assert_eq!(summary.outcome, Outcome::TeardownError);

    let group = &summary.teardown.fixtures[0];
    assert_eq!(group.scope, None);
    assert_eq!(group.fixture_name, None);
    assert_eq!(group.counts.get(&TypeCode::Other), Some(&1));
    assert!(report
        .breakdown_lines()
        .iter()
        .any(|line| line.contains("no fixture") && line.contains("O: 1")));
}

#[test]
fn test_soft_failure_in_finalizer_fails_teardown() {
    let session = quiet_session();
    let cleanup = session.clone();
    let case = TestCase::new(TestId::new("test_soft_cleanup"), move |s| {
        s.add_finalizer(move || {
            cleanup.check(false, "temp dir removed").no_raise().run()?;
            Ok(())
        });
        Ok(())
    });

    let run = run_test(&session, case);
    assert_eq!(run.kind(Phase::Teardown), Some(ReportKind::Error));
    let report = session.report();
    let summary = report.test("test_soft_cleanup").unwrap();
    assert_eq!(summary.teardown.label(), "teardown error");
    assert_eq!(summary.outcome, Outcome::TeardownError);
}

#[test]
fn test_class_fixture_without_class_stays_with_its_test() {
    let session = quiet_session();
    let with_pool = TestCase::new(TestId::new("test_a"), |_| Ok(())).fixture(
        Fixture::new("pool", Scope::Class).setup(|s| {
            s.check(false, "pool warmed").no_raise().run()?;
            Ok(())
        }),
    );
    let plain = TestCase::new(TestId::new("test_b"), |_| Ok(()));

    let report = run_suite(&session, vec![with_pool, plain]);
    assert_eq!(report.test("test_a").unwrap().outcome, Outcome::SetupError);
    let plain = report.test("test_b").unwrap();
    assert_eq!(plain.setup.label(), "setup passed");
    assert_eq!(plain.outcome, Outcome::Passed);
}

#[test]
fn test_skip_and_xfail() {
    let session = quiet_session();
    let skipped = TestCase::new(TestId::new("test_skipped"), |s| {
        s.verify(false, "never evaluated")?;
        Ok(())
    })
    .skip("not supported");
    let expected = TestCase::new(TestId::new("test_expected"), |s| {
        s.check(false, "known bug").no_raise().run()?;
        Ok(())
    })
    .xfail("known bug");
    let surprise = TestCase::new(TestId::new("test_surprise"), |_| Ok(())).xfail("flaky");

    let report = run_suite(&session, vec![skipped, expected, surprise]);
    assert_eq!(report.test("test_skipped").unwrap().outcome, Outcome::SetupSkipped);
    assert_eq!(report.test("test_expected").unwrap().outcome, Outcome::ExpectedFailure);
    assert_eq!(report.test("test_surprise").unwrap().outcome, Outcome::UnexpectedPass);
    assert_eq!(
        report.short_summary,
        vec![
            "XFAIL test_expected known bug".to_string(),
            "XPASS test_surprise flaky".to_string(),
            "SKIPPED test_skipped not supported".to_string(),
        ]
    );
    assert_eq!(session.get_saved_results().0.len(), 1);
}
