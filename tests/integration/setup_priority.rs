//! Setup failures and warnings against the call phase

use soft_verify::harness::{run_suite, run_test, Fixture, TestCase};
use soft_verify::report::ReportKind;
use soft_verify::{Outcome, Phase, Scope, TestId, VerifyConfig};

use super::helpers::{config_with, quiet_session, Flag};

fn seeded_db(warning: bool) -> Fixture {
    Fixture::new("db", Scope::Function).setup(move |s| {
        let check = s.check(false, "db seeded").no_raise();
        let check = if warning { check.warning() } else { check };
        check.run()?;
        Ok(())
    })
}

fn body(flag: Flag) -> impl FnOnce(&soft_verify::Session) -> anyhow::Result<()> + Send + 'static {
    move |s| {
        flag.set();
        s.verify(true, "body ran")?;
        Ok(())
    }
}

#[test]
fn test_failing_setup_outranks_passing_call() {
    let (session, _) = quiet_session(config_with(&[("continue-on-setup-failure", "yes")]));
    let ran = Flag::default();
    let case = TestCase::new(
        TestId::new("test_after_bad_setup").in_module("it_setup"),
        body(ran.clone()),
    )
    .fixture(seeded_db(false));

    let report = run_suite(&session, vec![case]);
    assert!(ran.is_set());

    let summary = report.test("test_after_bad_setup").unwrap();
    assert_eq!(summary.setup.label(), "setup error");
    assert_eq!(summary.call.label(), "passed");
    assert_eq!(summary.teardown.label(), "teardown passed");
    assert_eq!(summary.outcome, Outcome::SetupError);
    assert_eq!(report.summary_line(), "1 setup error");
}

#[test]
fn test_setup_failure_skips_call_by_default() {
    let (session, _) = quiet_session(VerifyConfig::default());
    let ran = Flag::default();
    let case =
        TestCase::new(TestId::new("test_blocked"), body(ran.clone())).fixture(seeded_db(false));

    let run = run_test(&session, case);
    assert!(!ran.is_set());
    assert_eq!(run.kind(Phase::Setup), Some(ReportKind::Error));
    assert_eq!(run.errors[0].message(), "db seeded - FAIL");
    assert_eq!(session.report().test("test_blocked").unwrap().outcome, Outcome::SetupError);
}

#[test]
fn test_setup_warning_stops_call_by_default() {
    let (session, _) = quiet_session(VerifyConfig::default());
    let ran = Flag::default();
    let case =
        TestCase::new(TestId::new("test_warned"), body(ran.clone())).fixture(seeded_db(true));

    let run = run_test(&session, case);
    assert!(!ran.is_set());
    assert_eq!(run.kind(Phase::Setup), Some(ReportKind::Error));
    assert_eq!(run.errors[0].message(), "db seeded - WARNING");
    assert_eq!(session.report().test("test_warned").unwrap().outcome, Outcome::SetupWarning);
}

#[test]
fn test_setup_warning_tolerated_when_configured() {
    for options in [
        &[("continue-on-setup-warning", "on")][..],
        &[("raise-warnings", "off")][..],
    ] {
        let (session, _) = quiet_session(config_with(options));
        let ran = Flag::default();
        let case = TestCase::new(TestId::new("test_tolerant"), body(ran.clone()))
            .fixture(seeded_db(true));

        let run = run_test(&session, case);
        assert!(ran.is_set(), "{options:?}");
        assert_eq!(run.kind(Phase::Setup), Some(ReportKind::Passed));
        assert_eq!(
            session.report().test("test_tolerant").unwrap().outcome,
            Outcome::SetupWarning
        );
    }
}
