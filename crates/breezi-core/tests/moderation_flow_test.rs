//! Integration test: report processing state machine over a real store.
//!
//! ## Scenarios
//! 1. Warn increments the count and notifies the user with "(n/5)".
//! 2. Re-processing the same report with the same action is idempotent.
//! 3. Changing a processed warn to ignore removes the warning.
//! 4. The fifth warning auto-suspends with the cumulative-warning notice.
//! 5. Ignoring the suspending report reactivates the account; ignoring any
//!    other report leaves the suspension in place.
//! 6. A re-processed suspend keeps the account suspended (documented
//!    asymmetry: undo of a suspend is not an automatic reactivation).
//! 7. Missing report or missing profile is a `NotFound`.

use breezi_core::shared::{AccountStatus, ModerationRecord, ReportStatus};
use breezi_core::{
    CoreError, KvStore, ModerationAction, ModerationEngine, NotificationQueue, TargetType,
};

fn engine() -> (tempfile::TempDir, KvStore, ModerationEngine, NotificationQueue) {
    let dir = tempfile::tempdir().unwrap();
    let store = KvStore::open_path(dir.path()).unwrap();
    let notifications = NotificationQueue::new(store.clone());
    let engine = ModerationEngine::new(store.clone(), notifications.clone());
    (dir, store, engine, notifications)
}

fn seed_profile(store: &KvStore, user_id: &str) {
    store
        .set(
            &format!("profile:{}", user_id),
            &ModerationRecord::new(user_id),
        )
        .unwrap();
}

fn profile(store: &KvStore, user_id: &str) -> ModerationRecord {
    store
        .get(&format!("profile:{}", user_id))
        .unwrap()
        .unwrap()
}

#[test]
fn warn_then_idempotent_reprocess() {
    let (_dir, store, engine, notifications) = engine();
    seed_profile(&store, "u1");

    let report = engine
        .submit_report("u1", TargetType::Comment, "c1", "욕설", "reporter", None, None)
        .unwrap();
    assert_eq!(report.status, ReportStatus::Pending);

    let outcome = engine
        .process_report(&report.id, ModerationAction::Warn, "admin")
        .unwrap();
    assert_eq!(outcome.record.warning_count, 1);
    assert_eq!(outcome.report.status, ReportStatus::Processed);

    // Same action again: undo (-1) then apply (+1) nets out to 1.
    let outcome = engine
        .process_report(&report.id, ModerationAction::Warn, "admin")
        .unwrap();
    assert_eq!(outcome.record.warning_count, 1);
    assert_eq!(profile(&store, "u1").warning_count, 1);

    let warning_notices = notifications
        .list("u1")
        .unwrap()
        .iter()
        .filter(|n| n.title.starts_with("경고"))
        .count();
    assert_eq!(warning_notices, 2);
}

#[test]
fn changing_warn_to_ignore_removes_the_warning() {
    let (_dir, store, engine, _) = engine();
    seed_profile(&store, "u1");

    let report = engine
        .submit_report("u1", TargetType::Post, "p1", "도배", "reporter", None, None)
        .unwrap();
    engine
        .process_report(&report.id, ModerationAction::Warn, "admin")
        .unwrap();
    assert_eq!(profile(&store, "u1").warning_count, 1);

    engine
        .process_report(&report.id, ModerationAction::Ignore, "admin")
        .unwrap();
    assert_eq!(profile(&store, "u1").warning_count, 0);
    assert_eq!(profile(&store, "u1").status, AccountStatus::Active);
}

#[test]
fn fifth_warning_auto_suspends() {
    let (_dir, store, engine, notifications) = engine();
    seed_profile(&store, "u1");

    let mut last_report_id = String::new();
    for i in 0..5 {
        let report = engine
            .submit_report("u1", TargetType::Comment, &format!("c{}", i), "욕설", "r", None, None)
            .unwrap();
        last_report_id = report.id.clone();
        engine
            .process_report(&report.id, ModerationAction::Warn, "admin")
            .unwrap();
    }

    let record = profile(&store, "u1");
    assert_eq!(record.warning_count, 5);
    assert_eq!(record.status, AccountStatus::Suspended);
    assert_eq!(record.suspend_report_id.as_deref(), Some(last_report_id.as_str()));

    let suspended_notice = notifications
        .list("u1")
        .unwrap()
        .into_iter()
        .find(|n| n.title.contains("누적 경고 5회"));
    assert!(suspended_notice.is_some());
}

#[test]
fn ignore_reactivates_only_for_the_suspending_report() {
    let (_dir, store, engine, notifications) = engine();
    seed_profile(&store, "u1");

    let suspending = engine
        .submit_report("u1", TargetType::Post, "p1", "심한 욕설", "r", None, None)
        .unwrap();
    engine
        .process_report(&suspending.id, ModerationAction::Suspend, "admin")
        .unwrap();
    assert_eq!(profile(&store, "u1").status, AccountStatus::Suspended);

    // An unrelated ignored report changes nothing.
    let other = engine
        .submit_report("u1", TargetType::Comment, "c1", "도배", "r", None, None)
        .unwrap();
    engine
        .process_report(&other.id, ModerationAction::Ignore, "admin")
        .unwrap();
    assert_eq!(profile(&store, "u1").status, AccountStatus::Suspended);

    // Ignoring the report that caused the suspension reactivates.
    engine
        .process_report(&suspending.id, ModerationAction::Ignore, "admin")
        .unwrap();
    let record = profile(&store, "u1");
    assert_eq!(record.status, AccountStatus::Active);
    assert!(record.suspend_report_id.is_none());
    assert!(record.activated_at.is_some());

    let reactivation = notifications
        .list("u1")
        .unwrap()
        .into_iter()
        .find(|n| n.title == "계정 활성화");
    assert!(reactivation.is_some());
}

#[test]
fn reprocessed_suspend_stays_suspended() {
    let (_dir, store, engine, _) = engine();
    seed_profile(&store, "u1");

    let report = engine
        .submit_report("u1", TargetType::Post, "p1", "욕설", "r", None, None)
        .unwrap();
    engine
        .process_report(&report.id, ModerationAction::Suspend, "admin")
        .unwrap();
    // Re-processing as suspend again: the undo phase does not reactivate.
    engine
        .process_report(&report.id, ModerationAction::Suspend, "admin")
        .unwrap();
    assert_eq!(profile(&store, "u1").status, AccountStatus::Suspended);
}

#[test]
fn missing_report_and_missing_profile_are_not_found() {
    let (_dir, store, engine, _) = engine();

    assert!(matches!(
        engine.process_report("nope", ModerationAction::Warn, "admin"),
        Err(CoreError::NotFound(_))
    ));

    // Report exists but the target has no profile record.
    let report = engine
        .submit_report("ghost", TargetType::Post, "p1", "욕설", "r", None, None)
        .unwrap();
    assert!(matches!(
        engine.process_report(&report.id, ModerationAction::Warn, "admin"),
        Err(CoreError::NotFound(_))
    ));
    let _ = store;
}
