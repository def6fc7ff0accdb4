//! Integration test: one-year retention sweep.
//!
//! ## Scenarios
//! 1. An expired withdrawal anonymizes the user's reports (both as reporter
//!    and as target), deletes the content snapshot, activity logs, and
//!    warning history, then drops the withdrawal record.
//! 2. Withdrawals inside the retention window are untouched.
//! 3. The sweep is idempotent: a second run the same day does nothing.

use breezi_core::retention::{RetentionScheduler, RETENTION_DAYS};
use breezi_core::shared::{ActivityLog, ContentSnapshot, Report, ReportStatus, TargetType};
use breezi_core::{KvStore, WithdrawalRecord};
use chrono::{Duration, Utc};

fn seeded_store() -> (tempfile::TempDir, KvStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = KvStore::open_path(dir.path()).unwrap();

    let now = Utc::now();
    // u_old withdrew 13 months ago, u_new a week ago.
    store
        .set(
            "withdrawal:u_old",
            &WithdrawalRecord {
                user_id: "u_old".to_string(),
                email: "old@example.com".to_string(),
                deleted_at: now - Duration::days(RETENTION_DAYS + 30),
            },
        )
        .unwrap();
    store
        .set(
            "withdrawal:u_new",
            &WithdrawalRecord {
                user_id: "u_new".to_string(),
                email: "new@example.com".to_string(),
                deleted_at: now - Duration::days(7),
            },
        )
        .unwrap();

    // u_old appears once as target and once as reporter.
    let base = Report {
        id: String::new(),
        target_user_id: String::new(),
        target_type: TargetType::Comment,
        target_id: "c1".to_string(),
        reason: "욕설".to_string(),
        saved_content: Some(ContentSnapshot {
            title: None,
            content: Some("원문".to_string()),
            deleted: false,
            deleted_reason: None,
        }),
        reporter_id: None,
        reporter_email: None,
        reporter_ip: None,
        target_user_email: None,
        status: ReportStatus::Processed,
        action: None,
        processed_at: None,
        processed_by: None,
        created_at: now,
        version: 0,
    };
    store
        .set(
            "report:r1",
            &Report {
                id: "r1".to_string(),
                target_user_id: "u_old".to_string(),
                target_user_email: Some("old@example.com".to_string()),
                reporter_id: Some("someone".to_string()),
                reporter_email: Some("someone@example.com".to_string()),
                ..base.clone()
            },
        )
        .unwrap();
    store
        .set(
            "report:r2",
            &Report {
                id: "r2".to_string(),
                target_user_id: "u_new".to_string(),
                reporter_id: Some("u_old".to_string()),
                reporter_email: Some("old@example.com".to_string()),
                reporter_ip: Some("10.0.0.1".to_string()),
                ..base
            },
        )
        .unwrap();

    store
        .set(
            "activitylog:u_old:l1",
            &ActivityLog {
                id: "l1".to_string(),
                user_id: "u_old".to_string(),
                action: "login".to_string(),
                timestamp: now,
            },
        )
        .unwrap();
    store.set("user_warnings:u_old", &vec!["경고 1회"]).unwrap();

    (dir, store)
}

#[test]
fn sweep_scrubs_expired_users_and_is_idempotent() {
    let (_dir, store) = seeded_store();
    let scheduler = RetentionScheduler::new(store.clone(), RETENTION_DAYS);
    let now = Utc::now();

    let summary = scheduler.sweep(now).unwrap();
    assert_eq!(summary.withdrawals_removed, 1);
    assert_eq!(summary.reports_anonymized, 2);
    assert_eq!(summary.activity_logs_deleted, 1);
    assert_eq!(summary.warning_histories_deleted, 1);

    // Target-side report: email marker, snapshot replaced by deletion stub.
    let r1: Report = store.get("report:r1").unwrap().unwrap();
    assert_eq!(r1.target_user_email.as_deref(), Some("[삭제된 이메일]"));
    let snapshot = r1.saved_content.unwrap();
    assert!(snapshot.deleted);
    assert!(snapshot.content.is_none());
    assert_eq!(
        snapshot.deleted_reason.as_deref(),
        Some("법적 보관 기한(1년) 만료로 영구 삭제됨")
    );
    // The other party in r1 is untouched.
    assert_eq!(r1.reporter_email.as_deref(), Some("someone@example.com"));

    // Reporter-side report: email and IP markers, snapshot kept.
    let r2: Report = store.get("report:r2").unwrap().unwrap();
    assert_eq!(r2.reporter_email.as_deref(), Some("[삭제된 이메일]"));
    assert_eq!(r2.reporter_ip.as_deref(), Some("[삭제됨]"));
    assert!(r2.saved_content.is_some());

    // Per-user data is gone, the fresh withdrawal remains.
    assert!(!store.exists("withdrawal:u_old").unwrap());
    assert!(store.exists("withdrawal:u_new").unwrap());
    assert!(!store.exists("activitylog:u_old:l1").unwrap());
    assert!(!store.exists("user_warnings:u_old").unwrap());

    // Second run finds nothing left.
    let second = scheduler.sweep(now).unwrap();
    assert_eq!(second.withdrawals_removed, 0);
    assert_eq!(second.reports_anonymized, 0);
}
