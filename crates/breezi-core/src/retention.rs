//! Legal-hold retention sweep.
//!
//! Withdrawn accounts are kept on record for one year, then everything that
//! can identify the person is removed: the withdrawal record itself, report
//! emails and IPs (replaced with deletion markers), reported content
//! snapshots, activity logs, and warning/suspension history. The sweep is
//! idempotent: a second run on the same day finds nothing left to do.
//!
//! The decision (`plan`) is split from the store-applying executor (`sweep`)
//! so the expiry policy is testable without a store.

use crate::error::CoreError;
use crate::memory::{keys, KvStore};
use crate::shared::{ContentSnapshot, Report, WithdrawalRecord};
use chrono::{DateTime, Duration, Utc};

pub const RETENTION_DAYS: i64 = 365;

const DELETED_EMAIL_MARKER: &str = "[삭제된 이메일]";
const DELETED_MARKER: &str = "[삭제됨]";
const CONTENT_DELETED_REASON: &str = "법적 보관 기한(1년) 만료로 영구 삭제됨";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetentionStep {
    /// Drop the withdrawal record itself.
    DeleteWithdrawal,
    /// Strip the user's email/IP from reports and delete content snapshots.
    AnonymizeReports,
    /// Delete `activitylog:{user}:*`.
    DeleteActivityLogs,
    /// Delete `user_warnings:{user}`.
    DeleteWarningHistory,
}

/// One expired withdrawal and the cleanup it requires.
#[derive(Debug, Clone)]
pub struct RetentionAction {
    pub user_id: String,
    pub email: Option<String>,
    pub steps: Vec<RetentionStep>,
}

/// Whether a withdrawal has passed the retention window at `now`.
pub fn is_expired(record: &WithdrawalRecord, now: DateTime<Utc>, retention_days: i64) -> bool {
    record.deleted_at <= now - Duration::days(retention_days)
}

pub struct RetentionScheduler {
    store: KvStore,
    retention_days: i64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub withdrawals_removed: usize,
    pub reports_anonymized: usize,
    pub activity_logs_deleted: usize,
    pub warning_histories_deleted: usize,
}

impl RetentionScheduler {
    pub fn new(store: KvStore, retention_days: i64) -> Self {
        Self {
            store,
            retention_days,
        }
    }

    /// Pure decision pass: which users are past retention and what needs
    /// cleaning for each.
    pub fn plan(&self, now: DateTime<Utc>) -> Result<Vec<RetentionAction>, CoreError> {
        let withdrawals: Vec<WithdrawalRecord> =
            self.store.get_by_prefix(keys::WITHDRAWAL_PREFIX)?;
        let mut actions = Vec::new();
        for w in withdrawals {
            if !is_expired(&w, now, self.retention_days) {
                continue;
            }
            let mut steps = vec![RetentionStep::DeleteWithdrawal, RetentionStep::AnonymizeReports];
            if !self
                .store
                .keys_by_prefix(&keys::activity_log_prefix(&w.user_id))?
                .is_empty()
            {
                steps.push(RetentionStep::DeleteActivityLogs);
            }
            if self.store.exists(&keys::user_warnings(&w.user_id))? {
                steps.push(RetentionStep::DeleteWarningHistory);
            }
            actions.push(RetentionAction {
                user_id: w.user_id,
                email: Some(w.email),
                steps,
            });
        }
        Ok(actions)
    }

    /// Executes the plan. Returns what was cleaned; an empty summary means
    /// nothing had expired.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<SweepSummary, CoreError> {
        let actions = self.plan(now)?;
        if actions.is_empty() {
            return Ok(SweepSummary::default());
        }
        tracing::info!(target: "breezi::retention", expired = actions.len(), "retention sweep starting");

        let mut summary = SweepSummary::default();
        for action in &actions {
            summary.reports_anonymized += self.anonymize_reports(action)?;

            for key in self
                .store
                .keys_by_prefix(&keys::activity_log_prefix(&action.user_id))?
            {
                self.store.del(&key)?;
                summary.activity_logs_deleted += 1;
            }

            let warnings_key = keys::user_warnings(&action.user_id);
            if self.store.exists(&warnings_key)? {
                self.store.del(&warnings_key)?;
                summary.warning_histories_deleted += 1;
            }

            self.store.del(&keys::withdrawal(&action.user_id))?;
            summary.withdrawals_removed += 1;
        }

        tracing::info!(
            target: "breezi::retention",
            withdrawals = summary.withdrawals_removed,
            reports = summary.reports_anonymized,
            activity_logs = summary.activity_logs_deleted,
            warning_histories = summary.warning_histories_deleted,
            "retention sweep completed"
        );
        Ok(summary)
    }

    /// Scrubs one user's identifiers out of every report they appear in,
    /// whether as reporter or as target.
    fn anonymize_reports(&self, action: &RetentionAction) -> Result<usize, CoreError> {
        let mut cleaned = 0;
        for key in self.store.keys_by_prefix(keys::REPORT_PREFIX)? {
            let Some(report) = self.store.get::<Report>(&key)? else {
                continue;
            };
            let mut modified = report.clone();
            let mut touched = false;

            let matches_reporter = report.reporter_id.as_deref() == Some(action.user_id.as_str())
                || (action.email.is_some() && report.reporter_email == action.email);
            if matches_reporter && report.reporter_email.as_deref() != Some(DELETED_EMAIL_MARKER) {
                modified.reporter_email = Some(DELETED_EMAIL_MARKER.to_string());
                modified.reporter_ip = Some(DELETED_MARKER.to_string());
                touched = true;
            }

            let matches_target = report.target_user_id == action.user_id
                || (action.email.is_some() && report.target_user_email == action.email);
            if matches_target
                && report.target_user_email.as_deref() != Some(DELETED_EMAIL_MARKER)
            {
                modified.target_user_email = Some(DELETED_EMAIL_MARKER.to_string());
                if modified.saved_content.is_some() {
                    modified.saved_content = Some(ContentSnapshot {
                        title: None,
                        content: None,
                        deleted: true,
                        deleted_reason: Some(CONTENT_DELETED_REASON.to_string()),
                    });
                }
                touched = true;
            }

            if touched {
                modified.version += 1;
                self.store.set(&key, &modified)?;
                cleaned += 1;
            }
        }
        Ok(cleaned)
    }
}
