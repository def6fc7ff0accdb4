//! Report processing state machine.
//!
//! Re-processing a report is idempotent via undo-then-apply: the previous
//! action on the same report is reverted first, then the new action is
//! applied, so changing `warn` to `warn` leaves the count unchanged and
//! changing `warn` to `ignore` removes the warning. One known asymmetry is
//! kept on purpose: undoing a previous `suspend` does not reactivate the
//! account by itself; only an `ignore` whose report id matches
//! `suspend_report_id` does.
//!
//! Warning count 5 auto-suspends. All state transitions go through the
//! versioned CAS update on the profile key.

use crate::error::CoreError;
use crate::memory::{keys, KvStore};
use crate::notify::NotificationQueue;
use crate::shared::{
    AccountStatus, ContentSnapshot, ModerationAction, ModerationRecord, NotificationKind, Report,
    ReportStatus, TargetType,
};
use chrono::{DateTime, Utc};

/// Warnings that trigger automatic suspension.
pub const AUTO_SUSPEND_THRESHOLD: u32 = 5;

const PREVIEW_CHARS: usize = 50;
const NO_CONTENT_PREVIEW: &str = "내용 없음";

/// What the apply phase did, used to pick the outbound notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyEffect {
    Warned { count: u32 },
    Suspended { auto: bool },
    Reactivated,
    NoChange,
}

#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub report: Report,
    pub record: ModerationRecord,
    pub effect: ApplyEffect,
}

// --- pure transition functions ---------------------------------------------

/// Undo phase: reverts the effect of the action previously applied for this
/// same report. A previous `warn` decrements the count, floored at zero. A
/// previous `suspend` is left in place (resolved by the apply phase when the
/// new action is `ignore`). A previous `ignore` changed nothing.
pub fn undo_previous(record: &mut ModerationRecord, previous: ModerationAction) {
    match previous {
        ModerationAction::Warn => {
            record.warning_count = record.warning_count.saturating_sub(1);
        }
        ModerationAction::Suspend | ModerationAction::Ignore => {}
    }
}

/// Apply phase: mutates the record for the new action and reports what
/// happened so the caller can notify the user.
pub fn apply_action(
    record: &mut ModerationRecord,
    report: &Report,
    action: ModerationAction,
    preview: &str,
    now: DateTime<Utc>,
) -> ApplyEffect {
    match action {
        ModerationAction::Suspend => {
            record.status = AccountStatus::Suspended;
            record.suspended_at = Some(now);
            record.suspend_reason = Some(format!(
                "신고 접수 - {}\n{}: {}",
                report.reason,
                report.target_type.label_ko(),
                preview
            ));
            record.suspend_report_id = Some(report.id.clone());
            ApplyEffect::Suspended { auto: false }
        }
        ModerationAction::Warn => {
            record.warning_count += 1;
            if record.warning_count >= AUTO_SUSPEND_THRESHOLD {
                record.status = AccountStatus::Suspended;
                record.suspended_at = Some(now);
                record.suspend_reason = Some(format!(
                    "누적 경고 5회 - 최근 사유: {}\n{}: {}",
                    report.reason,
                    report.target_type.label_ko(),
                    preview
                ));
                record.suspend_report_id = Some(report.id.clone());
                ApplyEffect::Suspended { auto: true }
            } else {
                ApplyEffect::Warned {
                    count: record.warning_count,
                }
            }
        }
        ModerationAction::Ignore => {
            // Reactivate only when this very report caused the suspension.
            if record.suspend_report_id.as_deref() == Some(report.id.as_str()) {
                record.status = AccountStatus::Active;
                record.suspend_reason = None;
                record.suspended_at = None;
                record.suspend_report_id = None;
                record.activated_at = Some(now);
                ApplyEffect::Reactivated
            } else {
                ApplyEffect::NoChange
            }
        }
    }
}

// --- engine -----------------------------------------------------------------

pub struct ModerationEngine {
    store: KvStore,
    notifications: NotificationQueue,
}

impl ModerationEngine {
    pub fn new(store: KvStore, notifications: NotificationQueue) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Files a new report, snapshotting the target content so processing
    /// still has context after the author edits or deletes it.
    pub fn submit_report(
        &self,
        target_user_id: &str,
        target_type: TargetType,
        target_id: &str,
        reason: &str,
        reporter_id: &str,
        reporter_email: Option<&str>,
        reporter_ip: Option<&str>,
    ) -> Result<Report, CoreError> {
        if reason.trim().is_empty() {
            return Err(CoreError::Validation("report reason required".to_string()));
        }
        let saved_content = self.live_content(target_type, target_id)?;
        let report = Report {
            id: uuid::Uuid::new_v4().to_string(),
            target_user_id: target_user_id.to_string(),
            target_type,
            target_id: target_id.to_string(),
            reason: reason.to_string(),
            saved_content,
            reporter_id: Some(reporter_id.to_string()),
            reporter_email: reporter_email.map(str::to_string),
            reporter_ip: reporter_ip.map(str::to_string),
            target_user_email: None,
            status: ReportStatus::Pending,
            action: None,
            processed_at: None,
            processed_by: None,
            created_at: Utc::now(),
            version: 0,
        };
        self.store.set(&keys::report(&report.id), &report)?;
        tracing::info!(target: "breezi::moderation", report_id = %report.id, %target_user_id, "report submitted");
        Ok(report)
    }

    /// Processes (or re-processes) a report with the given action.
    pub fn process_report(
        &self,
        report_id: &str,
        action: ModerationAction,
        admin_id: &str,
    ) -> Result<ProcessOutcome, CoreError> {
        let report: Report = self
            .store
            .get(&keys::report(report_id))?
            .ok_or_else(|| CoreError::NotFound(format!("report {}", report_id)))?;

        if !self.store.exists(&keys::profile(&report.target_user_id))? {
            return Err(CoreError::NotFound(format!(
                "profile {}",
                report.target_user_id
            )));
        }

        let previous = match report.status {
            ReportStatus::Processed => report.action,
            ReportStatus::Pending => None,
        };
        let preview = self.content_preview(&report)?;
        let now = Utc::now();

        let mut effect = ApplyEffect::NoChange;
        let record = self
            .store
            .update::<ModerationRecord, _>(&keys::profile(&report.target_user_id), |current| {
                let mut rec = current.ok_or_else(|| {
                    CoreError::NotFound(format!("profile {}", report.target_user_id))
                })?;
                if let Some(prev) = previous {
                    undo_previous(&mut rec, prev);
                }
                effect = apply_action(&mut rec, &report, action, &preview, now);
                rec.version += 1;
                Ok(Some(rec))
            })?
            .ok_or_else(|| CoreError::Storage("profile update aborted".to_string()))?;

        let mut processed = report.clone();
        processed.status = ReportStatus::Processed;
        processed.action = Some(action);
        processed.processed_at = Some(now);
        processed.processed_by = Some(admin_id.to_string());
        processed.version += 1;
        self.store.set(&keys::report(report_id), &processed)?;

        self.notify(&processed, &effect, &preview)?;
        tracing::info!(
            target: "breezi::moderation",
            report_id,
            action = action.as_str(),
            effect = ?effect,
            warning_count = record.warning_count,
            "report processed"
        );

        Ok(ProcessOutcome {
            report: processed,
            record,
            effect,
        })
    }

    fn notify(&self, report: &Report, effect: &ApplyEffect, preview: &str) -> Result<(), CoreError> {
        let label = report.target_type.label_ko();
        match effect {
            ApplyEffect::Suspended { auto: false } => {
                self.notifications.enqueue(
                    &report.target_user_id,
                    NotificationKind::Suspended,
                    "계정 정지",
                    &format!(
                        "회원님의 {} {}이(가) 신고되어 계정이 정지되었습니다.\n사유: {}",
                        label, preview, report.reason
                    ),
                    Some(&report.target_id),
                    Some(report.target_type),
                )?;
            }
            ApplyEffect::Suspended { auto: true } => {
                self.notifications.enqueue(
                    &report.target_user_id,
                    NotificationKind::Suspended,
                    "계정 정지 (누적 경고 5회)",
                    &format!(
                        "누적 경고 횟수 5회 도달로 계정이 정지되었습니다.\n최근 위반 내용: {} {}\n사유: {}",
                        label, preview, report.reason
                    ),
                    Some(&report.target_id),
                    Some(report.target_type),
                )?;
            }
            ApplyEffect::Warned { count } => {
                self.notifications.enqueue(
                    &report.target_user_id,
                    NotificationKind::Warning,
                    &format!("경고 ({}/5)", count),
                    &format!(
                        "회원님의 {} {}이(가) 신고되어 경고 조치되었습니다.\n사유: {}\n누적 경고: {}회 (5회 시 계정 정지)",
                        label, preview, report.reason, count
                    ),
                    Some(&report.target_id),
                    Some(report.target_type),
                )?;
            }
            ApplyEffect::Reactivated => {
                self.notifications.enqueue(
                    &report.target_user_id,
                    NotificationKind::Reactivated,
                    "계정 활성화",
                    "신고가 무시 처리되어 계정이 다시 활성화되었습니다.",
                    Some(&report.target_id),
                    Some(report.target_type),
                )?;
            }
            ApplyEffect::NoChange => {}
        }
        Ok(())
    }

    /// Preview of the reported content for notification payloads. Prefers the
    /// snapshot taken at report time, then the live record.
    fn content_preview(&self, report: &Report) -> Result<String, CoreError> {
        match report.target_type {
            TargetType::Post => {
                if let Some(title) = report.saved_content.as_ref().and_then(|s| s.title.clone()) {
                    return Ok(format!("\"{}\"", title));
                }
                if let Some(post) = self.live_content(TargetType::Post, &report.target_id)? {
                    if let Some(title) = post.title {
                        return Ok(format!("\"{}\"", title));
                    }
                }
            }
            TargetType::Comment => {
                if let Some(content) = report.saved_content.as_ref().and_then(|s| s.content.clone()) {
                    return Ok(truncate_quoted(&content));
                }
                if let Some(content) = self
                    .live_content(TargetType::Comment, &report.target_id)?
                    .and_then(|c| c.content)
                {
                    return Ok(truncate_quoted(&content));
                }
            }
        }
        Ok(NO_CONTENT_PREVIEW.to_string())
    }

    fn live_content(
        &self,
        target_type: TargetType,
        target_id: &str,
    ) -> Result<Option<ContentSnapshot>, CoreError> {
        let key = match target_type {
            TargetType::Post => keys::community_post(target_id),
            TargetType::Comment => keys::community_comment(target_id),
        };
        self.store.get(&key)
    }

    /// All reports, newest first. Admin listing.
    pub fn list_reports(&self) -> Result<Vec<Report>, CoreError> {
        let mut reports: Vec<Report> = self.store.get_by_prefix(keys::REPORT_PREFIX)?;
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }
}

// Comment previews are truncated on a char boundary; byte slicing would split
// Hangul.
fn truncate_quoted(content: &str) -> String {
    let preview: String = content.chars().take(PREVIEW_CHARS).collect();
    format!("\"{}...\"", preview)
}
