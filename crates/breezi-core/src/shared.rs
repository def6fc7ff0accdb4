//! Shared data model used across the BreezI crates.
//!
//! All records persist as flat JSON objects in the KV store. Fields use
//! `#[serde(default)]` liberally so records written by older builds keep
//! deserializing after additive changes.

use crate::error::CoreError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------
// Chat
// -----------------------------------------------------------------------------

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorRole {
    User,
    Assistant,
}

/// One message in a chat room. Immutable once stored; ordered by `timestamp`
/// within a room. Every assistant message in a group room carries
/// `responding_persona_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub room_id: String,
    pub author: AuthorRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Which persona answered. Always set on assistant messages in group rooms.
    #[serde(default)]
    pub responding_persona_id: Option<String>,
    /// Set when the safety screen flagged the user message (crisis keywords).
    #[serde(default)]
    pub warning_flag: bool,
}

/// A chat room. `is_group` rooms have no fixed persona; each turn's responder
/// is selected by the router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: String,
    pub user_id: String,
    /// Fixed persona for one-on-one rooms; `None` for group rooms.
    #[serde(default)]
    pub persona_id: Option<String>,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub message_count: u64,
    pub updated_at: DateTime<Utc>,
}

// -----------------------------------------------------------------------------
// Moderation
// -----------------------------------------------------------------------------

/// Account standing tracked per user by the moderation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
}

/// Per-user moderation state. Mutated only by the moderation state machine.
///
/// Invariant: `warning_count >= 5` implies `status == Suspended` with
/// `suspend_report_id` set to the triggering report. A suspended record with
/// no `suspend_report_id` is an admin-direct suspension and is not reversible
/// by ignoring a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationRecord {
    pub user_id: String,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default)]
    pub warning_count: u32,
    #[serde(default)]
    pub suspend_report_id: Option<String>,
    #[serde(default)]
    pub suspended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub suspend_reason: Option<String>,
    #[serde(default)]
    pub activated_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency token; bumped on every persisted write.
    #[serde(default)]
    pub version: u64,
}

impl ModerationRecord {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            status: AccountStatus::Active,
            warning_count: 0,
            suspend_report_id: None,
            suspended_at: None,
            suspend_reason: None,
            activated_at: None,
            version: 0,
        }
    }
}

/// Admin decision applied to a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Warn,
    Suspend,
    Ignore,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::Warn => "warn",
            ModerationAction::Suspend => "suspend",
            ModerationAction::Ignore => "ignore",
        }
    }

    /// Parses an action string. "warning" is accepted as a legacy spelling of
    /// "warn" (the admin UI historically sent both).
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.trim().to_lowercase().as_str() {
            "warn" | "warning" => Ok(ModerationAction::Warn),
            "suspend" => Ok(ModerationAction::Suspend),
            "ignore" => Ok(ModerationAction::Ignore),
            other => Err(CoreError::Validation(format!(
                "unknown moderation action '{}' (expected warn, suspend, or ignore)",
                other
            ))),
        }
    }
}

/// What kind of content a report targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Post,
    Comment,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Post => "post",
            TargetType::Comment => "comment",
        }
    }

    /// Korean label used in notification texts.
    pub fn label_ko(&self) -> &'static str {
        match self {
            TargetType::Post => "게시글",
            TargetType::Comment => "댓글",
        }
    }
}

/// Snapshot of the reported content, taken at report time so moderation can
/// proceed after the original is edited or deleted. The retention sweep
/// replaces it with a deletion marker after the legal hold expires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSnapshot {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub deleted_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Processed,
}

/// A user-submitted abuse report. `action`/`status` are stamped by processing;
/// a report may be re-processed with a different action, which undoes the
/// prior action's side effect first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub target_user_id: String,
    pub target_type: TargetType,
    pub target_id: String,
    pub reason: String,
    #[serde(default)]
    pub saved_content: Option<ContentSnapshot>,
    /// Reporter identifiers, kept for the 1-year legal hold then anonymized.
    #[serde(default)]
    pub reporter_id: Option<String>,
    #[serde(default)]
    pub reporter_email: Option<String>,
    #[serde(default)]
    pub reporter_ip: Option<String>,
    #[serde(default)]
    pub target_user_email: Option<String>,
    #[serde(default)]
    pub status: ReportStatus,
    #[serde(default)]
    pub action: Option<ModerationAction>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

// -----------------------------------------------------------------------------
// Diary & time capsules
// -----------------------------------------------------------------------------

/// One diary entry per user per calendar date (saving again for the same date
/// overwrites).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub user_id: String,
    /// Calendar date (YYYY-MM-DD); the uniqueness key together with `user_id`.
    pub date: NaiveDate,
    pub title: String,
    pub content: String,
    /// Emotion key: one of the builtin emotions or a user-defined custom key.
    pub emotion: String,
    #[serde(default)]
    pub compliment: Option<String>,
    #[serde(default)]
    pub regrets: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A diary entry time-locked until `open_date`. Transitions `is_open`
/// false -> true exactly once, via an explicit open request only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeCapsule {
    pub id: String,
    pub user_id: String,
    /// Links to the diary entry by its per-user date key.
    pub diary_date: NaiveDate,
    pub open_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_open: bool,
}

// -----------------------------------------------------------------------------
// Notifications
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Warning,
    Suspended,
    Reactivated,
}

/// Notification delivered to a user. Enqueued fire-and-forget; read state is
/// owned by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub related_id: Option<String>,
    #[serde(default)]
    pub related_type: Option<TargetType>,
}

// -----------------------------------------------------------------------------
// Retention
// -----------------------------------------------------------------------------

/// Record of a withdrawn (deleted) account, kept for the 1-year legal hold.
/// The retention sweep removes it and anonymizes everything that referenced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRecord {
    pub user_id: String,
    pub email: String,
    pub deleted_at: DateTime<Utc>,
}

/// One user-activity log line (kept for abuse investigation, deleted by the
/// retention sweep).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: String,
    pub user_id: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderation_action_parse() {
        assert_eq!(ModerationAction::parse("warn").unwrap(), ModerationAction::Warn);
        assert_eq!(ModerationAction::parse("warning").unwrap(), ModerationAction::Warn);
        assert_eq!(ModerationAction::parse(" Suspend ").unwrap(), ModerationAction::Suspend);
        assert_eq!(ModerationAction::parse("ignore").unwrap(), ModerationAction::Ignore);
        assert!(ModerationAction::parse("ban").is_err());
    }

    #[test]
    fn records_round_trip_as_flat_json() {
        let record = ModerationRecord::new("user-1");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "active");
        assert_eq!(json["warning_count"], 0);
        let back: ModerationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn old_records_without_new_fields_still_deserialize() {
        let raw = r#"{"user_id":"u1","status":"suspended","created_at":"2024-01-01T00:00:00Z"}"#;
        let report: Result<Report, _> = serde_json::from_str(
            r#"{"id":"r1","target_user_id":"u1","target_type":"post","target_id":"p1",
                "reason":"spam","created_at":"2024-01-01T00:00:00Z"}"#,
        );
        assert!(report.is_ok());
        let record: ModerationRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.status, AccountStatus::Suspended);
        assert_eq!(record.warning_count, 0);
    }
}
