//! BreezI — Core library.
//! Persona chat routing, community moderation, diaries, time capsules, and
//! emotion reports over a shared sled-backed key-value store.

pub mod capsule;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod diary;
pub mod emotion;
pub mod error;
pub mod llm;
pub mod memory;
pub mod moderation;
pub mod notify;
pub mod retention;
pub mod router;
pub mod safety;
pub mod shared;

pub use capsule::{can_open, days_until_open, local_day_floor, TimeCapsuleScheduler};
pub use catalog::{Persona, PersonaCatalog, GROUP_ROOM_PERSONA};
pub use chat::{ChatService, TurnOutcome};
pub use config::{BreeziConfig, UserConfig};
pub use diary::DiaryService;
pub use emotion::{aggregate, EmotionAggregator, EmotionReport, InsightBucket, ReportPeriod};
pub use error::CoreError;
pub use llm::{ChatTurn, LanguageModel, OpenAiBridge};
pub use memory::KvStore;
pub use moderation::{ModerationEngine, ProcessOutcome};
pub use notify::NotificationQueue;
pub use retention::{RetentionScheduler, SweepSummary};
pub use router::{PersonaRouter, RouteDecision, RouteStrategy};
pub use shared::{
    AccountStatus, ChatMessage, ChatRoom, DiaryEntry, ModerationAction, ModerationRecord,
    Notification, NotificationKind, Report, ReportStatus, TargetType, TimeCapsule,
    WithdrawalRecord,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
