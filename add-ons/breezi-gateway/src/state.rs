//! Shared handler state.

use breezi_core::{
    ChatService, DiaryService, EmotionAggregator, LanguageModel, ModerationEngine,
    NotificationQueue, RetentionScheduler, TimeCapsuleScheduler,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub moderation: Arc<ModerationEngine>,
    pub retention: Arc<RetentionScheduler>,
    pub capsules: Arc<TimeCapsuleScheduler>,
    pub emotion: Arc<EmotionAggregator>,
    pub diary: Arc<DiaryService>,
    pub notifications: NotificationQueue,
    pub llm: Option<Arc<dyn LanguageModel>>,
    pub admin_id: String,
}
