//! Chat turn pipeline: safety screen -> persona routing -> reply generation
//! -> persistence.
//!
//! Provider failures never surface to the user: a failed generation falls
//! back to one of the selected persona's canned replies, and the turn is
//! still persisted. The only hard failures out of this module are storage
//! errors.

use crate::catalog::PersonaCatalog;
use crate::error::CoreError;
use crate::llm::{ChatTurn, LanguageModel};
use crate::memory::{keys, KvStore};
use crate::router::{PersonaRouter, RouteDecision};
use crate::safety;
use crate::shared::{AuthorRole, ChatMessage, ChatRoom};
use chrono::Utc;
use std::sync::Arc;

/// Turns of prior conversation handed to the model. Keeps the prompt small
/// while preserving the immediate thread.
const HISTORY_WINDOW: usize = 6;

/// Shared reply guidelines appended to every persona system prompt.
const RESPONSE_GUIDELINES: &str = "\n\n**응답 가이드라인:**\n- 2-4문장으로 짧고 따뜻하게 답변하세요.\n- 사용자의 감정을 먼저 인정한 뒤 이야기하세요.\n- 의학적 진단이나 처방은 하지 마세요.\n- 한국어로 답변하세요.";

/// Outcome of one user turn: what was said back and why that persona spoke.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: ChatMessage,
    pub decision: RouteDecision,
    pub crisis: bool,
}

pub struct ChatService {
    store: KvStore,
    catalog: Arc<PersonaCatalog>,
    router: PersonaRouter,
    llm: Option<Arc<dyn LanguageModel>>,
}

impl ChatService {
    pub fn new(
        store: KvStore,
        catalog: Arc<PersonaCatalog>,
        router: PersonaRouter,
        llm: Option<Arc<dyn LanguageModel>>,
    ) -> Self {
        Self {
            store,
            catalog,
            router,
            llm,
        }
    }

    /// Handles one inbound user message end to end. Persists the user
    /// message, the assistant reply, and the room summary.
    pub async fn send(
        &self,
        user_id: &str,
        room_id: &str,
        content: &str,
    ) -> Result<TurnOutcome, CoreError> {
        if content.trim().is_empty() {
            return Err(CoreError::Validation("empty message".to_string()));
        }

        let room = self.load_or_create_room(user_id, room_id)?;
        let crisis = safety::screen(content);
        let now = Utc::now();

        // History for the model is read before the new turn is persisted, so
        // the current message appears once in the prompt.
        let (decision, reply_text) = if crisis {
            // Screened messages always answer with the fixed crisis reply
            // from the default persona; the LLM is never consulted.
            tracing::warn!(target: "breezi::chat", %user_id, %room_id, "self-harm keyword detected");
            let decision = RouteDecision {
                persona_id: self.catalog.default_persona().id.clone(),
                reason: "위기 키워드 감지".to_string(),
                strategy: crate::router::RouteStrategy::Default,
            };
            (decision, safety::CRISIS_RESPONSE.to_string())
        } else {
            let decision = self
                .router
                .route(content, room.persona_id.as_deref(), room.is_group)
                .await;
            let text = self.generate_reply(user_id, room_id, &decision.persona_id, content).await;
            (decision, text)
        };

        let user_msg = ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            room_id: room_id.to_string(),
            author: AuthorRole::User,
            content: content.to_string(),
            timestamp: now,
            responding_persona_id: None,
            warning_flag: crisis,
        };
        self.store
            .set(&keys::chat_message(user_id, room_id, &user_msg.id), &user_msg)?;

        let reply = ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            room_id: room_id.to_string(),
            author: AuthorRole::Assistant,
            content: reply_text,
            timestamp: Utc::now(),
            responding_persona_id: Some(decision.persona_id.clone()),
            warning_flag: crisis,
        };
        self.store
            .set(&keys::chat_message(user_id, room_id, &reply.id), &reply)?;

        let updated = ChatRoom {
            last_message: Some(reply.content.chars().take(50).collect()),
            message_count: room.message_count + 2,
            updated_at: reply.timestamp,
            ..room
        };
        self.store.set(&keys::chat_room(user_id, room_id), &updated)?;

        Ok(TurnOutcome {
            reply,
            decision,
            crisis,
        })
    }

    /// All messages in a room, oldest first.
    pub fn history(&self, user_id: &str, room_id: &str) -> Result<Vec<ChatMessage>, CoreError> {
        let mut msgs: Vec<ChatMessage> = self
            .store
            .get_by_prefix(&keys::chat_message_prefix(user_id, room_id))?;
        msgs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(msgs)
    }

    pub fn rooms(&self, user_id: &str) -> Result<Vec<ChatRoom>, CoreError> {
        let mut rooms: Vec<ChatRoom> = self.store.get_by_prefix(&keys::chat_room_prefix(user_id))?;
        rooms.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rooms)
    }

    fn load_or_create_room(&self, user_id: &str, room_id: &str) -> Result<ChatRoom, CoreError> {
        if let Some(room) = self.store.get::<ChatRoom>(&keys::chat_room(user_id, room_id))? {
            return Ok(room);
        }
        // Unknown room id: treat it as a fresh group room. Fixed-persona
        // rooms are created with an explicit persona id by the caller.
        let room = ChatRoom {
            id: room_id.to_string(),
            user_id: user_id.to_string(),
            persona_id: None,
            is_group: true,
            last_message: None,
            message_count: 0,
            updated_at: Utc::now(),
        };
        self.store.set(&keys::chat_room(user_id, room_id), &room)?;
        Ok(room)
    }

    async fn generate_reply(
        &self,
        user_id: &str,
        room_id: &str,
        persona_id: &str,
        content: &str,
    ) -> String {
        let persona = match self.catalog.get(persona_id) {
            Some(p) => p,
            None => self.catalog.default_persona(),
        };

        if let Some(llm) = &self.llm {
            let system = format!("{}{}", persona.system_prompt, RESPONSE_GUIDELINES);
            let history = self.recent_turns(user_id, room_id);
            match llm.generate_text(&system, &history, content).await {
                Ok(text) if !text.trim().is_empty() => return text,
                Ok(_) => {
                    tracing::warn!(target: "breezi::chat", persona = %persona.id, "empty reply from provider");
                }
                Err(e) => {
                    tracing::warn!(target: "breezi::chat", persona = %persona.id, error = %e, "generation failed, using fallback reply");
                }
            }
        }

        // Canned persona replies keep the conversation alive when the
        // provider is unavailable.
        let replies = &persona.fallback_replies;
        let idx = Utc::now().timestamp_subsec_millis() as usize % replies.len().max(1);
        replies
            .get(idx)
            .cloned()
            .unwrap_or_else(|| "지금은 답변하기 어려워요. 잠시 후 다시 이야기해요.".to_string())
    }

    fn recent_turns(&self, user_id: &str, room_id: &str) -> Vec<ChatTurn> {
        let msgs = self.history(user_id, room_id).unwrap_or_default();
        msgs.iter()
            .rev()
            .take(HISTORY_WINDOW)
            .rev()
            .map(|m| ChatTurn {
                role: match m.author {
                    AuthorRole::User => "user".to_string(),
                    AuthorRole::Assistant => "assistant".to_string(),
                },
                content: m.content.clone(),
            })
            .collect()
    }
}
