//! PersonaRouter: selects the responding persona for each turn.
//!
//! Group-chat strategy chain, in priority order:
//! 1. explicit `@mention` (skips everything else),
//! 2. LLM routing (JSON `{character, reason}`, strict parse-then-validate),
//! 3. keyword scoring with the catalog-order tie-break,
//! 4. default persona.
//!
//! Routing never fails: every provider error, malformed reply, or unknown
//! persona id falls through to the next strategy, ending at the default
//! persona. Non-group rooms bypass routing entirely and use the room's fixed
//! persona.

pub mod keywords;
pub mod mention;

use crate::catalog::PersonaCatalog;
use crate::llm::LanguageModel;
use std::sync::Arc;
use std::time::Duration;

/// Which strategy produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStrategy {
    FixedRoom,
    Mention,
    LlmRouting,
    KeywordFallback,
    Default,
}

/// Routing outcome: the selected persona plus a human-readable reason the UI
/// can display ("루미 selected because ...").
#[derive(Debug, Clone)]
pub struct RouteDecision {
    pub persona_id: String,
    pub reason: String,
    pub strategy: RouteStrategy,
}

pub struct PersonaRouter {
    catalog: Arc<PersonaCatalog>,
    llm: Option<Arc<dyn LanguageModel>>,
    llm_timeout: Duration,
}

impl PersonaRouter {
    pub fn new(
        catalog: Arc<PersonaCatalog>,
        llm: Option<Arc<dyn LanguageModel>>,
        llm_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            llm,
            llm_timeout,
        }
    }

    /// Selects the responding persona. Pure selection: the caller attaches
    /// the decision to the outgoing message record.
    pub async fn route(
        &self,
        message: &str,
        room_persona_id: Option<&str>,
        is_group: bool,
    ) -> RouteDecision {
        if !is_group {
            let persona_id = room_persona_id
                .filter(|id| self.catalog.contains(id))
                .unwrap_or(&self.catalog.default_persona().id)
                .to_string();
            return RouteDecision {
                persona_id,
                reason: "고정 캐릭터 채팅방".to_string(),
                strategy: RouteStrategy::FixedRoom,
            };
        }

        // 1. Explicit mention wins outright.
        if let Some(id) = mention::parse(&self.catalog, message) {
            let name = self.catalog.get(&id).map(|p| p.name.clone()).unwrap_or_default();
            tracing::info!(target: "breezi::router", persona = %id, "routed by mention");
            return RouteDecision {
                persona_id: id,
                reason: format!("사용자가 {}를 직접 호출함", name),
                strategy: RouteStrategy::Mention,
            };
        }

        // 2. LLM routing, bounded by the configured timeout.
        if let Some(llm) = &self.llm {
            match tokio::time::timeout(self.llm_timeout, self.route_with_llm(llm.as_ref(), message))
                .await
            {
                Ok(Ok(decision)) => {
                    tracing::info!(target: "breezi::router", persona = %decision.persona_id, "routed by LLM");
                    return decision;
                }
                Ok(Err(reason)) => {
                    tracing::warn!(target: "breezi::router", %reason, "LLM routing failed, falling back to keywords");
                }
                Err(_) => {
                    tracing::warn!(target: "breezi::router", timeout_ms = self.llm_timeout.as_millis() as u64, "LLM routing timed out, falling back to keywords");
                }
            }
        }

        // 3. Keyword scoring; 4. default persona.
        self.route_with_keywords(message)
    }

    fn route_with_keywords(&self, message: &str) -> RouteDecision {
        let scores = keywords::score_all(&self.catalog, message);
        tracing::debug!(target: "breezi::router", ?scores, "keyword scores");
        match keywords::select(&scores) {
            Some(id) => {
                let specialty = self
                    .catalog
                    .get(id)
                    .map(|p| p.specialty.clone())
                    .unwrap_or_default();
                RouteDecision {
                    persona_id: id.to_string(),
                    reason: format!("키워드 감지: {}", specialty),
                    strategy: RouteStrategy::KeywordFallback,
                }
            }
            None => RouteDecision {
                persona_id: self.catalog.default_persona().id.clone(),
                reason: "기본 선택 (감정 지원)".to_string(),
                strategy: RouteStrategy::Default,
            },
        }
    }

    async fn route_with_llm(
        &self,
        llm: &dyn LanguageModel,
        message: &str,
    ) -> Result<RouteDecision, String> {
        let system = "당신은 JSON만 출력하는 라우터입니다. 설명 없이 JSON만 반환하세요.";
        let prompt = self.routing_prompt(message);
        let raw = llm
            .generate_json(system, &prompt)
            .await
            .map_err(|e| e.to_string())?;
        let (persona_id, reason) = parse_routing_reply(&self.catalog, &raw)?;
        Ok(RouteDecision {
            persona_id,
            reason,
            strategy: RouteStrategy::LlmRouting,
        })
    }

    /// Routing prompt enumerating each routable persona's specialty.
    /// Mention-only personas are never offered to the router model.
    fn routing_prompt(&self, message: &str) -> String {
        let mut out = String::from(
            "당신은 사용자의 메시지를 분석하여 가장 적합한 AI 캐릭터를 선택하는 라우터입니다.\n\n**캐릭터 정보:**\n",
        );
        for (i, p) in self.catalog.routable_personas().enumerate() {
            out.push_str(&format!(
                "\n{}. **{} ({})** {}\n   - 전문성: {}\n",
                i + 1,
                p.name,
                p.id,
                p.emoji,
                p.specialty
            ));
        }
        out.push_str(&format!(
            "\n**사용자 메시지:**\n\"{}\"\n\n**분석하여 JSON으로만 답변:**\n{{\n  \"character\": \"char_1\",\n  \"reason\": \"선택 이유 짧게 답변\"\n}}",
            message
        ));
        out
    }
}

/// Strict parse-then-validate of the LLM routing reply. Tolerates code-fenced
/// JSON and prose around the object, but the `character` field must be a
/// routable catalog persona id. Never panics; the router treats `Err` as
/// "fall through to keyword scoring".
pub fn parse_routing_reply(
    catalog: &PersonaCatalog,
    raw: &str,
) -> Result<(String, String), String> {
    let candidate = strip_code_fences(raw);
    let value: serde_json::Value = serde_json::from_str(candidate.trim())
        .or_else(|_| {
            // Last resort: extract the outermost {...} from surrounding prose.
            extract_json_object(&candidate)
                .ok_or("no JSON object in reply")
                .and_then(|s| serde_json::from_str(s).map_err(|_| "invalid JSON object"))
        })
        .map_err(|e| format!("routing reply parse failed: {}", e))?;

    let character = value
        .get("character")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "missing 'character' field".to_string())?;
    if !catalog.is_routable(character) {
        return Err(format!("'{}' is not a routable persona id", character));
    }
    let reason = value
        .get("reason")
        .and_then(|v| v.as_str())
        .unwrap_or("LLM 선택")
        .to_string();
    Ok((character.to_string(), reason))
}

fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        // Drop an optional language tag ("json") after the opening fence.
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        let rest = rest.trim_start();
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim().to_string();
        }
        return rest.trim().to_string();
    }
    trimmed.to_string()
}

fn extract_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    if end > start {
        Some(&s[start..=end])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let catalog = PersonaCatalog::default();
        let (id, reason) =
            parse_routing_reply(&catalog, r#"{"character":"char_2","reason":"실용적 질문"}"#)
                .unwrap();
        assert_eq!(id, "char_2");
        assert_eq!(reason, "실용적 질문");
    }

    #[test]
    fn parses_code_fenced_json() {
        let catalog = PersonaCatalog::default();
        let raw = "```json\n{\"character\": \"char_3\", \"reason\": \"성찰\"}\n```";
        let (id, _) = parse_routing_reply(&catalog, raw).unwrap();
        assert_eq!(id, "char_3");
    }

    #[test]
    fn parses_json_embedded_in_prose() {
        let catalog = PersonaCatalog::default();
        let raw = "선택 결과: {\"character\": \"char_1\", \"reason\": \"감정\"} 입니다.";
        let (id, _) = parse_routing_reply(&catalog, raw).unwrap();
        assert_eq!(id, "char_1");
    }

    #[test]
    fn unknown_persona_is_rejected() {
        let catalog = PersonaCatalog::default();
        let err = parse_routing_reply(&catalog, r#"{"character":"char_9"}"#).unwrap_err();
        assert!(err.contains("not a routable persona"));
    }

    #[test]
    fn mention_only_persona_is_rejected() {
        // 리브 is never offered to the router model, so a reply naming it is
        // treated like any other invalid id and falls through to keywords.
        let catalog = PersonaCatalog::default();
        let err = parse_routing_reply(&catalog, r#"{"character":"char_4","reason":"리듬"}"#)
            .unwrap_err();
        assert!(err.contains("not a routable persona"));
    }

    #[test]
    fn routing_prompt_lists_only_routable_personas() {
        let catalog = Arc::new(PersonaCatalog::default());
        let router = PersonaRouter::new(catalog, None, Duration::from_secs(1));
        let prompt = router.routing_prompt("안녕");
        assert!(prompt.contains("char_1"));
        assert!(prompt.contains("char_3"));
        assert!(!prompt.contains("char_4"));
    }

    #[test]
    fn missing_character_field_is_rejected() {
        let catalog = PersonaCatalog::default();
        assert!(parse_routing_reply(&catalog, r#"{"reason":"?"}"#).is_err());
        assert!(parse_routing_reply(&catalog, "not json at all").is_err());
    }
}
