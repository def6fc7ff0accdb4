//! Persona catalog: the AI characters that answer in chat rooms.
//!
//! The catalog is an immutable value built at process start and passed into
//! the router explicitly — no process-wide singleton. Catalog order is
//! priority order: the first persona wins keyword-score ties and is the
//! default when nothing else matches.

use serde::{Deserialize, Serialize};

/// Room id marker for the multi-persona group room.
pub const GROUP_ROOM_PERSONA: &str = "char_group";

/// One AI chat character. `keywords` are scored with uniform weight 1;
/// `aliases` are matched as `@alias` mentions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub emoji: String,
    /// One-line specialty, enumerated in the LLM routing prompt.
    pub specialty: String,
    /// System prompt template defining voice and guidelines.
    pub system_prompt: String,
    pub aliases: Vec<String>,
    pub keywords: Vec<String>,
    /// Canned replies used when the LLM provider is unavailable or fails.
    pub fallback_replies: Vec<String>,
    /// Eligible for automatic selection (LLM routing and keyword scoring).
    /// Mention-only personas set this false and answer only when called by
    /// `@alias`.
    #[serde(default = "default_routable")]
    pub routable: bool,
}

fn default_routable() -> bool {
    true
}

/// Immutable, ordered persona catalog.
#[derive(Debug, Clone)]
pub struct PersonaCatalog {
    personas: Vec<Persona>,
}

impl PersonaCatalog {
    /// Builds a catalog from an ordered persona list. The first entry is the
    /// default persona.
    pub fn new(personas: Vec<Persona>) -> Self {
        Self { personas }
    }

    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }

    pub fn get(&self, id: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// First persona in priority order; selected when every routing strategy
    /// is inconclusive.
    pub fn default_persona(&self) -> &Persona {
        &self.personas[0]
    }

    /// Personas eligible for automatic routing, in priority order.
    pub fn routable_personas(&self) -> impl Iterator<Item = &Persona> {
        self.personas.iter().filter(|p| p.routable)
    }

    pub fn is_routable(&self, id: &str) -> bool {
        self.get(id).map_or(false, |p| p.routable)
    }
}

impl Default for PersonaCatalog {
    fn default() -> Self {
        Self::new(default_personas())
    }
}

/// The shipping BreezI character set, in priority order.
fn default_personas() -> Vec<Persona> {
    vec![
        Persona {
            id: "char_1".to_string(),
            name: "루미".to_string(),
            emoji: "💡".to_string(),
            specialty: "공감, 위로, 감정 수용, 정서적 안정".to_string(),
            system_prompt: "You are 루미, an empathetic emotional supporter who helps users feel safe and accepted.\n\
                Your primary goal is comfort, not solutions.\n\
                Respond with warmth, validation, and gentle encouragement.\n\
                Speak as if you are a close friend who understands feelings deeply.\n\n\
                [Guidelines]\n\
                - Focus on emotional validation, not problem-solving.\n\
                - Use soft, compassionate words and short rhythmic sentences.\n\
                - Include natural, comforting emojis occasionally.\n\
                - Never sound robotic or overly formal.\n\
                - When users feel sad, help them accept their emotions safely."
                .to_string(),
            aliases: vec!["루미".to_string(), "lumi".to_string()],
            keywords: [
                "힘들", "우울", "외로", "슬프", "불안", "걱정", "두려", "무서", "위로",
                "공감", "마음", "감정", "아프", "괴롭", "지쳐", "힘들어", "막막",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            fallback_replies: vec![
                "그 마음 이해해. 힘들 때는 언제든지 이야기해줘.".to_string(),
                "오늘 하루도 고생 많았어. 네 마음이 조금이나마 편안해지면 좋겠어.".to_string(),
                "그런 일이 있었구나. 네 감정을 솔직하게 표현해줘서 고마워.".to_string(),
            ],
            routable: true,
        },
        Persona {
            id: "char_2".to_string(),
            name: "카이".to_string(),
            emoji: "🌊".to_string(),
            specialty: "문제 해결, 계획 수립, 실천 방법, 습관 형성, 목표 달성".to_string(),
            system_prompt: "You are 카이, a pragmatic life coach who focuses on realistic, step-by-step advice.\n\
                You acknowledge emotions briefly, but quickly move toward practical solutions.\n\
                You help users find clarity and take action without overcomplicating things.\n\n\
                [Guidelines]\n\
                - Respond in 2~3 short sentences with a structured format:\n\
                [Empathy] -> [Problem Summary] -> [Action Suggestion]\n\
                - Avoid excessive warmth; stay focused and realistic.\n\
                - Use concise language and direct verbs (start, try, change, focus).\n\
                - Always offer one specific next step."
                .to_string(),
            aliases: vec!["카이".to_string(), "kai".to_string()],
            keywords: [
                "어떻게", "방법", "해결", "계획", "루틴", "습관", "시작", "정리", "관리",
                "조언", "문제", "전략", "돈", "커리어", "취업", "목표",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            fallback_replies: vec![
                "그 문제는 이렇게 접근해보면 어떨까요?".to_string(),
                "차근차근 정리해볼까요? 우선순위부터 생각해봐요.".to_string(),
            ],
            routable: true,
        },
        Persona {
            id: "char_3".to_string(),
            name: "레오".to_string(),
            emoji: "🌙".to_string(),
            specialty: "자기 이해, 내면 탐색, 의미 찾기, 성찰 유도".to_string(),
            system_prompt: "You are 레오, a reflective mentor who guides users toward self-understanding.\n\
                Instead of giving direct answers, you ask gentle questions that encourage self-awareness.\n\
                Your voice should feel calm, deep, and slightly poetic, like talking to a wise friend.\n\n\
                [Guidelines]\n\
                - Use one introspective question per message.\n\
                - Encourage the user to notice emotions, triggers, and patterns.\n\
                - Avoid advice; help them think rather than act.\n\
                - Leave space for reflection (\"Maybe…\" \"Could it be that…\" \"What if…\").\n\
                - Never rush to conclusions."
                .to_string(),
            aliases: vec!["레오".to_string(), "리오".to_string(), "leo".to_string()],
            keywords: [
                "왜", "이유", "생각", "의미", "나는", "스스로", "성찰", "이해", "원인",
                "진짜", "본질", "느낌",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            fallback_replies: vec![
                "왜 그렇게 느꼈을까요? 함께 생각해봐요.".to_string(),
                "그 순간, 진짜 마음은 어땠나요?".to_string(),
            ],
            routable: true,
        },
        // 리브 answers only when mentioned; automatic routing never selects it.
        Persona {
            id: "char_4".to_string(),
            name: "리브".to_string(),
            emoji: "🎵".to_string(),
            specialty: "데이터 기반 하루 리듬 분석, 루틴 조정, 일정 피드백".to_string(),
            system_prompt: "당신은 '리브'입니다. Rhythm Coach 역할로, 데이터 기반으로 하루 리듬을 분석하고 조율합니다. \n\
                슬로건: \"당신의 하루엔 어떤 리듬이 흐르고 있을까요?\" \n\
                대화 스타일: 지능적이고 균형 잡힘, 맥락 기반 공감, 루틴 조정, 일정 피드백 중심입니다."
                .to_string(),
            aliases: vec!["리브".to_string(), "rib".to_string()],
            keywords: Vec::new(),
            fallback_replies: vec![
                "오늘 일정이 많았네요. 내일은 좀 더 여유를 만들어볼까요?".to_string(),
            ],
            routable: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_priority_order() {
        let catalog = PersonaCatalog::default();
        let ids: Vec<&str> = catalog.personas().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["char_1", "char_2", "char_3", "char_4"]);
        assert_eq!(catalog.default_persona().id, "char_1");
    }

    #[test]
    fn rib_is_mention_only() {
        let catalog = PersonaCatalog::default();
        assert_eq!(catalog.get("char_4").unwrap().name, "리브");
        assert!(!catalog.is_routable("char_4"));
        let routable: Vec<&str> = catalog.routable_personas().map(|p| p.id.as_str()).collect();
        assert_eq!(routable, vec!["char_1", "char_2", "char_3"]);
    }

    #[test]
    fn lookup_by_id() {
        let catalog = PersonaCatalog::default();
        assert_eq!(catalog.get("char_2").unwrap().name, "카이");
        assert!(catalog.get("char_99").is_none());
    }
}
