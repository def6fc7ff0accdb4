//! Self-harm screening. Runs on every inbound user message BEFORE routing:
//! a flagged message skips the LLM entirely and returns the fixed crisis
//! reply, and the stored message carries `warning_flag = true`.

/// Substrings that trigger the crisis path.
const WARNING_KEYWORDS: [&str; 5] = ["죽고싶", "자살", "죽어버리", "사라지고싶", "끝내고싶"];

/// Fixed reply for screened messages. Includes the 생명사랑콜센터 hotline so
/// the user always gets an actionable contact even when the provider is down.
pub const CRISIS_RESPONSE: &str = "지금 정말 힘드시겠지만, 당신은 소중한 존재예요. 전문적인 도움을 받아보시는 건 어떨까요? 생명사랑콜센터(1393) 같은 곳에서 24시간 상담을 받으실 수 있어요. 💝";

/// True when the message contains any self-harm keyword.
pub fn screen(text: &str) -> bool {
    WARNING_KEYWORDS.iter().any(|kw| text.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_self_harm_keywords() {
        assert!(screen("요즘 너무 힘들어서 죽고싶다는 생각이 들어"));
        assert!(screen("자살에 대해 생각해봤어"));
        assert!(screen("그냥 사라지고싶어"));
    }

    #[test]
    fn passes_ordinary_distress() {
        assert!(!screen("오늘 너무 힘들고 우울해"));
        assert!(!screen("회사 가기 싫다"));
    }
}
