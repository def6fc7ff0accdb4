//! Weekly/monthly emotion reports over diary entries.
//!
//! The histogram is seeded with the five builtin emotions so the chart always
//! shows every bucket, plus any custom emotion keys found in the entries.
//! `positive_ratio` counts only `happy`; custom emotions contribute to the
//! histogram and total but sit outside the positive/negative split.

use crate::error::CoreError;
use crate::llm::LanguageModel;
use crate::memory::{keys, KvStore};
use crate::shared::DiaryEntry;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Builtin emotions in display order. The order doubles as the dominant-
/// emotion tie-break.
pub const BUILTIN_EMOTIONS: [&str; 5] = ["happy", "sad", "angry", "anxious", "neutral"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Week,
    Month,
}

impl ReportPeriod {
    fn label_ko(&self) -> &'static str {
        match self {
            ReportPeriod::Week => "주",
            ReportPeriod::Month => "달",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightBucket {
    /// positive_ratio >= 0.7
    Positive,
    /// positive_ratio >= 0.5
    Balanced,
    /// below 0.5
    SeekSupport,
    /// no entries in the period
    InsufficientData,
}

#[derive(Debug, Clone)]
pub struct EmotionReport {
    /// Emotion key -> occurrence count; builtin keys always present.
    pub counts: Vec<(String, usize)>,
    pub total: usize,
    /// Highest count; first in histogram order wins ties. None when empty.
    pub dominant: Option<String>,
    pub positive_ratio: f64,
    pub bucket: InsightBucket,
    pub insight: String,
}

/// Rule-based aggregation over the entries of one report period.
pub fn aggregate(entries: &[DiaryEntry], period: ReportPeriod) -> EmotionReport {
    // Seed builtins first, then customs in first-seen order.
    let mut order: Vec<String> = BUILTIN_EMOTIONS.iter().map(|s| s.to_string()).collect();
    let mut histogram: BTreeMap<String, usize> =
        BUILTIN_EMOTIONS.iter().map(|s| (s.to_string(), 0)).collect();
    for entry in entries {
        if !histogram.contains_key(&entry.emotion) {
            order.push(entry.emotion.clone());
        }
        *histogram.entry(entry.emotion.clone()).or_insert(0) += 1;
    }
    let counts: Vec<(String, usize)> = order
        .iter()
        .map(|k| (k.clone(), histogram.get(k).copied().unwrap_or(0)))
        .collect();

    let total = entries.len();
    let dominant = if total == 0 {
        None
    } else {
        let max = counts.iter().map(|(_, c)| *c).max().unwrap_or(0);
        counts
            .iter()
            .find(|(_, c)| *c == max)
            .map(|(k, _)| k.clone())
    };

    let positive = histogram.get("happy").copied().unwrap_or(0);
    let positive_ratio = if total == 0 {
        0.0
    } else {
        positive as f64 / total as f64
    };

    let (bucket, insight) = fallback_insight(total, positive_ratio, period);

    EmotionReport {
        counts,
        total,
        dominant,
        positive_ratio,
        bucket,
        insight,
    }
}

fn fallback_insight(
    total: usize,
    positive_ratio: f64,
    period: ReportPeriod,
) -> (InsightBucket, String) {
    if total == 0 {
        return (
            InsightBucket::InsufficientData,
            "아직 충분한 데이터가 없어요. 일기를 더 작성해보세요!".to_string(),
        );
    }
    if positive_ratio >= 0.7 {
        (
            InsightBucket::Positive,
            format!(
                "이번 {}에는 전반적으로 긍정적인 감정이 많았어요! 이런 좋은 상태를 유지해보세요. ✨",
                period.label_ko()
            ),
        )
    } else if positive_ratio >= 0.5 {
        (
            InsightBucket::Balanced,
            "감정의 균형이 잘 잡혀있어요. 힘든 순간도 있었지만 잘 극복하고 계시는 것 같아요. 🌱"
                .to_string(),
        )
    } else {
        (
            InsightBucket::SeekSupport,
            "요즘 조금 힘든 시기를 보내고 계시는 것 같아요. 혼자 견디지 마시고, 주변 사람들에게 도움을 요청해보세요. 💜"
                .to_string(),
        )
    }
}

pub struct EmotionAggregator {
    store: KvStore,
}

impl EmotionAggregator {
    pub fn new(store: KvStore) -> Self {
        Self { store }
    }

    /// Loads the user's entries for `[period_start, period_end]` and builds
    /// the rule-based report.
    pub fn report(
        &self,
        user_id: &str,
        period_start: NaiveDate,
        period_end: NaiveDate,
        period: ReportPeriod,
    ) -> Result<EmotionReport, CoreError> {
        let entries = self.entries_between(user_id, period_start, period_end)?;
        Ok(aggregate(&entries, period))
    }

    /// Same report but with the insight text written by the model when one is
    /// configured. Any provider failure keeps the rule-based insight.
    pub async fn report_with_llm(
        &self,
        user_id: &str,
        period_start: NaiveDate,
        period_end: NaiveDate,
        period: ReportPeriod,
        llm: Option<&dyn LanguageModel>,
    ) -> Result<EmotionReport, CoreError> {
        let Some(llm) = llm else {
            return self.report(user_id, period_start, period_end, period);
        };
        let entries = self.entries_between(user_id, period_start, period_end)?;
        let mut report = aggregate(&entries, period);
        if report.total == 0 {
            return Ok(report);
        }
        match llm
            .generate_text(INSIGHT_SYSTEM_PROMPT, &[], &insight_prompt(&entries, &report, period))
            .await
        {
            Ok(text) if !text.trim().is_empty() => report.insight = text.trim().to_string(),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(target: "breezi::emotion", error = %e, "insight generation failed, keeping rule-based insight");
            }
        }
        Ok(report)
    }

    fn entries_between(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DiaryEntry>, CoreError> {
        let mut entries: Vec<DiaryEntry> = self
            .store
            .get_by_prefix(&keys::diary_prefix(user_id))?
            .into_iter()
            .filter(|e: &DiaryEntry| e.date >= start && e.date <= end)
            .collect();
        entries.sort_by_key(|e| e.date);
        Ok(entries)
    }
}

const INSIGHT_SYSTEM_PROMPT: &str = "당신은 사용자의 감정 일기를 분석하여 심리적 인사이트를 제공하는 전문 심리 상담 AI입니다.\n\n**지침:**\n1. 사용자의 일기 내용과 감정 패턴을 바탕으로 따뜻하고 공감적인 인사이트를 제공합니다\n2. 긍정적인 변화는 칭찬하고, 어려운 감정은 이해하며 위로합니다\n3. 2-3문장으로 간결하게 작성합니다\n4. 친근하고 따뜻한 톤을 유지합니다";

fn insight_prompt(entries: &[DiaryEntry], report: &EmotionReport, period: ReportPeriod) -> String {
    let label = |key: &str| match key {
        "happy" => "기쁨".to_string(),
        "sad" => "슬픔".to_string(),
        "angry" => "화남".to_string(),
        "anxious" => "불안".to_string(),
        "neutral" => "보통".to_string(),
        other => other.to_string(),
    };
    let summary: Vec<String> = report
        .counts
        .iter()
        .filter(|(_, c)| *c > 0)
        .map(|(k, c)| format!("{}: {}회", label(k), c))
        .collect();
    // Last 7 entries keep the prompt compact.
    let recent: Vec<String> = entries
        .iter()
        .rev()
        .take(7)
        .rev()
        .map(|e| format!("[{}] ({}) {}: {}", e.date, label(&e.emotion), e.title, e.content))
        .collect();
    format!(
        "**감정 리포트 기간:** 최근 1{}\n**총 일기 수:** {}개\n\n**감정 분포:**\n{}\n\n**최근 일기 내용:**\n{}\n\n위 내용을 분석하여 따뜻한 인사이트를 2-3문장으로 작성해주세요.",
        period.label_ko(),
        report.total,
        summary.join(", "),
        recent.join("\n")
    )
}
