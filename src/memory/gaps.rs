//! Knowledge-gap analysis over a memory log snapshot.
//!
//! Entries are grouped by topic, each group gets coverage statistics, and a [`GapMode`]
//! decides which groups are surfaced:
//!
//! | Mode | Surfaced when |
//! |------|---------------|
//! | `focused` | exactly one high-impact entry, or stale |
//! | `explore` | fewer than the sparse threshold of entries |
//! | `all` | any of the above |

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::Serialize;

use super::topic::{TopicExtractor, TopicGroup};
use super::types::MemoryEntry;
use crate::config::GapsConfig;

static OPEN_PROMPT_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(what|how|why|should)\b").expect("valid open-question pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GapMode {
    All,
    Focused,
    Explore,
}

impl GapMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Focused => "focused",
            Self::Explore => "explore",
        }
    }
}

impl std::fmt::Display for GapMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GapMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "focused" => Ok(Self::Focused),
            "explore" => Ok(Self::Explore),
            _ => Err(format!("unknown gap mode: {s}. Expected all, focused or explore")),
        }
    }
}

/// Thresholds for gap classification.
#[derive(Debug, Clone)]
pub struct GapPolicy {
    /// A topic is stale when its newest entry is strictly older than this.
    pub stale_after: Duration,
    /// Entries scoring strictly above this count as high impact.
    pub high_impact_above: i64,
    /// Topics with fewer entries than this are sparse.
    pub sparse_below: usize,
}

impl Default for GapPolicy {
    fn default() -> Self {
        Self::from(&GapsConfig::default())
    }
}

impl From<&GapsConfig> for GapPolicy {
    fn from(config: &GapsConfig) -> Self {
        Self {
            stale_after: Duration::days(config.stale_after_days),
            high_impact_above: config.high_impact_threshold,
            sparse_below: config.sparse_entry_count,
        }
    }
}

/// Why a topic was surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GapReason {
    FewEntries,
    SingleHighImpact,
    Stale,
}

/// Coverage statistics for one surfaced topic.
#[derive(Debug, Clone, Serialize)]
pub struct TopicGap {
    pub topic: String,
    pub total: usize,
    pub high_impact: usize,
    pub open_questions: Vec<String>,
    pub stale: bool,
    pub suggested_questions: Vec<String>,
    pub reasons: Vec<GapReason>,
}

/// Follow-up questions offered for a surfaced topic.
pub fn suggest_questions(topic: &str) -> Vec<String> {
    vec![
        format!("What else should I explore about {topic}?"),
        format!("How does {topic} apply in new contexts?"),
    ]
}

/// Surface the topics of `entries` that `mode` considers gaps, in first-seen order.
pub fn analyze(
    entries: &[MemoryEntry],
    mode: GapMode,
    topics: &TopicExtractor,
    policy: &GapPolicy,
    now: DateTime<Utc>,
) -> Vec<TopicGap> {
    topics
        .group_entries(entries)
        .iter()
        .filter_map(|group| classify(group, policy, now))
        .filter(|gap| selected_by(mode, &gap.reasons))
        .collect()
}

/// Statistics and triggered conditions for one group.
fn classify(group: &TopicGroup<'_>, policy: &GapPolicy, now: DateTime<Utc>) -> Option<TopicGap> {
    let latest = group.entries.iter().map(|e| e.timestamp).max()?;
    let total = group.entries.len();
    let high_impact = group
        .entries
        .iter()
        .filter(|e| e.impact_score > policy.high_impact_above)
        .count();
    let open_questions: Vec<String> = group
        .entries
        .iter()
        .filter(|e| OPEN_PROMPT_WORDS.is_match(&e.question))
        .map(|e| e.question.clone())
        .collect();
    let stale = now - latest > policy.stale_after;

    let mut reasons = Vec::new();
    if total < policy.sparse_below {
        reasons.push(GapReason::FewEntries);
    }
    if high_impact == 1 {
        reasons.push(GapReason::SingleHighImpact);
    }
    if stale {
        reasons.push(GapReason::Stale);
    }

    Some(TopicGap {
        suggested_questions: suggest_questions(&group.topic),
        topic: group.topic.clone(),
        total,
        high_impact,
        open_questions,
        stale,
        reasons,
    })
}

fn selected_by(mode: GapMode, reasons: &[GapReason]) -> bool {
    let has = |r: GapReason| reasons.contains(&r);
    match mode {
        GapMode::All => !reasons.is_empty(),
        GapMode::Focused => has(GapReason::SingleHighImpact) || has(GapReason::Stale),
        GapMode::Explore => has(GapReason::FewEntries),
    }
}

/// Human-readable reason text for reports.
pub fn describe_reason(reason: GapReason, policy: &GapPolicy) -> String {
    match reason {
        GapReason::FewEntries => format!("fewer than {} entries", policy.sparse_below),
        GapReason::SingleHighImpact => "only one high-impact entry".to_string(),
        GapReason::Stale => format!(
            "not updated in last {} days",
            policy.stale_after.num_days()
        ),
    }
}

/// Render surfaced gaps as Markdown.
pub fn render_markdown(gaps: &[TopicGap], policy: &GapPolicy) -> String {
    let mut lines = Vec::new();
    for gap in gaps {
        lines.push(format!("### {}", gap.topic));
        let reasons: Vec<String> = gap
            .reasons
            .iter()
            .map(|r| describe_reason(*r, policy))
            .collect();
        lines.push(format!("- Gap: {}", reasons.join(", ")));
        if !gap.open_questions.is_empty() {
            lines.push("- Existing open questions:".to_string());
            lines.extend(gap.open_questions.iter().map(|q| format!("  - {q}")));
        }
        lines.push("- Suggested next questions:".to_string());
        lines.extend(gap.suggested_questions.iter().map(|q| format!("  - {q}")));
        lines.push(String::new());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(question: &str, topic: &str, impact: i64, age: Duration, now: DateTime<Utc>) -> MemoryEntry {
        let mut e = MemoryEntry::new(question, "answer", "summary", impact, topic.into());
        e.timestamp = now - age;
        e
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("focused".parse::<GapMode>().unwrap(), GapMode::Focused);
        assert!("everything".parse::<GapMode>().is_err());
    }

    #[test]
    fn open_questions_match_whole_words_case_insensitively() {
        let now = Utc::now();
        let entries = vec![
            entry("WHAT is a monad?", "fp", 5, Duration::zero(), now),
            entry("Somewhat related note", "fp", 5, Duration::zero(), now),
            entry("Should I curry?", "fp", 5, Duration::zero(), now),
        ];
        let gaps = analyze(&entries, GapMode::All, &TopicExtractor::heuristic(), &GapPolicy::default(), now);
        // three entries, no high impact, fresh: not a gap at all
        assert!(gaps.is_empty());

        let gap = classify(
            &TopicExtractor::heuristic().group_entries(&entries)[0],
            &GapPolicy::default(),
            now,
        )
        .unwrap();
        assert_eq!(gap.open_questions, vec!["WHAT is a monad?", "Should I curry?"]);
    }

    #[test]
    fn staleness_boundary_is_strict() {
        let now = Utc::now();
        let policy = GapPolicy::default();
        let topics = TopicExtractor::heuristic();

        let exactly = vec![entry("q", "edge", 5, Duration::days(10), now)];
        let gap = &analyze(&exactly, GapMode::All, &topics, &policy, now)[0];
        assert!(!gap.stale);

        let older = vec![entry("q", "edge", 5, Duration::days(10) + Duration::seconds(1), now)];
        let gap = &analyze(&older, GapMode::All, &topics, &policy, now)[0];
        assert!(gap.stale);
        assert!(gap.reasons.contains(&GapReason::Stale));
    }

    #[test]
    fn high_impact_requires_strictly_above_threshold() {
        let now = Utc::now();
        let entries = vec![
            entry("a", "perf", 7, Duration::zero(), now),
            entry("b", "perf", 7, Duration::zero(), now),
            entry("c", "perf", 8, Duration::zero(), now),
        ];
        let gaps = analyze(&entries, GapMode::Focused, &TopicExtractor::heuristic(), &GapPolicy::default(), now);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].high_impact, 1);
        assert_eq!(gaps[0].reasons, vec![GapReason::SingleHighImpact]);
    }

    #[test]
    fn markdown_lists_reasons_and_suggestions() {
        let now = Utc::now();
        let entries = vec![entry("How do lifetimes work?", "lifetimes", 9, Duration::days(20), now)];
        let policy = GapPolicy::default();
        let gaps = analyze(&entries, GapMode::All, &TopicExtractor::heuristic(), &policy, now);
        let md = render_markdown(&gaps, &policy);

        assert!(md.contains("### lifetimes"));
        assert!(md.contains(
            "- Gap: fewer than 3 entries, only one high-impact entry, not updated in last 10 days"
        ));
        assert!(md.contains("  - How do lifetimes work?"));
        assert!(md.contains("  - What else should I explore about lifetimes?"));
        assert!(md.contains("  - How does lifetimes apply in new contexts?"));
    }
}
