//! Per-topic statistics, top questions by impact, and topic reflections.

use serde::Serialize;

use super::topic::TopicExtractor;
use super::types::MemoryEntry;

#[derive(Debug, Clone, Serialize)]
pub struct TopicStats {
    pub topic: String,
    pub average_impact: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedQuestion {
    pub question: String,
    pub impact_score: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    /// One row per topic, in first-seen order.
    pub topics: Vec<TopicStats>,
    pub top_questions: Vec<RankedQuestion>,
}

impl AnalyticsSummary {
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn topic(&self, name: &str) -> Option<&TopicStats> {
        self.topics.iter().find(|t| t.topic == name)
    }
}

pub fn summarize(entries: &[MemoryEntry], topics: &TopicExtractor, top_n: usize) -> AnalyticsSummary {
    let stats = topics
        .group_entries(entries)
        .into_iter()
        .map(|group| {
            let count = group.entries.len();
            let sum: i64 = group.entries.iter().map(|e| e.impact_score).sum();
            TopicStats {
                topic: group.topic,
                average_impact: sum as f64 / count as f64,
                count,
            }
        })
        .collect();

    AnalyticsSummary {
        topics: stats,
        top_questions: top_questions(entries.iter(), top_n),
    }
}

/// Highest-impact questions first; equal scores keep log order.
pub fn top_questions<'a>(
    entries: impl Iterator<Item = &'a MemoryEntry>,
    n: usize,
) -> Vec<RankedQuestion> {
    let mut ranked: Vec<&MemoryEntry> = entries.collect();
    ranked.sort_by(|a, b| b.impact_score.cmp(&a.impact_score));
    ranked
        .into_iter()
        .take(n)
        .map(|e| RankedQuestion {
            question: e.question.clone(),
            impact_score: e.impact_score,
        })
        .collect()
}

/// Render the analytics report as Markdown.
pub fn render_report(summary: &AnalyticsSummary) -> String {
    let mut lines = vec![
        "# Analytics Report".to_string(),
        String::new(),
        "## Average Impact Score per Topic".to_string(),
        String::new(),
        "| Topic | Avg Impact | Questions |".to_string(),
        "|-------|-----------:|----------:|".to_string(),
    ];
    for stats in &summary.topics {
        lines.push(format!(
            "| {} | {:.2} | {} |",
            stats.topic, stats.average_impact, stats.count
        ));
    }
    lines.push(String::new());
    lines.push(format!(
        "## Top {} Most Impactful Questions",
        summary.top_questions.len()
    ));
    for q in &summary.top_questions {
        lines.push(format!("- ({}) {}", q.impact_score, q.question));
    }
    lines.join("\n")
}

/// What has been learned about one topic.
#[derive(Debug, Clone, Serialize)]
pub struct TopicReflection {
    pub topic: String,
    /// Summary of each entry, or its answer when the summary is empty.
    pub points: Vec<String>,
    pub top_questions: Vec<RankedQuestion>,
}

/// Group entries scoring at least `min_impact` (0 keeps all) into per-topic reflections.
pub fn reflect(
    entries: &[MemoryEntry],
    topics: &TopicExtractor,
    min_impact: i64,
    top_per_topic: usize,
) -> Vec<TopicReflection> {
    let kept: Vec<MemoryEntry> = if min_impact <= 0 {
        entries.to_vec()
    } else {
        entries
            .iter()
            .filter(|e| e.impact_score >= min_impact)
            .cloned()
            .collect()
    };

    topics
        .group_entries(&kept)
        .into_iter()
        .map(|group| TopicReflection {
            points: group
                .entries
                .iter()
                .map(|e| {
                    if e.summary.trim().is_empty() {
                        e.answer.clone()
                    } else {
                        e.summary.clone()
                    }
                })
                .collect(),
            top_questions: top_questions(group.entries.iter().copied(), top_per_topic),
            topic: group.topic,
        })
        .collect()
}

pub fn render_reflection(reflection: &TopicReflection, show_top: bool) -> String {
    let mut lines = vec![format!(
        "Here\u{2019}s what you\u{2019}ve learned so far about {}:",
        reflection.topic
    )];
    lines.extend(reflection.points.iter().map(|p| format!("- {p}")));
    if show_top {
        lines.push("Top questions:".to_string());
        lines.extend(
            reflection
                .top_questions
                .iter()
                .map(|q| format!("  - ({}) {}", q.impact_score, q.question)),
        );
    }
    lines.join("\n")
}
