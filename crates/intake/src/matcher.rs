//! Fuzzy reference resolution between a spoken phrase and task titles.
//!
//! The scoring is deliberately crude (no edit distance, no stemming). Saved
//! commands and tests depend on the exact numbers it produces.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::Task;

/// Score for an exact (normalized) match
pub const EXACT_SCORE: f64 = 1.0;
/// Score when one string contains the other
pub const CONTAINMENT_SCORE: f64 = 0.85;
/// Tokens longer than this may match by containment
const PARTIAL_TOKEN_MIN_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatcherConfig {
    /// Minimum score for a task to be a candidate
    pub threshold: f64,
    /// A top score above this is treated as an unambiguous reference
    pub unambiguous_score: f64,
    /// Upper bound on candidates returned for an ambiguous reference
    pub max_candidates: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: 0.4,
            unambiguous_score: 0.8,
            max_candidates: 5,
        }
    }
}

/// A task that a phrase plausibly refers to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct TaskMatch {
    pub task_id: String,
    pub title: String,
    pub score: f64,
}

/// How well `a` names `b`, in `[0, 1]`
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a == b {
        return EXACT_SCORE;
    }
    if a.contains(&b) || b.contains(&a) {
        return CONTAINMENT_SCORE;
    }

    let a_tokens: Vec<&str> = a.split_whitespace().collect();
    let b_tokens: Vec<&str> = b.split_whitespace().collect();
    let denominator = a_tokens.len().max(b_tokens.len());
    if denominator == 0 {
        return 0.0;
    }

    let matches = a_tokens
        .iter()
        .filter(|wa| b_tokens.iter().any(|wb| tokens_match(wa, wb)))
        .count();

    matches as f64 / denominator as f64
}

fn tokens_match(a: &str, b: &str) -> bool {
    a == b
        || (a.chars().count() > PARTIAL_TOKEN_MIN_LEN && b.contains(a))
        || (b.chars().count() > PARTIAL_TOKEN_MIN_LEN && a.contains(b))
}

/// Resolve `subject` against `tasks` with the default thresholds
pub fn find_matching_tasks(subject: &str, tasks: &[Task]) -> Vec<TaskMatch> {
    find_matching_tasks_with(subject, tasks, &MatcherConfig::default())
}

/// Resolve `subject` against `tasks`.
///
/// Returns a single task when the best score clears
/// [`MatcherConfig::unambiguous_score`], otherwise up to
/// [`MatcherConfig::max_candidates`] candidates, best first.
pub fn find_matching_tasks_with(
    subject: &str,
    tasks: &[Task],
    config: &MatcherConfig,
) -> Vec<TaskMatch> {
    if subject.trim().is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<TaskMatch> = tasks
        .iter()
        .map(|task| TaskMatch {
            task_id: task.id.clone(),
            title: task.title.clone(),
            score: similarity(subject, &task.title),
        })
        .filter(|m| m.score >= config.threshold)
        .collect();

    // stable: equal scores keep store order
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));

    match scored.first() {
        Some(top) if top.score > config.unambiguous_score => {
            scored.truncate(1);
        }
        _ => scored.truncate(config.max_candidates),
    }

    tracing::debug!(
        "[MATCHER] '{}' resolved to {} candidate(s)",
        subject,
        scored.len()
    );
    scored
}
