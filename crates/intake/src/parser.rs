//! Rule-based command parser
//!
//! Turns one utterance ("delete the milk task", "remind me to call mom") into a
//! [`ParsedCommand`]. Intent groups are tried in a fixed precedence and the
//! first one that matches wins. Anything the rules do not recognise, or a
//! reference that resolves to no task, yields `None`: the caller treats that as
//! "no actionable command" and shows nothing.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{
    matcher::{find_matching_tasks_with, MatcherConfig, TaskMatch},
    models::{Area, Priority, Task},
};

/// What the user asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum CommandAction {
    Delete,
    Complete,
    Start,
    Cancel,
    Reopen,
    SetPriority,
    SetArea,
    Create,
}

impl CommandAction {
    /// Detection precedence when several groups could match
    pub const PRECEDENCE: [CommandAction; 8] = [
        CommandAction::Delete,
        CommandAction::Complete,
        CommandAction::Start,
        CommandAction::Cancel,
        CommandAction::Reopen,
        CommandAction::SetPriority,
        CommandAction::SetArea,
        CommandAction::Create,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandAction::Delete => "delete",
            CommandAction::Complete => "complete",
            CommandAction::Start => "start",
            CommandAction::Cancel => "cancel",
            CommandAction::Reopen => "reopen",
            CommandAction::SetPriority => "set_priority",
            CommandAction::SetArea => "set_area",
            CommandAction::Create => "create",
        }
    }

    /// Verb used in previews and descriptions
    pub fn label(&self) -> &'static str {
        match self {
            CommandAction::Delete => "Delete",
            CommandAction::Complete => "Mark as done",
            CommandAction::Start => "Start",
            CommandAction::Cancel => "Cancel",
            CommandAction::Reopen => "Reopen",
            CommandAction::SetPriority => "Set priority",
            CommandAction::SetArea => "Move to area",
            CommandAction::Create => "Create task",
        }
    }
}

impl std::fmt::Display for CommandAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient output of the parser; applied or discarded exactly once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCommand {
    pub action: CommandAction,
    pub matched_task_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<Area>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_title: Option<String>,
    pub description: String,
}

struct IntentRule {
    action: CommandAction,
    detect: Regex,
    /// Phrasings that look like this action but belong to a later rule
    exclude: Option<Regex>,
    verb: Regex,
    suffix: Option<Regex>,
}

/// Rules match case-insensitively so subjects keep the user's casing
fn rx(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("valid parser regex")
}

const PRIORITY_WORDS: &str = r"urgent|critical|important|high|medium|low";
const AREA_WORDS: &str =
    r"life admin|health|career|finance|brand|admin|training|fitness|workout|learning|work|money|budget|social";

static POLITENESS: Lazy<Regex> = Lazy::new(|| {
    rx(r"^(?:please|can you|could you|would you|will you|i want to|i'd like to|let's)\s+")
});
static TRAILING_PLEASE: Lazy<Regex> = Lazy::new(|| rx(r",?\s+please$"));
static DETERMINER: Lazy<Regex> = Lazy::new(|| rx(r"^(?:the|my|that|those|this|these)\s+"));
static TRAILING_NOUN: Lazy<Regex> = Lazy::new(|| rx(r"(?:^|\s+)(?:tasks?|todos?|items?)$"));

static RULES: Lazy<Vec<IntentRule>> = Lazy::new(|| {
    vec![
        IntentRule {
            action: CommandAction::Delete,
            exclude: None,
            detect: rx(r"^(?:delete|remove|erase|trash|drop|scrap|get rid of)\b"),
            verb: rx(r"^(?:delete|remove|erase|trash|drop|scrap|get rid of)\b"),
            suffix: None,
        },
        IntentRule {
            action: CommandAction::Complete,
            exclude: None,
            detect: rx(
                r"^(?:complete|completed|finish|finished|done with|tick off|check off|cross off|i finished|i completed|i did)\b|^mark\b.+\bas (?:done|complete|completed|finished)$",
            ),
            verb: rx(
                r"^(?:complete|completed|finish|finished|done with|tick off|check off|cross off|i finished|i completed|i did|mark)\b",
            ),
            suffix: Some(rx(r"\s+as\s+(?:done|complete|completed|finished)$")),
        },
        IntentRule {
            action: CommandAction::Start,
            exclude: None,
            detect: rx(
                r"^(?:start|begin|kick off|work on|i'm starting|i am starting)\b|^mark\b.+\bas (?:in progress|started)$",
            ),
            verb: rx(
                r"^(?:start working on|start on|start|begin|kick off|work on|i'm starting|i am starting|mark)\b",
            ),
            suffix: Some(rx(r"\s+as\s+(?:in progress|started)$")),
        },
        IntentRule {
            action: CommandAction::Cancel,
            exclude: None,
            detect: rx(
                r"^(?:cancel|abandon|skip|forget about)\b|^mark\b.+\bas (?:cancelled|canceled)$",
            ),
            verb: rx(r"^(?:cancel|abandon|skip|forget about|mark)\b"),
            suffix: Some(rx(r"\s+as\s+(?:cancelled|canceled)$")),
        },
        IntentRule {
            action: CommandAction::Reopen,
            exclude: None,
            detect: rx(
                r"^(?:reopen|re-open|uncomplete|restore|bring back)\b|^mark\b.+\bas (?:todo|to do|not done|undone|open)$",
            ),
            verb: rx(r"^(?:reopen|re-open|uncomplete|restore|bring back|mark)\b"),
            suffix: Some(rx(r"\s+as\s+(?:todo|to do|not done|undone|open)$")),
        },
        IntentRule {
            action: CommandAction::SetPriority,
            exclude: Some(rx(r"^make an? (?:new\s+)?(?:task|todo)\b")),
            detect: rx(&format!(
                r"^(?:set|change|make|mark|bump|raise|lower|prioriti[sz]e)\b.*\b(?:priority|{PRIORITY_WORDS})\b"
            )),
            verb: rx(
                r"^(?:set|change|make|mark|bump|raise|lower|prioriti[sz]e)\b(?:\s+(?:the\s+)?priority\s+(?:of|for|on))?",
            ),
            suffix: Some(rx(&format!(
                r"\s+(?:(?:as|to)\s+)?(?:(?:an?\s+)?(?:{PRIORITY_WORDS})(?:\s+priority)?|priority)$"
            ))),
        },
        IntentRule {
            action: CommandAction::SetArea,
            exclude: None,
            detect: rx(&format!(
                r"^(?:move|put|file|assign|set|change|tag|categori[sz]e)\b.*\b(?:area|category|{AREA_WORDS})\b"
            )),
            verb: rx(
                r"^(?:move|put|file|assign|set|change|tag|categori[sz]e)\b(?:\s+(?:the\s+)?(?:area|category)\s+(?:of|for))?",
            ),
            suffix: Some(rx(&format!(
                r"\s+(?:(?:to|in|into|under|as|with)\s+)?(?:the\s+)?(?:{AREA_WORDS})(?:\s+(?:area|category))?$"
            ))),
        },
        IntentRule {
            action: CommandAction::Create,
            exclude: None,
            detect: rx(
                r"^(?:add|create|new|capture|schedule|remind me to|remember to|i need to|i have to|i should|don't forget to|note to self|make an? (?:new\s+)?(?:task|todo))\b",
            ),
            verb: rx(
                r"^(?:(?:add|create|new|make|capture|schedule)(?:\s+(?:a|an|another))?(?:\s+new)?(?:\s+(?:task|todo|to-do|item))?(?:\s+(?:to|called|named|for))?|remind me to|remember to|i need to|i have to|i should|don't forget to|note to self)\b",
            ),
            suffix: None,
        },
    ]
});

/// Ordered priority keywords; the first key found in the input wins
const PRIORITY_KEYWORDS: [(&str, Priority); 6] = [
    ("urgent", Priority::Urgent),
    ("high", Priority::High),
    ("medium", Priority::Medium),
    ("low", Priority::Low),
    ("critical", Priority::Urgent),
    ("important", Priority::High),
];

/// Ordered area keywords; the first key found in the input wins
const AREA_KEYWORDS: [(&str, Area); 16] = [
    ("training", Area::Health),
    ("fitness", Area::Health),
    ("workout", Area::Health),
    ("health", Area::Health),
    ("learning", Area::Career),
    ("work", Area::Career),
    ("career", Area::Career),
    ("money", Area::Finance),
    ("budget", Area::Finance),
    ("finance", Area::Finance),
    ("social", Area::Brand),
    ("brand", Area::Brand),
    ("life admin", Area::Admin),
    ("admin", Area::Admin),
    ("chores", Area::Admin),
    ("errands", Area::Admin),
];

static PRIORITY_PATTERNS: Lazy<Vec<(Regex, Priority)>> = Lazy::new(|| {
    PRIORITY_KEYWORDS
        .iter()
        .map(|(word, priority)| (rx(&format!(r"\b{}\b", regex::escape(word))), *priority))
        .collect()
});

static AREA_PATTERNS: Lazy<Vec<(Regex, Area)>> = Lazy::new(|| {
    AREA_KEYWORDS
        .iter()
        .map(|(word, area)| (rx(&format!(r"\b{}\b", regex::escape(word))), *area))
        .collect()
});

/// Scan the whole input for a priority keyword
pub fn detect_priority(input: &str) -> Option<Priority> {
    PRIORITY_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(input))
        .map(|(_, priority)| *priority)
}

/// Scan the whole input for an area keyword
pub fn detect_area(input: &str) -> Option<Area> {
    AREA_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(input))
        .map(|(_, area)| *area)
}

fn normalize(input: &str) -> String {
    let trimmed = input.trim().trim_end_matches(|c: char| matches!(c, '.' | '!' | '?'));
    let mut text = collapse_whitespace(trimmed);

    // politeness can stack: "please can you ..."
    while let Some(end) = POLITENESS.find(&text).map(|m| m.end()) {
        text = text[end..].to_string();
    }
    TRAILING_PLEASE.replace(&text, "").into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn detect_rule(normalized: &str) -> Option<&'static IntentRule> {
    RULES.iter().find(|rule| {
        rule.detect.is_match(normalized)
            && !rule
                .exclude
                .as_ref()
                .is_some_and(|exclude| exclude.is_match(normalized))
    })
}

/// Pull the task phrase out of an utterance for the given action.
///
/// Strips a politeness prefix, the action's verb phrase, a leading determiner
/// and a trailing `task`/`todo`/`item` noun.
pub fn extract_subject(input: &str, action: CommandAction) -> String {
    let normalized = normalize(input);
    let Some(rule) = RULES.iter().find(|rule| rule.action == action) else {
        return normalized;
    };
    strip_for_rule(&normalized, rule)
}

fn strip_for_rule(normalized: &str, rule: &IntentRule) -> String {
    let mut subject = rule.verb.replace(normalized, "").into_owned();
    subject = subject
        .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ':' | ',' | '-'))
        .to_string();

    if let Some(suffix) = &rule.suffix {
        subject = suffix.replace(&subject, "").into_owned();
    }

    subject = DETERMINER.replace(&subject, "").into_owned();
    subject = TRAILING_NOUN.replace(&subject, "").into_owned();
    subject.trim().to_string()
}

fn quoted_titles(matches: &[TaskMatch]) -> String {
    matches
        .iter()
        .map(|m| format!("\"{}\"", m.title))
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe(
    action: CommandAction,
    matches: &[TaskMatch],
    priority: Option<Priority>,
    area: Option<Area>,
) -> String {
    let titles = quoted_titles(matches);
    match action {
        CommandAction::SetPriority => match priority {
            Some(p) => format!("Set priority to {} for {}", p, titles),
            None => format!("{} for {}", action.label(), titles),
        },
        CommandAction::SetArea => match area {
            Some(a) => format!("Move {} to {}", titles, a),
            None => format!("{} for {}", action.label(), titles),
        },
        _ => format!("{} {}", action.label(), titles),
    }
}

/// Rule-based parser bound to a matcher configuration
#[derive(Debug, Clone, Default)]
pub struct CommandParser {
    matcher: MatcherConfig,
}

impl CommandParser {
    pub fn new(matcher: MatcherConfig) -> Self {
        Self { matcher }
    }

    /// Parse one utterance against the current task list
    pub fn parse(&self, input: &str, tasks: &[Task]) -> Option<ParsedCommand> {
        let original = input.trim();
        if original.is_empty() {
            return None;
        }

        let normalized = normalize(original);
        let Some(rule) = detect_rule(&normalized) else {
            tracing::debug!("[PARSER] No intent recognised in '{}'", original);
            return None;
        };
        let action = rule.action;
        let subject = strip_for_rule(&normalized, rule);
        let priority = detect_priority(original);
        let area = detect_area(original);

        tracing::debug!(
            "[PARSER] action={} subject='{}' priority={:?} area={:?}",
            action,
            subject,
            priority,
            area
        );

        if action == CommandAction::Create {
            let title = if subject.is_empty() {
                original.to_string()
            } else {
                subject
            };
            let mut description = format!("{} \"{}\"", action.label(), title);
            if let Some(p) = priority {
                description.push_str(&format!(" ({} priority)", p));
            }
            if let Some(a) = area {
                description.push_str(&format!(" in {}", a));
            }
            return Some(ParsedCommand {
                action,
                matched_task_ids: Vec::new(),
                priority,
                area,
                new_title: Some(title),
                description,
            });
        }

        // a field change with no recognisable value has nothing to apply
        let (priority, area) = match action {
            CommandAction::SetPriority => (Some(priority?), None),
            CommandAction::SetArea => (None, Some(area?)),
            _ => (None, None),
        };

        let matches = find_matching_tasks_with(&subject, tasks, &self.matcher);
        if matches.is_empty() {
            tracing::debug!("[PARSER] No task matches '{}'", subject);
            return None;
        }

        Some(ParsedCommand {
            action,
            matched_task_ids: matches.iter().map(|m| m.task_id.clone()).collect(),
            priority,
            area,
            new_title: None,
            description: describe(action, &matches, priority, area),
        })
    }
}

/// Parse with the default matcher thresholds
pub fn parse_command(input: &str, tasks: &[Task]) -> Option<ParsedCommand> {
    CommandParser::default().parse(input, tasks)
}
