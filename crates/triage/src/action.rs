//! TODO / action item detection.

use std::sync::LazyLock;

use rambler_common::{Entity, EntityKind};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::confidence::Confidence;

const MAX_ACTION_CHARS: usize = 100;

// Order matters: the first pattern that matches decides where the action
// text starts.
static ACTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(need to|have to|should|must)\s+\w+",
        r"(?i)\b(don't forget|remember to|make sure)\s+\w+",
        r"(?i)\b(todo|task|reminder):\s*.+",
        r"(?i)\b(call|email|text|message|contact)\s+\w+",
        r"(?i)\b(buy|get|pick up|order)\s+\w+",
        r"(?i)\b(schedule|book|arrange|plan)\s+\w+",
        r"(?i)\b(pay|send|submit|file)\s+\w+",
    ]
    .into_iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const URGENT_WORDS: &[&str] = &["urgent", "asap", "immediately", "today", "!!!"];
const HEDGE_WORDS: &[&str] = &["eventually", "sometime", "maybe"];
const NEAR_TERM_WORDS: &[&str] = &["today", "tomorrow"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub action: String,
    pub urgency: Urgency,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ActionDetector;

impl ActionDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, text: &str) -> Option<ActionItem> {
        self.detect_with_entities(text, &[])
    }

    /// Like [`detect`](Self::detect), but DATE/TIME entities mentioning
    /// today or tomorrow also raise urgency.
    pub fn detect_with_entities(&self, text: &str, entities: &[Entity]) -> Option<ActionItem> {
        let start = ACTION_PATTERNS
            .iter()
            .find_map(|re| re.find(text))
            .map(|m| m.start())?;

        let action: String = text[start..].chars().take(MAX_ACTION_CHARS).collect();
        let confidence = if action.split_whitespace().count() > 3 {
            Confidence::High
        } else {
            Confidence::Medium
        };

        Some(ActionItem {
            action,
            urgency: Self::urgency(text, entities),
            confidence,
        })
    }

    fn urgency(text: &str, entities: &[Entity]) -> Urgency {
        let lower = text.to_lowercase();

        let near_term_entity = entities
            .iter()
            .filter(|e| matches!(e.kind, EntityKind::Date | EntityKind::Time))
            .any(|e| {
                let entity = e.text.to_lowercase();
                NEAR_TERM_WORDS.iter().any(|w| entity.contains(w))
            });
        let urgent_deadline = lower.contains("friday") && lower.contains("urgent");

        if URGENT_WORDS.iter().any(|w| lower.contains(w)) || near_term_entity || urgent_deadline {
            Urgency::High
        } else if HEDGE_WORDS.iter().any(|w| lower.contains(w)) {
            Urgency::Low
        } else {
            Urgency::Medium
        }
    }
}
