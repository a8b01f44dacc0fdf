//! Fragment types: the unit of text every triage stage classifies.

use serde::{Deserialize, Serialize};

/// Kind of a named entity recognised inside a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityKind {
    Person,
    Org,
    Norp,
    Date,
    Time,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::Org => "ORG",
            Self::Norp => "NORP",
            Self::Date => "DATE",
            Self::Time => "TIME",
        }
    }
}

/// A named, typed span of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub kind: EntityKind,
}

impl Entity {
    pub fn new(text: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

/// A contiguous span of input text selected for independent classification.
///
/// Offsets are character indices into the source text and are best effort:
/// strategies that do not track positions leave both at 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Fragment text, trimmed
    pub text: String,

    /// Start character index in the source
    #[serde(default)]
    pub start_char: usize,

    /// End character index in the source (exclusive)
    #[serde(default)]
    pub end_char: usize,

    /// Entities found by entity-aware segmentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Entity>>,
}

impl Fragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            start_char: 0,
            end_char: 0,
            entities: None,
        }
    }

    pub fn with_span(mut self, start_char: usize, end_char: usize) -> Self {
        self.start_char = start_char;
        self.end_char = end_char;
        self
    }

    pub fn with_entities(mut self, entities: Vec<Entity>) -> Self {
        self.entities = Some(entities);
        self
    }

    /// Whether entity metadata was produced for this fragment.
    pub fn has_entity_metadata(&self) -> bool {
        self.entities.is_some()
    }

    pub fn entities(&self) -> &[Entity] {
        self.entities.as_deref().unwrap_or(&[])
    }

    pub fn has_entity(&self, kind: EntityKind) -> bool {
        self.entities().iter().any(|e| e.kind == kind)
    }

    pub fn entities_of(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities().iter().filter(move |e| e.kind == kind)
    }

    /// Short preview used in logs and the processing log.
    pub fn preview(&self, max_chars: usize) -> String {
        preview(&self.text, max_chars)
    }
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
