//! Collaborator traits consumed by the triage pipeline.
//!
//! These traits live in `rambler-common` so that the triage core and the
//! LLM crate can both reference them without a dependency cycle.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Coarse sentiment of a thought chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

/// An enriched sub-chunk of a thought fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtChunk {
    /// 1-based chunk id within its fragment
    pub id: usize,

    pub text: String,

    /// Confidence score (0.0 - 1.0)
    pub confidence: f32,

    pub start_char: usize,

    pub end_char: usize,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub sentiment: Sentiment,

    /// Ids of the chunks this one was merged from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_from: Option<Vec<usize>>,

    /// Number of relationships that touched the merged group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_count: Option<usize>,
}

impl ThoughtChunk {
    /// The passthrough chunk used when no enricher is wired in.
    pub fn neutral(text: impl Into<String>) -> Self {
        let text = text.into();
        let end_char = text.chars().count();
        Self {
            id: 1,
            text,
            confidence: 0.85,
            start_char: 0,
            end_char,
            keywords: Vec::new(),
            sentiment: Sentiment::Neutral,
            merged_from: None,
            relationship_count: None,
        }
    }
}

/// Turns the text of a thought fragment into enriched chunks.
pub trait ThoughtEnricher: Send + Sync {
    fn name(&self) -> &str;

    fn enrich(&self, text: &str) -> Vec<ThoughtChunk>;
}

/// Kind of semantic relationship between two chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    SameTopic,
    SamePerson,
    SameEvent,
    CauseEffect,
    Temporal,
    None,
}

impl FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .trim_matches(|c| c == '[' || c == ']')
            .to_ascii_uppercase();
        match normalized.as_str() {
            "SAME_TOPIC" => Ok(Self::SameTopic),
            "SAME_PERSON" => Ok(Self::SamePerson),
            "SAME_EVENT" => Ok(Self::SameEvent),
            "CAUSE_EFFECT" => Ok(Self::CauseEffect),
            "TEMPORAL" | "TEMPORAL_SEQUENCE" => Ok(Self::Temporal),
            "NONE" => Ok(Self::None),
            other => Err(format!("unknown relationship type: {other}")),
        }
    }
}

/// A classified relationship between two text chunks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub relationship_type: RelationshipType,

    /// Confidence score (0.0 - 1.0)
    pub confidence: f32,
}

impl Relationship {
    pub fn none() -> Self {
        Self {
            relationship_type: RelationshipType::None,
            confidence: 0.0,
        }
    }
}

/// Optional remote classifier used to decide whether two thought chunks
/// should be merged. Failures only disable merging, never the pipeline.
#[async_trait]
pub trait RemoteClassifier: Send + Sync {
    fn name(&self) -> &str;

    async fn classify_relationship(&self, text_a: &str, text_b: &str) -> Result<Relationship>;
}
