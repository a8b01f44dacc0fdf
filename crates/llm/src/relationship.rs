//! LLM-backed relationship classification between two thought chunks.

use std::sync::Arc;

use async_trait::async_trait;
use rambler_common::{Relationship, RelationshipType, RemoteClassifier, Result};
use tracing::debug;

use crate::client::{LlmClient, LlmRequest};

/// Asks a chat model whether two segments discuss the same thing.
pub struct LlmRelationshipClassifier {
    client: Arc<dyn LlmClient>,
}

impl LlmRelationshipClassifier {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub fn build_prompt(text_a: &str, text_b: &str) -> String {
        format!(
            r#"Analyze if these two text segments are related:

Segment 1: "{text_a}"
Segment 2: "{text_b}"

Consider if they discuss:
- Same topic or subject
- Same person or entity
- Same event or situation
- Related cause and effect
- Temporal sequence

Respond with:
RELATIONSHIP: [SAME_TOPIC|SAME_PERSON|SAME_EVENT|CAUSE_EFFECT|TEMPORAL|NONE]
CONFIDENCE: [0.0 to 1.0]
REASONING: [brief explanation]

Example:
RELATIONSHIP: SAME_PERSON
CONFIDENCE: 0.95
REASONING: Both segments discuss the same boss and her behavior."#
        )
    }

    /// Parse `RELATIONSHIP:` / `CONFIDENCE:` lines. Unknown types and
    /// unparsable confidences degrade to NONE / 0.0.
    pub fn parse_response(response: &str) -> Relationship {
        let mut relationship = Relationship::none();

        for line in response.lines().map(str::trim) {
            if let Some(value) = line.strip_prefix("RELATIONSHIP:") {
                relationship.relationship_type =
                    value.parse().unwrap_or(RelationshipType::None);
            } else if let Some(value) = line.strip_prefix("CONFIDENCE:") {
                relationship.confidence = value
                    .trim()
                    .parse::<f32>()
                    .map(|c| c.clamp(0.0, 1.0))
                    .unwrap_or(0.0);
            }
        }

        if relationship.relationship_type == RelationshipType::None {
            relationship.confidence = 0.0;
        }
        relationship
    }
}

#[async_trait]
impl RemoteClassifier for LlmRelationshipClassifier {
    fn name(&self) -> &str {
        self.client.model_name()
    }

    async fn classify_relationship(&self, text_a: &str, text_b: &str) -> Result<Relationship> {
        let request = LlmRequest::prompt(Self::build_prompt(text_a, text_b))
            .with_temperature(0.0)
            .with_max_tokens(120);
        let response = self.client.complete(request).await?;
        let relationship = Self::parse_response(&response.content);

        debug!(
            model = %response.model,
            relationship = ?relationship.relationship_type,
            confidence = relationship.confidence,
            "Classified chunk relationship"
        );
        Ok(relationship)
    }
}
