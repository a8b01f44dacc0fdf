//! Merging of related thought chunks through an optional remote classifier.

use std::sync::Arc;
use std::time::Duration;

use rambler_common::{
    RamblerError, Relationship, RelationshipType, RemoteClassifier, Result, ThoughtChunk,
};
use tracing::{debug, warn};

use crate::config::MergeConfig;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.7;
pub const DEFAULT_WINDOW: usize = 3;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const MERGED_TEXT_SEPARATOR: &str = " ... ";

/// An accepted relationship between the chunks at two indices.
#[derive(Debug, Clone, Copy)]
struct Link {
    a: usize,
    b: usize,
}

/// Groups chunks the classifier considers related and merges each group.
pub struct ChunkMerger {
    classifier: Arc<dyn RemoteClassifier>,
    threshold: f32,
    window: usize,
    request_timeout: Duration,
}

impl ChunkMerger {
    pub fn new(classifier: Arc<dyn RemoteClassifier>) -> Self {
        Self {
            classifier,
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            window: DEFAULT_WINDOW,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn from_config(classifier: Arc<dyn RemoteClassifier>, config: &MergeConfig) -> Self {
        Self::new(classifier)
            .with_threshold(config.confidence_threshold)
            .with_window(config.window)
            .with_request_timeout(Duration::from_millis(config.request_timeout_ms))
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// How many following chunks each chunk is compared with.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Merge related chunks. Any classifier failure leaves the chunks as
    /// they were.
    pub async fn merge(&self, chunks: Vec<ThoughtChunk>) -> Vec<ThoughtChunk> {
        if chunks.len() < 2 {
            return chunks;
        }

        let links = match self.links(&chunks).await {
            Ok(links) => links,
            Err(e) => {
                warn!(
                    classifier = self.classifier.name(),
                    error = %e,
                    "Relationship classification failed, skipping chunk merge"
                );
                return chunks;
            }
        };

        if links.is_empty() {
            return chunks;
        }

        let groups = components(chunks.len(), &links);
        debug!(
            chunks = chunks.len(),
            relationships = links.len(),
            groups = groups.len(),
            "Merging related chunks"
        );

        groups
            .into_iter()
            .map(|members| {
                let edge_count = links
                    .iter()
                    .filter(|link| members.contains(&link.a))
                    .count();
                let group: Vec<&ThoughtChunk> = members.iter().map(|&i| &chunks[i]).collect();
                merge_group(&group, edge_count)
            })
            .collect()
    }

    async fn links(&self, chunks: &[ThoughtChunk]) -> Result<Vec<Link>> {
        let mut links = Vec::new();
        for a in 0..chunks.len() {
            let end = chunks.len().min(a + self.window + 1);
            for b in (a + 1)..end {
                let relationship = self.classify(&chunks[a].text, &chunks[b].text).await?;
                if relationship.relationship_type != RelationshipType::None
                    && relationship.confidence >= self.threshold
                {
                    debug!(
                        a = chunks[a].id,
                        b = chunks[b].id,
                        relationship = ?relationship.relationship_type,
                        confidence = relationship.confidence,
                        "Related chunks"
                    );
                    links.push(Link { a, b });
                }
            }
        }
        Ok(links)
    }

    async fn classify(&self, a: &str, b: &str) -> Result<Relationship> {
        tokio::time::timeout(
            self.request_timeout,
            self.classifier.classify_relationship(a, b),
        )
        .await
        .map_err(|_| {
            RamblerError::Llm(format!(
                "relationship request timed out after {:?}",
                self.request_timeout
            ))
        })?
    }
}

/// Connected components over the links, each sorted, ordered by first member.
fn components(len: usize, links: &[Link]) -> Vec<Vec<usize>> {
    let mut parent: Vec<usize> = (0..len).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for link in links {
        let ra = find(&mut parent, link.a);
        let rb = find(&mut parent, link.b);
        if ra != rb {
            parent[ra.max(rb)] = ra.min(rb);
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_of_root: Vec<Option<usize>> = vec![None; len];
    for i in 0..len {
        let root = find(&mut parent, i);
        match group_of_root[root] {
            Some(g) => groups[g].push(i),
            None => {
                group_of_root[root] = Some(groups.len());
                groups.push(vec![i]);
            }
        }
    }
    groups
}

fn merge_group(group: &[&ThoughtChunk], relationship_count: usize) -> ThoughtChunk {
    if let [single] = group {
        return (*single).clone();
    }

    let mut keywords: Vec<String> = Vec::new();
    for keyword in group.iter().flat_map(|c| c.keywords.iter()) {
        if !keywords.contains(keyword) {
            keywords.push(keyword.clone());
        }
    }

    ThoughtChunk {
        id: group.iter().map(|c| c.id).min().unwrap_or(1),
        text: group
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(MERGED_TEXT_SEPARATOR),
        confidence: group.iter().map(|c| c.confidence).sum::<f32>() / group.len() as f32,
        start_char: group.iter().map(|c| c.start_char).min().unwrap_or(0),
        end_char: group.iter().map(|c| c.end_char).max().unwrap_or(0),
        keywords,
        sentiment: group[0].sentiment,
        merged_from: Some(group.iter().map(|c| c.id).collect()),
        relationship_count: Some(relationship_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rambler_common::Sentiment;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Relates chunks whose texts share the first word.
    struct FirstWordClassifier {
        calls: AtomicUsize,
        confidence: f32,
    }

    impl FirstWordClassifier {
        fn new(confidence: f32) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                confidence,
            }
        }
    }

    #[async_trait]
    impl RemoteClassifier for FirstWordClassifier {
        fn name(&self) -> &str {
            "first-word"
        }

        async fn classify_relationship(&self, a: &str, b: &str) -> Result<Relationship> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if a.split_whitespace().next() == b.split_whitespace().next() {
                Ok(Relationship {
                    relationship_type: RelationshipType::SameTopic,
                    confidence: self.confidence,
                })
            } else {
                Ok(Relationship::none())
            }
        }
    }

    struct FailingClassifier;

    #[async_trait]
    impl RemoteClassifier for FailingClassifier {
        fn name(&self) -> &str {
            "failing"
        }

        async fn classify_relationship(&self, _a: &str, _b: &str) -> Result<Relationship> {
            Err(RamblerError::Llm("connection refused".into()))
        }
    }

    struct SlowClassifier;

    #[async_trait]
    impl RemoteClassifier for SlowClassifier {
        fn name(&self) -> &str {
            "slow"
        }

        async fn classify_relationship(&self, _a: &str, _b: &str) -> Result<Relationship> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Relationship::none())
        }
    }

    fn chunk(id: usize, text: &str, start: usize, keywords: &[&str]) -> ThoughtChunk {
        ThoughtChunk {
            id,
            text: text.to_string(),
            confidence: 0.8,
            start_char: start,
            end_char: start + text.len(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            sentiment: if id == 1 {
                Sentiment::Positive
            } else {
                Sentiment::Neutral
            },
            merged_from: None,
            relationship_count: None,
        }
    }

    fn sample() -> Vec<ThoughtChunk> {
        vec![
            chunk(1, "garden needs water", 0, &["garden", "water"]),
            chunk(2, "car needs tires", 20, &["tires"]),
            chunk(3, "garden fence is broken", 40, &["garden", "fence"]),
        ]
    }

    #[tokio::test]
    async fn test_related_chunks_are_merged() {
        let merger = ChunkMerger::new(Arc::new(FirstWordClassifier::new(0.9)));
        let merged = merger.merge(sample()).await;

        assert_eq!(merged.len(), 2);
        let garden = &merged[0];
        assert_eq!(garden.id, 1);
        assert_eq!(garden.text, "garden needs water ... garden fence is broken");
        assert_eq!(garden.merged_from, Some(vec![1, 3]));
        assert_eq!(garden.relationship_count, Some(1));
        assert_eq!(garden.keywords, vec!["garden", "water", "fence"]);
        assert_eq!(garden.start_char, 0);
        assert_eq!(garden.end_char, 40 + "garden fence is broken".len());
        assert_eq!(garden.sentiment, Sentiment::Positive);

        assert_eq!(merged[1].text, "car needs tires");
        assert!(merged[1].merged_from.is_none());
    }

    #[tokio::test]
    async fn test_low_confidence_relationships_are_ignored() {
        let merger = ChunkMerger::new(Arc::new(FirstWordClassifier::new(0.5)));
        assert_eq!(merger.merge(sample()).await, sample());
    }

    #[tokio::test]
    async fn test_window_limits_comparisons() {
        let classifier = Arc::new(FirstWordClassifier::new(0.9));
        let merger = ChunkMerger::new(classifier.clone()).with_window(1);
        let merged = merger.merge(sample()).await;

        // Chunks 1 and 3 are two apart, outside a window of one.
        assert_eq!(merged.len(), 3);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_transitive_groups() {
        let chunks = vec![
            chunk(1, "work was long", 0, &[]),
            chunk(2, "work meeting ran late", 10, &[]),
            chunk(3, "work again tomorrow", 30, &[]),
        ];
        let merger = ChunkMerger::new(Arc::new(FirstWordClassifier::new(0.95)));
        let merged = merger.merge(chunks).await;
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].merged_from, Some(vec![1, 2, 3]));
        assert_eq!(merged[0].relationship_count, Some(3));
        assert!((merged[0].confidence - 0.8).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_classifier_failure_leaves_chunks_unchanged() {
        let merger = ChunkMerger::new(Arc::new(FailingClassifier));
        assert_eq!(merger.merge(sample()).await, sample());
    }

    #[tokio::test]
    async fn test_classifier_timeout_leaves_chunks_unchanged() {
        let merger = ChunkMerger::new(Arc::new(SlowClassifier))
            .with_request_timeout(Duration::from_millis(20));
        assert_eq!(merger.merge(sample()).await, sample());
    }

    #[tokio::test]
    async fn test_single_chunk_skips_classifier() {
        let classifier = Arc::new(FirstWordClassifier::new(0.9));
        let merger = ChunkMerger::new(classifier.clone());
        let chunks = vec![chunk(1, "only one", 0, &[])];
        assert_eq!(merger.merge(chunks.clone()).await, chunks);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }
}
