use rambler_common::Fragment;

use super::{locate_spans, Chunker};
use crate::segmentation::{SegmentationMode, SegmentationService};

/// Groups sentences into thoughts through the segmentation service.
///
/// When the service has no model the groups are single sentences and the
/// fragments carry no entity metadata.
#[derive(Debug, Clone)]
pub struct DiscourseChunker {
    segmentation: SegmentationService,
}

impl DiscourseChunker {
    pub fn new(segmentation: SegmentationService) -> Self {
        Self { segmentation }
    }

    pub fn is_ready(&self) -> bool {
        self.segmentation.is_ready()
    }
}

impl Chunker for DiscourseChunker {
    fn name(&self) -> &'static str {
        "discourse"
    }

    fn split(&self, text: &str, mode: SegmentationMode) -> Vec<Fragment> {
        let ready = self.segmentation.is_ready();
        let groups = self.segmentation.segment(text, mode);

        let sentence_spans = locate_spans(
            text,
            groups
                .iter()
                .flat_map(|g| g.sentences.iter().map(String::as_str)),
        );
        let mut spans = sentence_spans.into_iter();

        groups
            .into_iter()
            .map(|group| {
                let group_spans: Vec<(usize, usize)> =
                    spans.by_ref().take(group.sentences.len()).collect();
                let start = group_spans.first().map_or(0, |s| s.0);
                let end = group_spans.last().map_or(0, |s| s.1);

                let fragment = Fragment::new(group.text.trim()).with_span(start, end);
                if ready {
                    fragment.with_entities(group.entities)
                } else {
                    fragment
                }
            })
            .filter(|f| !f.text.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rambler_common::EntityKind;

    #[test]
    fn test_unready_service_splits_on_punctuation() {
        let chunker = DiscourseChunker::new(SegmentationService::unavailable());
        assert!(!chunker.is_ready());
        let fragments = chunker.split("First thought. Second one? Third!", SegmentationMode::Loose);
        let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["First thought.", "Second one?", "Third!"]);
        assert!(fragments.iter().all(|f| !f.has_entity_metadata()));
    }

    #[test]
    fn test_lexicon_groups_and_tags_entities() {
        let chunker = DiscourseChunker::new(SegmentationService::with_lexicon(None));
        assert!(chunker.is_ready());

        let text = "I talked to Sarah today. She was upset. Anyway, I need to call Google support.";
        let fragments = chunker.split(text, SegmentationMode::Balanced);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].text, "I talked to Sarah today. She was upset.");
        assert!(fragments[0].has_entity(EntityKind::Person));
        assert!(fragments[1].has_entity(EntityKind::Org));
        assert_eq!(fragments[1].end_char, text.chars().count());
    }

    #[test]
    fn test_strict_mode_one_sentence_each() {
        let chunker = DiscourseChunker::new(SegmentationService::with_lexicon(None));
        let fragments = chunker.split("One. Two. Three.", SegmentationMode::Strict);
        assert_eq!(fragments.len(), 3);
        assert!(fragments.iter().all(|f| f.has_entity_metadata()));
    }
}
