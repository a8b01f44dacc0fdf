use std::sync::LazyLock;

use rambler_common::Fragment;
use regex::Regex;

use super::{locate_spans, Chunker};
use crate::segmentation::{basic_sentences, SegmentationMode};

/// Blocks longer than this (in characters) are split into sentences.
pub const MAX_BLOCK_CHARS: usize = 500;

static PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\n+").unwrap());

/// Delimiter-based chunking: paragraphs, then sentences for long blocks or
/// lines for SMS-style blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveChunker;

impl NaiveChunker {
    fn pieces(text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        for block in PARAGRAPH_BREAK.split(text) {
            if block.chars().count() > MAX_BLOCK_CHARS {
                pieces.extend(basic_sentences(block));
            } else if block.contains('\n') {
                pieces.extend(block.split('\n').map(str::to_string));
            } else {
                pieces.push(block.to_string());
            }
        }
        pieces
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()
    }
}

impl Chunker for NaiveChunker {
    fn name(&self) -> &'static str {
        "naive"
    }

    fn split(&self, text: &str, _mode: SegmentationMode) -> Vec<Fragment> {
        let pieces = Self::pieces(text);
        let spans = locate_spans(text, pieces.iter().map(String::as_str));
        pieces
            .into_iter()
            .zip(spans)
            .map(|(piece, (start, end))| Fragment::new(piece).with_span(start, end))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str) -> Vec<String> {
        NaiveChunker
            .split(text, SegmentationMode::default())
            .into_iter()
            .map(|f| f.text)
            .collect()
    }

    #[test]
    fn test_paragraphs_and_lines() {
        assert_eq!(
            split("need milk\n\nhttps://amazon.com\nasdf\n\n\n  \n\nlast one"),
            vec!["need milk", "https://amazon.com", "asdf", "last one"]
        );
    }

    #[test]
    fn test_long_block_splits_on_sentences() {
        let sentence = "This sentence is exactly long enough to matter here. ";
        let block = sentence.repeat(12);
        let pieces = split(&block);
        assert_eq!(pieces.len(), 12);
        assert!(pieces.iter().all(|p| p.ends_with('.')));
    }

    #[test]
    fn test_spans_point_into_source() {
        let text = "één\n\ntwee";
        let fragments = NaiveChunker.split(text, SegmentationMode::Strict);
        assert_eq!(fragments[1].text, "twee");
        assert_eq!((fragments[1].start_char, fragments[1].end_char), (5, 9));
        assert!(!fragments[0].has_entity_metadata());
    }

    #[test]
    fn test_whitespace_only_yields_nothing() {
        assert!(split(" \n\n \n").is_empty());
    }
}
