//! Rule-based thought enrichment: sub-chunking, keywords and sentiment.

use std::collections::HashMap;
use std::sync::LazyLock;

use rambler_common::{Sentiment, ThoughtChunk, ThoughtEnricher};
use regex::Regex;

const CHUNK_CONFIDENCE: f32 = 0.85;
const MIN_SEGMENT_CHARS: usize = 10;
const LONG_SEGMENT_WORDS: usize = 15;
const MAX_KEYWORDS: usize = 5;

static FILLERS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\b(um|uh|er|ah)\b").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").unwrap());
static CONJUNCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(and|but|so|then)\b").unwrap());
static KEYWORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[a-zA-Z]{3,}\b").unwrap());
static CAPITALISED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+\b").unwrap());

const TRANSITION_MARKERS: &[&[&str]] = &[
    // temporal
    &["then", "next", "after", "before", "meanwhile", "now", "later"],
    // logical
    &["but", "however", "although", "though", "nevertheless", "anyway"],
    // additive
    &["also", "additionally", "furthermore", "moreover"],
    // topic shift
    &["speaking of", "by the way", "oh", "wait", "actually", "i mean"],
    // decision
    &["i should", "i need to", "i have to", "let me"],
    // memory
    &["i remember", "i forgot", "i was thinking", "i realized"],
];

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "amazing", "wonderful", "happy", "excited",
];
const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "horrible", "sad", "angry", "frustrated",
];

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "about", "through", "during", "before", "after", "above", "below", "between",
    "among", "up", "down", "out", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "can", "will", "just", "should", "now", "i", "me", "my", "myself", "we",
    "our", "ours", "ourselves", "you", "your", "yours", "yourself", "yourselves", "he", "him",
    "his", "himself", "she", "her", "hers", "herself", "it", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "these",
    "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "having", "do", "does", "did", "doing", "would", "could",
];

/// Default [`ThoughtEnricher`] used when no external enricher is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedEnricher;

impl RuleBasedEnricher {
    pub fn new() -> Self {
        Self
    }

    fn preprocess(text: &str) -> String {
        let collapsed = WHITESPACE.replace_all(text.trim(), " ");
        let without_fillers = FILLERS.replace_all(&collapsed, "");
        WHITESPACE
            .replace_all(&without_fillers, " ")
            .trim()
            .to_string()
    }

    /// Sentences further split on strong conjunctions, dropping short ones.
    fn segments(text: &str) -> Vec<String> {
        let mut result = Vec::new();

        for sentence in SENTENCE_END.split(text) {
            let sentence = sentence.trim();
            if sentence.is_empty() {
                continue;
            }

            let mut current = String::new();
            let mut last = 0;
            for m in CONJUNCTION.find_iter(sentence) {
                Self::append(&mut current, &sentence[last..m.start()]);
                if current.is_empty() {
                    Self::append(&mut current, m.as_str());
                } else {
                    result.push(std::mem::take(&mut current));
                }
                last = m.end();
            }
            Self::append(&mut current, &sentence[last..]);
            if !current.is_empty() {
                result.push(current);
            }
        }

        result
            .into_iter()
            .filter(|s| s.chars().count() > MIN_SEGMENT_CHARS)
            .collect()
    }

    fn append(current: &mut String, part: &str) {
        let part = part.trim();
        if part.is_empty() {
            return;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(part);
    }

    fn starts_new_chunk(segment: &str) -> bool {
        let lower = segment.to_lowercase();
        let has_marker = TRANSITION_MARKERS.iter().flat_map(|m| m.iter()).any(|marker| {
            lower.starts_with(marker) || lower.contains(&format!(" {marker} "))
        });
        has_marker || segment.contains('?') || segment.split_whitespace().count() > LONG_SEGMENT_WORDS
    }

    pub fn sentiment(text: &str) -> Sentiment {
        let lower = text.to_lowercase();
        let positive = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
        let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
        match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => Sentiment::Positive,
            std::cmp::Ordering::Less => Sentiment::Negative,
            std::cmp::Ordering::Equal => Sentiment::Neutral,
        }
    }

    /// Frequency-ranked content words, then capitalised words.
    pub fn keywords(text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let mut order: Vec<&str> = Vec::new();
        let mut frequency: HashMap<&str, usize> = HashMap::new();
        for word in KEYWORD.find_iter(&lower).map(|m| m.as_str()) {
            if word.len() <= 3 || STOPWORDS.contains(&word) {
                continue;
            }
            let count = frequency.entry(word).or_insert(0);
            if *count == 0 {
                order.push(word);
            }
            *count += 1;
        }
        // Stable sort keeps first-seen order among equal counts.
        order.sort_by_key(|w| std::cmp::Reverse(frequency[w]));

        let mut keywords: Vec<String> = order
            .into_iter()
            .take(MAX_KEYWORDS)
            .map(str::to_string)
            .collect();

        for word in CAPITALISED.find_iter(text).map(|m| m.as_str()) {
            let word_lower = word.to_lowercase();
            if !STOPWORDS.contains(&word_lower.as_str())
                && !keywords.iter().any(|k| k.to_lowercase() == word_lower)
            {
                keywords.push(word.to_string());
            }
        }

        keywords.truncate(MAX_KEYWORDS);
        keywords
    }

    fn chunk(id: usize, text: String, start_char: usize) -> ThoughtChunk {
        let end_char = start_char + text.chars().count();
        ThoughtChunk {
            id,
            keywords: Self::keywords(&text),
            sentiment: Self::sentiment(&text),
            confidence: CHUNK_CONFIDENCE,
            start_char,
            end_char,
            text,
            merged_from: None,
            relationship_count: None,
        }
    }
}

impl ThoughtEnricher for RuleBasedEnricher {
    fn name(&self) -> &str {
        "rule-based"
    }

    fn enrich(&self, text: &str) -> Vec<ThoughtChunk> {
        let cleaned = Self::preprocess(text);
        let segments = Self::segments(&cleaned);
        if segments.is_empty() {
            let mut chunk = ThoughtChunk::neutral(text.trim());
            chunk.sentiment = Self::sentiment(text);
            return vec![chunk];
        }

        let mut groups: Vec<(usize, Vec<String>)> = Vec::new();
        let mut cursor = 0;
        for (i, segment) in segments.into_iter().enumerate() {
            let located = cleaned[cursor..].find(&segment).map(|offset| cursor + offset);
            if let Some(byte_start) = located {
                cursor = byte_start;
            }

            match groups.last_mut() {
                Some((_, current)) if i == 0 || !Self::starts_new_chunk(&segment) => {
                    current.push(segment)
                }
                _ => {
                    let start_char = located.map_or(0, |b| cleaned[..b].chars().count());
                    groups.push((start_char, vec![segment]));
                }
            }
        }

        groups
            .into_iter()
            .enumerate()
            .map(|(i, (start_char, segments))| Self::chunk(i + 1, segments.join(" "), start_char))
            .collect()
    }
}
