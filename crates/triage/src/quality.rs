//! Quality scoring: the gibberish detector.
//!
//! A fragment's score is the unweighted mean of five sub-scores. The
//! classification and recommended action are a pure function of that
//! score, so repeated analysis of the same text is always identical.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use rambler_common::preview;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Scores at or above this are processed as normal text.
pub const HIGH_QUALITY_THRESHOLD: f64 = 0.7;

/// Scores at or above this (and below high quality) go to review.
pub const SALVAGEABLE_THRESHOLD: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityClass {
    Empty,
    HighQuality,
    Salvageable,
    Gibberish,
}

impl QualityClass {
    /// Threshold function from score to class. Only meaningful for
    /// non-empty text; empty input short-circuits before scoring.
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_QUALITY_THRESHOLD {
            Self::HighQuality
        } else if score >= SALVAGEABLE_THRESHOLD {
            Self::Salvageable
        } else {
            Self::Gibberish
        }
    }

    pub fn recommendation(&self) -> Recommendation {
        match self {
            Self::Empty => Recommendation::Discard,
            Self::HighQuality => Recommendation::Process,
            Self::Salvageable => Recommendation::Review,
            Self::Gibberish => Recommendation::Quarantine,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Process,
    Review,
    Quarantine,
    Discard,
}

/// The five independent sub-scores, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityScores {
    pub pattern: f64,
    pub coherence: f64,
    pub diversity: f64,
    pub structure: f64,
    pub repetition: f64,
}

impl QualityScores {
    pub fn mean(&self) -> f64 {
        (self.pattern + self.coherence + self.diversity + self.structure + self.repetition) / 5.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// Mean of the sub-scores, rounded to three decimals
    pub quality_score: f64,
    pub classification: QualityClass,
    pub issues: Vec<String>,
    /// Only populated for salvageable text
    pub salvageable_parts: Vec<String>,
    pub recommendation: Recommendation,
    pub scores: QualityScores,
    /// The analysed text, truncated for display
    pub original_text: String,
}

impl QualityAssessment {
    fn empty(text: &str) -> Self {
        Self {
            quality_score: 0.0,
            classification: QualityClass::Empty,
            issues: vec!["Empty or whitespace-only input".to_string()],
            salvageable_parts: Vec::new(),
            recommendation: Recommendation::Discard,
            scores: QualityScores::default(),
            original_text: text.to_string(),
        }
    }

    pub fn is_gibberish(&self) -> bool {
        self.classification == QualityClass::Gibberish
    }

    pub fn is_salvageable(&self) -> bool {
        self.classification == QualityClass::Salvageable && !self.salvageable_parts.is_empty()
    }
}

static COMMON_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "the", "be", "to", "of", "and", "a", "in", "that", "have", "i", "it", "for", "not", "on",
        "with", "he", "as", "you", "do", "at", "this", "but", "his", "by", "from", "they", "we",
        "say", "her", "she", "or", "an", "will", "my", "one", "all", "would", "there", "their",
        "what", "so", "up", "out", "if", "about", "who", "get", "which", "go",
    ]
    .into_iter()
    .collect()
});

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[a-zA-Z]+\b").unwrap());

static VERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\b(is|are|was|were|have|has|had|do|does|did|will|would|could|should|can|may|might",
        r"|must|shall|need|want|going|make|take|get|give|go|come|see|know|think|say|tell)\b"
    ))
    .unwrap()
});

static SALVAGE_DELIMITERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[;,\n\r|]+").unwrap());

static SENTENCE_PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").unwrap());

static GIBBERISH_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("encoding_errors", r"\x{FFFD}{2,}"),
        ("excessive_special", r"^[^a-zA-Z0-9\s]{10,}$"),
        ("number_soup", r"^[\d\s.\-()]+$"),
        ("random_caps", r"^(?:[A-Z]{1,2}[a-z]{0,2}){10,}$"),
        ("keyboard_smash", r"^[asdfghjkl;]{8,}$|^[qwerty]{8,}$"),
        ("truncated_base64", r"^[A-Za-z0-9+/]{20,}={0,2}$"),
        ("excessive_punctuation", r"^[!?.,:;]{5,}"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).unwrap()))
    .collect()
});

/// A run of one repeated character; the regex crate has no backreferences.
fn is_single_char_repeat(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => text.chars().count() >= 6 && chars.all(|c| c == first),
        None => false,
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Stateless quality classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityClassifier;

impl QualityClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, text: &str) -> QualityAssessment {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return QualityAssessment::empty(text);
        }

        let mut issues = Vec::new();

        let matched = Self::matched_patterns(trimmed);
        let pattern = if matched.is_empty() { 1.0 } else { 0.0 };
        issues.extend(matched.iter().map(|name| format!("Pattern: {name}")));

        let coherence = Self::word_coherence(trimmed);
        if coherence < 0.3 {
            issues.push("Low word coherence".to_string());
        }

        let diversity = Self::character_diversity(trimmed);
        if diversity < 0.3 {
            issues.push("Poor character diversity".to_string());
        }

        let structure = Self::structure_score(trimmed);
        if structure < 0.3 {
            issues.push("No clear sentence structure".to_string());
        }

        let repetition = 1.0 - Self::repetition_score(trimmed);
        if repetition < 0.5 {
            issues.push("Excessive repetition".to_string());
        }

        let scores = QualityScores {
            pattern,
            coherence,
            diversity,
            structure,
            repetition,
        };
        let quality_score = round3(scores.mean()).clamp(0.0, 1.0);
        let classification = QualityClass::from_score(quality_score);

        let salvageable_parts = if classification == QualityClass::Salvageable {
            Self::salvage(trimmed)
        } else {
            Vec::new()
        };

        QualityAssessment {
            quality_score,
            classification,
            issues,
            salvageable_parts,
            recommendation: classification.recommendation(),
            scores,
            original_text: preview(trimmed, 100),
        }
    }

    /// Names of the gibberish patterns the whole text matches.
    pub fn matched_patterns(text: &str) -> Vec<&'static str> {
        let mut matched: Vec<&'static str> = GIBBERISH_PATTERNS
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(name, _)| *name)
            .collect();
        if is_single_char_repeat(text) {
            matched.push("single_char_repeat");
        }
        matched
    }

    /// Fraction of alphabetic words that are common or very short.
    pub fn word_coherence(text: &str) -> f64 {
        let lower = text.to_lowercase();
        let words: Vec<&str> = WORD.find_iter(&lower).map(|m| m.as_str()).collect();
        if words.is_empty() {
            return 0.0;
        }
        let coherent = words
            .iter()
            .filter(|w| COMMON_WORDS.contains(*w) || w.len() <= 2)
            .count();
        (coherent as f64 / words.len() as f64).min(1.0)
    }

    pub fn character_diversity(text: &str) -> f64 {
        let total = text.chars().count();
        if total == 0 {
            return 0.0;
        }

        let mut alpha = 0usize;
        let mut digit = 0usize;
        let mut special = 0usize;
        let mut has_space = false;
        for c in text.chars() {
            if c.is_ascii_alphabetic() {
                alpha += 1;
            } else if c.is_ascii_digit() {
                digit += 1;
            } else if c.is_whitespace() {
                has_space = true;
            } else {
                special += 1;
            }
        }

        let total = total as f64;
        let alpha_ratio = alpha as f64 / total;
        let digit_ratio = digit as f64 / total;
        let special_ratio = special as f64 / total;

        if alpha > 0 && has_space && alpha_ratio > 0.5 && alpha_ratio < 0.95 {
            1.0
        } else if alpha_ratio > 0.3 {
            0.7
        } else if special_ratio > 0.5 || digit_ratio > 0.7 {
            0.2
        } else {
            0.4
        }
    }

    pub fn structure_score(text: &str) -> f64 {
        let mut score = 0.0;
        if text.split_whitespace().count() > 2 {
            score += 0.4;
        }
        if VERB.is_match(&text.to_lowercase()) {
            score += 0.3;
        }
        if text.starts_with(|c: char| c.is_ascii_uppercase()) {
            score += 0.15;
        }
        if text.ends_with('.') {
            score += 0.15;
        }
        f64::min(score, 1.0)
    }

    /// Larger of character and word repetition; 0 for short text.
    pub fn repetition_score(text: &str) -> f64 {
        let length = text.chars().count();
        if length < 10 {
            return 0.0;
        }

        let mut char_counts: HashMap<char, usize> = HashMap::new();
        for c in text.chars() {
            *char_counts.entry(c).or_default() += 1;
        }
        let char_repetition =
            char_counts.values().copied().max().unwrap_or(0) as f64 / length as f64;

        let lower = text.to_lowercase();
        let words: Vec<&str> = lower.split_whitespace().collect();
        let word_repetition = if words.is_empty() {
            0.0
        } else {
            let mut word_counts: HashMap<&str, usize> = HashMap::new();
            for w in &words {
                *word_counts.entry(w).or_default() += 1;
            }
            word_counts.values().copied().max().unwrap_or(0) as f64 / words.len() as f64
        };

        char_repetition.max(word_repetition)
    }

    /// Recover coherent pieces: delimiter-separated parts first, then any
    /// longer sentences not already kept.
    fn salvage(text: &str) -> Vec<String> {
        let mut parts: Vec<String> = Vec::new();

        for part in SALVAGE_DELIMITERS.split(text) {
            let part = part.trim();
            if part.chars().count() < 5 {
                continue;
            }
            if Self::word_coherence(part) > 0.5 || Self::structure_score(part) > 0.5 {
                parts.push(part.to_string());
            }
        }

        for sentence in SENTENCE_PUNCTUATION.split(text) {
            let sentence = sentence.trim();
            if sentence.chars().count() > 10
                && !parts.iter().any(|p| p == sentence)
                && Self::word_coherence(sentence) > 0.5
            {
                parts.push(sentence.to_string());
            }
        }

        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(text: &str) -> QualityAssessment {
        QualityClassifier::new().analyze(text)
    }

    #[test]
    fn test_empty_input_short_circuits() {
        for text in ["", "   ", "\n\t "] {
            let result = analyze(text);
            assert_eq!(result.classification, QualityClass::Empty);
            assert_eq!(result.quality_score, 0.0);
            assert_eq!(result.recommendation, Recommendation::Discard);
            assert!(result.salvageable_parts.is_empty());
        }
    }

    #[test]
    fn test_repeated_character_is_gibberish() {
        let result = analyze("aaaaaaaaaa");
        assert_eq!(result.classification, QualityClass::Gibberish);
        assert!(result.quality_score < 0.4);
        assert!(result
            .issues
            .contains(&"Pattern: single_char_repeat".to_string()));
        assert!(result.issues.contains(&"Excessive repetition".to_string()));
        assert!(result.salvageable_parts.is_empty());
    }

    #[test]
    fn test_keyboard_smash_is_gibberish() {
        let result = analyze("asdflkjasdf");
        assert_eq!(result.classification, QualityClass::Gibberish);
        assert_eq!(result.recommendation, Recommendation::Quarantine);
    }

    #[test]
    fn test_plain_sentence_is_high_quality() {
        let result = analyze("need milk and eggs");
        assert_eq!(result.classification, QualityClass::HighQuality);
        assert_eq!(result.recommendation, Recommendation::Process);
        assert!(result.quality_score >= HIGH_QUALITY_THRESHOLD);

        let result = analyze("meeting at 3pm with Sarah");
        assert_eq!(result.classification, QualityClass::HighQuality);
    }

    #[test]
    fn test_patterns() {
        assert_eq!(
            QualityClassifier::matched_patterns("12 34 (56) 78-90"),
            vec!["number_soup"]
        );
        assert!(QualityClassifier::matched_patterns("!!!!!!!!!!!!").contains(&"excessive_special"));
        assert!(QualityClassifier::matched_patterns("?!?!?! what").contains(&"excessive_punctuation"));
        assert!(QualityClassifier::matched_patterns("\u{FFFD}\u{FFFD} broken")
            .contains(&"encoding_errors"));
        assert!(QualityClassifier::matched_patterns("aGVsbG8gd29ybGQgaGVsbG8gd29ybGQ=")
            .contains(&"truncated_base64"));
        assert!(QualityClassifier::matched_patterns("the cat sat").is_empty());
    }

    #[test]
    fn test_sub_scores() {
        assert_eq!(QualityClassifier::word_coherence("the and to"), 1.0);
        assert_eq!(QualityClassifier::word_coherence("12345"), 0.0);
        assert_eq!(QualityClassifier::character_diversity("hello world"), 1.0);
        assert_eq!(QualityClassifier::character_diversity("#$%^&*"), 0.2);
        assert!((QualityClassifier::structure_score("This is a test.") - 1.0).abs() < 1e-9);
        assert_eq!(QualityClassifier::repetition_score("short"), 0.0);
    }

    #[test]
    fn test_classification_is_threshold_function() {
        assert_eq!(QualityClass::from_score(1.0), QualityClass::HighQuality);
        assert_eq!(QualityClass::from_score(0.7), QualityClass::HighQuality);
        assert_eq!(QualityClass::from_score(0.699), QualityClass::Salvageable);
        assert_eq!(QualityClass::from_score(0.4), QualityClass::Salvageable);
        assert_eq!(QualityClass::from_score(0.399), QualityClass::Gibberish);
        assert_eq!(QualityClass::from_score(0.0), QualityClass::Gibberish);
    }

    #[test]
    fn test_score_bounds_and_class_consistency() {
        let samples = [
            "hello",
            "zzzzzzzzzzzzzz",
            "The weather is nice today.",
            "qwerqwerqwer",
            "xkcd 927 lol, we have to fix this, whatever it is",
            "$$$ 100% FREE!!! click",
            "I was, um, thinking; we should go | maybe later",
        ];
        for text in samples {
            let result = analyze(text);
            assert!((0.0..=1.0).contains(&result.quality_score), "{text}");
            assert_eq!(
                result.classification,
                QualityClass::from_score(result.quality_score),
                "{text}"
            );
            if result.classification != QualityClass::Salvageable {
                assert!(result.salvageable_parts.is_empty(), "{text}");
            }
        }
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let classifier = QualityClassifier::new();
        let text = "brb; gotta go, the meeting is now | xx";
        assert_eq!(classifier.analyze(text), classifier.analyze(text));
    }

    #[test]
    fn test_salvage_keeps_coherent_parts() {
        let parts = QualityClassifier::salvage("zxqv; I will be at the office, qqqq");
        assert!(parts.contains(&"I will be at the office".to_string()));
        assert!(!parts.iter().any(|p| p == "zxqv" || p == "qqqq"));
    }
}
