//! Sentence segmentation and thought grouping.
//!
//! A [`SegmentationService`] is constructed explicitly with an optional
//! [`SentenceModel`]. With a model it groups sentences into thoughts using
//! discourse markers, subjects and entity kinds; without one it degrades to
//! punctuation splitting and reports `is_ready() == false`.

mod lexicon;

pub use lexicon::{Gazetteer, LexiconModel};

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use rambler_common::{Entity, EntityKind, RamblerError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Granularity of thought grouping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentationMode {
    /// One sentence per thought
    Strict,
    #[default]
    Balanced,
    /// Only break on strong topic shifts
    Loose,
}

impl SegmentationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Balanced => "balanced",
            Self::Loose => "loose",
        }
    }
}

impl fmt::Display for SegmentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentationMode {
    type Err = RamblerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "balanced" => Ok(Self::Balanced),
            "loose" => Ok(Self::Loose),
            other => Err(RamblerError::Config(format!(
                "unknown segmentation mode '{other}' (expected strict, balanced or loose)"
            ))),
        }
    }
}

/// Lexical cue at the start of a sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    TopicShift,
    Continuation,
    Contrast,
    Filler,
}

const DISCOURSE_MARKERS: &[(MarkerKind, &[&str])] = &[
    (
        MarkerKind::TopicShift,
        &["anyway", "so", "oh", "btw", "by the way", "also", "plus"],
    ),
    (
        MarkerKind::Continuation,
        &["and", "then", "next", "after that"],
    ),
    (MarkerKind::Contrast, &["but", "however", "although", "though"]),
    (
        MarkerKind::Filler,
        &["um", "uh", "like", "you know", "i mean", "basically"],
    ),
];

const PRONOUNS: &[&str] = &["he", "she", "it", "they", "we", "i"];

/// Whether `phrase` occurs in `haystack` on word boundaries. Both are
/// expected lowercase.
pub(crate) fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    haystack.match_indices(phrase).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + phrase.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn starts_with_phrase(haystack: &str, phrase: &str) -> bool {
    haystack.starts_with(phrase)
        && !haystack[phrase.len()..]
            .chars()
            .next()
            .is_some_and(char::is_alphanumeric)
}

/// The first marker kind (in declaration order) the sentence opens with.
pub fn leading_marker(sentence: &str) -> Option<MarkerKind> {
    let lower = sentence.trim().to_lowercase();
    DISCOURSE_MARKERS
        .iter()
        .find(|(_, markers)| markers.iter().any(|m| starts_with_phrase(&lower, m)))
        .map(|(kind, _)| *kind)
}

pub fn has_discourse_marker(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    DISCOURSE_MARKERS
        .iter()
        .flat_map(|(_, markers)| markers.iter())
        .any(|m| contains_phrase(&lower, m))
}

pub fn has_filler(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    DISCOURSE_MARKERS
        .iter()
        .filter(|(kind, _)| *kind == MarkerKind::Filler)
        .flat_map(|(_, markers)| markers.iter())
        .any(|m| contains_phrase(&lower, m))
}

/// Linguistic features of one sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceAnalysis {
    pub text: String,
    pub subject: Option<String>,
    pub verb: Option<String>,
    pub entities: Vec<Entity>,
    pub starts_with_marker: Option<MarkerKind>,
    pub has_discourse_marker: bool,
    pub word_count: usize,
    pub has_question: bool,
    pub has_exclamation: bool,
    pub has_filler: bool,
    /// Sorted, deduplicated
    pub entity_kinds: Vec<EntityKind>,
}

impl SentenceAnalysis {
    /// Features that need no model: markers, counts and punctuation flags.
    pub fn plain(text: &str) -> Self {
        let text = text.trim();
        Self {
            text: text.to_string(),
            subject: None,
            verb: None,
            entities: Vec::new(),
            starts_with_marker: leading_marker(text),
            has_discourse_marker: has_discourse_marker(text),
            word_count: text.split_whitespace().count(),
            has_question: text.contains('?'),
            has_exclamation: text.contains('!'),
            has_filler: has_filler(text),
            entity_kinds: Vec::new(),
        }
    }

    pub fn with_entities(mut self, entities: Vec<Entity>) -> Self {
        let kinds: BTreeSet<EntityKind> = entities.iter().map(|e| e.kind).collect();
        self.entity_kinds = kinds.into_iter().collect();
        self.entities = entities;
        self
    }

    /// Running topic of a group started by this sentence.
    fn topic(&self) -> Option<String> {
        self.subject
            .clone()
            .or_else(|| self.entities.first().map(|e| e.text.clone()))
    }
}

/// Produces sentence-level analyses for a text.
pub trait SentenceModel: Send + Sync {
    fn name(&self) -> &str;

    fn analyze(&self, text: &str) -> Vec<SentenceAnalysis>;

    fn extract_entities(&self, text: &str) -> Vec<Entity> {
        self.analyze(text)
            .into_iter()
            .flat_map(|s| s.entities)
            .collect()
    }
}

/// One or more adjacent sentences grouped as a single thought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtGroup {
    pub text: String,
    pub sentence_count: usize,
    pub word_count: usize,
    pub primary_subject: Option<String>,
    pub primary_verb: Option<String>,
    pub entities: Vec<Entity>,
    pub entity_kinds: Vec<EntityKind>,
    pub has_question: bool,
    pub has_exclamation: bool,
    pub has_filler: bool,
    pub sentences: Vec<String>,
}

impl ThoughtGroup {
    fn merge(group: &[SentenceAnalysis]) -> Self {
        let kinds: BTreeSet<EntityKind> = group
            .iter()
            .flat_map(|s| s.entity_kinds.iter().copied())
            .collect();

        Self {
            text: group
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            sentence_count: group.len(),
            word_count: group.iter().map(|s| s.word_count).sum(),
            primary_subject: group.iter().find_map(|s| s.subject.clone()),
            primary_verb: group.iter().find_map(|s| s.verb.clone()),
            entities: group.iter().flat_map(|s| s.entities.clone()).collect(),
            entity_kinds: kinds.into_iter().collect(),
            has_question: group.iter().any(|s| s.has_question),
            has_exclamation: group.iter().any(|s| s.has_exclamation),
            has_filler: group.iter().any(|s| s.has_filler),
            sentences: group.iter().map(|s| s.text.clone()).collect(),
        }
    }
}

/// Split after `.`, `!` or `?` when followed by whitespace.
pub fn basic_sentences(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut after_terminal = false;

    for (i, c) in text.char_indices() {
        if after_terminal && c.is_whitespace() {
            pieces.push(&text[start..i]);
            start = i;
        }
        after_terminal = matches!(c, '.' | '!' | '?');
    }
    pieces.push(&text[start..]);

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Explicitly constructed replacement for a process-wide NLP singleton.
#[derive(Clone)]
pub struct SegmentationService {
    model: Option<Arc<dyn SentenceModel>>,
}

impl SegmentationService {
    pub fn new(model: Option<Arc<dyn SentenceModel>>) -> Self {
        match &model {
            Some(model) => info!(model = model.name(), "Sentence model ready"),
            None => warn!("No sentence model available, falling back to basic segmentation"),
        }
        Self { model }
    }

    /// Service without a model; always uses basic segmentation.
    pub fn unavailable() -> Self {
        Self::new(None)
    }

    /// Service backed by the built-in lexicon model, optionally extended
    /// with a gazetteer file. A gazetteer that cannot be loaded leaves the
    /// service unavailable rather than failing.
    pub fn with_lexicon(gazetteer: Option<&Path>) -> Self {
        let model = match gazetteer {
            None => Ok(LexiconModel::new()),
            Some(path) => LexiconModel::from_gazetteer(path),
        };
        match model {
            Ok(model) => Self::new(Some(Arc::new(model))),
            Err(e) => {
                warn!(error = %e, "Failed to load sentence model");
                Self::new(None)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model.as_deref().map(|m| m.name())
    }

    pub fn segment(&self, text: &str, mode: SegmentationMode) -> Vec<ThoughtGroup> {
        let Some(model) = &self.model else {
            return basic_sentences(text)
                .iter()
                .map(|s| ThoughtGroup::merge(&[SentenceAnalysis::plain(s)]))
                .collect();
        };

        let sentences = model.analyze(text);
        match mode {
            SegmentationMode::Strict => sentences
                .chunks(1)
                .map(ThoughtGroup::merge)
                .collect(),
            SegmentationMode::Balanced => group_balanced(sentences),
            SegmentationMode::Loose => group_loose(sentences),
        }
    }

    pub fn extract_entities(&self, text: &str) -> Vec<Entity> {
        self.model
            .as_ref()
            .map(|m| m.extract_entities(text))
            .unwrap_or_default()
    }

    pub fn sentences(&self, text: &str) -> Vec<String> {
        match &self.model {
            Some(model) => model.analyze(text).into_iter().map(|s| s.text).collect(),
            None => basic_sentences(text),
        }
    }
}

impl fmt::Debug for SegmentationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentationService")
            .field("model", &self.model_name())
            .finish()
    }
}

fn is_pronoun(word: &str) -> bool {
    PRONOUNS.contains(&word.to_lowercase().as_str())
}

fn is_balanced_boundary(
    sentence: &SentenceAnalysis,
    topic: Option<&str>,
    group: &[SentenceAnalysis],
) -> bool {
    if sentence.starts_with_marker == Some(MarkerKind::TopicShift) {
        return true;
    }

    if sentence.has_question && group.last().is_some_and(|prev| !prev.has_question) {
        return true;
    }

    if let (Some(topic), Some(subject)) = (topic, sentence.subject.as_deref()) {
        if !topic.eq_ignore_ascii_case(subject) && !is_pronoun(subject) {
            return true;
        }
    }

    let introduces_new_kind = sentence
        .entity_kinds
        .iter()
        .any(|kind| !group.iter().any(|s| s.entity_kinds.contains(kind)));
    if !group.is_empty() && introduces_new_kind {
        return true;
    }

    if sentence.starts_with_marker == Some(MarkerKind::Continuation) {
        return false;
    }

    group.len() >= 3 && group.iter().map(|s| s.word_count).sum::<usize>() > 50
}

fn is_major_shift(sentence: &SentenceAnalysis, group: &[SentenceAnalysis]) -> bool {
    let Some(prev) = group.last() else {
        return false;
    };
    sentence.starts_with_marker == Some(MarkerKind::TopicShift)
        || (sentence.has_question && !prev.has_question)
        || group.len() > 5
}

fn group_balanced(sentences: Vec<SentenceAnalysis>) -> Vec<ThoughtGroup> {
    let mut groups = Vec::new();
    let mut current: Vec<SentenceAnalysis> = Vec::new();
    let mut topic: Option<String> = None;

    for sentence in sentences {
        if is_balanced_boundary(&sentence, topic.as_deref(), &current) {
            if !current.is_empty() {
                groups.push(ThoughtGroup::merge(&current));
            }
            topic = sentence.topic();
            current = vec![sentence];
        } else {
            if current.is_empty() {
                topic = sentence.topic();
            }
            current.push(sentence);
        }
    }
    if !current.is_empty() {
        groups.push(ThoughtGroup::merge(&current));
    }
    groups
}

fn group_loose(sentences: Vec<SentenceAnalysis>) -> Vec<ThoughtGroup> {
    let mut groups = Vec::new();
    let mut current: Vec<SentenceAnalysis> = Vec::new();

    for sentence in sentences {
        if is_major_shift(&sentence, &current) {
            groups.push(ThoughtGroup::merge(&current));
            current = vec![sentence];
        } else {
            current.push(sentence);
        }
    }
    if !current.is_empty() {
        groups.push(ThoughtGroup::merge(&current));
    }
    groups
}
