//! Deterministic lexicon-and-regex sentence model.

use std::path::Path;
use std::sync::LazyLock;

use rambler_common::{Entity, EntityKind, RamblerError, Result};
use regex::Regex;
use serde::Deserialize;
use unicode_segmentation::UnicodeSegmentation;

use super::{leading_marker, MarkerKind, SentenceAnalysis, SentenceModel};

/// Unpunctuated sentences longer than this are split at topic shifts.
const RUN_ON_WORDS: usize = 25;

/// A run-on piece must have at least this many words before it can end.
const MIN_PIECE_WORDS: usize = 4;

static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:(?:next|last|this)\s+(?:weekend|week|month|year|monday|tuesday|wednesday|thursday|friday|saturday|sunday)",
        r"|today|tomorrow|yesterday|the weekend",
        r"|mondays?|tuesdays?|wednesdays?|thursdays?|fridays?|saturdays?|sundays?",
        r"|january|february|march|april|june|july|august|september|october|november|december",
        r"|christmas|thanksgiving|easter|halloween|new year'?s(?:\s+(?:eve|day))?",
        r"|\d{1,2}/\d{1,2}(?:/\d{2,4})?)(?:\s+\d{1,2}(?:st|nd|rd|th)?)?\b",
    ))
    .unwrap()
});

static TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:\d{1,2}(?::\d{2})?\s?(?:am|pm)|\d{1,2}:\d{2}|noon|midnight|tonight",
        r"|(?:this\s+|in\s+the\s+)?(?:morning|afternoon|evening))\b",
    ))
    .unwrap()
});

// Brand names that are also ordinary words only count when capitalised.
static ORG_CAPITALISED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:Apple|Target|Meta|Amazon|Uber|Lyft|Tesla|Oracle|Shell|IBM|NASA|FBI|CIA|NHS|BBC|CNN|UN)\b")
        .unwrap()
});

static ORG_ANY_CASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:google|microsoft|facebook|netflix|spotify|twitter|reddit|github|youtube",
        r"|instagram|linkedin|tiktok|ebay|etsy|walmart|costco|starbucks|nvidia|intel|openai",
        r"|anthropic|paypal|venmo|airbnb|doordash|slack|zoom|dropbox)\b",
    ))
    .unwrap()
});

static ORG_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:[A-Z][\w&]*\s+)+(?:Inc|Corp|LLC|Ltd|Co)\b\.?").unwrap()
});

static NORP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\b(?:American|British|Canadian|Mexican|French|German|Italian|Spanish|Portuguese",
        r"|Dutch|Swedish|Norwegian|Danish|Irish|Scottish|Russian|Ukrainian|Polish|Chinese",
        r"|Japanese|Korean|Indian|Pakistani|Australian|Brazilian|Nigerian|Egyptian|Israeli",
        r"|Turkish|Greek|European|Asian|African|Christian|Muslim|Jewish|Hindu|Buddhist",
        r"|Catholic|Democrats?|Republicans?)\b",
    ))
    .unwrap()
});

static CAPITALISED_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b").unwrap());

/// Capitalised words that are not names.
const NOT_NAMES: &[&str] = &[
    "the", "a", "an", "this", "that", "these", "those", "my", "your", "our", "his", "her",
    "their", "i", "i'm", "we", "he", "she", "it", "they", "you", "and", "but", "so", "or",
    "oh", "also", "then", "anyway", "hey", "hi", "yes", "no", "ok", "okay", "mr", "mrs", "ms",
    "dr", "maybe", "just", "remember", "todo", "note", "what", "why", "how", "when", "where",
];

const PRONOUNS: &[&str] = &["i", "he", "she", "it", "they", "we", "you"];

const VERB_LIKE: &[&str] = &[
    "is", "are", "was", "were", "am", "be", "been", "have", "has", "had", "do", "does", "did",
    "will", "would", "can", "could", "should", "must", "need", "needs", "want", "wants", "go",
    "goes", "going", "went", "think", "thinks", "thought", "said", "says", "told", "got", "get",
    "gets", "make", "made", "take", "took", "see", "saw", "know", "knew", "love", "hate",
    "left", "came", "come", "feel", "felt", "broke", "lost", "found", "ran", "met", "keeps",
];

/// Words skipped when looking for a subject in front of the verb.
const NOT_SUBJECTS: &[&str] = &[
    "the", "a", "an", "so", "and", "then", "also", "just", "really", "oh", "um", "uh", "like",
    "anyway", "but", "still", "never", "always", "to", "not",
];

/// Extra names loaded from a TOML file:
///
/// ```toml
/// organizations = ["Initech", "Acme Labs"]
/// people = ["Sarah", "Bob"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Gazetteer {
    #[serde(default)]
    pub organizations: Vec<String>,
    #[serde(default)]
    pub people: Vec<String>,
}

impl Gazetteer {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

fn alternation(names: &[String]) -> Result<Option<Regex>> {
    let mut escaped: Vec<String> = names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .map(regex::escape)
        .collect();
    if escaped.is_empty() {
        return Ok(None);
    }
    // Longest first so multi-word names win over their prefixes.
    escaped.sort_by_key(|n| std::cmp::Reverse(n.len()));
    Regex::new(&format!(r"(?i)\b(?:{})\b", escaped.join("|")))
        .map(Some)
        .map_err(|e| RamblerError::Segmentation(format!("gazetteer pattern: {e}")))
}

/// Built-in heuristic model: Unicode sentence boundaries, gazetteer and
/// regex entities, and a nearest-word-before-the-verb subject.
#[derive(Debug, Default)]
pub struct LexiconModel {
    extra_orgs: Option<Regex>,
    extra_people: Option<Regex>,
}

impl LexiconModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gazetteer(gazetteer: &Gazetteer) -> Result<Self> {
        Ok(Self {
            extra_orgs: alternation(&gazetteer.organizations)?,
            extra_people: alternation(&gazetteer.people)?,
        })
    }

    pub fn from_gazetteer(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_gazetteer(&Gazetteer::from_file(path)?)
    }

    fn split_sentences(text: &str) -> Vec<String> {
        text.lines()
            .flat_map(|line| line.unicode_sentences())
            .flat_map(split_run_on)
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn entities(&self, sentence: &str) -> Vec<Entity> {
        let mut spans: Vec<(usize, usize, EntityKind)> = Vec::new();
        let mut claim = |start: usize, end: usize, kind: EntityKind| {
            if !spans.iter().any(|&(s, e, _)| start < e && s < end) {
                spans.push((start, end, kind));
            }
        };

        let patterns: [(&Regex, EntityKind); 6] = [
            (&*DATE, EntityKind::Date),
            (&*TIME, EntityKind::Time),
            (&*ORG_SUFFIX, EntityKind::Org),
            (&*ORG_CAPITALISED, EntityKind::Org),
            (&*ORG_ANY_CASE, EntityKind::Org),
            (&*NORP, EntityKind::Norp),
        ];
        let extra = [
            (self.extra_orgs.as_ref(), EntityKind::Org),
            (self.extra_people.as_ref(), EntityKind::Person),
        ];
        // Gazetteer names take precedence over the built-in patterns.
        for (re, kind) in extra
            .into_iter()
            .filter_map(|(re, kind)| re.map(|re| (re, kind)))
            .chain(patterns)
        {
            for m in re.find_iter(sentence) {
                claim(m.start(), m.end(), kind);
            }
        }

        let first_word = sentence
            .find(|c: char| c.is_alphanumeric())
            .unwrap_or(sentence.len());
        for m in CAPITALISED_RUN.find_iter(sentence) {
            let mut start = m.start();
            if start == first_word {
                // Sentence-initial capitals are not evidence of a name.
                match sentence[start..m.end()].find(char::is_whitespace) {
                    Some(offset) => {
                        start += offset;
                        start += sentence[start..].len() - sentence[start..].trim_start().len();
                    }
                    None => continue,
                }
            }
            let text = &sentence[start..m.end()];
            let leading = text.split_whitespace().next().unwrap_or_default();
            if NOT_NAMES.contains(&leading.to_lowercase().as_str()) {
                continue;
            }
            claim(start, m.end(), EntityKind::Person);
        }

        spans.sort_by_key(|&(start, _, _)| start);
        spans
            .into_iter()
            .map(|(start, end, kind)| Entity::new(&sentence[start..end], kind))
            .collect()
    }

    /// Returns `(subject, verb)`.
    fn subject_and_verb(sentence: &str) -> (Option<String>, Option<String>) {
        let words: Vec<&str> = sentence
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
            .filter(|w| !w.is_empty())
            .collect();

        let verb_index = words.iter().position(|w| is_verb_like(w));
        let verb = verb_index.map(|i| words[i].to_string());

        let before_verb = verb_index
            .filter(|&i| i > 0)
            .map(|i| words[i - 1])
            .filter(|w| !NOT_SUBJECTS.contains(&w.to_lowercase().as_str()));

        let leading_pronoun = || {
            words
                .iter()
                .find(|w| !NOT_SUBJECTS.contains(&w.to_lowercase().as_str()))
                .filter(|w| PRONOUNS.contains(&w.to_lowercase().as_str()))
                .copied()
        };

        let subject = before_verb.or_else(leading_pronoun).map(str::to_string);
        (subject, verb)
    }
}

fn is_verb_like(word: &str) -> bool {
    let lower = word.to_lowercase();
    VERB_LIKE.contains(&lower.as_str()) || (lower.len() > 4 && lower.ends_with("ed"))
}

/// Split an unpunctuated ramble before topic-shift markers.
fn split_run_on(sentence: &str) -> Vec<String> {
    let trimmed = sentence.trim();
    let words: Vec<&str> = trimmed.split_whitespace().collect();
    let terminated = trimmed.ends_with(|c: char| matches!(c, '.' | '!' | '?'));
    if terminated || words.len() <= RUN_ON_WORDS {
        return vec![trimmed.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for (i, word) in words.iter().enumerate() {
        let lookahead = words[i..words.len().min(i + 3)].join(" ");
        if current.len() >= MIN_PIECE_WORDS
            && leading_marker(&lookahead) == Some(MarkerKind::TopicShift)
        {
            pieces.push(current.join(" "));
            current.clear();
        }
        current.push(word);
    }
    if !current.is_empty() {
        pieces.push(current.join(" "));
    }
    pieces
}

impl SentenceModel for LexiconModel {
    fn name(&self) -> &str {
        "lexicon"
    }

    fn analyze(&self, text: &str) -> Vec<SentenceAnalysis> {
        Self::split_sentences(text)
            .iter()
            .map(|sentence| {
                let (subject, verb) = Self::subject_and_verb(sentence);
                let mut analysis =
                    SentenceAnalysis::plain(sentence).with_entities(self.entities(sentence));
                analysis.subject = subject;
                analysis.verb = verb;
                analysis
            })
            .collect()
    }

    fn extract_entities(&self, text: &str) -> Vec<Entity> {
        Self::split_sentences(text)
            .iter()
            .flat_map(|s| self.entities(s))
            .collect()
    }
}
