//! URL detection and inference from vague descriptions.
//!
//! Explicit URLs are picked out with a broad domain regex. Descriptions
//! like "the blue bird social media site" are resolved against a small
//! known-site table first, then by building a domain from keywords, and
//! finally from any `word.tld` or long word in the text.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::confidence::Confidence;

/// Default timeout for the reachability check.
pub const DEFAULT_VALIDATION_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_ALTERNATIVES: usize = 4;

const ALTERNATIVE_TLDS: &[&str] = &[".com", ".org", ".net", ".io", ".co"];

const URL_TRIGGERS: &[&str] = &[
    "site",
    "website",
    "webpage",
    "link",
    "url",
    "domain",
    ".com",
    ".org",
    ".net",
    ".io",
    ".co",
    ".edu",
    "http://",
    "https://",
    "www.",
    "online",
    "web app",
    "platform",
    "portal",
    "that place where",
    "the site with",
    "the page",
];

/// Description substring to candidate domains, scanned in order.
const KNOWN_SITES: &[(&str, &[&str])] = &[
    ("blue bird", &["twitter.com"]),
    ("x.com", &["x.com"]),
    ("face book", &["facebook.com"]),
    ("insta", &["instagram.com"]),
    ("reddit", &["reddit.com"]),
    ("linked in", &["linkedin.com"]),
    ("tik tok", &["tiktok.com"]),
    ("amazon", &["amazon.com"]),
    ("ebay", &["ebay.com"]),
    ("etsy", &["etsy.com"]),
    ("alibaba", &["alibaba.com"]),
    ("hammock", &["hammocks.com", "hammockcompany.com", "eno.com"]),
    ("github", &["github.com"]),
    ("stack overflow", &["stackoverflow.com"]),
    ("hacker news", &["news.ycombinator.com"]),
    ("youtube", &["youtube.com"]),
    ("netflix", &["netflix.com"]),
    ("spotify", &["spotify.com"]),
    ("google", &["google.com"]),
    ("bing", &["bing.com"]),
    ("duck duck go", &["duckduckgo.com"]),
];

const KEYWORD_STOPWORDS: &[&str] = &[
    "the", "that", "where", "with", "site", "website", "webpage", "online", "place", "thing",
    "one",
];

const HYPHEN_PREFIXES: &[&str] = &["get", "buy", "find", "best", "my", "the"];

static EXPLICIT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:https?://)?(?:www\.)?(?:[a-zA-Z0-9-]+\.)+[a-zA-Z]{2,}(?:/[^\s]*)?").unwrap()
});

static ALPHA_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[a-zA-Z]+\b").unwrap());

static PARTIAL_DOMAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([a-zA-Z]+)\.([a-zA-Z]{2,})\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceType {
    Explicit,
    Inferred,
    Failed,
}

/// A URL written out in the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitUrl {
    /// Normalised with a scheme
    pub url: String,
    pub original_text: String,
    pub confidence: Confidence,
    #[serde(rename = "type")]
    pub inference_type: InferenceType,
}

/// Best guess at the URL a description refers to.
///
/// `confidence` is `None` exactly when `url` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredUrl {
    pub url: String,
    pub confidence: Confidence,
    pub explanation: String,
    pub alternatives: Vec<String>,
    #[serde(rename = "type")]
    pub inference_type: InferenceType,
    /// Set when a reachability check was performed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reachable: Option<bool>,
}

impl InferredUrl {
    fn inferred(url: String, confidence: Confidence, explanation: String) -> Self {
        Self {
            url,
            confidence,
            explanation,
            alternatives: Vec::new(),
            inference_type: InferenceType::Inferred,
            reachable: None,
        }
    }

    pub fn failed() -> Self {
        Self {
            url: String::new(),
            confidence: Confidence::None,
            explanation: "Could not infer URL from description".to_string(),
            alternatives: Vec::new(),
            inference_type: InferenceType::Failed,
            reachable: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.confidence != Confidence::None
    }
}

pub struct UrlInferencer {
    http_client: reqwest::Client,
}

impl Default for UrlInferencer {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlInferencer {
    pub fn new() -> Self {
        Self::with_validation_timeout(DEFAULT_VALIDATION_TIMEOUT)
    }

    pub fn with_validation_timeout(timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http_client }
    }

    /// Every domain-like substring, prefixed with `https://` when it has
    /// no scheme.
    pub fn extract_explicit(&self, text: &str) -> Vec<ExplicitUrl> {
        EXPLICIT_URL
            .find_iter(text)
            .map(|m| {
                let matched = m.as_str();
                let url = if matched.starts_with("http://") || matched.starts_with("https://") {
                    matched.to_string()
                } else {
                    format!("https://{matched}")
                };
                ExplicitUrl {
                    original_text: url.clone(),
                    url,
                    confidence: Confidence::High,
                    inference_type: InferenceType::Explicit,
                }
            })
            .collect()
    }

    /// Whether the text reads like a description of a website.
    pub fn might_describe_url(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        URL_TRIGGERS.iter().any(|t| lower.contains(t))
            || KNOWN_SITES.iter().any(|(key, _)| lower.contains(key))
    }

    pub async fn infer(&self, text: &str) -> InferredUrl {
        let lower = text.trim().to_lowercase();

        if let Some((description, domains)) =
            KNOWN_SITES.iter().find(|(key, _)| lower.contains(key))
        {
            let explanation = if domains.len() > 1 {
                format!("Recognized \"{description}\" reference")
            } else {
                format!("Recognized \"{description}\" as known site")
            };
            let mut result =
                InferredUrl::inferred(format!("https://{}", domains[0]), Confidence::High, explanation);
            result.alternatives = domains[1..].iter().map(|d| format!("https://{d}")).collect();
            return result;
        }

        let keywords = Self::domain_keywords(text);
        if !keywords.is_empty() {
            let url = Self::url_from_keywords(&keywords);
            let mut result = InferredUrl::inferred(
                url,
                Confidence::Medium,
                format!("Built from keywords: {}", keywords.join(", ")),
            );
            result.alternatives = Self::alternatives(&result.url);
            return result;
        }

        if let Some(domain) = Self::partial_domain(text) {
            let mut result = InferredUrl::inferred(
                format!("https://{domain}"),
                Confidence::Low,
                "Extracted partial domain pattern".to_string(),
            );
            result.alternatives = Self::alternatives(&result.url);
            return result;
        }

        InferredUrl::failed()
    }

    /// HEAD the url, following redirects. Any transport error counts as
    /// unreachable.
    pub async fn validate(&self, url: &str) -> bool {
        match self.http_client.head(url).send().await {
            Ok(response) => response.status().as_u16() < 400,
            Err(e) => {
                debug!(url = %url, error = %e, "URL validation request failed");
                false
            }
        }
    }

    /// Check the primary url and lower confidence one tier when it cannot
    /// be reached. Failed inferences are returned untouched.
    pub async fn apply_validation(&self, mut result: InferredUrl) -> InferredUrl {
        if !result.is_resolved() {
            return result;
        }
        let reachable = self.validate(&result.url).await;
        if !reachable {
            result.confidence = result.confidence.downgrade();
            result.explanation.push_str(" (unreachable)");
        }
        result.reachable = Some(reachable);
        result
    }

    fn domain_keywords(text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        ALPHA_WORD
            .find_iter(&lower)
            .map(|m| m.as_str())
            .filter(|w| w.len() > 2 && !KEYWORD_STOPWORDS.contains(w))
            .take(3)
            .map(str::to_string)
            .collect()
    }

    fn url_from_keywords(keywords: &[String]) -> String {
        let domain: String = keywords.iter().take(2).map(String::as_str).collect();
        format!("https://{domain}.com")
    }

    fn partial_domain(text: &str) -> Option<String> {
        if let Some(m) = PARTIAL_DOMAIN.find(text) {
            return Some(m.as_str().to_string());
        }
        text.split_whitespace()
            .find(|w| w.chars().count() > 4 && w.chars().all(char::is_alphabetic))
            .map(|w| format!("{w}.com"))
    }

    /// TLD swaps plus a hyphenated variant for long concatenated stems.
    /// When both exist the hyphenated variant keeps its place under the cap.
    fn alternatives(base_url: &str) -> Vec<String> {
        let host = match Url::parse(base_url) {
            Ok(parsed) => match parsed.host_str() {
                Some(host) => host.replace("www.", ""),
                None => return Vec::new(),
            },
            Err(_) => return Vec::new(),
        };

        let mut parts = host.split('.');
        let (Some(base_name), Some(_)) = (parts.next(), parts.next()) else {
            return Vec::new();
        };

        let mut alternatives: Vec<String> = ALTERNATIVE_TLDS
            .iter()
            .map(|tld| format!("https://{base_name}{tld}"))
            .filter(|alt| alt != base_url)
            .collect();

        if base_name.chars().count() > 8 && !base_name.contains('-') {
            let hyphenated = Self::add_hyphens(base_name);
            if hyphenated != base_name {
                alternatives.truncate(MAX_ALTERNATIVES - 1);
                alternatives.push(format!("https://{hyphenated}.com"));
            }
        }

        alternatives.truncate(MAX_ALTERNATIVES);
        alternatives
    }

    /// `stem` is a host label, so it is already lowercase.
    fn add_hyphens(stem: &str) -> String {
        let chars: Vec<char> = stem.chars().collect();
        for i in 3..chars.len().saturating_sub(3) {
            let prefix: String = chars[..i].iter().collect();
            if HYPHEN_PREFIXES.contains(&prefix.as_str()) {
                let rest: String = chars[i..].iter().collect();
                return format!("{prefix}-{rest}");
            }
        }
        stem.to_string()
    }
}
