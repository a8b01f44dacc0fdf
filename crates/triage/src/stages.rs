//! The ordered classification stages a fragment passes through.
//!
//! Each stage either claims the fragment with a [`StageOutcome`] or returns
//! `None` so the next stage gets a look. The orchestrator folds over the
//! list and stops at the first claim; [`ThoughtStage`] always claims.

use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use rambler_common::{Entity, EntityKind, Fragment, Result, ThoughtChunk, ThoughtEnricher};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::action::{ActionDetector, ActionItem};
use crate::confidence::Confidence;
use crate::merge::ChunkMerger;
use crate::quality::{QualityAssessment, QualityClassifier};
use crate::report::Category;
use crate::url_inference::{ExplicitUrl, InferredUrl, UrlInferencer};

/// What a stage decided about a fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", content = "result")]
pub enum StageOutcome {
    #[serde(rename = "thought")]
    Thought {
        chunks: Vec<ThoughtChunk>,
        confidence: Confidence,
    },
    #[serde(rename = "url/explicit")]
    ExplicitUrls(Vec<ExplicitUrl>),
    #[serde(rename = "url/inferred")]
    InferredUrl(InferredUrl),
    #[serde(rename = "todo")]
    Todo(ActionItem),
    #[serde(rename = "gibberish")]
    Gibberish(QualityAssessment),
    #[serde(rename = "salvaged")]
    Salvaged(QualityAssessment),
    /// A stage failed; the fragment is quarantined as gibberish.
    #[serde(rename = "unclassifiable")]
    Unclassifiable { reason: String },
}

impl StageOutcome {
    pub fn category(&self) -> Category {
        match self {
            Self::Thought { .. } => Category::Thought,
            Self::ExplicitUrls(_) => Category::UrlExplicit,
            Self::InferredUrl(_) => Category::UrlInferred,
            Self::Todo(_) => Category::Todo,
            Self::Gibberish(_) | Self::Unclassifiable { .. } => Category::Gibberish,
            Self::Salvaged(_) => Category::Salvaged,
        }
    }

    pub fn confidence(&self) -> Option<Confidence> {
        match self {
            Self::Thought { confidence, .. } => Some(*confidence),
            Self::ExplicitUrls(_) => Some(Confidence::High),
            Self::InferredUrl(inferred) => Some(inferred.confidence),
            Self::Todo(action) => Some(action.confidence),
            Self::Gibberish(_) | Self::Salvaged(_) | Self::Unclassifiable { .. } => None,
        }
    }

    /// Reasons recorded in the quarantine store for rejected fragments.
    pub fn quarantine_reasons(&self) -> Option<Vec<String>> {
        match self {
            Self::Gibberish(assessment) => Some(assessment.issues.clone()),
            Self::Unclassifiable { reason } => Some(vec![format!("unclassifiable: {reason}")]),
            _ => None,
        }
    }
}

/// A fragment under classification plus lazily computed shared analysis.
#[derive(Debug)]
pub struct FragmentContext {
    pub index: usize,
    pub fragment: Fragment,
    quality: OnceLock<QualityAssessment>,
}

impl FragmentContext {
    pub fn new(index: usize, fragment: Fragment) -> Self {
        Self {
            index,
            fragment,
            quality: OnceLock::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.fragment.text
    }

    pub fn entities(&self) -> &[Entity] {
        self.fragment.entities()
    }

    /// Quality assessment, computed on first use.
    pub fn quality(&self) -> &QualityAssessment {
        self.quality
            .get_or_init(|| QualityClassifier::new().analyze(&self.fragment.text))
    }
}

#[async_trait]
pub trait TriageStage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn evaluate(&self, ctx: &FragmentContext) -> Result<Option<StageOutcome>>;
}

pub struct ExplicitUrlStage {
    inferencer: Arc<UrlInferencer>,
}

impl ExplicitUrlStage {
    pub fn new(inferencer: Arc<UrlInferencer>) -> Self {
        Self { inferencer }
    }
}

#[async_trait]
impl TriageStage for ExplicitUrlStage {
    fn name(&self) -> &'static str {
        "explicit_url"
    }

    async fn evaluate(&self, ctx: &FragmentContext) -> Result<Option<StageOutcome>> {
        let urls = self.inferencer.extract_explicit(ctx.text());
        Ok((!urls.is_empty()).then_some(StageOutcome::ExplicitUrls(urls)))
    }
}

pub struct GibberishStage;

#[async_trait]
impl TriageStage for GibberishStage {
    fn name(&self) -> &'static str {
        "gibberish"
    }

    async fn evaluate(&self, ctx: &FragmentContext) -> Result<Option<StageOutcome>> {
        let quality = ctx.quality();
        Ok(quality
            .is_gibberish()
            .then(|| StageOutcome::Gibberish(quality.clone())))
    }
}

pub struct SalvageStage;

#[async_trait]
impl TriageStage for SalvageStage {
    fn name(&self) -> &'static str {
        "salvage"
    }

    async fn evaluate(&self, ctx: &FragmentContext) -> Result<Option<StageOutcome>> {
        let quality = ctx.quality();
        Ok(quality
            .is_salvageable()
            .then(|| StageOutcome::Salvaged(quality.clone())))
    }
}

pub struct ActionStage {
    detector: ActionDetector,
}

impl ActionStage {
    pub fn new(detector: ActionDetector) -> Self {
        Self { detector }
    }
}

#[async_trait]
impl TriageStage for ActionStage {
    fn name(&self) -> &'static str {
        "action"
    }

    async fn evaluate(&self, ctx: &FragmentContext) -> Result<Option<StageOutcome>> {
        Ok(self
            .detector
            .detect_with_entities(ctx.text(), ctx.entities())
            .map(StageOutcome::Todo))
    }
}

/// Await `future`, or give up after `timeout`.
pub async fn within<F: Future>(timeout: Duration, future: F) -> Option<F::Output> {
    tokio::time::timeout(timeout, future).await.ok()
}

pub struct InferredUrlStage {
    inferencer: Arc<UrlInferencer>,
    timeout: Duration,
    validate: bool,
}

impl InferredUrlStage {
    pub fn new(inferencer: Arc<UrlInferencer>, timeout: Duration) -> Self {
        Self {
            inferencer,
            timeout,
            validate: false,
        }
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    fn is_candidate(&self, ctx: &FragmentContext) -> bool {
        self.inferencer.might_describe_url(ctx.text())
            || ctx.fragment.has_entity(EntityKind::Org)
    }
}

#[async_trait]
impl TriageStage for InferredUrlStage {
    fn name(&self) -> &'static str {
        "inferred_url"
    }

    async fn evaluate(&self, ctx: &FragmentContext) -> Result<Option<StageOutcome>> {
        if !self.is_candidate(ctx) {
            return Ok(None);
        }

        let inference = async {
            let inferred = self.inferencer.infer(ctx.text()).await;
            if self.validate {
                self.inferencer.apply_validation(inferred).await
            } else {
                inferred
            }
        };

        match within(self.timeout, inference).await {
            Some(inferred) if inferred.is_resolved() => {
                Ok(Some(StageOutcome::InferredUrl(inferred)))
            }
            Some(_) => Ok(None),
            None => {
                warn!(
                    fragment_index = ctx.index,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "URL inference timed out, falling through"
                );
                Ok(None)
            }
        }
    }
}

/// Fallback stage: hands the fragment to the enricher and optionally merges
/// related chunks.
pub struct ThoughtStage {
    enricher: Option<Arc<dyn ThoughtEnricher>>,
    merger: Option<Arc<ChunkMerger>>,
}

impl ThoughtStage {
    pub fn new(enricher: Option<Arc<dyn ThoughtEnricher>>, merger: Option<Arc<ChunkMerger>>) -> Self {
        Self { enricher, merger }
    }
}

#[async_trait]
impl TriageStage for ThoughtStage {
    fn name(&self) -> &'static str {
        "thought"
    }

    async fn evaluate(&self, ctx: &FragmentContext) -> Result<Option<StageOutcome>> {
        let Some(enricher) = &self.enricher else {
            return Ok(Some(StageOutcome::Thought {
                chunks: vec![ThoughtChunk::neutral(ctx.text())],
                confidence: Confidence::Medium,
            }));
        };

        let mut chunks = enricher.enrich(ctx.text());
        if chunks.is_empty() {
            chunks.push(ThoughtChunk::neutral(ctx.text()));
        }
        if let Some(merger) = &self.merger {
            let before = chunks.len();
            chunks = merger.merge(chunks).await;
            debug!(
                fragment_index = ctx.index,
                before,
                after = chunks.len(),
                "Thought chunks merged"
            );
        }

        Ok(Some(StageOutcome::Thought {
            chunks,
            confidence: Confidence::High,
        }))
    }
}
