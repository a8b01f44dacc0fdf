//! Triage orchestrator: chunks the input and routes each fragment through
//! the stage pipeline.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use rambler_common::{now_millis, RamblerError, RemoteClassifier, Result, ThoughtEnricher};
use rambler_llm::{build_llm_client, LlmRelationshipClassifier};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::action::ActionDetector;
use crate::chunker::Chunker;
use crate::config::TriageConfig;
use crate::enrichment::RuleBasedEnricher;
use crate::merge::ChunkMerger;
use crate::report::{QuarantineEntry, TriageReport, TriageResult};
use crate::segmentation::{SegmentationMode, SegmentationService};
use crate::stages::{
    ActionStage, ExplicitUrlStage, FragmentContext, GibberishStage, InferredUrlStage,
    SalvageStage, StageOutcome, ThoughtStage, TriageStage,
};
use crate::stats::RunStatistics;
use crate::url_inference::UrlInferencer;

#[derive(Debug, Default)]
struct OrchestratorState {
    stats: RunStatistics,
    quarantine: Vec<QuarantineEntry>,
}

/// Routes every fragment of an input into exactly one bucket.
///
/// Statistics and the quarantine store belong to the instance and
/// accumulate across runs. Runs over the same instance are expected to be
/// sequential.
pub struct TriageOrchestrator {
    config: TriageConfig,
    segmentation: SegmentationService,
    chunker: Box<dyn Chunker>,
    stages: Vec<Box<dyn TriageStage>>,
    state: Mutex<OrchestratorState>,
}

impl TriageOrchestrator {
    pub fn builder() -> TriageOrchestratorBuilder {
        TriageOrchestratorBuilder::default()
    }

    /// Orchestrator with the default collaborators. When the config names
    /// an LLM, it backs chunk merging; if that client cannot be built,
    /// merging is disabled with a warning.
    pub fn from_config(config: TriageConfig) -> Self {
        let classifier = match (&config.llm, config.merge.enabled) {
            (Some(llm), true) => match build_llm_client(llm) {
                Ok(client) => {
                    info!(provider = %llm.provider, model = %llm.model, "Relationship classifier ready");
                    Some(Arc::new(LlmRelationshipClassifier::new(client)) as Arc<dyn RemoteClassifier>)
                }
                Err(e) => {
                    warn!(error = %e, "Failed to build LLM client, chunk merging disabled");
                    None
                }
            },
            _ => None,
        };

        let mut builder = Self::builder().config(config);
        if let Some(classifier) = classifier {
            builder = builder.classifier(classifier);
        }
        builder.build()
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    /// Whether the entity-aware sentence model is available.
    pub fn is_model_ready(&self) -> bool {
        self.segmentation.is_ready()
    }

    /// Triage `text`. Empty or whitespace-only input is rejected before
    /// any chunking happens.
    pub async fn process(&self, text: &str, mode: SegmentationMode) -> Result<TriageReport> {
        if text.trim().is_empty() {
            return Err(RamblerError::EmptyInput);
        }

        let run_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "triage_run",
            run_id = %run_id,
            mode = %mode,
            strategy = self.chunker.name()
        );
        self.run(text, mode, run_id).instrument(span).await
    }

    async fn run(&self, text: &str, mode: SegmentationMode, run_id: String) -> Result<TriageReport> {
        let fragments = self.chunker.split(text, mode);
        info!(fragments = fragments.len(), "Starting triage run");

        let mut report = TriageReport::new(
            run_id,
            mode,
            self.config.strategy,
            self.segmentation.is_ready(),
        );
        let mut run_stats = RunStatistics::default();

        for (index, fragment) in fragments.into_iter().enumerate() {
            let entity_count = fragment.entities().len();
            let original_text = fragment.text.clone();

            let outcome = self.classify(FragmentContext::new(index, fragment)).await;
            let category = outcome.category();
            debug!(
                fragment_index = index,
                category = %category,
                entities = entity_count,
                "Fragment classified"
            );

            run_stats.record(category, entity_count);
            {
                let mut state = self.state.lock();
                state.stats.record(category, entity_count);
                if let Some(reasons) = outcome.quarantine_reasons() {
                    state.quarantine.push(QuarantineEntry {
                        text: original_text.clone(),
                        reasons,
                        timestamp: now_millis(),
                    });
                }
            }

            report.push(
                TriageResult {
                    fragment_index: index,
                    outcome,
                    original_text,
                    timestamp: now_millis(),
                },
                entity_count,
            );
        }

        report.summarize(&run_stats);
        info!(
            total = report.summary.total_chunks,
            thoughts = run_stats.thoughts,
            urls = run_stats.urls(),
            todos = run_stats.todos,
            quarantined = run_stats.gibberish,
            salvaged = run_stats.salvaged,
            "Triage run finished"
        );
        Ok(report)
    }

    /// First stage to claim the fragment wins. A failing or panicking stage
    /// makes the fragment unclassifiable instead of aborting the run.
    async fn classify(&self, ctx: FragmentContext) -> StageOutcome {
        for stage in &self.stages {
            match AssertUnwindSafe(stage.evaluate(&ctx)).catch_unwind().await {
                Ok(Ok(Some(outcome))) => return outcome,
                Ok(Ok(None)) => continue,
                Ok(Err(e)) => {
                    warn!(
                        stage = stage.name(),
                        fragment_index = ctx.index,
                        error = %e,
                        "Stage failed, fragment is unclassifiable"
                    );
                    return StageOutcome::Unclassifiable {
                        reason: format!("{} stage: {e}", stage.name()),
                    };
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(
                        stage = stage.name(),
                        fragment_index = ctx.index,
                        panic = %message,
                        "Stage panicked, fragment is unclassifiable"
                    );
                    return StageOutcome::Unclassifiable {
                        reason: format!("{} stage panicked: {message}", stage.name()),
                    };
                }
            }
        }

        StageOutcome::Unclassifiable {
            reason: "no stage claimed the fragment".to_string(),
        }
    }

    /// Cumulative statistics across every run on this instance.
    pub fn get_stats(&self) -> RunStatistics {
        self.state.lock().stats
    }

    pub fn quarantine_len(&self) -> usize {
        self.state.lock().quarantine.len()
    }

    /// Drain the quarantine store. Statistics are left untouched.
    pub fn clear_quarantine(&self) -> Vec<QuarantineEntry> {
        std::mem::take(&mut self.state.lock().quarantine)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub struct TriageOrchestratorBuilder {
    config: TriageConfig,
    enricher: Option<Arc<dyn ThoughtEnricher>>,
    classifier: Option<Arc<dyn RemoteClassifier>>,
    segmentation: Option<SegmentationService>,
    stages: Option<Vec<Box<dyn TriageStage>>>,
}

impl Default for TriageOrchestratorBuilder {
    fn default() -> Self {
        Self {
            config: TriageConfig::default(),
            enricher: Some(Arc::new(RuleBasedEnricher::new())),
            classifier: None,
            segmentation: None,
            stages: None,
        }
    }
}

impl TriageOrchestratorBuilder {
    pub fn config(mut self, config: TriageConfig) -> Self {
        self.config = config;
        self
    }

    pub fn enricher(mut self, enricher: Arc<dyn ThoughtEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Thoughts become single neutral chunks.
    pub fn without_enricher(mut self) -> Self {
        self.enricher = None;
        self
    }

    /// Remote classifier used to merge related thought chunks.
    pub fn classifier(mut self, classifier: Arc<dyn RemoteClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Segmentation service; defaults to the built-in lexicon model.
    pub fn segmentation(mut self, segmentation: SegmentationService) -> Self {
        self.segmentation = Some(segmentation);
        self
    }

    /// Replace the standard stage list.
    pub fn stages(mut self, stages: Vec<Box<dyn TriageStage>>) -> Self {
        self.stages = Some(stages);
        self
    }

    pub fn build(self) -> TriageOrchestrator {
        let config = self.config;
        let segmentation = self
            .segmentation
            .unwrap_or_else(|| SegmentationService::with_lexicon(config.lexicon_path.as_deref()));

        let merger = match (self.classifier, config.merge.enabled) {
            (Some(classifier), true) => {
                Some(Arc::new(ChunkMerger::from_config(classifier, &config.merge)))
            }
            _ => None,
        };

        let stages = self.stages.unwrap_or_else(|| {
            let inferencer = Arc::new(UrlInferencer::with_validation_timeout(
                config.validation_timeout(),
            ));
            vec![
                Box::new(ExplicitUrlStage::new(inferencer.clone())) as Box<dyn TriageStage>,
                Box::new(GibberishStage),
                Box::new(SalvageStage),
                Box::new(ActionStage::new(ActionDetector::new())),
                Box::new(
                    InferredUrlStage::new(inferencer, config.inference_timeout())
                        .with_validation(config.validate_inferred_urls),
                ),
                Box::new(ThoughtStage::new(self.enricher, merger)),
            ]
        });

        info!(
            strategy = %config.strategy,
            model_ready = segmentation.is_ready(),
            stages = stages.len(),
            "Triage orchestrator initialized"
        );

        TriageOrchestrator {
            chunker: config.strategy.build(segmentation.clone()),
            segmentation,
            stages,
            config,
            state: Mutex::new(OrchestratorState::default()),
        }
    }
}
