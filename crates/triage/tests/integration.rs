//! Integration tests for the triage pipeline.
//!
//! Everything runs offline: no LLM is configured unless a test wires in a
//! scripted classifier, and URL validation stays off.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rambler_common::{
    RamblerError, Relationship, RelationshipType, RemoteClassifier, Result,
};
use rambler_triage::stages::ThoughtStage;
use rambler_triage::{
    Category, ChunkingStrategy, Confidence, FragmentContext, QualityClass, QualityClassifier,
    SegmentationMode, SegmentationService, StageOutcome, TriageConfig, TriageOrchestrator,
    TriageReport, TriageStage, Urgency, UrlInferencer,
};

const SCENARIO: &str =
    "need milk and eggs\n\nhttps://amazon.com/dp/B08XYZ123\n\nasdflkjasdf\n\nmeeting at 3pm with Sarah";

const RAMBLE: &str = "I talked to Sarah today. She was upset. Anyway, I need to call Google support.\n\n\
    zzzzzzzzzzzz\n\nthat blue bird social media site\n\n\
    the garden looks great this year and the tomatoes are huge. Oh wait, did I lock the car?";

fn orchestrator(strategy: ChunkingStrategy) -> TriageOrchestrator {
    TriageOrchestrator::builder()
        .config(TriageConfig {
            strategy,
            ..Default::default()
        })
        .build()
}

fn bucket_total(report: &TriageReport) -> usize {
    report.thoughts.len()
        + report.urls.len()
        + report.todos.len()
        + report.quarantine.len()
        + report.salvaged.len()
}

// ============================================================================
// End-to-end scenario
// ============================================================================

#[tokio::test]
async fn test_end_to_end_scenario() {
    let orchestrator = orchestrator(ChunkingStrategy::Naive);
    let report = orchestrator
        .process(SCENARIO, SegmentationMode::Balanced)
        .await
        .unwrap();

    assert_eq!(report.summary.total_chunks, 4);
    assert_eq!(report.processing_log.len(), 4);

    let categories: Vec<Category> = report.processing_log.iter().map(|e| e.category).collect();
    assert!(matches!(categories[0], Category::Thought | Category::Todo));
    assert_eq!(categories[1], Category::UrlExplicit);
    assert_eq!(categories[2], Category::Gibberish);
    assert!(matches!(categories[3], Category::Thought | Category::Todo));

    assert_eq!(report.urls.len(), 1);
    match &report.urls[0].outcome {
        StageOutcome::ExplicitUrls(urls) => {
            assert_eq!(urls[0].url, "https://amazon.com/dp/B08XYZ123");
            assert_eq!(urls[0].confidence, Confidence::High);
        }
        other => panic!("expected explicit urls, got {other:?}"),
    }

    assert_eq!(report.quarantine.len(), 1);
    assert_eq!(report.quarantine[0].original_text, "asdflkjasdf");

    let drained = orchestrator.clear_quarantine();
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].text, "asdflkjasdf");
}

#[tokio::test]
async fn test_summary_metrics() {
    let report = orchestrator(ChunkingStrategy::Naive)
        .process(SCENARIO, SegmentationMode::Balanced)
        .await
        .unwrap();

    let metrics = report.summary.quality_metrics;
    assert!((metrics.clean_ratio - 0.75).abs() < 1e-9);
    assert_eq!(metrics.salvage_ratio, 0.0);
    assert_eq!(metrics.url_inference_ratio, 0.0);
    assert!(report.summary.recommendations.is_empty());
    assert_eq!(report.summary.breakdown.quarantined, 1);
}

#[tokio::test]
async fn test_report_serializes_to_json() {
    let report = orchestrator(ChunkingStrategy::Naive)
        .process(SCENARIO, SegmentationMode::Balanced)
        .await
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["summary"]["total_chunks"], 4);
    assert_eq!(json["urls"][0]["outcome"]["category"], "url/explicit");
    assert_eq!(json["processing_log"][2]["category"], "gibberish");
    assert!(json["processing_log"][2]["confidence"].is_null());
}

// ============================================================================
// Bucket accounting
// ============================================================================

#[tokio::test]
async fn test_every_fragment_lands_in_one_bucket() {
    for strategy in [ChunkingStrategy::Naive, ChunkingStrategy::Discourse] {
        for mode in [
            SegmentationMode::Strict,
            SegmentationMode::Balanced,
            SegmentationMode::Loose,
        ] {
            let orchestrator = orchestrator(strategy);
            let report = orchestrator.process(RAMBLE, mode).await.unwrap();

            assert_eq!(
                bucket_total(&report),
                report.processing_log.len(),
                "{strategy}/{mode}"
            );
            assert_eq!(report.summary.total_chunks, report.processing_log.len());

            let stats = orchestrator.get_stats();
            assert_eq!(stats.total_processed, report.processing_log.len());
            assert_eq!(
                stats.thoughts
                    + stats.urls_explicit
                    + stats.urls_inferred
                    + stats.todos
                    + stats.gibberish
                    + stats.salvaged,
                stats.total_processed
            );
        }
    }
}

#[tokio::test]
async fn test_processing_log_preserves_input_order() {
    let report = orchestrator(ChunkingStrategy::Naive)
        .process(RAMBLE, SegmentationMode::Balanced)
        .await
        .unwrap();

    let indices: Vec<usize> = report.processing_log.iter().map(|e| e.chunk_index).collect();
    let expected: Vec<usize> = (0..indices.len()).collect();
    assert_eq!(indices, expected);
    assert!(report.processing_log[0].original.starts_with("I talked to Sarah"));
}

// ============================================================================
// Stage behavior through the orchestrator
// ============================================================================

#[tokio::test]
async fn test_url_description_is_inferred() {
    let report = orchestrator(ChunkingStrategy::Naive)
        .process("that blue bird social media site", SegmentationMode::Balanced)
        .await
        .unwrap();

    assert_eq!(report.urls.len(), 1);
    assert_eq!(report.urls[0].category(), Category::UrlInferred);
    match &report.urls[0].outcome {
        StageOutcome::InferredUrl(inferred) => {
            assert!(inferred.url.starts_with("https://twitter.com"));
            assert_eq!(inferred.confidence, Confidence::High);
        }
        other => panic!("expected inferred url, got {other:?}"),
    }
    assert!(report
        .summary
        .recommendations
        .iter()
        .any(|r| r.contains("inferred URLs")));
}

#[tokio::test]
async fn test_gibberish_is_never_inferred_with_high_confidence() {
    let inferred = UrlInferencer::new().infer("asdkfj29xnz").await;
    assert!(matches!(inferred.confidence, Confidence::None | Confidence::Low));
}

#[tokio::test]
async fn test_urgent_action_item() {
    let report = orchestrator(ChunkingStrategy::Naive)
        .process(
            "I need to pay the electric bill by Friday URGENT",
            SegmentationMode::Balanced,
        )
        .await
        .unwrap();

    assert_eq!(report.todos.len(), 1);
    match &report.todos[0].outcome {
        StageOutcome::Todo(item) => {
            assert_eq!(item.urgency, Urgency::High);
            assert!(item.action.starts_with("need to pay"));
        }
        other => panic!("expected todo, got {other:?}"),
    }
}

#[tokio::test]
async fn test_repeated_characters_are_quarantined() {
    let assessment = QualityClassifier::new().analyze("aaaaaaaaaa");
    assert_eq!(assessment.classification, QualityClass::Gibberish);
    assert!(assessment.quality_score < 0.4);

    let report = orchestrator(ChunkingStrategy::Naive)
        .process("aaaaaaaaaa", SegmentationMode::Balanced)
        .await
        .unwrap();
    assert_eq!(report.quarantine.len(), 1);
}

#[test]
fn test_salvage_parts_only_for_salvageable_text() {
    let classifier = QualityClassifier::new();
    let samples = [
        "",
        "aaaaaaaaaa",
        "asdflkjasdf",
        "need milk and eggs",
        "The meeting is at noon.",
        "xkcd qwpz; I will call the bank, vbnm zzkq",
        "@@@@ ok then | we should go now ; ####",
        "12 34 56 78",
    ];
    for text in samples {
        let assessment = classifier.analyze(text);
        if assessment.classification != QualityClass::Salvageable {
            assert!(
                assessment.salvageable_parts.is_empty(),
                "{text:?} classified {:?} with parts",
                assessment.classification
            );
        }
        assert!((0.0..=1.0).contains(&assessment.quality_score));
    }
}

#[tokio::test]
async fn test_salvageable_fragment_with_parts_is_salvaged() {
    let orchestrator = orchestrator(ChunkingStrategy::Naive);
    let report = orchestrator
        .process(
            "bnmk bnmk bnmk bnmk bnmk bnmk bnmk, the cat is",
            SegmentationMode::Balanced,
        )
        .await
        .unwrap();

    assert_eq!(report.salvaged.len(), 1);
    assert_eq!(report.processing_log[0].category, Category::Salvaged);
    match &report.salvaged[0].outcome {
        StageOutcome::Salvaged(assessment) => {
            assert_eq!(assessment.classification, QualityClass::Salvageable);
            assert_eq!(assessment.salvageable_parts, vec!["the cat is"]);
        }
        other => panic!("expected salvaged, got {other:?}"),
    }
    assert!(report.quarantine.is_empty());
    assert_eq!(report.summary.quality_metrics.salvage_ratio, 1.0);
    assert_eq!(orchestrator.quarantine_len(), 0);
    assert_eq!(orchestrator.get_stats().salvaged, 1);
}

#[tokio::test]
async fn test_salvageable_fragment_without_parts_is_a_thought() {
    let orchestrator = orchestrator(ChunkingStrategy::Naive);
    let report = orchestrator
        .process("qwrt zxcv bnmk plkj hgfd wxyz, the cat", SegmentationMode::Balanced)
        .await
        .unwrap();

    assert!(report.salvaged.is_empty());
    assert_eq!(report.thoughts.len(), 1);
    assert_eq!(report.processing_log[0].category, Category::Thought);
    assert_eq!(report.summary.quality_metrics.salvage_ratio, 0.0);
    assert_eq!(orchestrator.quarantine_len(), 0);
}

#[tokio::test]
async fn test_repeated_runs_classify_identically() {
    let orchestrator = orchestrator(ChunkingStrategy::Naive);
    let first = orchestrator
        .process(RAMBLE, SegmentationMode::Balanced)
        .await
        .unwrap();
    let second = orchestrator
        .process(RAMBLE, SegmentationMode::Balanced)
        .await
        .unwrap();

    let categories =
        |r: &TriageReport| r.processing_log.iter().map(|e| e.category).collect::<Vec<_>>();
    assert_eq!(categories(&first), categories(&second));
    assert_eq!(first.summary.breakdown, second.summary.breakdown);
    assert_eq!(orchestrator.get_stats().total_processed, 2 * first.processing_log.len());
}

#[tokio::test]
async fn test_empty_input_is_rejected_before_chunking() {
    let orchestrator = orchestrator(ChunkingStrategy::Discourse);
    let err = orchestrator
        .process("   \n\n  ", SegmentationMode::Balanced)
        .await
        .unwrap_err();
    assert!(matches!(err, RamblerError::EmptyInput));
    assert_eq!(orchestrator.get_stats().total_processed, 0);
}

// ============================================================================
// Entity-aware segmentation
// ============================================================================

#[tokio::test]
async fn test_discourse_strategy_groups_and_counts_entities() {
    let orchestrator = orchestrator(ChunkingStrategy::Discourse);
    assert!(orchestrator.is_model_ready());

    let report = orchestrator
        .process(
            "I talked to Sarah today. She was upset. Anyway, I need to call Google support.",
            SegmentationMode::Balanced,
        )
        .await
        .unwrap();

    assert!(report.model_ready);
    assert_eq!(report.strategy, ChunkingStrategy::Discourse);
    assert_eq!(report.processing_log.len(), 2);
    assert_eq!(report.processing_log[0].category, Category::Thought);
    assert_eq!(report.processing_log[1].category, Category::Todo);
    assert!(orchestrator.get_stats().entities_found >= 3);
}

#[tokio::test]
async fn test_strict_mode_is_one_fragment_per_sentence() {
    let report = orchestrator(ChunkingStrategy::Discourse)
        .process(
            "I talked to Sarah today. She was upset. Anyway, I need to call Google support.",
            SegmentationMode::Strict,
        )
        .await
        .unwrap();
    assert_eq!(report.processing_log.len(), 3);
}

#[tokio::test]
async fn test_unavailable_model_degrades_silently() {
    let orchestrator = TriageOrchestrator::builder()
        .config(TriageConfig {
            strategy: ChunkingStrategy::Discourse,
            ..Default::default()
        })
        .segmentation(SegmentationService::unavailable())
        .build();

    let report = orchestrator
        .process(
            "I talked to Sarah today. She was upset. Anyway, I need to call Google support.",
            SegmentationMode::Balanced,
        )
        .await
        .unwrap();

    assert!(!report.model_ready);
    assert_eq!(report.processing_log.len(), 3);
    assert!(report.processing_log.iter().all(|e| e.entity_count == 0));
    assert_eq!(orchestrator.get_stats().entities_found, 0);
}

#[tokio::test]
async fn test_bad_gazetteer_leaves_model_unavailable() {
    let orchestrator = TriageOrchestrator::builder()
        .config(TriageConfig {
            strategy: ChunkingStrategy::Discourse,
            lexicon_path: Some("/nonexistent/gazetteer.toml".into()),
            ..Default::default()
        })
        .build();
    assert!(!orchestrator.is_model_ready());

    let report = orchestrator
        .process("One thought. Another thought.", SegmentationMode::Loose)
        .await
        .unwrap();
    assert_eq!(bucket_total(&report), 2);
}

// ============================================================================
// Remote classifier and chunk merging
// ============================================================================

struct ScriptedClassifier {
    relationship: Option<Relationship>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    fn related() -> Self {
        Self {
            relationship: Some(Relationship {
                relationship_type: RelationshipType::SameTopic,
                confidence: 0.9,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            relationship: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RemoteClassifier for ScriptedClassifier {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn classify_relationship(&self, _a: &str, _b: &str) -> Result<Relationship> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.relationship
            .ok_or_else(|| RamblerError::Llm("model unavailable".into()))
    }
}

const MULTI_CHUNK_THOUGHT: &str = "I walked the dog this morning. Later I cleaned the kitchen floor. \
    Oh wait, the neighbours were painting their fence";

#[tokio::test]
async fn test_related_thought_chunks_are_merged() {
    let classifier = Arc::new(ScriptedClassifier::related());
    let orchestrator = TriageOrchestrator::builder()
        .classifier(classifier.clone())
        .build();

    let report = orchestrator
        .process(MULTI_CHUNK_THOUGHT, SegmentationMode::Balanced)
        .await
        .unwrap();

    assert_eq!(report.thoughts.len(), 1);
    match &report.thoughts[0].outcome {
        StageOutcome::Thought { chunks, .. } => {
            assert_eq!(chunks.len(), 1);
            assert_eq!(chunks[0].merged_from, Some(vec![1, 2, 3]));
            assert!(chunks[0].text.contains(" ... "));
        }
        other => panic!("expected thought, got {other:?}"),
    }
    assert!(classifier.calls.load(Ordering::SeqCst) > 0);
}

#[tokio::test]
async fn test_failing_classifier_does_not_block_the_run() {
    let orchestrator = TriageOrchestrator::builder()
        .classifier(Arc::new(ScriptedClassifier::failing()))
        .build();

    let report = orchestrator
        .process(MULTI_CHUNK_THOUGHT, SegmentationMode::Balanced)
        .await
        .unwrap();

    assert_eq!(report.thoughts.len(), 1);
    match &report.thoughts[0].outcome {
        StageOutcome::Thought { chunks, .. } => {
            assert_eq!(chunks.len(), 3);
            assert!(chunks.iter().all(|c| c.merged_from.is_none()));
        }
        other => panic!("expected thought, got {other:?}"),
    }
}

#[tokio::test]
async fn test_disabled_merge_skips_classifier() {
    let classifier = Arc::new(ScriptedClassifier::related());
    let mut config = TriageConfig::default();
    config.merge.enabled = false;
    let orchestrator = TriageOrchestrator::builder()
        .config(config)
        .classifier(classifier.clone())
        .build();

    orchestrator
        .process(MULTI_CHUNK_THOUGHT, SegmentationMode::Balanced)
        .await
        .unwrap();
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Stage failures
// ============================================================================

/// Fails on fragments mentioning "boom"; panics on "kaboom".
struct VolatileStage;

#[async_trait]
impl TriageStage for VolatileStage {
    fn name(&self) -> &'static str {
        "volatile"
    }

    async fn evaluate(&self, ctx: &FragmentContext) -> Result<Option<StageOutcome>> {
        if ctx.text().contains("kaboom") {
            panic!("stage blew up");
        }
        if ctx.text().contains("boom") {
            return Err(RamblerError::Stage("boom".into()));
        }
        Ok(None)
    }
}

#[tokio::test]
async fn test_failing_stage_marks_fragment_unclassifiable() {
    let orchestrator = TriageOrchestrator::builder()
        .stages(vec![
            Box::new(VolatileStage),
            Box::new(ThoughtStage::new(None, None)),
        ])
        .build();

    let report = orchestrator
        .process(
            "first thought\n\nboom goes the dynamite\n\nkaboom\n\nlast thought",
            SegmentationMode::Balanced,
        )
        .await
        .unwrap();

    assert_eq!(report.processing_log.len(), 4);
    assert_eq!(report.thoughts.len(), 2);
    assert_eq!(report.quarantine.len(), 2);

    let stats = orchestrator.get_stats();
    assert_eq!(stats.gibberish, 2);
    assert_eq!(stats.thoughts, 2);

    let quarantined = orchestrator.clear_quarantine();
    assert_eq!(quarantined.len(), 2);
    assert!(quarantined[0].reasons[0].starts_with("unclassifiable: volatile stage"));
    assert!(quarantined[1].reasons[0].contains("panicked"));
}

#[tokio::test]
async fn test_stage_list_without_catch_all() {
    let orchestrator = TriageOrchestrator::builder()
        .stages(vec![Box::new(VolatileStage)])
        .build();
    let report = orchestrator
        .process("nothing claims this", SegmentationMode::Balanced)
        .await
        .unwrap();
    assert_eq!(report.quarantine.len(), 1);
    assert_eq!(bucket_total(&report), 1);
}
