//! Text triage pipeline.
//!
//! Raw, often unpunctuated captures are split into fragments and each
//! fragment is routed into exactly one bucket: thought, URL (explicit or
//! inferred), todo, quarantined gibberish, or salvaged content.
//!
//! ```no_run
//! use rambler_triage::{SegmentationMode, TriageConfig, TriageOrchestrator};
//!
//! # async fn run() -> rambler_common::Result<()> {
//! let orchestrator = TriageOrchestrator::from_config(TriageConfig::default());
//! let report = orchestrator
//!     .process("need milk and eggs\n\nhttps://example.com", SegmentationMode::Balanced)
//!     .await?;
//! println!("{} fragments", report.summary.total_chunks);
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod chunker;
pub mod confidence;
pub mod config;
pub mod enrichment;
pub mod merge;
pub mod orchestrator;
pub mod quality;
pub mod report;
pub mod segmentation;
pub mod stages;
pub mod stats;
pub mod url_inference;

pub use action::{ActionDetector, ActionItem, Urgency};
pub use chunker::{Chunker, ChunkingStrategy, DiscourseChunker, NaiveChunker};
pub use confidence::Confidence;
pub use config::{MergeConfig, TriageConfig};
pub use enrichment::RuleBasedEnricher;
pub use merge::ChunkMerger;
pub use orchestrator::{TriageOrchestrator, TriageOrchestratorBuilder};
pub use quality::{QualityAssessment, QualityClass, QualityClassifier, Recommendation};
pub use report::{
    Breakdown, Category, ProcessingLogEntry, QualityMetrics, QuarantineEntry, Summary,
    TriageReport, TriageResult,
};
pub use segmentation::{
    Gazetteer, LexiconModel, SegmentationMode, SegmentationService, SentenceAnalysis,
    SentenceModel, ThoughtGroup,
};
pub use stages::{FragmentContext, StageOutcome, TriageStage};
pub use stats::RunStatistics;
pub use url_inference::{ExplicitUrl, InferenceType, InferredUrl, UrlInferencer};
