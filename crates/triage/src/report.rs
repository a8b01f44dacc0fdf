//! Per-run triage report: buckets, processing log and summary.

use std::fmt;

use rambler_common::{preview, Result};
use serde::{Deserialize, Serialize};

use crate::chunker::ChunkingStrategy;
use crate::confidence::Confidence;
use crate::segmentation::SegmentationMode;
use crate::stages::StageOutcome;
use crate::stats::RunStatistics;

const PREVIEW_CHARS: usize = 50;

const QUARANTINE_WARNING: usize = 5;
const TODO_WARNING: usize = 10;
const SALVAGE_WARNING: usize = 3;

/// Bucket a fragment was routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "thought")]
    Thought,
    #[serde(rename = "url/explicit")]
    UrlExplicit,
    #[serde(rename = "url/inferred")]
    UrlInferred,
    #[serde(rename = "todo")]
    Todo,
    #[serde(rename = "gibberish")]
    Gibberish,
    #[serde(rename = "salvaged")]
    Salvaged,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thought => "thought",
            Self::UrlExplicit => "url/explicit",
            Self::UrlInferred => "url/inferred",
            Self::Todo => "todo",
            Self::Gibberish => "gibberish",
            Self::Salvaged => "salvaged",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The classified outcome of one fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResult {
    pub fragment_index: usize,
    pub outcome: StageOutcome,
    pub original_text: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl TriageResult {
    pub fn category(&self) -> Category {
        self.outcome.category()
    }
}

/// A rejected fragment held until [`clear_quarantine`] drains it.
///
/// [`clear_quarantine`]: crate::TriageOrchestrator::clear_quarantine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineEntry {
    pub text: String,
    pub reasons: Vec<String>,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingLogEntry {
    pub chunk_index: usize,
    /// First 50 characters, with "..." when truncated
    pub original: String,
    pub category: Category,
    /// Absent for gibberish and salvaged fragments
    pub confidence: Option<Confidence>,
    pub entity_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub thoughts: usize,
    pub urls: usize,
    pub todos: usize,
    pub quarantined: usize,
    pub salvaged: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub clean_ratio: f64,
    pub salvage_ratio: f64,
    pub url_inference_ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_chunks: usize,
    pub breakdown: Breakdown,
    pub quality_metrics: QualityMetrics,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageReport {
    pub run_id: String,
    pub mode: SegmentationMode,
    pub strategy: ChunkingStrategy,
    /// Whether the entity-aware sentence model was available
    pub model_ready: bool,
    pub thoughts: Vec<TriageResult>,
    pub urls: Vec<TriageResult>,
    pub todos: Vec<TriageResult>,
    pub quarantine: Vec<TriageResult>,
    pub salvaged: Vec<TriageResult>,
    pub summary: Summary,
    pub processing_log: Vec<ProcessingLogEntry>,
}

impl TriageReport {
    pub fn new(
        run_id: impl Into<String>,
        mode: SegmentationMode,
        strategy: ChunkingStrategy,
        model_ready: bool,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            mode,
            strategy,
            model_ready,
            thoughts: Vec::new(),
            urls: Vec::new(),
            todos: Vec::new(),
            quarantine: Vec::new(),
            salvaged: Vec::new(),
            summary: Summary::default(),
            processing_log: Vec::new(),
        }
    }

    /// Log a result and route it to its bucket.
    pub fn push(&mut self, result: TriageResult, entity_count: usize) {
        self.processing_log.push(ProcessingLogEntry {
            chunk_index: result.fragment_index,
            original: preview(&result.original_text, PREVIEW_CHARS),
            category: result.category(),
            confidence: result.outcome.confidence(),
            entity_count,
        });

        let bucket = match result.category() {
            Category::Thought => &mut self.thoughts,
            Category::UrlExplicit | Category::UrlInferred => &mut self.urls,
            Category::Todo => &mut self.todos,
            Category::Gibberish => &mut self.quarantine,
            Category::Salvaged => &mut self.salvaged,
        };
        bucket.push(result);
    }

    pub fn breakdown(&self) -> Breakdown {
        Breakdown {
            thoughts: self.thoughts.len(),
            urls: self.urls.len(),
            todos: self.todos.len(),
            quarantined: self.quarantine.len(),
            salvaged: self.salvaged.len(),
        }
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    /// Fill in the summary from the buckets and this run's statistics.
    pub fn summarize(&mut self, stats: &RunStatistics) {
        let breakdown = self.breakdown();

        let mut recommendations = Vec::new();
        if breakdown.quarantined > QUARANTINE_WARNING {
            recommendations
                .push("High gibberish count - consider reviewing input source".to_string());
        }
        if breakdown.todos > TODO_WARNING {
            recommendations
                .push("Many TODOs detected - consider task management integration".to_string());
        }
        if breakdown.salvaged > SALVAGE_WARNING {
            recommendations.push(
                "Several partially salvageable chunks - manual review recommended".to_string(),
            );
        }
        if stats.urls_inferred > stats.urls_explicit {
            recommendations.push("Many inferred URLs - verify accuracy manually".to_string());
        }

        self.summary = Summary {
            total_chunks: stats.classified(),
            breakdown,
            quality_metrics: QualityMetrics {
                clean_ratio: stats.clean_ratio(),
                salvage_ratio: stats.salvage_ratio(),
                url_inference_ratio: stats.url_inference_ratio(),
            },
            recommendations,
        };
    }
}
