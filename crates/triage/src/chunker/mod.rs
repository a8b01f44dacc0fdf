//! Splitting raw input into fragments.

mod discourse;
mod naive;

pub use discourse::DiscourseChunker;
pub use naive::NaiveChunker;

use std::fmt;
use std::str::FromStr;

use rambler_common::{Fragment, RamblerError};
use serde::{Deserialize, Serialize};

use crate::segmentation::{SegmentationMode, SegmentationService};

/// Splits text into an ordered list of non-empty fragments.
pub trait Chunker: Send + Sync {
    fn name(&self) -> &'static str;

    /// `mode` only affects strategies that group sentences.
    fn split(&self, text: &str, mode: SegmentationMode) -> Vec<Fragment>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    #[default]
    Naive,
    Discourse,
}

impl ChunkingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Naive => "naive",
            Self::Discourse => "discourse",
        }
    }

    pub fn build(self, segmentation: SegmentationService) -> Box<dyn Chunker> {
        match self {
            Self::Naive => Box::new(NaiveChunker),
            Self::Discourse => Box::new(DiscourseChunker::new(segmentation)),
        }
    }
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkingStrategy {
    type Err = RamblerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "naive" => Ok(Self::Naive),
            "discourse" | "entity" => Ok(Self::Discourse),
            other => Err(RamblerError::Config(format!(
                "unknown chunking strategy '{other}' (expected naive or discourse)"
            ))),
        }
    }
}

/// Finds `pieces` in `source` in order and returns their character spans.
/// A piece that cannot be found gets `(0, 0)`.
fn locate_spans<'a>(source: &str, pieces: impl IntoIterator<Item = &'a str>) -> Vec<(usize, usize)> {
    let mut cursor = 0;
    pieces
        .into_iter()
        .map(|piece| match source[cursor..].find(piece) {
            Some(offset) => {
                let start = cursor + offset;
                let end = start + piece.len();
                cursor = end;
                (
                    source[..start].chars().count(),
                    source[..end].chars().count(),
                )
            }
            None => (0, 0),
        })
        .collect()
}
