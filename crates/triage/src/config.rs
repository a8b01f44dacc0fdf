//! Configuration for the triage pipeline.
//!
//! # Security
//!
//! - Config file permission validation on Unix systems
//! - Rejects world-readable files containing API keys
//! - Warns about API keys stored in config files

use std::path::{Path, PathBuf};
use std::time::Duration;

use rambler_llm::LlmConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::chunker::ChunkingStrategy;
use crate::segmentation::SegmentationMode;

/// Main triage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    /// Chunking strategy: "naive" or "discourse"
    #[serde(default)]
    pub strategy: ChunkingStrategy,

    /// Default grouping granularity when the caller gives none
    #[serde(default)]
    pub segmentation_mode: SegmentationMode,

    /// Gazetteer TOML extending the sentence model's ORG/PERSON names
    #[serde(default)]
    pub lexicon_path: Option<PathBuf>,

    /// Timeout for URL inference in milliseconds
    #[serde(default = "default_inference_timeout")]
    pub inference_timeout_ms: u64,

    /// HEAD-check inferred URLs and downgrade unreachable ones
    #[serde(default)]
    pub validate_inferred_urls: bool,

    #[serde(default = "default_validation_timeout")]
    pub validation_timeout_ms: u64,

    #[serde(default)]
    pub merge: MergeConfig,

    /// Remote relationship classifier; merging is disabled without it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum relationship confidence for two chunks to merge
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// How many following chunks each chunk is compared with
    #[serde(default = "default_window")]
    pub window: usize,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_inference_timeout() -> u64 {
    12_000
}

fn default_validation_timeout() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

fn default_confidence_threshold() -> f32 {
    0.7
}

fn default_window() -> usize {
    3
}

fn default_request_timeout() -> u64 {
    15_000
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            confidence_threshold: default_confidence_threshold(),
            window: default_window(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkingStrategy::default(),
            segmentation_mode: SegmentationMode::default(),
            lexicon_path: None,
            inference_timeout_ms: default_inference_timeout(),
            validate_inferred_urls: false,
            validation_timeout_ms: default_validation_timeout(),
            merge: MergeConfig::default(),
            llm: None,
        }
    }
}

impl TriageConfig {
    /// Load configuration from a TOML file.
    ///
    /// On Unix the file must be a regular file that is not world-writable,
    /// and must not be world-readable if it holds an API key.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        #[cfg(unix)]
        validate_config_file_permissions(path)?;

        let config = Self::from_file_unchecked(path)?;

        if config.llm.as_ref().is_some_and(|llm| llm.api_key.is_some()) {
            warn!(
                "API key found in config file '{}'. For better security, \
                 use the OPENAI_API_KEY environment variable instead.",
                path.display()
            );
        }

        Ok(config)
    }

    /// Load configuration from a TOML file without permission checks.
    pub fn from_file_unchecked(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_millis(self.validation_timeout_ms)
    }
}

#[cfg(unix)]
fn validate_config_file_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;

    if !metadata.is_file() {
        anyhow::bail!(
            "Config path '{}' is not a regular file.",
            path.display()
        );
    }

    let permission_bits = metadata.permissions().mode() & 0o777;

    if permission_bits & 0o002 != 0 {
        anyhow::bail!(
            "Config file '{}' is world-writable (mode {:04o}). Fix with: chmod o-w {}",
            path.display(),
            permission_bits,
            path.display()
        );
    }

    let content = std::fs::read_to_string(path)?;
    let has_api_key = content.contains("api_key");

    if has_api_key && permission_bits & 0o004 != 0 {
        anyhow::bail!(
            "Config file '{}' contains an API key but is world-readable (mode {:04o}). \
             Fix with: chmod 600 {}",
            path.display(),
            permission_bits,
            path.display()
        );
    }

    Ok(())
}
