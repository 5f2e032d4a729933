//! Run configuration, passed explicitly to every component.

use crate::error::{NpSearchError, Result};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub const SIGNALP_ENV_BIN: &str = "NPSEARCH_SIGNALP_BIN";
pub const USEARCH_ENV_BIN: &str = "NPSEARCH_USEARCH_BIN";
pub const DEFAULT_SIGNALP_BIN: &str = "signalp";
pub const DEFAULT_USEARCH_BIN: &str = "usearch";

const MAX_REASONABLE_THREADS: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Minimum ORF length in residues, start residue included.
    pub min_orf_length: usize,
    /// Candidates longer than this are not sent to the predictor.
    pub max_sequence_length: usize,
    pub num_threads: usize,
    /// Bounded queue size of the worker pool; 0 means twice the thread count.
    pub queue_capacity: usize,
    pub alphabet_threshold: f64,
    pub alphabet_sample_size: usize,
    pub signalp_path: String,
    pub usearch_path: String,
    pub signalp_cutoff: f64,
    pub signalp_timeout_secs: u64,
    pub cluster_identity: f64,
    pub cluster_timeout_secs: u64,
    /// Parent of the per-call scratch directories; the system default when unset.
    pub temp_dir: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_orf_length: 30,
            max_sequence_length: 3000,
            num_threads: 1,
            queue_capacity: 0,
            alphabet_threshold: 0.9,
            alphabet_sample_size: 10_000,
            signalp_path: resolve_tool_executable(SIGNALP_ENV_BIN, DEFAULT_SIGNALP_BIN),
            usearch_path: resolve_tool_executable(USEARCH_ENV_BIN, DEFAULT_USEARCH_BIN),
            signalp_cutoff: 0.3,
            signalp_timeout_secs: 300,
            cluster_identity: 0.5,
            cluster_timeout_secs: 60,
            temp_dir: None,
        }
    }
}

impl SearchConfig {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            NpSearchError::Configuration(format!(
                "Could not read config file '{}': {e}",
                path.display()
            ))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            NpSearchError::Configuration(format!(
                "Could not parse config JSON '{}': {e}",
                path.display()
            ))
        })
    }

    /// Rejects unusable settings and coerces the thread count into range.
    pub fn validate(mut self) -> Result<Self> {
        if self.min_orf_length == 0 {
            return Err(NpSearchError::Input(
                "The minimum ORF length must be a whole number of at least 1".to_string(),
            ));
        }
        if self.max_sequence_length < self.min_orf_length {
            return Err(NpSearchError::Input(format!(
                "The maximum sequence length ({}) is below the minimum ORF length ({})",
                self.max_sequence_length, self.min_orf_length
            )));
        }
        if !(self.cluster_identity > 0.0 && self.cluster_identity <= 1.0) {
            return Err(NpSearchError::Input(format!(
                "The clustering identity must lie in (0, 1], got {}",
                self.cluster_identity
            )));
        }
        if !(self.alphabet_threshold > 0.0 && self.alphabet_threshold <= 1.0) {
            return Err(NpSearchError::Input(format!(
                "The alphabet threshold must lie in (0, 1], got {}",
                self.alphabet_threshold
            )));
        }
        if self.signalp_timeout_secs == 0 || self.cluster_timeout_secs == 0 {
            return Err(NpSearchError::Input(
                "External tool timeouts must be at least one second".to_string(),
            ));
        }
        if let Some(dir) = &self.temp_dir
            && !dir.is_dir()
        {
            return Err(NpSearchError::Configuration(format!(
                "Temporary directory '{}' does not exist",
                dir.display()
            )));
        }
        if self.num_threads == 0 {
            log::warn!("Number of threads can not be lower than 1, using 1");
            self.num_threads = 1;
        }
        if self.num_threads > MAX_REASONABLE_THREADS {
            log::warn!(
                "Number of threads set at {} is unusually high",
                self.num_threads
            );
        }
        Ok(self)
    }

    pub fn signalp_timeout(&self) -> Duration {
        Duration::from_secs(self.signalp_timeout_secs)
    }

    pub fn cluster_timeout(&self) -> Duration {
        Duration::from_secs(self.cluster_timeout_secs)
    }

    pub fn scratch_root(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn effective_queue_capacity(&self) -> usize {
        if self.queue_capacity == 0 {
            self.num_threads.max(1) * 2
        } else {
            self.queue_capacity
        }
    }
}

fn normalized_non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Environment variable if set and non-blank, otherwise the default binary name.
pub fn resolve_tool_executable(env_var: &str, default_bin: &str) -> String {
    std::env::var(env_var)
        .ok()
        .and_then(|v| normalized_non_empty(&v))
        .unwrap_or_else(|| default_bin.to_string())
}

/// Explicitly configured path if non-blank, otherwise [`resolve_tool_executable`].
pub fn configured_or_env(configured: Option<&str>, env_var: &str, default_bin: &str) -> String {
    configured
        .and_then(normalized_non_empty)
        .unwrap_or_else(|| resolve_tool_executable(env_var, default_bin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_validates() {
        let config = SearchConfig::default().validate().unwrap();
        assert_eq!(config.min_orf_length, 30);
        assert_eq!(config.effective_queue_capacity(), 2);
        assert_eq!(config.signalp_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_zero_threads_coerced() {
        let config = SearchConfig {
            num_threads: 0,
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(config.num_threads, 1);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let zero_orf = SearchConfig {
            min_orf_length: 0,
            ..Default::default()
        };
        assert!(matches!(zero_orf.validate(), Err(NpSearchError::Input(_))));

        let bad_identity = SearchConfig {
            cluster_identity: 1.5,
            ..Default::default()
        };
        assert!(bad_identity.validate().is_err());

        let missing_temp = SearchConfig {
            temp_dir: Some(PathBuf::from("/definitely/not/here/tmp")),
            ..Default::default()
        };
        assert!(matches!(
            missing_temp.validate(),
            Err(NpSearchError::Configuration(_))
        ));
    }

    #[test]
    fn test_load_partial_json() {
        let td = tempdir().unwrap();
        let path = td.path().join("config.json");
        std::fs::write(&path, r#"{"num_threads": 4, "signalp_path": "/opt/signalp"}"#).unwrap();
        let config = SearchConfig::load_from_path(&path).unwrap();
        assert_eq!(config.num_threads, 4);
        assert_eq!(config.signalp_path, "/opt/signalp");
        assert_eq!(config.cluster_identity, 0.5);
        assert_eq!(config.scratch_root(), std::env::temp_dir());
    }

    #[test]
    fn test_configured_path_wins() {
        assert_eq!(
            configured_or_env(Some(" /usr/bin/usearch "), "NPSEARCH_TEST_UNSET_VAR", "usearch"),
            "/usr/bin/usearch"
        );
        assert_eq!(
            configured_or_env(Some("   "), "NPSEARCH_TEST_UNSET_VAR", "usearch"),
            "usearch"
        );
    }
}
