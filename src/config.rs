use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings threaded through the cache index and the batch pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Items per batch in every tier
    pub batch_size: usize,
    /// Decode workers per batch
    pub threads: usize,
    /// Persist newly computed vectors
    pub caching: bool,
    /// Relocate cache files into this directory instead of next to the items
    pub cache_dir: Option<PathBuf>,
    /// Upper bound on vectors used to fit the reducer
    pub reduction_samples: usize,
    /// Seed for every randomized step
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 1024,
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            caching: false,
            cache_dir: None,
            reduction_samples: 4096,
            seed: 42,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a JSON file; missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            Error::config(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn caching(mut self, enabled: bool) -> Self {
        self.caching = enabled;
        self
    }

    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn reduction_samples(mut self, samples: usize) -> Self {
        self.reduction_samples = samples;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::config("batch_size must be positive"));
        }
        if self.threads == 0 {
            return Err(Error::config("threads must be positive"));
        }
        if self.reduction_samples == 0 {
            return Err(Error::config("reduction_samples must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = PipelineConfig::new()
            .batch_size(4)
            .threads(2)
            .caching(true)
            .cache_dir("/tmp/vectors")
            .seed(7);

        assert_eq!(config.batch_size, 4);
        assert_eq!(config.threads, 2);
        assert!(config.caching);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/vectors")));
        assert_eq!(config.reduction_samples, 4096);
        assert_eq!(config.seed, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let err = PipelineConfig::new().batch_size(0).validate().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_json_file_partial_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("imclust.json");
        std::fs::write(&path, r#"{ "batch_size": 16, "caching": true }"#).unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.batch_size, 16);
        assert!(config.caching);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn test_json_file_invalid_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "threads": 0 }"#).unwrap();

        assert!(matches!(
            PipelineConfig::from_json_file(&path),
            Err(Error::Configuration(_))
        ));
    }
}
