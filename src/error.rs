use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while indexing the cache, running the batch pipeline or
/// organizing clusters.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad setting or unsupported combination, reported before any I/O.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A single input could not be decoded. Recovered by skipping the item.
    #[error("cannot read item {path}: {reason}")]
    ItemRead { path: PathBuf, reason: String },

    /// A cache file found by the scan vanished, shrank or has the wrong width.
    #[error("cache inconsistency at {path}: {reason}")]
    CacheConsistency { path: PathBuf, reason: String },

    /// Nothing left to process after filtering.
    #[error("no items to process")]
    EmptyInput,

    /// Extractor, reducer or clusterer failed or broke its output contract.
    #[error("collaborator failed: {0}")]
    Collaborator(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn consistency(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CacheConsistency {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Errors the batch loop recovers from by dropping one item.
    pub fn is_item_local(&self) -> bool {
        matches!(self, Self::ItemRead { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_item_read_is_local() {
        let item = Error::ItemRead {
            path: "a.png".into(),
            reason: "truncated".into(),
        };
        assert!(item.is_item_local());
        assert!(!Error::EmptyInput.is_item_local());
        assert!(!Error::consistency("a.none", "missing").is_item_local());
    }

    #[test]
    fn test_messages_name_the_offender() {
        let err = Error::consistency("/cache/a.resnet50", "file is empty");
        let msg = err.to_string();
        assert!(msg.contains("/cache/a.resnet50"));
        assert!(msg.contains("file is empty"));

        let err = Error::config("batch_size must be positive");
        assert!(err.to_string().contains("batch_size"));
    }
}
