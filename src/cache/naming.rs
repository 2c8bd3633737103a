// naming.rs - how cache suffixes are derived for a run
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Requested dimensionality reduction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionSpec {
    pub method: String,
    pub size: usize,
}

impl ReductionSpec {
    pub fn new(method: impl Into<String>, size: usize) -> Self {
        Self {
            method: method.into(),
            size,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.method.is_empty() || self.method == "none" {
            return Err(Error::config(
                "reduction method must be named (omit the reduction to disable it)",
            ));
        }
        if self.size == 0 {
            return Err(Error::config("reduction size must be positive"));
        }
        Ok(())
    }

    /// Suffix of reduced vectors derived from the perception suffix
    pub(crate) fn suffix(&self, perception: &str, size: usize) -> String {
        format!("{}-{}{}", perception, self.method, size)
    }
}

/// Where perception vectors come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamingScheme {
    /// Vectors produced by a registered model, cached under the model id
    Model {
        model: String,
        reduction: Option<ReductionSpec>,
    },
    /// Vectors precomputed elsewhere, one file per suffix, concatenated in order
    Precomputed {
        suffixes: Vec<String>,
        reduction: Option<ReductionSpec>,
    },
}

impl NamingScheme {
    pub fn model(model: impl Into<String>) -> Self {
        Self::Model {
            model: model.into(),
            reduction: None,
        }
    }

    /// Parse a comma separated suffix list such as `"a,b"`
    pub fn precomputed(list: &str) -> Result<Self> {
        let suffixes: Vec<String> = list
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();
        if suffixes.iter().any(|s| s.is_empty()) {
            return Err(Error::config(format!("invalid suffix list {:?}", list)));
        }
        Ok(Self::Precomputed {
            suffixes,
            reduction: None,
        })
    }

    pub fn with_reduction(mut self, spec: ReductionSpec) -> Self {
        match &mut self {
            Self::Model { reduction, .. } | Self::Precomputed { reduction, .. } => {
                *reduction = Some(spec)
            }
        }
        self
    }

    pub fn reduction(&self) -> Option<&ReductionSpec> {
        match self {
            Self::Model { reduction, .. } | Self::Precomputed { reduction, .. } => {
                reduction.as_ref()
            }
        }
    }
}

/// Active suffixes of a built cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suffixes {
    /// Files concatenated into one perception vector
    pub inputs: Vec<String>,
    /// Suffix new perception vectors are written under
    pub perception: String,
    /// Suffix of reduced vectors, when reduction is enabled
    pub reduced: Option<String>,
}
