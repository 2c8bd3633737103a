//! Three-tier feature-vector cache.
//!
//! Every item is classified once, at startup, by probing the filesystem:
//! `Reduced` items already have their final vector on disk, `Perceived`
//! items only need reduction, `Uncached` items need the whole
//! decode/extract/reduce chain. The snapshot stays fixed for the run.

mod index;
mod naming;


pub use index::CacheIndex;
pub use naming::{NamingScheme, ReductionSpec, Suffixes};

use crate::vecfile::VectorFiles;
use std::fmt;
use std::path::{Path, PathBuf};

/// Index of an item in the cache's path table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(usize);

impl ItemId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTier {
    /// Needs decode, extraction and reduction
    Uncached,
    /// Perception vector on disk, needs reduction
    Perceived,
    /// Final vector on disk
    Reduced,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierCounts {
    pub uncached: usize,
    pub perceived: usize,
    pub reduced: usize,
}

impl TierCounts {
    pub fn total(&self) -> usize {
        self.uncached + self.perceived + self.reduced
    }
}

impl fmt::Display for TierCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} reduced, {} perceived, {} uncached",
            self.reduced, self.perceived, self.uncached
        )
    }
}

/// Tier snapshot of a set of items
#[derive(Debug, Clone)]
pub struct Cache {
    items: Vec<PathBuf>,
    tiers: Vec<Option<CacheTier>>,
    files: VectorFiles,
    suffixes: Suffixes,
    vector_width: usize,
    reduced_width: Option<usize>,

    uncached: Vec<ItemId>,
    perceived: Vec<ItemId>,
    reduced: Vec<ItemId>,
    /// Items with a perception vector on disk, whatever their tier
    perceived_all: Vec<ItemId>,
    /// Items without a perception vector on disk, whatever their tier
    uncached_all: Vec<ItemId>,
}

impl Cache {
    pub fn path(&self, id: ItemId) -> &Path {
        &self.items[id.0]
    }

    pub fn paths<'a>(&'a self, ids: &[ItemId]) -> Vec<&'a Path> {
        ids.iter().map(|&id| self.path(id)).collect()
    }

    /// Every input item, including the ones excluded from all tiers
    pub fn items(&self) -> &[PathBuf] {
        &self.items
    }

    /// Tier of `id`, `None` if the item was excluded
    pub fn tier(&self, id: ItemId) -> Option<CacheTier> {
        self.tiers[id.0]
    }

    pub fn ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        (0..self.items.len()).map(ItemId)
    }

    pub fn uncached(&self) -> &[ItemId] {
        &self.uncached
    }

    pub fn perceived(&self) -> &[ItemId] {
        &self.perceived
    }

    pub fn reduced(&self) -> &[ItemId] {
        &self.reduced
    }

    pub fn perceived_all(&self) -> &[ItemId] {
        &self.perceived_all
    }

    pub fn uncached_all(&self) -> &[ItemId] {
        &self.uncached_all
    }

    pub fn counts(&self) -> TierCounts {
        TierCounts {
            uncached: self.uncached.len(),
            perceived: self.perceived.len(),
            reduced: self.reduced.len(),
        }
    }

    pub fn files(&self) -> &VectorFiles {
        &self.files
    }

    pub fn suffixes(&self) -> &Suffixes {
        &self.suffixes
    }

    /// Width of perception vectors
    pub fn vector_width(&self) -> usize {
        self.vector_width
    }

    /// Width of reduced vectors, after clamping to the perception width
    pub fn reduced_width(&self) -> Option<usize> {
        self.reduced_width
    }

    /// Width of the vectors the pipeline outputs
    pub fn output_width(&self) -> usize {
        self.reduced_width.unwrap_or(self.vector_width)
    }

    pub fn is_reducing(&self) -> bool {
        self.suffixes.reduced.is_some()
    }
}
