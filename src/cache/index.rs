use super::naming::{NamingScheme, ReductionSpec, Suffixes};
use super::{Cache, CacheTier, ItemId};
use crate::error::{Error, Result};
use crate::perception::ModelRegistry;
use crate::vecfile::{self, VectorFiles};
use std::collections::hash_map::{Entry, HashMap};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Builds a [`Cache`] snapshot by probing the filesystem.
pub struct CacheIndex<'a> {
    registry: &'a ModelRegistry,
    files: VectorFiles,
}

impl<'a> CacheIndex<'a> {
    pub fn new(registry: &'a ModelRegistry) -> Self {
        Self {
            registry,
            files: VectorFiles::default(),
        }
    }

    /// Keep cache files in `dir` instead of next to the items
    pub fn cache_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.files = VectorFiles::new(dir);
        self
    }

    /// Classify every item into exactly one tier, or exclude it.
    pub fn build(&self, items: Vec<PathBuf>, scheme: &NamingScheme) -> Result<Cache> {
        if let Some(spec) = scheme.reduction() {
            spec.validate()?;
        }
        if items.is_empty() {
            return Err(Error::EmptyInput);
        }

        let cache = match scheme {
            NamingScheme::Model { model, reduction } => {
                self.build_model(items, model, reduction.as_ref())?
            }
            NamingScheme::Precomputed {
                suffixes,
                reduction,
            } => self.build_precomputed(items, suffixes, reduction.as_ref())?,
        };

        if cache.counts().total() == 0 {
            return Err(Error::EmptyInput);
        }
        for (first, second) in shared_cache_paths(&cache) {
            warn!(
                first = %cache.path(first).display(),
                second = %cache.path(second).display(),
                "items share one cache file"
            );
        }
        log_status(&cache);
        Ok(cache)
    }

    fn build_model(
        &self,
        items: Vec<PathBuf>,
        model: &str,
        reduction: Option<&ReductionSpec>,
    ) -> Result<Cache> {
        let width = self.registry.get(model)?.width;
        let reduced_width = reduction.map(|spec| clamp_size(spec, width));
        let suffixes = Suffixes {
            inputs: vec![model.to_string()],
            perception: model.to_string(),
            reduced: reduction.zip(reduced_width).map(|(spec, w)| spec.suffix(model, w)),
        };
        info!(
            perception = %suffixes.perception,
            reduced = ?suffixes.reduced,
            "cache suffixes"
        );

        let mut cache = empty_cache(items, self.files.clone(), suffixes, width, reduced_width);
        for index in 0..cache.items.len() {
            let id = ItemId(index);
            let item = &cache.items[index];

            let has_percept = vecfile::probe(&self.files.path(item, &cache.suffixes.perception))
                == Some(width);
            let has_reduced = match (&cache.suffixes.reduced, reduced_width) {
                (Some(suffix), Some(w)) => {
                    vecfile::probe(&self.files.path(item, suffix)) == Some(w)
                }
                _ => false,
            };

            let tier = if has_reduced {
                CacheTier::Reduced
            } else if has_percept {
                CacheTier::Perceived
            } else {
                CacheTier::Uncached
            };
            cache.assign(id, tier);

            if has_percept {
                cache.perceived_all.push(id);
            } else {
                cache.uncached_all.push(id);
            }
        }
        Ok(cache)
    }

    fn build_precomputed(
        &self,
        items: Vec<PathBuf>,
        inputs: &[String],
        reduction: Option<&ReductionSpec>,
    ) -> Result<Cache> {
        if inputs.is_empty() {
            return Err(Error::config("precomputed mode needs at least one suffix"));
        }
        info!(suffixes = %inputs.join(" "), "cache suffixes");

        // per-suffix widths of the first complete item fix the layout
        let mut layout: Option<Vec<usize>> = None;
        let mut survivors = Vec::new();
        for (index, item) in items.iter().enumerate() {
            let sizes: Option<Vec<usize>> = inputs
                .iter()
                .map(|suffix| vecfile::probe(&self.files.path(item, suffix)))
                .collect();
            let Some(sizes) = sizes else {
                debug!(item = %item.display(), "incomplete precomputed vectors, skipped");
                continue;
            };

            match &layout {
                None => {
                    info!(
                        sizes = %sizes.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(" + "),
                        width = sizes.iter().sum::<usize>(),
                        "vector size"
                    );
                    layout = Some(sizes);
                }
                Some(expected) if *expected != sizes => {
                    warn!(
                        item = %item.display(),
                        "precomputed vectors {:?} do not match {:?}, skipped",
                        sizes,
                        expected
                    );
                    continue;
                }
                Some(_) => {}
            }
            survivors.push(ItemId(index));
        }

        let width = layout.map(|sizes| sizes.iter().sum()).unwrap_or(0);
        let perception = inputs.concat();
        let reduced_width = match reduction {
            Some(spec) if width > 0 => Some(clamp_size(spec, width)),
            _ => None,
        };
        let suffixes = Suffixes {
            inputs: inputs.to_vec(),
            reduced: reduction
                .zip(reduced_width)
                .map(|(spec, w)| spec.suffix(&perception, w)),
            perception,
        };

        let mut cache = empty_cache(items, self.files.clone(), suffixes, width, reduced_width);
        for id in survivors {
            let has_reduced = match (&cache.suffixes.reduced, reduced_width) {
                (Some(suffix), Some(w)) => {
                    vecfile::probe(&self.files.path(cache.path(id), suffix)) == Some(w)
                }
                _ => false,
            };
            cache.assign(
                id,
                if has_reduced {
                    CacheTier::Reduced
                } else {
                    CacheTier::Perceived
                },
            );
            cache.perceived_all.push(id);
        }
        Ok(cache)
    }
}

impl Cache {
    fn assign(&mut self, id: ItemId, tier: CacheTier) {
        self.tiers[id.0] = Some(tier);
        match tier {
            CacheTier::Uncached => self.uncached.push(id),
            CacheTier::Perceived => self.perceived.push(id),
            CacheTier::Reduced => self.reduced.push(id),
        }
    }
}

fn empty_cache(
    items: Vec<PathBuf>,
    files: VectorFiles,
    suffixes: Suffixes,
    vector_width: usize,
    reduced_width: Option<usize>,
) -> Cache {
    let n = items.len();
    Cache {
        items,
        tiers: vec![None; n],
        files,
        suffixes,
        vector_width,
        reduced_width,
        uncached: Vec::new(),
        perceived: Vec::new(),
        reduced: Vec::new(),
        perceived_all: Vec::new(),
        uncached_all: Vec::new(),
    }
}

/// Pairs of items whose perception vectors land on the same file, e.g.
/// `a.png` and `a.jpg`.
pub(super) fn shared_cache_paths(cache: &Cache) -> Vec<(ItemId, ItemId)> {
    let mut seen: HashMap<PathBuf, ItemId> = HashMap::new();
    let mut shared = Vec::new();
    for id in cache.ids() {
        let path = cache.files.path(cache.path(id), &cache.suffixes.perception);
        match seen.entry(path) {
            Entry::Occupied(entry) => shared.push((*entry.get(), id)),
            Entry::Vacant(entry) => {
                entry.insert(id);
            }
        }
    }
    shared
}

/// Reduced size never exceeds the available vector width.
fn clamp_size(spec: &ReductionSpec, width: usize) -> usize {
    if spec.size > width {
        warn!(
            requested = spec.size,
            available = width,
            "reduction size clamped to the vector width"
        );
    }
    spec.size.min(width)
}

fn log_status(cache: &Cache) {
    let counts = cache.counts();
    let available = cache.perceived_all.len();
    if available > counts.perceived {
        info!(
            "cache status: {} ({} perception vectors available)",
            counts, available
        );
    } else {
        info!("cache status: {}", counts);
    }
}
