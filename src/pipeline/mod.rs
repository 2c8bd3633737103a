//! Batch pipeline producing one feature vector per item.
//!
//! Tiers run cheapest first and to completion: reduced vectors are just
//! loaded, perceived vectors are loaded and reduced, uncached items are
//! decoded, perceived and reduced. Output vectors are the concatenation of
//! the three tiers in that order; [`PipelineOutput::items`] carries the same
//! permutation so vectors and paths stay aligned.

pub mod batcher;


pub use batcher::Batcher;

use crate::cache::{Cache, CacheTier, ItemId};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::perception::{decode_batch, Decoder, Extractor};
use crate::reduction::Reducer;
use rayon::ThreadPool;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Vectors produced by one pipeline run
#[derive(Debug, Default)]
pub struct PipelineOutput {
    /// Item of each vector, in tier-then-batch order
    pub items: Vec<ItemId>,
    pub vectors: Vec<Vec<f32>>,
    /// Items whose perception vector was written during this run
    pub newly_perceived: Vec<ItemId>,
    /// Items whose reduced vector was written during this run
    pub newly_reduced: Vec<ItemId>,
    /// Unreadable items left out of the output
    pub failed: Vec<ItemId>,
    /// Batches processed, fit sampling included
    pub batches: usize,
}

impl PipelineOutput {
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

pub struct BatchPipeline<'a> {
    config: &'a PipelineConfig,
    decoder: &'a dyn Decoder,
    extractor: Option<&'a dyn Extractor>,
}

impl<'a> BatchPipeline<'a> {
    pub fn new(config: &'a PipelineConfig, decoder: &'a dyn Decoder) -> Self {
        Self {
            config,
            decoder,
            extractor: None,
        }
    }

    /// Extractor for uncached items; not needed when everything is cached
    pub fn with_extractor(mut self, extractor: &'a dyn Extractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn run(
        &self,
        cache: &Cache,
        mut reducer: Option<&mut dyn Reducer>,
    ) -> Result<PipelineOutput> {
        self.config.validate()?;
        let counts = cache.counts();
        let needs_reduction = cache.is_reducing() && counts.perceived + counts.uncached > 0;

        if needs_reduction {
            let reducer = reducer.as_deref().ok_or_else(|| {
                Error::config(format!(
                    "{} items need reduction but no reducer was given",
                    counts.perceived + counts.uncached
                ))
            })?;
            let expected = cache.output_width();
            if reducer.output_width() != expected {
                return Err(Error::config(format!(
                    "reducer {} outputs {} dimensions, cache expects {}",
                    reducer.name(),
                    reducer.output_width(),
                    expected
                )));
            }
        }

        match self.extractor {
            Some(extractor) if extractor.info().width != cache.vector_width() => {
                return Err(Error::config(format!(
                    "model {} outputs {} dimensions, cache expects {}",
                    extractor.info().name,
                    extractor.info().width,
                    cache.vector_width()
                )));
            }
            None if counts.uncached > 0 => {
                return Err(Error::config(format!(
                    "{} items need perception but model {} has no extractor",
                    counts.uncached,
                    cache.suffixes().perception
                )));
            }
            _ => {}
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .thread_name(|idx| format!("imclust-decode-{idx}"))
            .build()
            .map_err(|e| Error::config(format!("cannot start decode pool: {e}")))?;

        info!(
            reduced = counts.reduced,
            perceived = counts.perceived,
            uncached = counts.uncached,
            batch_size = self.config.batch_size,
            "loading setup"
        );

        let started = Instant::now();
        let mut run = Run {
            config: self.config,
            cache,
            decoder: self.decoder,
            extractor: self.extractor,
            pool,
            batcher: Batcher::new(self.config.batch_size),
            prefetched: HashMap::new(),
            failed: HashSet::new(),
            out: PipelineOutput::default(),
        };

        if needs_reduction {
            if let Some(reducer) = reducer.as_deref_mut() {
                if !reducer.is_fitted() {
                    run.fit(reducer)?;
                }
            }
        }
        let reducer: Option<&dyn Reducer> = if needs_reduction {
            reducer.as_deref()
        } else {
            None
        };

        run.load_reduced()?;
        run.load_perceived(reducer)?;
        run.load_uncached(reducer)?;

        let mut out = run.out;
        out.failed.sort_unstable();
        info!(
            vectors = out.vectors.len(),
            batches = out.batches,
            failed = out.failed.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loading done"
        );
        if !out.newly_perceived.is_empty() || !out.newly_reduced.is_empty() {
            info!(
                perceived = out.newly_perceived.len(),
                reduced = out.newly_reduced.len(),
                "newly cached"
            );
        }
        Ok(out)
    }
}

/// Mutable state of one run
struct Run<'a> {
    config: &'a PipelineConfig,
    cache: &'a Cache,
    decoder: &'a dyn Decoder,
    extractor: Option<&'a dyn Extractor>,
    pool: ThreadPool,
    batcher: Batcher,
    /// Perception vectors of uncached items computed while sampling the fit
    prefetched: HashMap<ItemId, Vec<f32>>,
    failed: HashSet<ItemId>,
    out: PipelineOutput,
}

impl Run<'_> {
    /// Train the reducer, cached perception vectors first, fresh ones only
    /// if the pool is still short.
    fn fit(&mut self, reducer: &mut dyn Reducer) -> Result<()> {
        let cache = self.cache;
        let target = self.config.reduction_samples;
        let started = Instant::now();
        let mut samples: Vec<Vec<f32>> = Vec::new();

        let cached: Vec<ItemId> = cache
            .perceived_all()
            .iter()
            .copied()
            .take(target)
            .collect();
        for batch in self.batcher.split(&cached) {
            samples.extend(self.read_percepts(batch)?);
            self.out.batches += 1;
        }

        if samples.len() < target && self.extractor.is_some() {
            let candidates = cache.uncached_all();
            let mut next = 0;
            while samples.len() < target && next < candidates.len() {
                let take = self
                    .config
                    .batch_size
                    .min(target - samples.len())
                    .min(candidates.len() - next);
                let batch = &candidates[next..next + take];
                next += take;

                let (ids, vectors) = self.perceive(batch)?;
                for (id, vector) in ids.into_iter().zip(&vectors) {
                    if cache.tier(id) == Some(CacheTier::Uncached) {
                        self.prefetched.insert(id, vector.clone());
                    }
                }
                samples.extend(vectors);
                self.out.batches += 1;
            }
        }

        if samples.is_empty() {
            return Err(Error::config(format!(
                "no vectors available to fit reducer {}",
                reducer.name()
            )));
        }
        if samples.len() < target {
            debug!(
                have = samples.len(),
                wanted = target,
                "fitting on fewer samples than requested"
            );
        }

        let loaded = started.elapsed();
        reducer.fit(&samples)?;
        info!(
            reducer = reducer.name(),
            samples = samples.len(),
            load_ms = loaded.as_millis() as u64,
            train_ms = (started.elapsed() - loaded).as_millis() as u64,
            "reducer fitted"
        );
        Ok(())
    }

    /// Tier 2: final vectors straight from disk
    fn load_reduced(&mut self) -> Result<()> {
        let cache = self.cache;
        let Some(suffix) = cache.suffixes().reduced.clone() else {
            return Ok(());
        };
        let suffixes = [suffix];
        for batch in self.batcher.split(cache.reduced()) {
            let vectors =
                cache
                    .files()
                    .read_batch(&cache.paths(batch), &suffixes, cache.output_width())?;
            self.push(batch, vectors);
        }
        Ok(())
    }

    /// Tier 1: cached perception vectors, reduced
    fn load_perceived(&mut self, reducer: Option<&dyn Reducer>) -> Result<()> {
        let cache = self.cache;
        for batch in self.batcher.split(cache.perceived()) {
            let vectors = self.read_percepts(batch)?;
            let vectors = match reducer {
                Some(reducer) => self.reduce(reducer, batch, vectors)?,
                None => vectors,
            };
            self.push(batch, vectors);
        }
        Ok(())
    }

    /// Tier 0: decode, perceive and reduce
    fn load_uncached(&mut self, reducer: Option<&dyn Reducer>) -> Result<()> {
        let cache = self.cache;
        for batch in self.batcher.split(cache.uncached()) {
            let pending: Vec<ItemId> = batch
                .iter()
                .copied()
                .filter(|id| !self.prefetched.contains_key(id) && !self.failed.contains(id))
                .collect();
            let (fresh_ids, fresh) = if pending.is_empty() {
                (Vec::new(), Vec::new())
            } else {
                self.perceive(&pending)?
            };
            let mut fresh: HashMap<ItemId, Vec<f32>> = fresh_ids.into_iter().zip(fresh).collect();

            let mut ids = Vec::with_capacity(batch.len());
            let mut vectors = Vec::with_capacity(batch.len());
            for &id in batch {
                if let Some(vector) = self.prefetched.remove(&id).or_else(|| fresh.remove(&id)) {
                    ids.push(id);
                    vectors.push(vector);
                }
            }
            if ids.is_empty() {
                continue;
            }

            let vectors = match reducer {
                Some(reducer) => self.reduce(reducer, &ids, vectors)?,
                None => vectors,
            };
            self.push(&ids, vectors);
        }
        Ok(())
    }

    fn read_percepts(&self, batch: &[ItemId]) -> Result<Vec<Vec<f32>>> {
        let cache = self.cache;
        cache.files().read_batch(
            &cache.paths(batch),
            &cache.suffixes().inputs,
            cache.vector_width(),
        )
    }

    /// Decode and extract one batch. Unreadable items are dropped with a
    /// warning; returns the surviving ids with their vectors.
    fn perceive(&mut self, batch: &[ItemId]) -> Result<(Vec<ItemId>, Vec<Vec<f32>>)> {
        let cache = self.cache;
        let extractor = self.extractor.ok_or_else(|| {
            Error::config(format!(
                "model {} has no extractor",
                cache.suffixes().perception
            ))
        })?;

        let paths = cache.paths(batch);
        let decoded = decode_batch(&self.pool, self.decoder, &paths, extractor.info().input);

        let mut ids = Vec::with_capacity(batch.len());
        let mut pictures = Vec::with_capacity(batch.len());
        for (&id, result) in batch.iter().zip(decoded) {
            match result {
                Ok(picture) => {
                    ids.push(id);
                    pictures.push(picture);
                }
                Err(e) if e.is_item_local() => {
                    warn!("{}", e);
                    // reduced items still reach the output from their cache file
                    if cache.tier(id) == Some(CacheTier::Uncached) && self.failed.insert(id) {
                        self.out.failed.push(id);
                    }
                }
                Err(e) => return Err(e),
            }
        }
        if ids.is_empty() {
            return Ok((ids, Vec::new()));
        }

        let vectors = extractor.transform(&pictures)?;
        check_batch(extractor.info().name.as_str(), &ids, &vectors, cache.vector_width())?;

        if self.config.caching {
            cache.files().write_batch(
                &cache.paths(&ids),
                &cache.suffixes().perception,
                &vectors,
                cache.vector_width(),
            )?;
            self.out.newly_perceived.extend_from_slice(&ids);
        }
        debug!(items = ids.len(), "perceived batch");
        Ok((ids, vectors))
    }

    fn reduce(
        &mut self,
        reducer: &dyn Reducer,
        batch: &[ItemId],
        vectors: Vec<Vec<f32>>,
    ) -> Result<Vec<Vec<f32>>> {
        let cache = self.cache;
        let reduced = reducer.transform(&vectors)?;
        check_batch(reducer.name(), batch, &reduced, cache.output_width())?;

        if self.config.caching {
            if let Some(suffix) = &cache.suffixes().reduced {
                cache.files().write_batch(
                    &cache.paths(batch),
                    suffix,
                    &reduced,
                    cache.output_width(),
                )?;
                self.out.newly_reduced.extend_from_slice(batch);
            }
        }
        Ok(reduced)
    }

    fn push(&mut self, batch: &[ItemId], vectors: Vec<Vec<f32>>) {
        self.out.items.extend_from_slice(batch);
        self.out.vectors.extend(vectors);
        self.out.batches += 1;
        debug!(batch = self.out.batches, items = batch.len(), "batch done");
    }
}

fn check_batch(stage: &str, batch: &[ItemId], vectors: &[Vec<f32>], width: usize) -> Result<()> {
    if vectors.len() != batch.len() {
        return Err(Error::Collaborator(format!(
            "{} returned {} vectors for {} items",
            stage,
            vectors.len(),
            batch.len()
        )));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != width) {
        return Err(Error::Collaborator(format!(
            "{} returned a {}-wide vector, expected {}",
            stage,
            bad.len(),
            width
        )));
    }
    Ok(())
}
