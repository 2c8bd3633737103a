use anyhow::{Context, Result};
use clap::Parser;
use imclust::perception::builtin_extractor;
use imclust::{
    organize, reduction, BatchPipeline, CacheIndex, ClusterAssignment, ClusterLayout,
    ClusterOrder, Clustering, Error, ImageDecoder, KMeans, ModelRegistry, NamingScheme,
    OrganizerOptions, PipelineConfig, Reducer, ReductionSpec, Scores, default_cluster_count,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Cluster the images found under the given directories and write the
/// organized clusters as CSV.
#[derive(Parser, Debug)]
#[command(name = "imclust", version, about, long_about = None)]
struct Cli {
    /// Directories (or single images) to cluster
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Output file; a .csv extension is enforced
    #[arg(short, long, default_value = "clust.csv")]
    output: PathBuf,

    /// Requested number of clusters
    #[arg(short, long)]
    clusters: Option<usize>,

    /// Limit the number of images to cluster
    #[arg(short, long)]
    maximum: Option<usize>,

    /// Batch size
    #[arg(short, long)]
    batch: Option<usize>,

    /// Decode workers
    #[arg(long)]
    threads: Option<usize>,

    /// Perception model id
    #[arg(long, default_value = "none")]
    model: String,

    /// Comma separated precomputed vector suffixes, instead of a model
    #[arg(long, conflicts_with = "model")]
    suffixes: Option<String>,

    /// Reduction method
    #[arg(long, default_value = "rp")]
    reduce: String,

    /// Reduced vector size; no reduction when absent
    #[arg(long)]
    reduce_size: Option<usize>,

    /// Vectors used to fit the reduction
    #[arg(long)]
    reduce_samples: Option<usize>,

    /// Write newly computed vectors to the cache
    #[arg(long)]
    cache: bool,

    /// Keep cache files in this directory instead of next to the images
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Absolute distance threshold for an image to be accepted
    #[arg(long)]
    dist_threshold: Option<f32>,

    /// Percentile threshold for an image to be accepted
    #[arg(long)]
    perc_threshold: Option<f32>,

    /// Members needed for a cluster to be accepted
    #[arg(long, default_value_t = 0)]
    min_members: usize,

    /// Cluster order: identity, size or tour
    #[arg(long, default_value = "size")]
    order: String,

    #[arg(long)]
    seed: Option<u64>,

    /// Skip the clustering quality scores
    #[arg(long)]
    no_metric: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON pipeline settings; flags override it
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::new(),
        };
        if let Some(size) = self.batch {
            config = config.batch_size(size);
        }
        if let Some(threads) = self.threads {
            config = config.threads(threads);
        }
        if let Some(samples) = self.reduce_samples {
            config = config.reduction_samples(samples);
        }
        if let Some(seed) = self.seed {
            config = config.seed(seed);
        }
        if let Some(dir) = &self.cache_dir {
            config = config.cache_dir(dir);
        }
        if self.cache {
            config = config.caching(true);
        }
        config.validate()?;
        Ok(config)
    }

    fn naming_scheme(&self) -> Result<NamingScheme> {
        let scheme = match &self.suffixes {
            Some(list) => NamingScheme::precomputed(list)?,
            None => NamingScheme::model(&self.model),
        };
        Ok(match self.reduce_size {
            Some(size) => scheme.with_reduction(ReductionSpec::new(&self.reduce, size)),
            None => scheme,
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let start_time = Instant::now();
    let config = cli.pipeline_config().context("invalid settings")?;
    let order: ClusterOrder = cli.order.parse()?;

    // Step 1: scan paths
    let items = scan_images(&cli.paths, cli.maximum, config.seed);
    info!(files = items.len(), "scanned paths");
    if items.is_empty() {
        return Err(Error::EmptyInput).context("cannot proceed without images");
    }

    // Step 2: classify items into cache tiers
    let registry = ModelRegistry::new();
    let scheme = cli.naming_scheme()?;
    let cache = CacheIndex::new(&registry)
        .cache_dir(config.cache_dir.clone())
        .build(items, &scheme)
        .context("cannot index the vector cache")?;

    // Step 3: fill in missing vectors
    let mut reducer = match (scheme.reduction(), cache.reduced_width()) {
        (Some(spec), Some(width)) => Some(reduction::build(
            &spec.method,
            cache.vector_width(),
            width,
            config.seed,
        )?),
        _ => None,
    };
    let extractor = match &scheme {
        NamingScheme::Model { model, .. } => builtin_extractor(registry.get(model)?),
        NamingScheme::Precomputed { .. } => None,
    };
    let decoder = ImageDecoder::default();
    let mut pipeline = BatchPipeline::new(&config, &decoder);
    if let Some(extractor) = extractor.as_deref() {
        pipeline = pipeline.with_extractor(extractor);
    }
    let output = pipeline
        .run(&cache, reducer.as_deref_mut().map(|r| r as &mut dyn Reducer))
        .context("cannot load feature vectors")?;
    if output.is_empty() {
        return Err(Error::EmptyInput).context("no image produced a feature vector");
    }

    // Step 4: cluster
    let requested = cli
        .clusters
        .unwrap_or_else(|| default_cluster_count(output.len()));
    let k = requested.clamp(1, output.len());
    if k != requested {
        info!(requested, clusters = k, "cluster count limited to the image count");
    }
    let cluster_start = Instant::now();
    let fit = KMeans::new(k)
        .seed(config.seed)
        .fit_predict(&output.vectors)
        .context("clustering failed")?;
    info!(
        clusters = k,
        iterations = fit.iterations,
        elapsed_ms = cluster_start.elapsed().as_millis() as u64,
        "clustering done"
    );
    if !cli.no_metric {
        log_scores(&output.vectors, &fit.labels);
    }

    // Step 5: organize and write
    let assignment = ClusterAssignment::from_fit(&fit)?;
    let layout = organize(
        &assignment,
        &output.vectors,
        &OrganizerOptions {
            distance_threshold: cli.dist_threshold,
            percentile_threshold: cli.perc_threshold,
            min_members: cli.min_members,
            order,
            seed: config.seed,
        },
    )?;

    let paths: Vec<&Path> = output.items.iter().map(|&id| cache.path(id)).collect();
    let target = cli.output.with_extension("csv");
    write_csv(&target, &layout, &paths)
        .with_context(|| format!("cannot write {}", target.display()))?;

    info!(
        output = %target.display(),
        images = paths.len(),
        flagged = layout.flagged_count(),
        rejected_clusters = layout.accepted.iter().filter(|&&a| !a).count(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "done"
    );
    Ok(())
}

/// Higher is better for chs and msc, lower for dbs
fn log_scores(vectors: &[Vec<f32>], labels: &[usize]) {
    let started = Instant::now();
    match Scores::compute(vectors, labels) {
        Ok(scores) => info!(
            chs = %format!("{:.2}", scores.calinski_harabasz),
            msc = %format!("{:.3}", scores.silhouette),
            dbs = %format!("{:.3}", scores.davies_bouldin),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "cluster quality"
        ),
        Err(e) => warn!("no quality scores: {}", e),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Images under `roots`, shuffled with `seed` and limited to `maximum`.
fn scan_images(roots: &[PathBuf], maximum: Option<usize>, seed: u64) -> Vec<PathBuf> {
    let mut images: Vec<PathBuf> = roots
        .iter()
        .flat_map(|root| WalkDir::new(root).follow_links(true))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_image(path))
        .collect();

    images.sort();
    images.dedup();
    images.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
    if let Some(max) = maximum {
        images.truncate(max);
    }
    images
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// One line per image, clusters in display order numbered from 1
fn write_csv(target: &Path, layout: &ClusterLayout, paths: &[&Path]) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(target)?);
    writeln!(out, "#path cluster dist pdist bad")?;
    for row in layout.rows() {
        writeln!(
            out,
            "{} {} {:.1} {:.1} {}",
            paths[row.item].display(),
            row.rank + 1,
            row.distance,
            row.percentile,
            u8::from(row.flagged)
        )?;
    }
    out.flush()
}
