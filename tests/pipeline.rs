//! End-to-end runs over real image files: index, load, cluster, organize.

use image::{Rgb, RgbImage};
use imclust::perception::builtin_extractor;
use imclust::{
    organize, reduction, vecfile, BatchPipeline, CacheIndex, CacheTier, ClusterAssignment,
    ClusterOrder, Clustering, ImageDecoder, KMeans, ModelRegistry, NamingScheme,
    OrganizerOptions, PipelineConfig, Reducer, ReductionSpec, TierCounts,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const REDUCED: usize = 8;

fn write_image(path: &Path, color: [u8; 3]) {
    RgbImage::from_pixel(16, 16, Rgb(color)).save(path).unwrap();
}

/// Five reddish images followed by five bluish ones
fn two_color_images(dir: &TempDir) -> Vec<PathBuf> {
    (0..10)
        .map(|i| {
            let path = dir.path().join(format!("img{i}.png"));
            let shade = 180 + (i % 5) as u8 * 10;
            let color = if i < 5 { [shade, 20, 20] } else { [20, 20, shade] };
            write_image(&path, color);
            path
        })
        .collect()
}

fn scheme() -> NamingScheme {
    NamingScheme::model("none").with_reduction(ReductionSpec::new("rp", REDUCED))
}

fn config() -> PipelineConfig {
    PipelineConfig::new().batch_size(4).threads(2).caching(true).seed(7)
}

/// Index `items` and run the pipeline with the built-in collaborators
fn load(
    registry: &ModelRegistry,
    config: &PipelineConfig,
    items: Vec<PathBuf>,
) -> (imclust::Cache, imclust::PipelineOutput) {
    let scheme = scheme();
    let cache = CacheIndex::new(registry).build(items, &scheme).unwrap();
    let model = registry.get("none").unwrap();
    let extractor = builtin_extractor(model).unwrap();
    let mut reducer = reduction::build("rp", cache.vector_width(), REDUCED, config.seed).unwrap();
    let decoder = ImageDecoder::default();

    let output = BatchPipeline::new(config, &decoder)
        .with_extractor(&*extractor)
        .run(&cache, Some(reducer.as_mut() as &mut dyn Reducer))
        .unwrap();
    (cache, output)
}

#[test]
fn test_cold_then_warm_run_on_images() {
    let dir = TempDir::new().unwrap();
    let registry = ModelRegistry::new();
    let config = config();
    let items = two_color_images(&dir);

    let (cache, first) = load(&registry, &config, items.clone());
    assert_eq!(
        cache.counts(),
        TierCounts {
            uncached: 10,
            perceived: 0,
            reduced: 0
        }
    );
    assert_eq!(first.len(), 10);
    assert!(first.vectors.iter().all(|v| v.len() == REDUCED));
    assert_eq!(first.newly_perceived.len(), 10);
    assert_eq!(first.newly_reduced.len(), 10);
    assert!(dir.path().join("img0.none").exists());
    assert!(dir.path().join("img0.none-rp8").exists());

    let (cache, second) = load(&registry, &config, items);
    assert_eq!(
        cache.counts(),
        TierCounts {
            uncached: 0,
            perceived: 0,
            reduced: 10
        }
    );
    assert!(second.newly_perceived.is_empty());
    assert!(second.newly_reduced.is_empty());
    assert_eq!(first.items, second.items);
    assert_eq!(first.vectors, second.vectors);
}

#[test]
fn test_precomputed_suffixes_exclude_incomplete_items() {
    let dir = TempDir::new().unwrap();
    let items: Vec<PathBuf> = (0..4)
        .map(|i| dir.path().join(format!("item{i}.jpg")))
        .collect();
    for (i, item) in items.iter().enumerate() {
        let base = i as f32;
        vecfile::write(&item.with_extension("a"), &[base, base + 0.5, base + 0.25]).unwrap();
        if i != 2 {
            vecfile::write(&item.with_extension("b"), &[-base, 1.0]).unwrap();
        }
    }

    let registry = ModelRegistry::new();
    let cache = CacheIndex::new(&registry)
        .build(items, &NamingScheme::precomputed("a,b").unwrap())
        .unwrap();

    assert_eq!(cache.vector_width(), 5);
    assert_eq!(cache.suffixes().perception, "ab");
    let excluded = cache.ids().nth(2).unwrap();
    assert_eq!(cache.tier(excluded), None);
    assert_eq!(cache.counts().perceived, 3);

    let config = PipelineConfig::new().batch_size(2).threads(1);
    let decoder = ImageDecoder::default();
    let output = BatchPipeline::new(&config, &decoder)
        .run(&cache, None)
        .unwrap();

    let indices: Vec<usize> = output.items.iter().map(|id| id.index()).collect();
    assert_eq!(indices, vec![0, 1, 3]);
    assert_eq!(output.vectors[1], vec![1.0, 1.5, 1.25, -1.0, 1.0]);
    assert_eq!(output.vectors[2], vec![3.0, 3.5, 3.25, -3.0, 1.0]);
}

#[test]
fn test_cluster_and_organize_images() {
    let dir = TempDir::new().unwrap();
    let registry = ModelRegistry::new();
    let config = config();
    let items = two_color_images(&dir);

    let (cache, output) = load(&registry, &config, items);
    let fit = KMeans::new(2).seed(3).fit_predict(&output.vectors).unwrap();
    let assignment = ClusterAssignment::from_fit(&fit).unwrap();
    let layout = organize(
        &assignment,
        &output.vectors,
        &OrganizerOptions {
            order: ClusterOrder::HeuristicTour,
            ..Default::default()
        },
    )
    .unwrap();

    // each color group lands in a cluster of its own
    let label_of = |name: &str| {
        let row = output
            .items
            .iter()
            .position(|&id| cache.path(id).ends_with(name))
            .unwrap();
        fit.labels[row]
    };
    let red = label_of("img0.png");
    let blue = label_of("img5.png");
    assert_ne!(red, blue);
    for i in 0..10 {
        let expected = if i < 5 { red } else { blue };
        assert_eq!(label_of(&format!("img{i}.png")), expected);
    }

    let rows: Vec<_> = layout.rows().collect();
    assert_eq!(rows.len(), 10);
    let mut order = layout.order.clone();
    order.sort_unstable();
    assert_eq!(order, vec![0, 1]);
    for cluster in 0..2 {
        let head = layout.members[cluster][0];
        assert_eq!(layout.percentiles[head], 100.0);
    }
}

#[test]
fn test_unreadable_image_is_skipped() {
    let dir = TempDir::new().unwrap();
    let registry = ModelRegistry::new();
    let config = config();
    let mut items = two_color_images(&dir);
    let broken = dir.path().join("broken.png");
    std::fs::write(&broken, b"not a png").unwrap();
    items.push(broken);

    let (cache, output) = load(&registry, &config, items);
    assert_eq!(output.len(), 10);
    assert_eq!(output.failed.len(), 1);
    assert_eq!(cache.tier(output.failed[0]), Some(CacheTier::Uncached));
    assert!(!dir.path().join("broken.none").exists());
}
