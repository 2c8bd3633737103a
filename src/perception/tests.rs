use super::*;
use crate::error::Error;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_png(dir: &TempDir, name: &str, width: u32, height: u32, value: u8) -> PathBuf {
    let path = dir.path().join(name);
    image::RgbImage::from_pixel(width, height, image::Rgb([value, value, value]))
        .save(&path)
        .unwrap();
    path
}

fn pool(threads: usize) -> rayon::ThreadPool {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .unwrap()
}

#[test]
fn test_model_info_default() {
    let model = ModelInfo::default();
    assert_eq!(model.name, "none");
    assert_eq!(model.input, Shape::new(128, 128, 3));
    assert_eq!(model.width, 49152);
}

#[test]
fn test_registry_sizes() {
    let registry = ModelRegistry::new();
    assert_eq!(registry.model_count(), 9);

    let resnet = registry.get("resnet50").unwrap();
    assert_eq!(resnet.input, Shape::new(224, 224, 3));
    assert_eq!(resnet.output, Shape::new(7, 7, 2048));
    assert_eq!(resnet.width, 100352);

    assert_eq!(registry.get("vgg16").unwrap().width, 25088);
    assert_eq!(registry.get("inceptionv3").unwrap().width, 51200);
    assert_eq!(registry.get("densenet169").unwrap().width, 81536);
}

#[test]
fn test_registry_unknown_model() {
    let registry = ModelRegistry::new();
    let err = registry.get("alexnet").unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert!(err.to_string().contains("alexnet"));
}

#[test]
fn test_registry_custom_model() {
    let mut registry = ModelRegistry::empty();
    registry.register(ModelInfo::new(
        "tiny",
        Shape::new(8, 8, 1),
        Shape::new(2, 2, 2),
    ));

    assert_eq!(registry.model_count(), 1);
    assert_eq!(registry.get("tiny").unwrap().width, 8);
    assert!(registry.names().contains(&"tiny"));
}

#[test]
fn test_decode_resizes_and_scales() {
    let dir = TempDir::new().unwrap();
    let path = write_png(&dir, "grey.png", 20, 10, 255);

    let picture = ImageDecoder::new()
        .decode(&path, Shape::new(4, 6, 3))
        .unwrap();
    assert_eq!(picture.shape, Shape::new(4, 6, 3));
    assert_eq!(picture.pixels.len(), 72);
    assert!(picture.pixels.iter().all(|&p| (p - 1.0).abs() < 1e-6));
}

#[test]
fn test_decode_single_channel() {
    let dir = TempDir::new().unwrap();
    let path = write_png(&dir, "grey.png", 5, 5, 0);

    let picture = ImageDecoder::new()
        .decode(&path, Shape::new(2, 2, 1))
        .unwrap();
    assert_eq!(picture.pixels, vec![0.0; 4]);
}

#[test]
fn test_decode_corrupt_is_item_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.png");
    std::fs::write(&path, b"not a png").unwrap();

    let err = ImageDecoder::new()
        .decode(&path, Shape::new(2, 2, 3))
        .unwrap_err();
    assert!(err.is_item_local());
}

#[test]
fn test_decode_batch_keeps_order() {
    let dir = TempDir::new().unwrap();
    let paths: Vec<PathBuf> = (0..6u8)
        .map(|i| write_png(&dir, &format!("{i}.png"), 3, 3, i * 40))
        .collect();
    let broken = dir.path().join("broken.png");
    std::fs::write(&broken, b"").unwrap();

    let mut refs: Vec<&Path> = paths.iter().map(|p| p.as_path()).collect();
    refs.insert(2, broken.as_path());

    let results = decode_batch(&pool(3), &ImageDecoder::new(), &refs, Shape::new(1, 1, 1));
    assert_eq!(results.len(), 7);
    assert!(results[2].is_err());

    let values: Vec<f32> = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|p| p.pixels[0])
        .collect();
    assert_eq!(values.len(), 6);
    for (i, value) in values.iter().enumerate() {
        let expected = (i as f32 * 40.0) / 255.0;
        assert!((value - expected).abs() < 0.01, "item {i}: {value}");
    }
}

#[test]
fn test_raw_pixels_flattens() {
    let info = ModelInfo::new("none", Shape::new(1, 2, 1), Shape::new(1, 2, 1));
    let extractor = RawPixels::with_info(info);
    let batch = vec![
        Picture {
            shape: Shape::new(1, 2, 1),
            pixels: vec![0.25, 0.5],
        },
        Picture {
            shape: Shape::new(1, 2, 1),
            pixels: vec![1.0, 0.0],
        },
    ];

    let vectors = extractor.transform(&batch).unwrap();
    assert_eq!(vectors, vec![vec![0.25, 0.5], vec![1.0, 0.0]]);
}

#[test]
fn test_raw_pixels_rejects_wrong_size() {
    let extractor = RawPixels::new();
    let batch = vec![Picture {
        shape: Shape::new(1, 1, 3),
        pixels: vec![0.0; 3],
    }];
    assert!(matches!(
        extractor.transform(&batch),
        Err(Error::Collaborator(_))
    ));
}

#[test]
fn test_builtin_extractor_only_for_raw_pixels() {
    let registry = ModelRegistry::new();
    assert!(builtin_extractor(registry.get("none").unwrap()).is_some());
    assert!(builtin_extractor(registry.get("resnet50").unwrap()).is_none());
}
