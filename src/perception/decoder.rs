// decoder.rs - image loading and resizing
use super::model::Shape;
use crate::error::{Error, Result};
use image::imageops::FilterType;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::path::Path;

/// A decoded picture resized to a model input shape, row-major HWC, in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    pub shape: Shape,
    pub pixels: Vec<f32>,
}

/// Turns an item path into a model-ready picture.
pub trait Decoder: Send + Sync {
    /// Fails with [`Error::ItemRead`] when the item is unreadable.
    fn decode(&self, path: &Path, shape: Shape) -> Result<Picture>;
}

/// Decoder backed by the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct ImageDecoder {
    filter: FilterType,
}

impl ImageDecoder {
    pub fn new() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }

    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }
}

impl Default for ImageDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ImageDecoder {
    fn decode(&self, path: &Path, shape: Shape) -> Result<Picture> {
        let image = image::open(path).map_err(|e| Error::ItemRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let resized = image.resize_exact(shape.width, shape.height, self.filter);
        let raw = match shape.channels {
            1 => resized.to_luma8().into_raw(),
            3 => resized.to_rgb8().into_raw(),
            4 => resized.to_rgba8().into_raw(),
            n => {
                return Err(Error::config(format!(
                    "cannot decode into {} channels",
                    n
                )))
            }
        };

        Ok(Picture {
            shape,
            pixels: raw.into_iter().map(|b| b as f32 / 255.0).collect(),
        })
    }
}

/// Decode one batch on `pool`, keeping results in `paths` order.
pub fn decode_batch(
    pool: &ThreadPool,
    decoder: &dyn Decoder,
    paths: &[&Path],
    shape: Shape,
) -> Vec<Result<Picture>> {
    pool.install(|| {
        paths
            .par_iter()
            .map(|path| decoder.decode(path, shape))
            .collect()
    })
}
