pub mod decoder;
pub mod model;
pub mod raw;
pub mod registry;

#[cfg(test)]
mod tests;

pub use decoder::{decode_batch, Decoder, ImageDecoder, Picture};
pub use model::{ModelInfo, Shape};
pub use raw::RawPixels;
pub use registry::ModelRegistry;

use crate::error::Result;

/// Feature extraction model: one fixed-width vector per picture.
pub trait Extractor: Send + Sync {
    /// Sizes of the model; `info().width` is the vector width
    fn info(&self) -> &ModelInfo;

    /// Transform a batch of pictures, returning vectors in batch order
    fn transform(&self, batch: &[Picture]) -> Result<Vec<Vec<f32>>>;
}

/// Built-in extractor for `model`, if the crate ships one.
pub fn builtin_extractor(model: &ModelInfo) -> Option<Box<dyn Extractor>> {
    match model.name.as_str() {
        "none" => Some(Box::new(RawPixels::with_info(model.clone()))),
        _ => None,
    }
}
