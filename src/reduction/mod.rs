//! Dimensionality reduction applied to perception vectors before clustering.

mod projection;


pub use projection::RandomProjection;

use crate::error::{Error, Result};

/// A trainable reduction from perception vectors to a smaller fixed width.
pub trait Reducer: Send {
    /// Method id used in the reduced cache suffix
    fn name(&self) -> &str;

    fn output_width(&self) -> usize;

    /// Whether [`Reducer::fit`] has already run
    fn is_fitted(&self) -> bool;

    /// Train on `samples`. Called at most once per run.
    fn fit(&mut self, samples: &[Vec<f32>]) -> Result<()>;

    /// Reduce a batch, returning vectors in batch order
    fn transform(&self, vectors: &[Vec<f32>]) -> Result<Vec<Vec<f32>>>;
}

/// Method ids [`build`] knows about
pub const METHODS: &[&str] = &["rp"];

/// Construct the built-in reducer registered under `method`.
pub fn build(
    method: &str,
    input_width: usize,
    output_width: usize,
    seed: u64,
) -> Result<Box<dyn Reducer>> {
    match method {
        "rp" => Ok(Box::new(RandomProjection::new(
            input_width,
            output_width,
            seed,
        )?)),
        other => Err(Error::config(format!(
            "unknown reduction method {} (known: {})",
            other,
            METHODS.join(", ")
        ))),
    }
}
