use super::Reducer;
use crate::error::{Error, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seeded random projection of mean-centred vectors.
///
/// Fitting learns the sample mean and draws a dense +-1/sqrt(k) matrix from
/// the seed, so two runs with the same seed and samples reduce identically.
pub struct RandomProjection {
    input_width: usize,
    output_width: usize,
    seed: u64,
    mean: Vec<f32>,
    /// Row-major, `output_width` rows of `input_width`
    matrix: Vec<f32>,
}

impl RandomProjection {
    pub fn new(input_width: usize, output_width: usize, seed: u64) -> Result<Self> {
        if output_width == 0 || input_width == 0 {
            return Err(Error::config("projection widths must be positive"));
        }
        if output_width > input_width {
            return Err(Error::config(format!(
                "cannot project {} dimensions up to {}",
                input_width, output_width
            )));
        }
        Ok(Self {
            input_width,
            output_width,
            seed,
            mean: Vec::new(),
            matrix: Vec::new(),
        })
    }

    fn check_width(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.input_width {
            return Err(Error::Collaborator(format!(
                "projection expects {} dimensions, got {}",
                self.input_width,
                vector.len()
            )));
        }
        Ok(())
    }
}

impl Reducer for RandomProjection {
    fn name(&self) -> &str {
        "rp"
    }

    fn output_width(&self) -> usize {
        self.output_width
    }

    fn is_fitted(&self) -> bool {
        !self.matrix.is_empty()
    }

    fn fit(&mut self, samples: &[Vec<f32>]) -> Result<()> {
        if samples.is_empty() {
            return Err(Error::Collaborator(
                "projection needs at least one sample".to_string(),
            ));
        }

        let mut mean = vec![0.0f32; self.input_width];
        for sample in samples {
            self.check_width(sample)?;
            for (m, x) in mean.iter_mut().zip(sample) {
                *m += x;
            }
        }
        let n = samples.len() as f32;
        mean.iter_mut().for_each(|m| *m /= n);

        let scale = 1.0 / (self.output_width as f32).sqrt();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.matrix = (0..self.output_width * self.input_width)
            .map(|_| if rng.gen::<bool>() { scale } else { -scale })
            .collect();
        self.mean = mean;
        Ok(())
    }

    fn transform(&self, vectors: &[Vec<f32>]) -> Result<Vec<Vec<f32>>> {
        if !self.is_fitted() {
            return Err(Error::Collaborator(
                "projection used before fit".to_string(),
            ));
        }

        let mut out = Vec::with_capacity(vectors.len());
        let mut centred = vec![0.0f32; self.input_width];
        for vector in vectors {
            self.check_width(vector)?;
            for ((c, x), m) in centred.iter_mut().zip(vector).zip(&self.mean) {
                *c = x - m;
            }
            out.push(
                self.matrix
                    .chunks_exact(self.input_width)
                    .map(|row| row.iter().zip(&centred).map(|(a, b)| a * b).sum::<f32>())
                    .collect(),
            );
        }
        Ok(out)
    }
}
