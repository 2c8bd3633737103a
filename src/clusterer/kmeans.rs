use crate::clusterer::{
    centroid::recompute_centroids,
    distance::euclidean,
    types::{Clustering, Fit},
};
use crate::error::{Error, Result};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Lloyd k-means with Euclidean distance and seeded random initial centers.
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    max_iters: usize,
    seed: u64,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iters: 100,
            seed: 42,
        }
    }

    pub fn max_iters(mut self, iters: usize) -> Self {
        self.max_iters = iters.max(1);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Clustering for KMeans {
    fn n_clusters(&self) -> usize {
        self.k
    }

    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Fit> {
        let n = data.len();
        let k = self.k;
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        if k == 0 || k > n {
            return Err(Error::config(format!(
                "cannot form {} clusters from {} vectors",
                k, n
            )));
        }
        let dim = data[0].len();
        if let Some(bad) = data.iter().find(|v| v.len() != dim) {
            return Err(Error::Collaborator(format!(
                "k-means got a {}-wide vector among {}-wide ones",
                bad.len(),
                dim
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        // 1. Pick random initial centers
        let mut centroids: Vec<Vec<f32>> = data.choose_multiple(&mut rng, k).cloned().collect();

        let mut assignments = vec![usize::MAX; n];
        let mut iterations = 0;

        for _ in 0..self.max_iters {
            iterations += 1;

            // 2. Assign each vector to nearest centroid
            let mut changed = false;
            for (i, vector) in data.iter().enumerate() {
                let best = nearest(vector, &centroids);
                if assignments[i] != best {
                    changed = true;
                    assignments[i] = best;
                }
            }

            if !changed {
                break; // converged
            }

            // 3. Recompute centroids
            recompute_centroids(data, &assignments, &mut centroids);
        }

        // 4. Final labels against the final centers
        let distances: Vec<Vec<f32>> = data
            .iter()
            .map(|v| centroids.iter().map(|c| euclidean(v, c)).collect())
            .collect();
        let labels: Vec<usize> = data.iter().map(|v| nearest(v, &centroids)).collect();
        debug!(k, iterations, "k-means done");

        Ok(Fit {
            labels,
            distances,
            centroids,
            iterations,
        })
    }
}

fn nearest(vector: &[f32], centroids: &[Vec<f32>]) -> usize {
    centroids
        .iter()
        .enumerate()
        .map(|(c, center)| (c, euclidean(vector, center)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(c, _)| c)
        .unwrap_or(0)
}

/// Cluster count used when none is requested: 128, or one per 16 items
/// for small collections, never below 2 nor above the item count.
pub fn default_cluster_count(items: usize) -> usize {
    let k = if items < 2048 { items / 16 } else { 128 };
    k.max(2).min(items.max(1))
}
