use crate::error::Result;

/// Output of a clustering run
#[derive(Debug, Clone)]
pub struct Fit {
    /// Cluster id of each input vector
    pub labels: Vec<usize>,
    /// Distance from each input vector to every cluster center
    pub distances: Vec<Vec<f32>>,
    pub centroids: Vec<Vec<f32>>,
    pub iterations: usize,
}

impl Fit {
    pub fn n_clusters(&self) -> usize {
        self.centroids.len()
    }

    /// Distance of each vector to its own center
    pub fn assigned_distances(&self) -> Vec<f32> {
        self.labels
            .iter()
            .zip(&self.distances)
            .map(|(&label, row)| row[label])
            .collect()
    }
}

/// Hard clustering: one label per vector plus distances to all centers.
pub trait Clustering {
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Fit>;

    fn n_clusters(&self) -> usize;
}
