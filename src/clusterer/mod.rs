mod centroid;
mod distance;
mod kmeans;
pub mod metrics;
mod types;

#[cfg(test)]
mod tests;

pub use distance::{euclidean, squared_euclidean};
pub use kmeans::{default_cluster_count, KMeans};
pub use metrics::Scores;
pub use types::{Clustering, Fit};
