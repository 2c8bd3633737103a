//! Post-clustering organization: per-cluster ordering, percentile
//! distances, acceptance thresholds and the cluster display order.

mod layout;
pub mod tour;


pub use layout::{ClusterAssignment, ClusterLayout, ClusterOrder, LayoutRow};

use crate::error::{Error, Result};
use tour::DistanceMatrix;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct OrganizerOptions {
    /// Members farther than this from their center are flagged
    pub distance_threshold: Option<f32>,
    /// Members under this percentile are flagged
    pub percentile_threshold: Option<f32>,
    /// Clusters with fewer members are not accepted
    pub min_members: usize,
    pub order: ClusterOrder,
    /// Seed of the heuristic tour
    pub seed: u64,
}

impl Default for OrganizerOptions {
    fn default() -> Self {
        Self {
            distance_threshold: None,
            percentile_threshold: None,
            min_members: 0,
            order: ClusterOrder::default(),
            seed: 42,
        }
    }
}

/// Organize `assignment` into a [`ClusterLayout`].
///
/// `vectors` must be index-aligned with the assignment; they are only read
/// for [`ClusterOrder::HeuristicTour`].
pub fn organize(
    assignment: &ClusterAssignment,
    vectors: &[Vec<f32>],
    options: &OrganizerOptions,
) -> Result<ClusterLayout> {
    let n_clusters = assignment.n_clusters();
    let distances = assignment.distances();

    // partition, then nearest first with ties by index
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); n_clusters];
    for (item, &label) in assignment.labels().iter().enumerate() {
        members[label].push(item);
    }
    for list in members.iter_mut() {
        list.sort_by(|&a, &b| distances[a].total_cmp(&distances[b]).then(a.cmp(&b)));
    }

    let max_distance = distances.iter().copied().fold(0.0f32, f32::max);
    let mut percentiles = vec![100.0f32; assignment.len()];
    for list in members.iter().filter(|l| !l.is_empty()) {
        let d0 = distances[list[0]];
        let span = max_distance - d0;
        for &item in list {
            percentiles[item] = if span > 0.0 {
                (max_distance - distances[item]) / span * 100.0
            } else {
                100.0
            };
        }
    }

    let mut cutoffs = vec![None; n_clusters];
    let mut distance_rejected = 0;
    let mut percentile_rejected = 0;
    for (cluster, list) in members.iter().enumerate() {
        for (position, &item) in list.iter().enumerate() {
            let too_far = options
                .distance_threshold
                .is_some_and(|t| distances[item] > t);
            let too_low = options
                .percentile_threshold
                .is_some_and(|t| percentiles[item] < t);
            if too_far || too_low {
                cutoffs[cluster] = Some(position);
                if too_far {
                    distance_rejected += 1;
                } else {
                    percentile_rejected += 1;
                }
                break;
            }
        }
    }
    if let Some(t) = options.distance_threshold {
        info!(clusters = distance_rejected, threshold = t, "distance threshold");
    }
    if let Some(t) = options.percentile_threshold {
        info!(clusters = percentile_rejected, threshold = t, "percentile threshold");
    }

    let accepted: Vec<bool> = members
        .iter()
        .map(|list| list.len() >= options.min_members)
        .collect();

    let order = match options.order {
        ClusterOrder::Identity => (0..n_clusters).collect(),
        ClusterOrder::BySize => by_size(&members),
        ClusterOrder::HeuristicTour => {
            if vectors.len() != assignment.len() {
                return Err(Error::Collaborator(format!(
                    "{} vectors for {} assigned items",
                    vectors.len(),
                    assignment.len()
                )));
            }
            heuristic_tour(&members, vectors, options.seed)
        }
    };

    Ok(ClusterLayout {
        members,
        distances: distances.to_vec(),
        percentiles,
        cutoffs,
        accepted,
        order,
        max_distance,
        distance_rejected,
        percentile_rejected,
    })
}

fn by_size(members: &[Vec<usize>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..members.len()).collect();
    order.sort_by(|&a, &b| members[b].len().cmp(&members[a].len()).then(a.cmp(&b)));
    order
}

/// Tour through the nearest member of every non-empty cluster; empty
/// clusters follow in id order.
fn heuristic_tour(members: &[Vec<usize>], vectors: &[Vec<f32>], seed: u64) -> Vec<usize> {
    let (toured, empty): (Vec<usize>, Vec<usize>) =
        (0..members.len()).partition(|&c| !members[c].is_empty());

    let representatives: Vec<&[f32]> = toured
        .iter()
        .map(|&c| vectors[members[c][0]].as_slice())
        .collect();
    let dist = DistanceMatrix::new(&representatives);
    let path = tour::anneal(&dist, seed);
    debug!(
        clusters = toured.len(),
        greedy = dist.path_length(&tour::nearest_neighbor(&dist)),
        annealed = dist.path_length(&path),
        "cluster tour"
    );

    path.into_iter()
        .map(|i| toured[i])
        .chain(empty)
        .collect()
}
