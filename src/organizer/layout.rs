use crate::clusterer::Fit;
use crate::error::{Error, Result};
use std::str::FromStr;

/// Cluster id and distance to that cluster's center, per item
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    labels: Vec<usize>,
    distances: Vec<f32>,
    n_clusters: usize,
}

impl ClusterAssignment {
    pub fn new(labels: Vec<usize>, distances: Vec<f32>, n_clusters: usize) -> Result<Self> {
        if labels.len() != distances.len() {
            return Err(Error::Collaborator(format!(
                "{} labels but {} distances",
                labels.len(),
                distances.len()
            )));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= n_clusters) {
            return Err(Error::Collaborator(format!(
                "label {} out of range for {} clusters",
                bad, n_clusters
            )));
        }
        if distances.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return Err(Error::Collaborator(
                "distances must be finite and non-negative".to_string(),
            ));
        }
        Ok(Self {
            labels,
            distances,
            n_clusters,
        })
    }

    pub fn from_fit(fit: &Fit) -> Result<Self> {
        Self::new(fit.labels.clone(), fit.assigned_distances(), fit.n_clusters())
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn distances(&self) -> &[f32] {
        &self.distances
    }

    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// How clusters are ordered for display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClusterOrder {
    /// Natural id order
    Identity,
    /// Largest first, ties by id
    #[default]
    BySize,
    /// Short open tour through the cluster representatives
    HeuristicTour,
}

impl FromStr for ClusterOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "identity" | "id" => Ok(Self::Identity),
            "size" | "by-size" => Ok(Self::BySize),
            "tour" | "heuristic-tour" => Ok(Self::HeuristicTour),
            other => Err(Error::config(format!(
                "unknown cluster order {} (identity, size, tour)",
                other
            ))),
        }
    }
}

/// One presented image, in display order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutRow {
    /// Position of the cluster in the display order
    pub rank: usize,
    pub cluster: usize,
    /// Position inside the cluster, nearest first
    pub position: usize,
    pub item: usize,
    pub distance: f32,
    pub percentile: f32,
    /// Beyond the cluster's acceptance cutoff
    pub flagged: bool,
}

/// Clusters organized for presentation.
///
/// `members` partitions the item indices: every item appears in exactly
/// one cluster's list.
#[derive(Debug, Clone)]
pub struct ClusterLayout {
    /// Per cluster id, member items nearest-to-center first
    pub members: Vec<Vec<usize>>,
    /// Per item, distance to its center
    pub distances: Vec<f32>,
    /// Per item, 100 at the cluster center falling to 0 at the global maximum
    pub percentiles: Vec<f32>,
    /// Per cluster id, first flagged position
    pub cutoffs: Vec<Option<usize>>,
    /// Per cluster id, whether it has enough members
    pub accepted: Vec<bool>,
    /// Display position -> cluster id
    pub order: Vec<usize>,
    pub max_distance: f32,
    /// Clusters whose cutoff came from the distance threshold
    pub distance_rejected: usize,
    /// Clusters whose cutoff came from the percentile threshold
    pub percentile_rejected: usize,
}

impl ClusterLayout {
    pub fn n_clusters(&self) -> usize {
        self.members.len()
    }

    pub fn is_flagged(&self, cluster: usize, position: usize) -> bool {
        self.cutoffs[cluster].is_some_and(|cut| position >= cut)
    }

    /// Number of members flagged below acceptance
    pub fn flagged_count(&self) -> usize {
        self.members
            .iter()
            .zip(&self.cutoffs)
            .map(|(members, cut)| cut.map_or(0, |c| members.len().saturating_sub(c)))
            .sum()
    }

    /// Every item, clusters in display order, members nearest first
    pub fn rows(&self) -> impl Iterator<Item = LayoutRow> + '_ {
        self.order.iter().enumerate().flat_map(move |(rank, &cluster)| {
            self.members[cluster]
                .iter()
                .enumerate()
                .map(move |(position, &item)| LayoutRow {
                    rank,
                    cluster,
                    position,
                    item,
                    distance: self.distances[item],
                    percentile: self.percentiles[item],
                    flagged: self.is_flagged(cluster, position),
                })
        })
    }
}
