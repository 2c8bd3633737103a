//! Internal quality scores of a hard clustering.
//!
//! All three work on the raw vectors and labels, Euclidean distance only.
//! Empty label ids are ignored, so labels need not be dense.

use super::distance::euclidean;
use crate::error::{Error, Result};
use rayon::prelude::*;

/// Calinski-Harabasz, silhouette and Davies-Bouldin of one clustering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scores {
    /// Between over within dispersion; higher is better
    pub calinski_harabasz: f64,
    /// Mean silhouette in [-1, 1]; higher is better
    pub silhouette: f64,
    /// Mean worst-case cluster similarity; lower is better
    pub davies_bouldin: f64,
}

impl Scores {
    pub fn compute(data: &[Vec<f32>], labels: &[usize]) -> Result<Self> {
        let groups = Groups::new(data, labels)?;
        Ok(Self {
            calinski_harabasz: groups.calinski_harabasz(data, labels),
            silhouette: groups.silhouette(data, labels),
            davies_bouldin: groups.davies_bouldin(data, labels),
        })
    }
}

pub fn calinski_harabasz(data: &[Vec<f32>], labels: &[usize]) -> Result<f64> {
    Ok(Groups::new(data, labels)?.calinski_harabasz(data, labels))
}

pub fn silhouette(data: &[Vec<f32>], labels: &[usize]) -> Result<f64> {
    Ok(Groups::new(data, labels)?.silhouette(data, labels))
}

pub fn davies_bouldin(data: &[Vec<f32>], labels: &[usize]) -> Result<f64> {
    Ok(Groups::new(data, labels)?.davies_bouldin(data, labels))
}

/// Member counts and means per label id
struct Groups {
    counts: Vec<usize>,
    means: Vec<Vec<f32>>,
    overall: Vec<f32>,
    non_empty: usize,
}

impl Groups {
    fn new(data: &[Vec<f32>], labels: &[usize]) -> Result<Self> {
        if data.len() != labels.len() {
            return Err(Error::Collaborator(format!(
                "{} labels for {} vectors",
                labels.len(),
                data.len()
            )));
        }
        let dim = data.first().map_or(0, |v| v.len());
        if data.iter().any(|v| v.len() != dim) {
            return Err(Error::Collaborator(
                "vectors differ in dimension".to_string(),
            ));
        }

        let slots = labels.iter().max().map_or(0, |&l| l + 1);
        let mut counts = vec![0usize; slots];
        let mut sums = vec![vec![0.0f64; dim]; slots];
        let mut total = vec![0.0f64; dim];
        for (vector, &label) in data.iter().zip(labels) {
            counts[label] += 1;
            for ((s, t), &x) in sums[label].iter_mut().zip(total.iter_mut()).zip(vector) {
                *s += f64::from(x);
                *t += f64::from(x);
            }
        }

        let non_empty = counts.iter().filter(|&&c| c > 0).count();
        if non_empty < 2 || non_empty >= data.len() {
            return Err(Error::config(format!(
                "quality scores need 2 to {} clusters, got {}",
                data.len().saturating_sub(1),
                non_empty
            )));
        }

        let means = sums
            .into_iter()
            .zip(&counts)
            .map(|(sum, &count)| {
                let n = count.max(1) as f64;
                sum.into_iter().map(|s| (s / n) as f32).collect()
            })
            .collect();
        let n = data.len() as f64;
        let overall = total.into_iter().map(|t| (t / n) as f32).collect();

        Ok(Self {
            counts,
            means,
            overall,
            non_empty,
        })
    }

    fn calinski_harabasz(&self, data: &[Vec<f32>], labels: &[usize]) -> f64 {
        let between: f64 = self
            .means
            .iter()
            .zip(&self.counts)
            .filter(|(_, &count)| count > 0)
            .map(|(mean, &count)| count as f64 * squared(mean, &self.overall))
            .sum();
        let within: f64 = data
            .iter()
            .zip(labels)
            .map(|(vector, &label)| squared(vector, &self.means[label]))
            .sum();

        if within == 0.0 {
            return 1.0;
        }
        let n = data.len() as f64;
        let k = self.non_empty as f64;
        between * (n - k) / (within * (k - 1.0))
    }

    /// Singleton members score 0.
    fn silhouette(&self, data: &[Vec<f32>], labels: &[usize]) -> f64 {
        let sum: f64 = (0..data.len())
            .into_par_iter()
            .map(|i| {
                let own = labels[i];
                if self.counts[own] < 2 {
                    return 0.0;
                }
                let mut totals = vec![0.0f64; self.counts.len()];
                for (j, other) in data.iter().enumerate() {
                    if j != i {
                        totals[labels[j]] += f64::from(euclidean(&data[i], other));
                    }
                }

                let a = totals[own] / (self.counts[own] - 1) as f64;
                let b = totals
                    .iter()
                    .zip(&self.counts)
                    .enumerate()
                    .filter(|&(label, (_, &count))| label != own && count > 0)
                    .map(|(_, (total, &count))| total / count as f64)
                    .fold(f64::INFINITY, f64::min);
                let max = a.max(b);
                if max > 0.0 {
                    (b - a) / max
                } else {
                    0.0
                }
            })
            .sum();
        sum / data.len() as f64
    }

    fn davies_bouldin(&self, data: &[Vec<f32>], labels: &[usize]) -> f64 {
        let mut scatter = vec![0.0f64; self.counts.len()];
        for (vector, &label) in data.iter().zip(labels) {
            scatter[label] += f64::from(euclidean(vector, &self.means[label]));
        }
        for (s, &count) in scatter.iter_mut().zip(&self.counts) {
            if count > 0 {
                *s /= count as f64;
            }
        }

        let live: Vec<usize> = (0..self.counts.len())
            .filter(|&c| self.counts[c] > 0)
            .collect();
        let worst: f64 = live
            .iter()
            .map(|&i| {
                live.iter()
                    .filter(|&&j| j != i)
                    .map(|&j| {
                        let d = f64::from(euclidean(&self.means[i], &self.means[j]));
                        // coincident centers contribute nothing
                        if d > 0.0 {
                            (scatter[i] + scatter[j]) / d
                        } else {
                            0.0
                        }
                    })
                    .fold(0.0, f64::max)
            })
            .sum();
        worst / live.len() as f64
    }
}

fn squared(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum()
}
