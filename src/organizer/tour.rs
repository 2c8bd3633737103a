// tour.rs - approximate shortest open path through a set of points
use crate::clusterer::euclidean;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Symmetric pairwise Euclidean distances
pub struct DistanceMatrix {
    n: usize,
    cells: Vec<f64>,
}

impl DistanceMatrix {
    pub fn new(points: &[&[f32]]) -> Self {
        let n = points.len();
        let mut cells = vec![0.0; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = euclidean(points[i], points[j]) as f64;
                cells[i * n + j] = d;
                cells[j * n + i] = d;
            }
        }
        Self { n, cells }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.cells[i * self.n + j]
    }

    /// Length of the open path visiting `order`
    pub fn path_length(&self, order: &[usize]) -> f64 {
        order.windows(2).map(|w| self.get(w[0], w[1])).sum()
    }
}

/// Greedy path: start at point 0, always hop to the closest unvisited point.
pub fn nearest_neighbor(dist: &DistanceMatrix) -> Vec<usize> {
    let n = dist.len();
    if n == 0 {
        return Vec::new();
    }
    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut current = 0;
    visited[0] = true;
    order.push(0);

    for _ in 1..n {
        let next = (0..n)
            .filter(|&j| !visited[j])
            .min_by(|&a, &b| dist.get(current, a).total_cmp(&dist.get(current, b)))
            .unwrap_or(current);
        visited[next] = true;
        order.push(next);
        current = next;
    }
    order
}

/// Simulated annealing over segment reversals, starting from the greedy path.
///
/// Returns the shortest path seen; deterministic for a given `seed`.
pub fn anneal(dist: &DistanceMatrix, seed: u64) -> Vec<usize> {
    let n = dist.len();
    let mut order = nearest_neighbor(dist);
    if n <= 3 {
        return order;
    }

    let mut length = dist.path_length(&order);
    let start_temp = length / (n - 1) as f64;
    if start_temp <= 0.0 {
        return order;
    }

    let steps = (200 * n * n).clamp(10_000, 2_000_000);
    let end_temp = start_temp * 1e-4;
    let cooling = (end_temp / start_temp).powf(1.0 / steps as f64);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut best = order.clone();
    let mut best_length = length;
    let mut temp = start_temp;

    for _ in 0..steps {
        let i = rng.gen_range(0..n - 1);
        let j = rng.gen_range(i + 1..n);
        let delta = reversal_delta(dist, &order, i, j);

        if delta < 0.0 || rng.gen::<f64>() < (-delta / temp).exp() {
            order[i..=j].reverse();
            length += delta;
            if length < best_length - 1e-12 {
                best_length = length;
                best.copy_from_slice(&order);
            }
        }
        temp *= cooling;
    }
    best
}

/// Change in open-path length when `order[i..=j]` is reversed.
fn reversal_delta(dist: &DistanceMatrix, order: &[usize], i: usize, j: usize) -> f64 {
    let n = order.len();
    let mut delta = 0.0;
    if i > 0 {
        delta += dist.get(order[i - 1], order[j]) - dist.get(order[i - 1], order[i]);
    }
    if j + 1 < n {
        delta += dist.get(order[i], order[j + 1]) - dist.get(order[j], order[j + 1]);
    }
    delta
}
