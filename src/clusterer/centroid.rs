/// Move every center to the mean of its members in one pass over `data`.
///
/// Centers without members keep their previous position.
pub fn recompute_centroids(data: &[Vec<f32>], labels: &[usize], centroids: &mut [Vec<f32>]) {
    let dim = centroids.first().map_or(0, |c| c.len());
    let mut sums = vec![vec![0.0f32; dim]; centroids.len()];
    let mut counts = vec![0usize; centroids.len()];

    for (vector, &label) in data.iter().zip(labels) {
        counts[label] += 1;
        for (s, x) in sums[label].iter_mut().zip(vector) {
            *s += x;
        }
    }

    for ((centroid, sum), &count) in centroids.iter_mut().zip(sums).zip(&counts) {
        if count > 0 {
            let n = count as f32;
            *centroid = sum.into_iter().map(|s| s / n).collect();
        }
    }
}
