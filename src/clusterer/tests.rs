use super::*;
use crate::error::Error;

fn blobs() -> Vec<Vec<f32>> {
    vec![
        vec![1.0, 0.0],
        vec![0.9, 0.1],
        vec![1.1, -0.1],
        vec![10.0, 10.0],
        vec![10.1, 9.9],
        vec![9.9, 10.2],
    ]
}

#[test]
fn test_simple_kmeans() {
    let fit = KMeans::new(2).fit_predict(&blobs()).unwrap();

    assert_eq!(fit.n_clusters(), 2);
    assert_eq!(fit.labels[0], fit.labels[1]);
    assert_eq!(fit.labels[0], fit.labels[2]);
    assert_eq!(fit.labels[3], fit.labels[4]);
    assert_ne!(fit.labels[0], fit.labels[3]);
}

#[test]
fn test_distance_matrix_matches_labels() {
    let data = blobs();
    let fit = KMeans::new(2).seed(3).fit_predict(&data).unwrap();

    assert_eq!(fit.distances.len(), data.len());
    for (row, &label) in fit.distances.iter().zip(&fit.labels) {
        assert_eq!(row.len(), 2);
        let min = row.iter().cloned().fold(f32::INFINITY, f32::min);
        assert_eq!(row[label], min);
    }

    let assigned = fit.assigned_distances();
    assert!(assigned.iter().all(|&d| d < 1.0));
}

#[test]
fn test_same_seed_same_fit() {
    let a = KMeans::new(3).seed(11).fit_predict(&blobs()).unwrap();
    let b = KMeans::new(3).seed(11).fit_predict(&blobs()).unwrap();
    assert_eq!(a.labels, b.labels);
    assert_eq!(a.centroids, b.centroids);
}

#[test]
fn test_invalid_cluster_counts() {
    assert!(matches!(
        KMeans::new(0).fit_predict(&blobs()),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(
        KMeans::new(7).fit_predict(&blobs()),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(
        KMeans::new(2).fit_predict(&[]),
        Err(Error::EmptyInput)
    ));
}

#[test]
fn test_ragged_input_rejected() {
    let data = vec![vec![0.0, 1.0], vec![0.0]];
    assert!(matches!(
        KMeans::new(1).fit_predict(&data),
        Err(Error::Collaborator(_))
    ));
}

#[test]
fn test_default_cluster_count() {
    assert_eq!(default_cluster_count(1), 1);
    assert_eq!(default_cluster_count(10), 2);
    assert_eq!(default_cluster_count(320), 20);
    assert_eq!(default_cluster_count(5000), 128);
}

#[test]
fn test_euclidean() {
    assert_eq!(euclidean(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
    assert_eq!(squared_euclidean(&[1.0], &[3.0]), 4.0);
}

#[test]
fn test_recompute_keeps_empty_centers() {
    let data = vec![vec![0.0, 0.0], vec![2.0, 4.0], vec![9.0, 9.0]];
    let mut centroids = vec![vec![1.0, 1.0], vec![5.0, 5.0], vec![-3.0, 7.0]];

    super::centroid::recompute_centroids(&data, &[0, 0, 1], &mut centroids);

    assert_eq!(centroids[0], vec![1.0, 2.0]);
    assert_eq!(centroids[1], vec![9.0, 9.0]);
    assert_eq!(centroids[2], vec![-3.0, 7.0]);
}

#[test]
fn test_scores_on_a_line() {
    let data = vec![vec![0.0], vec![2.0], vec![10.0], vec![12.0]];
    let scores = Scores::compute(&data, &[0, 0, 1, 1]).unwrap();

    assert!((scores.calinski_harabasz - 50.0).abs() < 1e-9);
    assert!((scores.silhouette - 158.0 / 198.0).abs() < 1e-9);
    assert!((scores.davies_bouldin - 0.2).abs() < 1e-9);
}

#[test]
fn test_scores_prefer_separated_labels() {
    let data = blobs();
    let good = Scores::compute(&data, &[0, 0, 0, 1, 1, 1]).unwrap();
    let mixed = Scores::compute(&data, &[0, 1, 0, 1, 0, 1]).unwrap();

    assert!(good.silhouette > 0.9);
    assert!(good.davies_bouldin < 0.1);
    assert!(good.calinski_harabasz > 1000.0);

    assert!(mixed.silhouette < 0.0);
    assert!(good.calinski_harabasz > mixed.calinski_harabasz);
    assert!(good.davies_bouldin < mixed.davies_bouldin);
}

#[test]
fn test_scores_ignore_unused_label_ids() {
    let data = blobs();
    let dense = Scores::compute(&data, &[0, 0, 0, 1, 1, 1]).unwrap();
    let sparse = Scores::compute(&data, &[4, 4, 4, 1, 1, 1]).unwrap();
    assert_eq!(dense, sparse);
}

#[test]
fn test_scores_from_kmeans_fit() {
    let data = blobs();
    let fit = KMeans::new(2).fit_predict(&data).unwrap();
    let silhouette = metrics::silhouette(&data, &fit.labels).unwrap();
    assert!(silhouette > 0.9);
}

#[test]
fn test_scores_need_two_to_n_minus_one_clusters() {
    let data = blobs();
    assert!(matches!(
        metrics::calinski_harabasz(&data, &[0; 6]),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(
        metrics::davies_bouldin(&data, &[0, 1, 2, 3, 4, 5]),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(
        Scores::compute(&data, &[0, 1]),
        Err(Error::Collaborator(_))
    ));
}
