//! K-means clustering over numeric attributes and feature location.
//!
//! Each feature becomes one row: its numeric attributes (missing values read
//! as zero) followed by its centroid projected to an equal-area grid. Columns
//! are standardized before running k-means++ with several restarts.

use std::collections::{BTreeSet, HashSet};

use geo::Centroid;
use geoingest_core_common::FieldSchema;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::column_values;
use crate::extract::ExtractedFeature;
use crate::options::AnalyzerConfig;
use crate::standardize::{to_equal_area, to_geo};
use crate::types::ClusterAssignment;

type Row = Vec<f64>;

/// Clusters the features when clustering is enabled and the layer has more
/// than `cluster_threshold` features.
///
/// Layers without numeric attributes are clustered by location alone, and
/// `attributes_used` is then empty. With a fixed `seed` the labels are
/// reproducible.
pub fn cluster_features(
    columns: &[FieldSchema],
    features: &[ExtractedFeature],
    config: &AnalyzerConfig,
) -> Option<ClusterAssignment> {
    if !config.run_clustering
        || features.len() <= config.cluster_threshold
        || config.max_clusters == 0
    {
        return None;
    }

    let numeric: Vec<&FieldSchema> = columns.iter().filter(|c| c.kind.is_numeric()).collect();
    let mut rows = feature_matrix(&numeric, features);
    standardize(&mut rows);

    let k = config.max_clusters.min(rows.len());
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut best: Option<(Vec<usize>, f64)> = None;
    for _ in 0..config.restarts.max(1) {
        let (labels, inertia) = kmeans(&rows, k, config.max_iterations, &mut rng);
        if best.as_ref().is_none_or(|(_, lowest)| inertia < *lowest) {
            best = Some((labels, inertia));
        }
    }
    let (labels, inertia) = best?;
    debug!("K-means over {} rows settled at inertia {inertia:.3}", rows.len());

    Some(ClusterAssignment {
        cluster_count: labels.iter().collect::<HashSet<_>>().len(),
        label_per_record: labels,
        attributes_used: numeric.iter().map(|c| c.name.clone()).collect::<BTreeSet<_>>(),
    })
}

fn feature_matrix(numeric: &[&FieldSchema], features: &[ExtractedFeature]) -> Vec<Row> {
    let columns: Vec<Vec<f64>> = numeric
        .iter()
        .map(|column| {
            column_values(features, &column.name)
                .into_iter()
                .map(|value| value.as_f64().unwrap_or(0.0))
                .collect()
        })
        .collect();

    features
        .iter()
        .enumerate()
        .map(|(index, feature)| {
            let (x, y) = to_geo(&feature.geometry)
                .and_then(|geometry| geometry.centroid())
                .map_or((0.0, 0.0), |point| to_equal_area(point.x(), point.y()));
            columns
                .iter()
                .map(|column| column[index])
                .chain([x, y])
                .collect()
        })
        .collect()
}

/// Scales every column to zero mean and unit population variance; constant
/// columns are only centered.
#[allow(clippy::cast_precision_loss)]
fn standardize(rows: &mut [Row]) {
    let Some(width) = rows.first().map(Vec::len) else {
        return;
    };
    let count = rows.len() as f64;
    for column in 0..width {
        let mean = rows.iter().map(|row| row[column]).sum::<f64>() / count;
        let variance = rows.iter().map(|row| (row[column] - mean).powi(2)).sum::<f64>() / count;
        let scale = if variance > 0.0 { variance.sqrt() } else { 1.0 };
        for row in rows.iter_mut() {
            row[column] = (row[column] - mean) / scale;
        }
    }
}

/// One k-means run; returns the labels and the inertia.
fn kmeans(rows: &[Row], k: usize, max_iterations: usize, rng: &mut StdRng) -> (Vec<usize>, f64) {
    let mut centroids = initial_centroids(rows, k, rng);
    let mut labels = vec![0; rows.len()];

    for iteration in 0..max_iterations {
        let mut changed = iteration == 0;
        for (label, row) in labels.iter_mut().zip(rows) {
            let nearest = nearest(&centroids, row).0;
            if *label != nearest {
                *label = nearest;
                changed = true;
            }
        }
        if !changed {
            break;
        }
        update_centroids(rows, &labels, &mut centroids);
    }

    let inertia = rows.iter().map(|row| nearest(&centroids, row).1).sum();
    (labels, inertia)
}

/// K-means++ seeding: each next centroid is drawn with probability
/// proportional to its squared distance from the closest chosen one.
fn initial_centroids(rows: &[Row], k: usize, rng: &mut StdRng) -> Vec<Row> {
    let mut centroids = vec![rows[rng.gen_range(0..rows.len())].clone()];
    while centroids.len() < k {
        let distances: Vec<f64> = rows.iter().map(|row| nearest(&centroids, row).1).collect();
        let total: f64 = distances.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.gen_range(0.0..total);
            distances
                .iter()
                .position(|distance| {
                    target -= distance;
                    target < 0.0
                })
                .unwrap_or(rows.len() - 1)
        } else {
            rng.gen_range(0..rows.len())
        };
        centroids.push(rows[chosen].clone());
    }
    centroids
}

fn update_centroids(rows: &[Row], labels: &[usize], centroids: &mut [Row]) {
    for (cluster, centroid) in centroids.iter_mut().enumerate() {
        let members: Vec<&Row> = rows
            .iter()
            .zip(labels)
            .filter_map(|(row, label)| (*label == cluster).then_some(row))
            .collect();
        if members.is_empty() {
            continue;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = members.len() as f64;
        for (dimension, value) in centroid.iter_mut().enumerate() {
            *value = members.iter().map(|row| row[dimension]).sum::<f64>() / count;
        }
    }
}

/// Index of and squared distance to the closest centroid.
fn nearest(centroids: &[Row], row: &Row) -> (usize, f64) {
    centroids
        .iter()
        .map(|centroid| {
            centroid
                .iter()
                .zip(row)
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
        })
        .enumerate()
        .fold((0, f64::INFINITY), |best, (index, distance)| {
            if distance < best.1 { (index, distance) } else { best }
        })
}

#[cfg(test)]
mod tests {
    use geoingest_core_common::{FieldKind, Geometry};
    use serde_json::json;

    use super::*;

    /// Two tight groups of points far apart, each with a distinct score.
    fn two_groups(count: usize) -> Vec<ExtractedFeature> {
        (0..count)
            .map(|index| {
                let (lon, score) = if index % 2 == 0 { (-100.0, 1.0) } else { (100.0, 50.0) };
                #[allow(clippy::cast_precision_loss)]
                let jitter = (index as f64) * 1e-4;
                ExtractedFeature {
                    index,
                    geometry: Geometry::Point(vec![lon + jitter, 10.0]),
                    properties: [("score".to_string(), json!(score))].into_iter().collect(),
                }
            })
            .collect()
    }

    fn columns() -> Vec<FieldSchema> {
        vec![
            FieldSchema {
                name: "score".into(),
                kind: FieldKind::Float,
            },
            FieldSchema {
                name: "label".into(),
                kind: FieldKind::Text,
            },
        ]
    }

    fn config() -> AnalyzerConfig {
        AnalyzerConfig {
            max_clusters: 2,
            ..AnalyzerConfig::default().with_seed(7)
        }
    }

    #[test]
    fn small_layers_are_not_clustered() {
        assert!(cluster_features(&columns(), &two_groups(100), &config()).is_none());
        let disabled = config().with_clustering(false);
        assert!(cluster_features(&columns(), &two_groups(150), &disabled).is_none());
    }

    #[test]
    fn separated_groups_get_separate_labels() {
        let features = two_groups(150);

        let clusters = cluster_features(&columns(), &features, &config()).unwrap();

        assert_eq!(clusters.cluster_count, 2);
        assert_eq!(clusters.label_per_record.len(), 150);
        assert_eq!(
            clusters.attributes_used.iter().collect::<Vec<_>>(),
            ["score"]
        );
        let even = clusters.label_per_record[0];
        for (index, label) in clusters.label_per_record.iter().enumerate() {
            assert_eq!(*label == even, index % 2 == 0, "record {index}");
        }
    }

    #[test]
    fn layers_without_numeric_columns_cluster_by_location() {
        let features = two_groups(150);
        let text_only = vec![FieldSchema {
            name: "label".into(),
            kind: FieldKind::Text,
        }];

        let clusters = cluster_features(&text_only, &features, &config()).unwrap();

        assert!(clusters.attributes_used.is_empty());
        assert_eq!(clusters.cluster_count, 2);
        let even = clusters.label_per_record[0];
        for (index, label) in clusters.label_per_record.iter().enumerate() {
            assert_eq!(*label == even, index % 2 == 0, "record {index}");
        }
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let features = two_groups(120);
        let config = AnalyzerConfig::default().with_seed(42);

        let first = cluster_features(&columns(), &features, &config);
        let second = cluster_features(&columns(), &features, &config);

        assert_eq!(first, second);
        assert!(first.unwrap().cluster_count <= 5);
    }

    #[test]
    fn constant_columns_are_centered() {
        let mut rows = vec![vec![3.0, 1.0], vec![3.0, 3.0]];
        standardize(&mut rows);
        assert_eq!(rows, [vec![0.0, -1.0], vec![0.0, 1.0]]);
    }
}
