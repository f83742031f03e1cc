use std::cmp::Ordering;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub(crate) enum TreeNode {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        distribution: Vec<f32>,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub n_split_features: usize,
}

/// A single CART classification tree. Nodes live in an arena with the root at
/// index 0; leaves hold the class distribution of the training rows that
/// reached them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub(crate) struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// fit grows a tree over the given training rows, splitting on gini
    /// impurity with a random feature subset considered at every node.
    pub fn fit(
        x: &Array2<f32>,
        y: &[usize],
        rows: &[usize],
        n_classes: usize,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut nodes = Vec::new();
        grow(&mut nodes, x, y, rows.to_vec(), 0, n_classes, params, rng);
        DecisionTree { nodes }
    }

    /// decide walks the tree and returns the leaf class distribution for the
    /// given feature row. The caller guarantees the row has the training
    /// dimensionality.
    pub fn decide(&self, features: &[f32]) -> &[f32] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { distribution } => return distribution,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

fn grow(
    nodes: &mut Vec<TreeNode>,
    x: &Array2<f32>,
    y: &[usize],
    rows: Vec<usize>,
    depth: usize,
    n_classes: usize,
    params: &TreeParams,
    rng: &mut StdRng,
) -> usize {
    let counts = class_counts(y, &rows, n_classes);
    let node_idx = nodes.len();
    nodes.push(TreeNode::Leaf {
        distribution: to_distribution(&counts, rows.len()),
    });

    let n_present = counts.iter().filter(|&&c| c > 0).count();
    let depth_capped = params.max_depth.map_or(false, |d| depth >= d);
    if rows.len() < params.min_samples_split || n_present <= 1 || depth_capped {
        return node_idx;
    }

    let features = sample_features(x.ncols(), params.n_split_features, rng);
    let (feature, threshold) = match best_split(x, y, &rows, &features, &counts) {
        Some(split) => split,
        None => return node_idx,
    };

    let mut left_rows = Vec::new();
    let mut right_rows = Vec::new();
    for &row in &rows {
        if x[[row, feature]] <= threshold {
            left_rows.push(row);
        } else {
            right_rows.push(row);
        }
    }
    if left_rows.is_empty() || right_rows.is_empty() {
        return node_idx;
    }

    let left = grow(nodes, x, y, left_rows, depth + 1, n_classes, params, rng);
    let right = grow(nodes, x, y, right_rows, depth + 1, n_classes, params, rng);
    nodes[node_idx] = TreeNode::Split {
        feature,
        threshold,
        left,
        right,
    };
    node_idx
}

/// Picks the candidate split with the largest gini impurity decrease, scanning
/// midpoints between consecutive distinct values per candidate feature.
fn best_split(
    x: &Array2<f32>,
    y: &[usize],
    rows: &[usize],
    features: &[usize],
    parent_counts: &[usize],
) -> Option<(usize, f32)> {
    let total = rows.len() as f64;
    let parent_gini = gini(parent_counts, rows.len());
    let n_classes = parent_counts.len();

    let mut best_gain = 1e-9;
    let mut best: Option<(usize, f32)> = None;

    for &feature in features {
        let mut ordered: Vec<(f32, usize)> = rows.iter().map(|&r| (x[[r, feature]], y[r])).collect();
        ordered.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let mut left_counts = vec![0usize; n_classes];
        for i in 0..ordered.len() - 1 {
            left_counts[ordered[i].1] += 1;
            if ordered[i].0 >= ordered[i + 1].0 {
                continue;
            }

            let left_n = i + 1;
            let right_n = rows.len() - left_n;
            let right_counts: Vec<usize> = parent_counts
                .iter()
                .zip(&left_counts)
                .map(|(&p, &l)| p - l)
                .collect();

            let weighted = (left_n as f64 / total) * gini(&left_counts, left_n)
                + (right_n as f64 / total) * gini(&right_counts, right_n);
            let gain = parent_gini - weighted;
            if gain > best_gain {
                best_gain = gain;
                best = Some((feature, (ordered[i].0 + ordered[i + 1].0) / 2.0));
            }
        }
    }

    best
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

fn class_counts(y: &[usize], rows: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &row in rows {
        counts[y[row]] += 1;
    }
    counts
}

fn to_distribution(counts: &[usize], n: usize) -> Vec<f32> {
    counts
        .iter()
        .map(|&c| if n == 0 { 0.0 } else { c as f32 / n as f32 })
        .collect()
}

fn sample_features(n_features: usize, k: usize, rng: &mut StdRng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n_features).collect();
    let k = k.min(n_features).max(1);
    let (chosen, _) = indices.partial_shuffle(rng, k);
    let mut chosen = chosen.to_vec();
    chosen.sort_unstable();
    chosen
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use crate::classifier::tree::{DecisionTree, TreeParams};

    fn separable_matrix() -> (Array2<f32>, Vec<usize>) {
        // class 0 clusters near 0.1 on feature 0, class 1 near 0.9
        let mut flat = Vec::new();
        let mut y = Vec::new();
        for i in 0..10 {
            flat.extend_from_slice(&[0.1 + 0.001 * i as f32, 0.5]);
            y.push(0);
        }
        for i in 0..10 {
            flat.extend_from_slice(&[0.9 - 0.001 * i as f32, 0.5]);
            y.push(1);
        }
        (Array2::from_shape_vec((20, 2), flat).unwrap(), y)
    }

    #[test]
    fn test_fit_separates_two_classes() {
        let (x, y) = separable_matrix();
        let rows: Vec<usize> = (0..x.nrows()).collect();
        let params = TreeParams {
            max_depth: None,
            min_samples_split: 2,
            n_split_features: 2,
        };
        let mut rng = StdRng::seed_from_u64(3);
        let tree = DecisionTree::fit(&x, &y, &rows, 2, &params, &mut rng);

        assert_eq!(tree.decide(&[0.05, 0.5]), &[1.0, 0.0]);
        assert_eq!(tree.decide(&[0.95, 0.5]), &[0.0, 1.0]);
    }

    #[test]
    fn test_pure_rows_become_single_leaf() {
        let x = Array2::from_shape_vec((3, 2), vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]).unwrap();
        let y = vec![1, 1, 1];
        let rows = vec![0, 1, 2];
        let params = TreeParams {
            max_depth: None,
            min_samples_split: 2,
            n_split_features: 2,
        };
        let mut rng = StdRng::seed_from_u64(3);
        let tree = DecisionTree::fit(&x, &y, &rows, 2, &params, &mut rng);

        assert_eq!(tree.decide(&[0.0, 0.0]), &[0.0, 1.0]);
    }

    #[test]
    fn test_max_depth_zero_yields_prior_distribution() {
        let (x, y) = separable_matrix();
        let rows: Vec<usize> = (0..x.nrows()).collect();
        let params = TreeParams {
            max_depth: Some(0),
            min_samples_split: 2,
            n_split_features: 2,
        };
        let mut rng = StdRng::seed_from_u64(3);
        let tree = DecisionTree::fit(&x, &y, &rows, 2, &params, &mut rng);

        assert_eq!(tree.decide(&[0.5, 0.5]), &[0.5, 0.5]);
    }
}
