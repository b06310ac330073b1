//! Silhouette score.
//!
//! For a point `i` with mean intra-cluster distance `a(i)` and smallest mean distance
//! to another cluster `b(i)`, the silhouette is `(b - a) / max(a, b)`. Points in
//! singleton clusters score 0. The score of a clustering is the mean over all points,
//! in `[-1, 1]`; higher means tighter, better separated clusters.
//!
//! Distances are Euclidean, accumulated in `f64`. Cost is O(n²·d).

use super::util::euclidean_f64;

/// Mean silhouette of `labels` over `points`.
///
/// Returns `None` when the score is undefined: fewer than 2 distinct labels, or as many
/// distinct labels as points. `labels` must have one entry per point.
pub fn silhouette_score<V: AsRef<[f32]>>(points: &[V], labels: &[usize]) -> Option<f64> {
    let n = points.len();
    if n == 0 || labels.len() != n {
        return None;
    }

    // Compact labels to 0..n_labels.
    let mut ids: Vec<usize> = labels.to_vec();
    ids.sort_unstable();
    ids.dedup();
    let n_labels = ids.len();
    if n_labels < 2 || n_labels >= n {
        return None;
    }
    let compact: Vec<usize> = labels
        .iter()
        .map(|l| ids.binary_search(l).unwrap_or(0))
        .collect();

    let mut sizes = vec![0usize; n_labels];
    for &c in &compact {
        sizes[c] += 1;
    }

    let mut total = 0.0;
    let mut sums = vec![0.0f64; n_labels];
    for i in 0..n {
        sums.iter_mut().for_each(|s| *s = 0.0);
        let pi = points[i].as_ref();
        for j in 0..n {
            if i != j {
                sums[compact[j]] += euclidean_f64(pi, points[j].as_ref());
            }
        }

        let own = compact[i];
        if sizes[own] <= 1 {
            continue;
        }
        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..n_labels)
            .filter(|&c| c != own)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }

    Some(total / n as f64)
}
