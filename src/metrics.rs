//! Metrics.
//!
//! Metrics are evaluation helpers (they do not participate in backprop).

use crate::Matrix;

/// Index of the largest entry in each column. Ties resolve to the lowest row.
pub fn argmax_columns(m: &Matrix) -> Vec<usize> {
    (0..m.cols())
        .map(|c| {
            let mut best = 0;
            for r in 1..m.rows() {
                if m[(r, c)] > m[(best, c)] {
                    best = r;
                }
            }
            best
        })
        .collect()
}

/// Fraction of columns whose argmax agrees between predictions and targets.
///
/// For single-output models a prediction counts as positive at `>= 0.5`.
pub fn accuracy(pred: &Matrix, target: &Matrix) -> f64 {
    assert_eq!(
        pred.shape(),
        target.shape(),
        "pred shape {:?} does not match target shape {:?}",
        pred.shape(),
        target.shape()
    );
    if pred.cols() == 0 {
        return 0.0;
    }

    let correct = if pred.rows() == 1 {
        pred.as_slice()
            .iter()
            .zip(target.as_slice())
            .filter(|&(&p, &t)| (p >= 0.5) == (t >= 0.5))
            .count()
    } else {
        argmax_columns(pred)
            .into_iter()
            .zip(argmax_columns(target))
            .filter(|(p, t)| p == t)
            .count()
    };
    correct as f64 / pred.cols() as f64
}
