//! Loss functions.
//!
//! Predictions and targets are `(outputs, batch)` matrices; both losses are
//! averaged over the batch (column) dimension only.
//!
//! Typical use inside a training step:
//!
//! - run `network.forward_pass(x)`
//! - monitor `Loss::compute(&output, &y)`
//! - run `network.back_propagate(x, y)`

use std::fmt;
use std::str::FromStr;

use crate::{Error, Matrix};

/// Probability floor applied before `ln` in cross-entropy.
pub const CROSS_ENTROPY_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Loss {
    /// Squared error: `sum((a - y)^2) / (2 * batch)`.
    #[default]
    L2,
    /// Cross-entropy over probabilities, meant for a softmax output layer.
    CrossEntropy,
}

impl Loss {
    /// Loss value for a batch.
    ///
    /// Shape contract: `pred.shape() == target.shape()`.
    pub fn compute(self, pred: &Matrix, target: &Matrix) -> f64 {
        match self {
            Loss::L2 => l2(pred, target),
            Loss::CrossEntropy => cross_entropy(pred, target),
        }
    }

    /// Gradient of the loss used to seed backprop.
    ///
    /// For `L2` this is `dL/da = a - y`. For `CrossEntropy` it is the combined
    /// softmax + cross-entropy gradient `dL/dz = p - y`. Neither is divided by
    /// the batch size; the network folds `1 / batch` into the update step.
    pub fn gradient(self, pred: &Matrix, target: &Matrix) -> Matrix {
        match self {
            Loss::L2 => l2_gradient(pred, target),
            Loss::CrossEntropy => softmax_cross_entropy_gradient(pred, target),
        }
    }
}

impl fmt::Display for Loss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Loss::L2 => f.write_str("l2"),
            Loss::CrossEntropy => f.write_str("crossEntropy"),
        }
    }
}

impl FromStr for Loss {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "l2" | "mse" => Ok(Loss::L2),
            "crossEntropy" | "cross_entropy" | "cross-entropy" => Ok(Loss::CrossEntropy),
            _ => Err(Error::UnknownLoss(s.to_owned())),
        }
    }
}

#[inline]
fn assert_same_shape(pred: &Matrix, target: &Matrix) {
    assert_eq!(
        pred.shape(),
        target.shape(),
        "pred shape {:?} does not match target shape {:?}",
        pred.shape(),
        target.shape()
    );
}

/// Squared-error loss summed over every entry, divided by `2 * batch`.
pub fn l2(pred: &Matrix, target: &Matrix) -> f64 {
    assert_same_shape(pred, target);
    let batch = pred.cols();
    if batch == 0 {
        return 0.0;
    }

    let mut sum_sq = 0.0_f64;
    for (a, y) in pred.as_slice().iter().zip(target.as_slice()) {
        let diff = a - y;
        sum_sq = diff.mul_add(diff, sum_sq);
    }
    sum_sq / (2.0 * batch as f64)
}

/// `dL/da = a - y`.
pub fn l2_gradient(pred: &Matrix, target: &Matrix) -> Matrix {
    assert_same_shape(pred, target);
    Matrix::difference(pred, target)
}

/// Cross-entropy `-(1/batch) * sum(y * ln(max(p, eps)))`.
///
/// Entries with `y == 0` contribute nothing and are skipped.
pub fn cross_entropy(pred: &Matrix, target: &Matrix) -> f64 {
    assert_same_shape(pred, target);
    let batch = pred.cols();
    if batch == 0 {
        return 0.0;
    }

    let mut sum = 0.0_f64;
    for (&p, &y) in pred.as_slice().iter().zip(target.as_slice()) {
        if y != 0.0 {
            sum -= y * p.max(CROSS_ENTROPY_EPSILON).ln();
        }
    }
    sum / batch as f64
}

/// Combined softmax + cross-entropy gradient w.r.t. the logits: `p - y`.
pub fn softmax_cross_entropy_gradient(probs: &Matrix, target: &Matrix) -> Matrix {
    assert_same_shape(probs, target);
    Matrix::difference(probs, target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(values: &[f64]) -> Matrix {
        Matrix::from_vec(values.len(), 1, values.to_vec()).unwrap()
    }

    #[test]
    fn l2_is_zero_when_equal() {
        let pred = Matrix::from_rows(&[vec![1.0, -2.0], vec![0.5, 3.0]]).unwrap();
        assert_eq!(l2(&pred, &pred), 0.0);
    }

    #[test]
    fn l2_sums_every_column() {
        // Two samples, two outputs: diffs (1, 2) and (3, 0).
        let pred = Matrix::from_rows(&[vec![1.0, 3.0], vec![2.0, 0.0]]).unwrap();
        let target = Matrix::zeros(2, 2);
        // (1 + 9 + 4 + 0) / (2 * 2)
        assert!((l2(&pred, &target) - 3.5).abs() < 1e-12);

        let g = l2_gradient(&pred, &target);
        assert_eq!(g, pred);
    }

    #[test]
    fn cross_entropy_of_confident_correct_prediction_is_small() {
        let target = col(&[0.0, 1.0, 0.0]);
        let good = col(&[0.01, 0.98, 0.01]);
        let bad = col(&[0.98, 0.01, 0.01]);
        let l_good = cross_entropy(&good, &target);
        let l_bad = cross_entropy(&bad, &target);
        assert!(l_good >= 0.0);
        assert!(l_good < l_bad);
        assert!((l_good - (-(0.98_f64).ln())).abs() < 1e-12);
    }

    #[test]
    fn cross_entropy_floors_zero_probabilities() {
        let target = col(&[1.0, 0.0]);
        let pred = col(&[0.0, 1.0]);
        let loss = cross_entropy(&pred, &target);
        assert!(loss.is_finite());
        assert!((loss - (-CROSS_ENTROPY_EPSILON.ln())).abs() < 1e-9);
    }

    #[test]
    fn cross_entropy_averages_over_batch() {
        let target = Matrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let pred = Matrix::from_rows(&[vec![0.5, 0.5], vec![0.5, 0.5]]).unwrap();
        assert!((cross_entropy(&pred, &target) - std::f64::consts::LN_2).abs() < 1e-12);
    }

    #[test]
    fn combined_gradient_is_p_minus_y() {
        let target = col(&[0.0, 1.0]);
        let probs = col(&[0.25, 0.75]);
        let g = Loss::CrossEntropy.gradient(&probs, &target);
        assert_eq!(g.as_slice(), &[0.25, -0.25]);
    }

    #[test]
    fn parses_names() {
        assert_eq!("l2".parse::<Loss>().unwrap(), Loss::L2);
        assert_eq!("crossEntropy".parse::<Loss>().unwrap(), Loss::CrossEntropy);
        assert!(matches!(
            "hinge".parse::<Loss>(),
            Err(Error::UnknownLoss(ref n)) if n == "hinge"
        ));
    }

    #[test]
    #[should_panic(expected = "does not match target shape")]
    fn shape_mismatch_panics() {
        l2(&Matrix::zeros(2, 1), &Matrix::zeros(1, 2));
    }
}
