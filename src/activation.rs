//! Activation functions.
//!
//! A layer computes a pre-activation `z = W x + b` and then applies an
//! activation: `a = activation(z)`. Both `z` and `a` are cached by the layer so
//! backprop can evaluate the derivative at `z`.
//!
//! The set of activations is closed:
//! - `ReLU` is element-wise, with derivative `1` for `z > 0` and `0` otherwise.
//! - `Softmax` normalises each column (one sample) independently. It has no
//!   standalone derivative here: it is only valid on the output layer, where it
//!   pairs with cross-entropy and the combined gradient `p - y` is used directly.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Matrix};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activation {
    ReLU,
    Softmax,
}

impl Activation {
    /// Canonical lowercase name, as accepted by `FromStr`.
    pub fn name(self) -> &'static str {
        match self {
            Activation::ReLU => "relu",
            Activation::Softmax => "softmax",
        }
    }

    /// Apply the activation to a batch of pre-activations `(neurons, batch)`.
    pub fn apply(self, z: &Matrix) -> Matrix {
        match self {
            Activation::ReLU => z.map(relu),
            Activation::Softmax => softmax_columns(z),
        }
    }

    /// `f'(z)` element-wise, or `None` for softmax, whose gradient only exists
    /// in combination with cross-entropy.
    pub(crate) fn derivative(self, z: &Matrix) -> Option<Matrix> {
        match self {
            Activation::ReLU => Some(z.map(relu_prime)),
            Activation::Softmax => None,
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Activation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relu" => Ok(Activation::ReLU),
            "softmax" => Ok(Activation::Softmax),
            _ => Err(Error::UnknownActivation(s.to_owned())),
        }
    }
}

#[inline]
pub fn relu(z: f64) -> f64 {
    z.max(0.0)
}

/// ReLU derivative; `relu_prime(0.0) == 0.0`.
#[inline]
pub fn relu_prime(z: f64) -> f64 {
    if z > 0.0 { 1.0 } else { 0.0 }
}

/// Column-wise, max-shifted softmax.
///
/// A column holding `+inf` splits the mass evenly over its infinite entries.
/// A column whose exponentials sum to zero or NaN (all `-inf`, or any NaN)
/// maps to all zeros.
pub fn softmax_columns(z: &Matrix) -> Matrix {
    let (rows, cols) = z.shape();
    let mut out = Matrix::zeros(rows, cols);
    if rows == 0 {
        return out;
    }

    for c in 0..cols {
        let mut max_z = f64::NEG_INFINITY;
        for r in 0..rows {
            max_z = max_z.max(z[(r, c)]);
        }

        if max_z == f64::INFINITY {
            let hits = (0..rows).filter(|&r| z[(r, c)] == f64::INFINITY).count();
            let share = 1.0 / hits as f64;
            for r in 0..rows {
                out[(r, c)] = if z[(r, c)] == f64::INFINITY { share } else { 0.0 };
            }
            continue;
        }

        let mut sum = 0.0_f64;
        for r in 0..rows {
            let e = (z[(r, c)] - max_z).exp();
            out[(r, c)] = e;
            sum += e;
        }

        if sum == 0.0 || !sum.is_finite() {
            for r in 0..rows {
                out[(r, c)] = 0.0;
            }
            continue;
        }

        let inv_sum = 1.0 / sum;
        for r in 0..rows {
            out[(r, c)] *= inv_sum;
        }
    }
    out
}
