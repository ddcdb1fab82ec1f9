//! A small dense feed-forward network trainer.
//!
//! `feedforward` builds a stack of dense layers, runs a forward pass over a
//! batch and trains with backpropagation + plain gradient descent. Everything
//! is expressed with a single dense `f64` [`Matrix`] type.
//!
//! # Data layout and shapes
//!
//! - Scalars are `f64`; matrices are row-major.
//! - Batches are column-per-sample: inputs are `(features, batch)`, targets
//!   and outputs are `(outputs, batch)`.
//! - Layer weights have shape `(out, in)`; biases `(out, 1)` and are broadcast
//!   across the batch.
//!
//! # Panics vs `Result`
//!
//! Like most numeric code, the crate exposes two layers of API:
//!
//! - Hot path (panics on misuse): the [`Matrix`] operations,
//!   [`Network::forward_pass`], [`Network::back_propagate`],
//!   [`Network::predict`] and [`Loss::compute`]. Shape mismatches are
//!   programmer error and panic via `assert!`.
//! - Construction and training (`Result`): [`Network::new`],
//!   [`Network::add_layer`], [`NetworkBuilder`], [`Network::fit`], the IDX
//!   reader and [`Dataset`] constructors.
//!
//! # Training protocol
//!
//! `forward_pass` caches each layer's pre-activation `z` and activation `a`;
//! the following `back_propagate` on the same input consumes them exactly
//! once. Softmax is only valid on the output layer and is paired with
//! cross-entropy, whose combined gradient `p - y` seeds backprop directly.
//!
//! ```rust
//! use feedforward::{Loss, Matrix, Network};
//! use rand::SeedableRng;
//!
//! # fn main() -> feedforward::Result<()> {
//! let mut rng = rand::rngs::StdRng::seed_from_u64(0);
//! let mut net = Network::new(0.01)?;
//! net.add_linear(2, 3, "relu", &mut rng)?;
//! net.add_linear(3, 1, "relu", &mut rng)?;
//!
//! let x = Matrix::from_rows(&[vec![1.0, 2.0], vec![0.5, -1.0]])?;
//! let y = Matrix::from_rows(&[vec![1.0, 0.0]])?;
//!
//! let out = net.forward_pass(&x);
//! let _loss = Loss::L2.compute(&out, &y);
//! net.back_propagate(&x, &y);
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod builder;
pub mod data;
pub mod error;
pub mod idx;
pub mod layer;
pub mod loss;
pub(crate) mod matmul;
pub mod matrix;
pub mod metrics;
pub mod network;
pub mod train;

pub use activation::Activation;
pub use builder::NetworkBuilder;
pub use data::{Dataset, Shuffle};
pub use error::{Error, Result};
pub use layer::{Init, Layer};
pub use loss::Loss;
pub use matrix::{Matrix, Transpose};
pub use network::Network;
pub use train::{EvalReport, FitConfig, FitReport};

/// Loss of `predictions` against `targets` for the named loss.
///
/// `kind` is `"l2"` or `"crossEntropy"`.
pub fn compute_loss(kind: &str, predictions: &Matrix, targets: &Matrix) -> Result<f64> {
    let loss: Loss = kind.parse()?;
    Ok(loss.compute(predictions, targets))
}
