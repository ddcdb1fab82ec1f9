use log::{debug, trace};
use rand::Rng;

use crate::activation::Activation;
use crate::loss::Loss;
use crate::matrix::Transpose;
use crate::{Error, Layer, Matrix, Result};

/// An ordered stack of dense layers trained with plain gradient descent.
///
/// Batches are column-per-sample: inputs are `(input_features, batch)` and
/// outputs `(output_features, batch)`.
///
/// Training is a two-call protocol on the same input:
/// - [`Network::forward_pass`] evaluates every layer and leaves `z`/`a` cached
///   in each [`Layer`]
/// - [`Network::back_propagate`] consumes those caches, computes gradients and
///   updates every layer's weights and biases in place
///
/// Dropping the network releases every layer buffer.
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<Layer>,
    learning_rate: f64,
}

impl Network {
    /// An empty network.
    pub fn new(learning_rate: f64) -> Result<Self> {
        validate_learning_rate(learning_rate)?;
        Ok(Self {
            layers: Vec::new(),
            learning_rate,
        })
    }

    /// Append a layer.
    ///
    /// The layer's `in_features` must equal the current last layer's
    /// `out_features`, and nothing may follow a softmax layer.
    pub fn add_layer(&mut self, layer: Layer) -> Result<()> {
        if let Some(last) = self.layers.last() {
            if last.activation() == Activation::Softmax {
                return Err(Error::InvalidConfig(
                    "softmax is only supported on the output layer".to_owned(),
                ));
            }
            if layer.in_features() != last.out_features() {
                return Err(Error::InvalidShape(format!(
                    "layer {} expects {} inputs but the previous layer has {} outputs",
                    self.layers.len(),
                    layer.in_features(),
                    last.out_features()
                )));
            }
        }

        debug!(
            "adding layer {}: {} -> {} ({})",
            self.layers.len(),
            layer.in_features(),
            layer.out_features(),
            layer.activation()
        );
        self.layers.push(layer);
        Ok(())
    }

    /// Build and append a freshly initialised dense layer (`addLayer`).
    pub fn add_linear<R: Rng + ?Sized>(
        &mut self,
        in_features: usize,
        out_features: usize,
        activation: &str,
        rng: &mut R,
    ) -> Result<()> {
        let layer = Layer::linear_named(in_features, out_features, activation, rng)?;
        self.add_layer(layer)
    }

    /// Explicitly release the network and all of its buffers (`releaseNetwork`).
    pub fn release(self) {
        debug!("releasing network with {} layers", self.layers.len());
    }

    #[inline]
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) -> Result<()> {
        validate_learning_rate(learning_rate)?;
        self.learning_rate = learning_rate;
        Ok(())
    }

    #[inline]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    #[inline]
    pub fn layer_mut(&mut self, idx: usize) -> &mut Layer {
        &mut self.layers[idx]
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn input_features(&self) -> usize {
        self.layers
            .first()
            .expect("network must have at least one layer")
            .in_features()
    }

    #[inline]
    pub fn output_features(&self) -> usize {
        self.layers
            .last()
            .expect("network must have at least one layer")
            .out_features()
    }

    /// The loss whose gradient `back_propagate` implements for this topology:
    /// cross-entropy for a softmax output, squared error otherwise.
    pub fn natural_loss(&self) -> Loss {
        match self.layers.last().map(Layer::activation) {
            Some(Activation::Softmax) => Loss::CrossEntropy,
            _ => Loss::L2,
        }
    }

    /// Check that `loss` is the one backprop optimises for this network.
    pub fn check_loss(&self, loss: Loss) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::InvalidConfig(
                "network must have at least one layer".to_owned(),
            ));
        }
        let expected = self.natural_loss();
        if loss != expected {
            return Err(Error::InvalidConfig(format!(
                "loss {loss} does not match the output layer; expected {expected}"
            )));
        }
        Ok(())
    }

    /// Evaluate the network on `x` and cache per-layer `z`/`a`.
    ///
    /// Returns a copy of the output activations, shape `(output_features, batch)`.
    /// Any caches left from a previous call are replaced.
    pub fn forward_pass(&mut self, x: &Matrix) -> Matrix {
        self.assert_input(x);

        for idx in 0..self.layers.len() {
            if idx == 0 {
                self.layers[0].evaluate(x);
            } else {
                // Borrow the previous layer immutably and the current layer mutably.
                let (left, right) = self.layers.split_at_mut(idx);
                let prev = left[idx - 1]
                    .last_activation()
                    .expect("previous layer was just evaluated");
                right[0].evaluate(prev);
            }
        }

        self.layers
            .last()
            .and_then(Layer::last_activation)
            .cloned()
            .expect("output layer was just evaluated")
    }

    /// Inference-only forward pass; leaves layer caches untouched.
    pub fn predict(&self, x: &Matrix) -> Matrix {
        self.assert_input(x);

        let mut layers = self.layers.iter();
        let first = layers.next().expect("network must have at least one layer");
        let (_, mut a) = first.forward(x);
        for layer in layers {
            a = layer.forward(&a).1;
        }
        a
    }

    /// Backpropagate the error of the preceding `forward_pass(x)` against `y`
    /// and apply one gradient-descent step to every layer.
    ///
    /// The caches from that forward pass are consumed: calling this twice
    /// without a new `forward_pass` panics.
    ///
    /// Shape contract:
    /// - `x` is `(input_features, batch)`, the same matrix passed to `forward_pass`
    /// - `y` is `(output_features, batch)`
    pub fn back_propagate(&mut self, x: &Matrix, y: &Matrix) {
        self.assert_input(x);
        let batch = x.cols();
        assert_eq!(
            y.shape(),
            (self.output_features(), batch),
            "targets have shape {:?}, expected ({}, {batch})",
            y.shape(),
            self.output_features()
        );

        let caches: Vec<(Matrix, Matrix)> = self
            .layers
            .iter_mut()
            .enumerate()
            .map(|(idx, layer)| {
                let cache = layer.take_cache().unwrap_or_else(|| {
                    panic!("layer {idx} has no cached forward pass; call forward_pass first")
                });
                assert_eq!(
                    cache.1.shape(),
                    (layer.out_features(), batch),
                    "layer {idx} cache has shape {:?}, expected ({}, {batch}); \
                     was forward_pass called with a different batch?",
                    cache.1.shape(),
                    layer.out_features()
                );
                cache
            })
            .collect();

        if batch == 0 {
            return;
        }

        let step = self.learning_rate / batch as f64;
        let last = self.layers.len() - 1;

        let (z_out, a_out) = &caches[last];
        // Softmax pairs with cross-entropy, whose gradient is already dL/dz.
        let seed = self.natural_loss().gradient(a_out, y);
        let mut delta = match self.layers[last].activation().derivative(z_out) {
            Some(f_prime) => Matrix::hadamard(&seed, &f_prime),
            None => seed,
        };

        for idx in (0..self.layers.len()).rev() {
            let layer = &self.layers[idx];
            let prev_activation = if idx == 0 { x } else { &caches[idx - 1].1 };

            let d_weights = Matrix::multiply(
                &delta,
                prev_activation,
                &Matrix::zeros(layer.out_features(), layer.in_features()),
                step,
                0.0,
                Transpose::B,
            );
            let d_biases = delta.row_sum().scale(step);

            // Propagate with the pre-update weights of this layer.
            let prev_delta = if idx > 0 {
                let back = Matrix::multiply(
                    layer.weights(),
                    &delta,
                    &Matrix::zeros(layer.in_features(), batch),
                    1.0,
                    0.0,
                    Transpose::A,
                );
                let f_prime = self.layers[idx - 1]
                    .activation()
                    .derivative(&caches[idx - 1].0)
                    .expect("softmax is only allowed on the output layer");
                Some(Matrix::hadamard(&back, &f_prime))
            } else {
                None
            };

            trace!(
                "layer {idx}: |dW|_1={:.6e} |db|_1={:.6e}",
                d_weights.as_slice().iter().map(|v| v.abs()).sum::<f64>(),
                d_biases.as_slice().iter().map(|v| v.abs()).sum::<f64>()
            );
            self.layers[idx].apply_update(&d_weights, &d_biases);

            if let Some(d) = prev_delta {
                delta = d;
            }
        }
    }

    /// One training step: forward pass, loss measurement, backprop + update.
    ///
    /// Returns the loss of the batch before the update.
    pub fn train_step(&mut self, x: &Matrix, y: &Matrix, loss: Loss) -> f64 {
        let output = self.forward_pass(x);
        let value = loss.compute(&output, y);
        self.back_propagate(x, y);
        debug!("train step: batch={} loss={value:.6}", x.cols());
        value
    }

    fn assert_input(&self, x: &Matrix) {
        assert!(!self.layers.is_empty(), "network has no layers");
        assert_eq!(
            x.rows(),
            self.input_features(),
            "input has {} rows, network expects {} features",
            x.rows(),
            self.input_features()
        );
    }
}

fn validate_learning_rate(lr: f64) -> Result<()> {
    if !(lr.is_finite() && lr > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "learning rate must be finite and > 0, got {lr}"
        )));
    }
    Ok(())
}
