//! Network builder.
//!
//! `NetworkBuilder` is the recommended way to define a model when the topology
//! is known up front. It tracks the running feature count so each layer's
//! input size is derived from the previous layer, validates the learning rate
//! and the softmax-on-output rule, and initialises weights from a seed or a
//! caller-provided RNG.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Activation, Error, Layer, Network, Result};

#[derive(Debug, Clone, Copy)]
struct LayerSpec {
    out_features: usize,
    activation: Activation,
}

/// Builder for a [`Network`].
///
/// ```rust
/// use feedforward::{Activation, NetworkBuilder};
///
/// # fn main() -> feedforward::Result<()> {
/// let net = NetworkBuilder::new(784)?
///     .learning_rate(0.1)?
///     .add_layer(64, Activation::ReLU)?
///     .add_layer(10, Activation::Softmax)?
///     .build_with_seed(0)?;
/// assert_eq!(net.output_features(), 10);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct NetworkBuilder {
    input_features: usize,
    learning_rate: f64,
    layers: Vec<LayerSpec>,
}

impl NetworkBuilder {
    pub const DEFAULT_LEARNING_RATE: f64 = 0.01;

    /// Start building a network that accepts `input_features` rows per sample.
    pub fn new(input_features: usize) -> Result<Self> {
        if input_features == 0 {
            return Err(Error::InvalidConfig(
                "input_features must be > 0".to_owned(),
            ));
        }
        Ok(Self {
            input_features,
            learning_rate: Self::DEFAULT_LEARNING_RATE,
            layers: Vec::new(),
        })
    }

    /// Convenience constructor from a sizes list + activations.
    ///
    /// `sizes` includes the input and output sizes, so its length must be at
    /// least 2; `activations` must have length `sizes.len() - 1`.
    pub fn from_sizes(sizes: &[usize], activations: &[Activation]) -> Result<Self> {
        if sizes.len() < 2 {
            return Err(Error::InvalidConfig(
                "sizes must include input and output sizes".to_owned(),
            ));
        }
        if activations.len() != sizes.len() - 1 {
            return Err(Error::InvalidConfig(format!(
                "activations length {} does not match sizes.len() - 1 ({})",
                activations.len(),
                sizes.len() - 1
            )));
        }

        let mut b = Self::new(sizes[0])?;
        for (&out, &act) in sizes[1..].iter().zip(activations) {
            b = b.add_layer(out, act)?;
        }
        Ok(b)
    }

    pub fn learning_rate(mut self, learning_rate: f64) -> Result<Self> {
        if !(learning_rate.is_finite() && learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be finite and > 0, got {learning_rate}"
            )));
        }
        self.learning_rate = learning_rate;
        Ok(self)
    }

    /// Add a dense layer with `out_features` neurons.
    pub fn add_layer(mut self, out_features: usize, activation: Activation) -> Result<Self> {
        if out_features == 0 {
            return Err(Error::InvalidConfig(
                "layer out_features must be > 0".to_owned(),
            ));
        }
        if matches!(
            self.layers.last(),
            Some(LayerSpec {
                activation: Activation::Softmax,
                ..
            })
        ) {
            return Err(Error::InvalidConfig(
                "softmax is only supported on the output layer".to_owned(),
            ));
        }

        self.layers.push(LayerSpec {
            out_features,
            activation,
        });
        Ok(self)
    }

    /// Build using a deterministic seed.
    pub fn build_with_seed(self, seed: u64) -> Result<Network> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Build using the provided RNG.
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Network> {
        if self.layers.is_empty() {
            return Err(Error::InvalidConfig(
                "network must have at least one layer".to_owned(),
            ));
        }

        let mut network = Network::new(self.learning_rate)?;
        let mut in_features = self.input_features;
        for spec in self.layers {
            let layer = Layer::linear(in_features, spec.out_features, spec.activation, rng)?;
            network.add_layer(layer)?;
            in_features = spec.out_features;
        }
        Ok(network)
    }
}
