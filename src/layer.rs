use rand::Rng;

use crate::{Activation, Error, Matrix, Result};

/// Weight initialisation scheme.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Init {
    /// Uniform in `[-1/sqrt(in), 1/sqrt(in))`, biases zero.
    #[default]
    ScaledUniform,
    /// Every weight and bias set to the same value.
    Constant(f64),
}

/// One dense stage of a network: `z = W x + b`, `a = activation(z)`.
///
/// The layer caches `z` and `a` from its most recent [`Layer::evaluate`] call.
/// Those caches are what [`crate::Network::back_propagate`] consumes.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Row-major matrix with shape (out_features, in_features).
    weights: Matrix,
    /// Shape (out_features, 1), broadcast across the batch.
    biases: Matrix,
    activation: Activation,
    last_preactivation: Option<Matrix>,
    last_activation: Option<Matrix>,
}

impl Layer {
    /// Dense layer with the default scaled-uniform initialiser.
    pub fn linear<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        Self::with_init(in_features, out_features, activation, Init::ScaledUniform, rng)
    }

    /// Like [`Layer::linear`] with the activation given by name.
    pub fn linear_named<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        activation: &str,
        rng: &mut R,
    ) -> Result<Self> {
        let activation = activation.parse()?;
        Self::linear(in_features, out_features, activation, rng)
    }

    pub fn with_init<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        activation: Activation,
        init: Init,
        rng: &mut R,
    ) -> Result<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer dims must be > 0, got in={in_features} out={out_features}"
            )));
        }

        let (weights, biases) = match init {
            Init::ScaledUniform => {
                let limit = 1.0 / (in_features as f64).sqrt();
                (
                    Matrix::random_uniform(out_features, in_features, -limit, limit, rng),
                    Matrix::zeros(out_features, 1),
                )
            }
            Init::Constant(value) => {
                if !value.is_finite() {
                    return Err(Error::InvalidConfig(format!(
                        "constant init must be finite, got {value}"
                    )));
                }
                (
                    Matrix::filled(out_features, in_features, value),
                    Matrix::filled(out_features, 1, value),
                )
            }
        };

        Ok(Self::new_unchecked(weights, biases, activation))
    }

    /// Build a layer from explicit parameters.
    ///
    /// `weights` is `(out, in)` and `biases` must be `(out, 1)`.
    pub fn from_parts(weights: Matrix, biases: Matrix, activation: Activation) -> Result<Self> {
        if weights.is_empty() {
            return Err(Error::InvalidShape(
                "layer weights must not be empty".to_owned(),
            ));
        }
        if biases.shape() != (weights.rows(), 1) {
            return Err(Error::InvalidShape(format!(
                "biases have shape {:?}, expected ({}, 1)",
                biases.shape(),
                weights.rows()
            )));
        }
        Ok(Self::new_unchecked(weights, biases, activation))
    }

    fn new_unchecked(weights: Matrix, biases: Matrix, activation: Activation) -> Self {
        Self {
            weights,
            biases,
            activation,
            last_preactivation: None,
            last_activation: None,
        }
    }

    #[inline]
    pub fn in_features(&self) -> usize {
        self.weights.cols()
    }

    /// Number of neurons (`neuron_count`).
    #[inline]
    pub fn out_features(&self) -> usize {
        self.weights.rows()
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    #[inline]
    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    #[inline]
    pub fn biases(&self) -> &Matrix {
        &self.biases
    }

    #[inline]
    pub fn weights_mut(&mut self) -> &mut Matrix {
        &mut self.weights
    }

    #[inline]
    pub fn biases_mut(&mut self) -> &mut Matrix {
        &mut self.biases
    }

    /// Cached `z` from the last `evaluate`, if any.
    #[inline]
    pub fn last_preactivation(&self) -> Option<&Matrix> {
        self.last_preactivation.as_ref()
    }

    /// Cached `a` from the last `evaluate`, if any.
    #[inline]
    pub fn last_activation(&self) -> Option<&Matrix> {
        self.last_activation.as_ref()
    }

    /// Pure forward pass for a batch `(in_features, batch)`.
    ///
    /// Returns `(z, a)`, both `(out_features, batch)`.
    pub fn forward(&self, input: &Matrix) -> (Matrix, Matrix) {
        assert_eq!(
            input.rows(),
            self.in_features(),
            "input has {} rows, layer expects {} features",
            input.rows(),
            self.in_features()
        );
        let z = Matrix::multiply_bias_broadcast(&self.weights, input, &self.biases, 1.0, 1.0);
        let a = self.activation.apply(&z);
        (z, a)
    }

    /// Forward pass that replaces the cached `z`/`a` and returns the new `a`.
    pub fn evaluate(&mut self, input: &Matrix) -> &Matrix {
        let (z, a) = self.forward(input);
        self.last_preactivation = Some(z);
        self.last_activation.insert(a)
    }

    /// Move the cached `(z, a)` out of the layer, leaving the slots empty.
    pub(crate) fn take_cache(&mut self) -> Option<(Matrix, Matrix)> {
        match (self.last_preactivation.take(), self.last_activation.take()) {
            (Some(z), Some(a)) => Some((z, a)),
            _ => None,
        }
    }

    /// Gradient-descent update: `W <- W - d_weights`, `b <- b - d_biases`.
    ///
    /// The deltas are already scaled by the learning rate.
    pub(crate) fn apply_update(&mut self, d_weights: &Matrix, d_biases: &Matrix) {
        self.weights.subtract_in_place(d_weights);
        self.biases.subtract_in_place(d_biases);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn scaled_uniform_init_respects_bounds() {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = Layer::linear(16, 4, Activation::ReLU, &mut rng).unwrap();
        assert_eq!(layer.weights().shape(), (4, 16));
        assert_eq!(layer.biases().shape(), (4, 1));

        let limit = 0.25;
        assert!(
            layer
                .weights()
                .as_slice()
                .iter()
                .all(|w| (-limit..limit).contains(w))
        );
        assert!(layer.biases().as_slice().iter().all(|&b| b == 0.0));
        assert!(layer.last_preactivation().is_none());
        assert!(layer.last_activation().is_none());
    }

    #[test]
    fn named_construction_rejects_unknown_activation() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = Layer::linear_named(2, 2, "sigmoid", &mut rng).unwrap_err();
        assert!(matches!(err, Error::UnknownActivation(ref n) if n == "sigmoid"));
        assert!(Layer::linear_named(2, 2, "softmax", &mut rng).is_ok());
    }

    #[test]
    fn zero_dims_are_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(Layer::linear(0, 2, Activation::ReLU, &mut rng).is_err());
        assert!(Layer::linear(2, 0, Activation::ReLU, &mut rng).is_err());
    }

    #[test]
    fn from_parts_checks_bias_shape() {
        let w = Matrix::zeros(3, 2);
        assert!(Layer::from_parts(w.clone(), Matrix::zeros(3, 2), Activation::ReLU).is_err());
        assert!(Layer::from_parts(w, Matrix::zeros(3, 1), Activation::ReLU).is_ok());
    }

    #[test]
    fn evaluate_caches_z_and_a() {
        let w = Matrix::from_rows(&[vec![1.0, -1.0], vec![2.0, 0.0]]).unwrap();
        let b = Matrix::from_rows(&[vec![0.0], vec![-5.0]]).unwrap();
        let mut layer = Layer::from_parts(w, b, Activation::ReLU).unwrap();

        let x = Matrix::from_rows(&[vec![3.0, 1.0], vec![1.0, 2.0]]).unwrap();
        let a = layer.evaluate(&x).clone();

        let z = layer.last_preactivation().unwrap();
        assert_eq!(z.as_slice(), &[2.0, -1.0, 1.0, -3.0]);
        assert_eq!(a.as_slice(), &[2.0, 0.0, 1.0, 0.0]);
        assert_eq!(layer.last_activation(), Some(&a));

        // A second evaluate replaces the cache.
        let x2 = Matrix::zeros(2, 1);
        layer.evaluate(&x2);
        assert_eq!(layer.last_preactivation().unwrap().shape(), (2, 1));

        let (z, a) = layer.take_cache().unwrap();
        assert_eq!(z.as_slice(), &[0.0, -5.0]);
        assert_eq!(a.as_slice(), &[0.0, 0.0]);
        assert!(layer.take_cache().is_none());
    }

    #[test]
    #[should_panic(expected = "layer expects")]
    fn forward_rejects_wrong_feature_count() {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = Layer::linear(3, 2, Activation::ReLU, &mut rng).unwrap();
        layer.forward(&Matrix::zeros(2, 4));
    }
}
