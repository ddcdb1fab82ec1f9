use log::{debug, info, warn};

use crate::{Dataset, Error, Loss, Network, Result, Shuffle, metrics};

#[derive(Debug, Clone, Copy)]
pub struct FitConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub shuffle: Shuffle,
    pub loss: Loss,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 32,
            shuffle: Shuffle::None,
            loss: Loss::L2,
        }
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be > 0".to_owned()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_owned()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FitReport {
    /// Mean training loss of each epoch, measured before each batch update.
    pub epoch_losses: Vec<f64>,
}

impl FitReport {
    pub fn final_loss(&self) -> f64 {
        self.epoch_losses.last().copied().unwrap_or(f64::NAN)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalReport {
    pub loss: f64,
    pub accuracy: f64,
}

impl Network {
    /// Train on `train` with mini-batch gradient descent.
    ///
    /// Each batch runs `forward_pass` -> loss -> `back_propagate`.
    pub fn fit(&mut self, train: &Dataset, cfg: FitConfig) -> Result<FitReport> {
        cfg.validate()?;
        self.check_dataset(train)?;
        self.check_loss(cfg.loss)?;

        let mut epoch_losses = Vec::with_capacity(cfg.epochs);
        for epoch in 0..cfg.epochs {
            let mut total = 0.0_f64;
            let batches = train.batches(cfg.batch_size, cfg.shuffle, epoch as u64);
            for (step, (x, y)) in batches.iter().enumerate() {
                let loss = self.train_step(x, y, cfg.loss);
                if !loss.is_finite() {
                    warn!("epoch {epoch} batch {step}: loss is {loss}");
                }
                // Weight by batch size so a short final batch is not over-counted.
                total += loss * x.cols() as f64;
            }

            let mean = total / train.len() as f64;
            info!("epoch {}/{}: loss={mean:.6}", epoch + 1, cfg.epochs);
            epoch_losses.push(mean);
        }

        Ok(FitReport { epoch_losses })
    }

    /// Loss and accuracy over a whole dataset, without touching layer caches.
    pub fn evaluate(&self, data: &Dataset, loss: Loss) -> Result<EvalReport> {
        self.check_dataset(data)?;
        let pred = self.predict(data.inputs());
        let report = EvalReport {
            loss: loss.compute(&pred, data.targets()),
            accuracy: metrics::accuracy(&pred, data.targets()),
        };
        debug!(
            "evaluated {} samples: loss={:.6} accuracy={:.4}",
            data.len(),
            report.loss,
            report.accuracy
        );
        Ok(report)
    }

    fn check_dataset(&self, data: &Dataset) -> Result<()> {
        if self.num_layers() == 0 {
            return Err(Error::InvalidConfig(
                "network must have at least one layer".to_owned(),
            ));
        }
        if data.is_empty() {
            return Err(Error::InvalidData("dataset must not be empty".to_owned()));
        }
        if data.input_features() != self.input_features() {
            return Err(Error::InvalidData(format!(
                "dataset input_features {} does not match network input_features {}",
                data.input_features(),
                self.input_features()
            )));
        }
        if data.target_features() != self.output_features() {
            return Err(Error::InvalidData(format!(
                "dataset target_features {} does not match network output_features {}",
                data.target_features(),
                self.output_features()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Activation, NetworkBuilder};

    fn blobs() -> Dataset {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        let centers = [[-1.0, -1.0], [1.0, -1.0], [0.0, 1.0]];
        for (class, c) in centers.iter().enumerate() {
            for k in 0..10 {
                let jitter = (k as f64 - 4.5) * 0.03;
                xs.push(vec![c[0] + jitter, c[1] - jitter]);
                let mut t = vec![0.0; 3];
                t[class] = 1.0;
                ys.push(t);
            }
        }
        Dataset::from_samples(&xs, &ys).unwrap()
    }

    #[test]
    fn fit_learns_separable_blobs() {
        let train = blobs();
        let mut net = NetworkBuilder::new(2)
            .unwrap()
            .learning_rate(0.2)
            .unwrap()
            .add_layer(16, Activation::ReLU)
            .unwrap()
            .add_layer(3, Activation::Softmax)
            .unwrap()
            .build_with_seed(0)
            .unwrap();

        let before = net.evaluate(&train, Loss::CrossEntropy).unwrap();
        let report = net
            .fit(
                &train,
                FitConfig {
                    epochs: 100,
                    batch_size: 8,
                    shuffle: Shuffle::Seeded(0),
                    loss: Loss::CrossEntropy,
                },
            )
            .unwrap();
        let after = net.evaluate(&train, Loss::CrossEntropy).unwrap();

        assert_eq!(report.epoch_losses.len(), 100);
        assert!(after.loss < before.loss);
        assert!(after.accuracy > 0.9, "accuracy {}", after.accuracy);
    }

    #[test]
    fn fit_validates_inputs() {
        let train = blobs();
        let mut net = NetworkBuilder::new(2)
            .unwrap()
            .add_layer(3, Activation::Softmax)
            .unwrap()
            .build_with_seed(0)
            .unwrap();

        let bad_epochs = FitConfig {
            epochs: 0,
            loss: Loss::CrossEntropy,
            ..FitConfig::default()
        };
        assert!(net.fit(&train, bad_epochs).is_err());

        // Softmax output requires cross-entropy.
        assert!(net.fit(&train, FitConfig::default()).is_err());

        let mut wide = NetworkBuilder::new(3)
            .unwrap()
            .add_layer(3, Activation::Softmax)
            .unwrap()
            .build_with_seed(0)
            .unwrap();
        let cfg = FitConfig {
            loss: Loss::CrossEntropy,
            ..FitConfig::default()
        };
        assert!(matches!(wide.fit(&train, cfg), Err(Error::InvalidData(_))));
    }
}
