//! In-memory datasets and batching.
//!
//! A `Dataset` stores inputs as `(input_features, len)` and targets as
//! `(target_features, len)`: one column per sample, the same layout the network
//! consumes. Batches are built by gathering columns.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::idx::{IdxImages, IdxLabels};
use crate::{Error, Matrix, Result};

/// Sample ordering for each epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shuffle {
    /// Keep dataset order.
    #[default]
    None,
    /// Shuffle with a deterministic seed (mixed with the epoch index).
    Seeded(u64),
}

#[derive(Debug, Clone)]
pub struct Dataset {
    inputs: Matrix,
    targets: Matrix,
}

impl Dataset {
    /// Build from column-per-sample matrices with the same number of columns.
    pub fn from_matrices(inputs: Matrix, targets: Matrix) -> Result<Self> {
        if inputs.cols() != targets.cols() {
            return Err(Error::InvalidData(format!(
                "inputs have {} samples but targets have {}",
                inputs.cols(),
                targets.cols()
            )));
        }
        if inputs.rows() == 0 || targets.rows() == 0 {
            return Err(Error::InvalidData(
                "input and target features must be > 0".to_owned(),
            ));
        }
        Ok(Self { inputs, targets })
    }

    /// Build from per-sample rows (`inputs[i]` and `targets[i]` describe sample `i`).
    ///
    /// This is a convenience constructor (it transposes into column storage).
    pub fn from_samples(inputs: &[Vec<f64>], targets: &[Vec<f64>]) -> Result<Self> {
        if inputs.len() != targets.len() {
            return Err(Error::InvalidData(format!(
                "inputs/targets length mismatch: {} vs {}",
                inputs.len(),
                targets.len()
            )));
        }
        let inputs = columns_from_samples(inputs, "input")?;
        let targets = columns_from_samples(targets, "target")?;
        Self::from_matrices(inputs, targets)
    }

    /// Build a classification dataset from IDX tensors.
    ///
    /// Pixels are scaled from `[0, 255]` to `[0, 1]`; labels are one-hot encoded
    /// over `num_classes`.
    pub fn from_idx(images: &IdxImages, labels: &IdxLabels, num_classes: usize) -> Result<Self> {
        if images.count != labels.count() {
            return Err(Error::InvalidData(format!(
                "{} images but {} labels",
                images.count,
                labels.count()
            )));
        }
        let expected = images
            .count
            .checked_mul(images.image_len())
            .ok_or_else(|| Error::InvalidData("image tensor is too large".to_owned()))?;
        if images.data.len() != expected {
            return Err(Error::InvalidData(format!(
                "image tensor ({}, {}, {}) needs {expected} bytes, found {}",
                images.count,
                images.rows,
                images.cols,
                images.data.len()
            )));
        }
        let inputs = normalize_images(images);
        let targets = one_hot(&labels.data, num_classes)?;
        Self::from_matrices(inputs, targets)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inputs.cols()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn input_features(&self) -> usize {
        self.inputs.rows()
    }

    #[inline]
    pub fn target_features(&self) -> usize {
        self.targets.rows()
    }

    #[inline]
    pub fn inputs(&self) -> &Matrix {
        &self.inputs
    }

    #[inline]
    pub fn targets(&self) -> &Matrix {
        &self.targets
    }

    /// Keep only the first `n` samples.
    pub fn truncate(&self, n: usize) -> Dataset {
        let n = n.min(self.len());
        let idx: Vec<usize> = (0..n).collect();
        let (inputs, targets) = self.gather(&idx);
        Dataset { inputs, targets }
    }

    /// Sample order for one epoch.
    pub fn epoch_order(&self, shuffle: Shuffle, epoch: u64) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        if let Shuffle::Seeded(seed) = shuffle {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(epoch));
            order.shuffle(&mut rng);
        }
        order
    }

    /// Split one epoch into `(x, y)` batches of at most `batch_size` columns.
    ///
    /// The final batch is shorter when `len` is not a multiple of `batch_size`.
    pub fn batches(&self, batch_size: usize, shuffle: Shuffle, epoch: u64) -> Vec<(Matrix, Matrix)> {
        assert!(batch_size > 0, "batch_size must be > 0");
        self.epoch_order(shuffle, epoch)
            .chunks(batch_size)
            .map(|idx| self.gather(idx))
            .collect()
    }

    /// Gather the given sample columns into a batch.
    pub fn gather(&self, indices: &[usize]) -> (Matrix, Matrix) {
        (
            gather_columns(&self.inputs, indices),
            gather_columns(&self.targets, indices),
        )
    }
}

fn columns_from_samples(samples: &[Vec<f64>], what: &str) -> Result<Matrix> {
    let features = samples.first().map(Vec::len).unwrap_or(0);
    if features == 0 {
        return Err(Error::InvalidData(format!("{what} features must be > 0")));
    }
    let mut m = Matrix::zeros(features, samples.len());
    for (c, sample) in samples.iter().enumerate() {
        if sample.len() != features {
            return Err(Error::InvalidData(format!(
                "{what} sample {c} has len {}, expected {features}",
                sample.len()
            )));
        }
        for (r, &v) in sample.iter().enumerate() {
            m[(r, c)] = v;
        }
    }
    Ok(m)
}

fn gather_columns(src: &Matrix, indices: &[usize]) -> Matrix {
    let mut out = Matrix::zeros(src.rows(), indices.len());
    for (dst_c, &src_c) in indices.iter().enumerate() {
        for r in 0..src.rows() {
            out[(r, dst_c)] = src[(r, src_c)];
        }
    }
    out
}

/// One-hot encode labels into a `(num_classes, labels.len())` matrix.
pub fn one_hot(labels: &[u8], num_classes: usize) -> Result<Matrix> {
    if num_classes == 0 {
        return Err(Error::InvalidConfig("num_classes must be > 0".to_owned()));
    }
    let mut y = Matrix::zeros(num_classes, labels.len());
    for (c, &label) in labels.iter().enumerate() {
        let class = label as usize;
        if class >= num_classes {
            return Err(Error::InvalidData(format!(
                "label {label} at sample {c} is out of range for {num_classes} classes"
            )));
        }
        y[(class, c)] = 1.0;
    }
    Ok(y)
}

/// Flatten images into `(rows * cols, count)` with pixels scaled to `[0, 1]`.
pub fn normalize_images(images: &IdxImages) -> Matrix {
    let features = images.image_len();
    let mut x = Matrix::zeros(features, images.count);
    for c in 0..images.count {
        for (r, &px) in images.image(c).iter().enumerate() {
            x[(r, c)] = f64::from(px) / 255.0;
        }
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> Dataset {
        Dataset::from_samples(
            &[vec![0.0, 1.0], vec![2.0, 3.0], vec![4.0, 5.0]],
            &[vec![0.0], vec![1.0], vec![2.0]],
        )
        .unwrap()
    }

    #[test]
    fn samples_become_columns() {
        let d = tiny();
        assert_eq!(d.len(), 3);
        assert_eq!(d.input_features(), 2);
        assert_eq!(d.target_features(), 1);
        assert_eq!(d.inputs().column(1), vec![2.0, 3.0]);
    }

    #[test]
    fn validates_shapes() {
        assert!(Dataset::from_samples(&[vec![1.0]], &[]).is_err());
        assert!(Dataset::from_samples(&[vec![1.0], vec![1.0, 2.0]], &[vec![0.0], vec![0.0]]).is_err());
        assert!(Dataset::from_matrices(Matrix::zeros(2, 3), Matrix::zeros(1, 2)).is_err());
    }

    #[test]
    fn batches_cover_every_sample_once() {
        let d = tiny();
        let batches = d.batches(2, Shuffle::Seeded(9), 0);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].0.shape(), (2, 2));
        assert_eq!(batches[1].0.shape(), (2, 1));

        let mut seen: Vec<f64> = batches
            .iter()
            .flat_map(|(_, y)| y.as_slice().to_vec())
            .collect();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(seen, vec![0.0, 1.0, 2.0]);

        // Inputs and targets stay aligned after shuffling.
        for (x, y) in &batches {
            for c in 0..x.cols() {
                assert_eq!(x[(0, c)], 2.0 * y[(0, c)]);
            }
        }
    }

    #[test]
    fn unshuffled_order_is_identity() {
        assert_eq!(tiny().epoch_order(Shuffle::None, 3), vec![0, 1, 2]);
        let a = tiny().epoch_order(Shuffle::Seeded(1), 0);
        let b = tiny().epoch_order(Shuffle::Seeded(1), 0);
        assert_eq!(a, b);
    }

    #[test]
    fn one_hot_encodes_and_validates() {
        let y = one_hot(&[2, 0], 3).unwrap();
        assert_eq!(y.column(0), vec![0.0, 0.0, 1.0]);
        assert_eq!(y.column(1), vec![1.0, 0.0, 0.0]);
        assert!(one_hot(&[3], 3).is_err());
        assert!(one_hot(&[0], 0).is_err());
    }

    #[test]
    fn idx_tensors_become_normalised_dataset() {
        let images = IdxImages {
            count: 2,
            rows: 1,
            cols: 2,
            data: vec![0, 255, 51, 102],
        };
        let labels = IdxLabels { data: vec![1, 0] };
        let d = Dataset::from_idx(&images, &labels, 2).unwrap();
        assert_eq!(d.inputs().column(0), vec![0.0, 1.0]);
        assert_eq!(d.inputs().column(1), vec![0.2, 0.4]);
        assert_eq!(d.targets().column(0), vec![0.0, 1.0]);

        let short = IdxLabels { data: vec![1] };
        assert!(Dataset::from_idx(&images, &short, 2).is_err());
    }

    #[test]
    fn idx_images_with_missing_pixels_are_rejected() {
        let images = IdxImages {
            count: 2,
            rows: 2,
            cols: 2,
            data: vec![0; 4],
        };
        let labels = IdxLabels { data: vec![0, 1] };
        let err = Dataset::from_idx(&images, &labels, 2).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn truncate_keeps_prefix() {
        let d = tiny().truncate(2);
        assert_eq!(d.len(), 2);
        assert_eq!(d.targets().as_slice(), &[0.0, 1.0]);
        assert_eq!(tiny().truncate(10).len(), 3);
    }
}
