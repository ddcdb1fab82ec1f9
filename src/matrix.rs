//! Dense, row-major `f64` matrices.
//!
//! `Matrix` is the only numeric container in the crate. Layers store weights
//! `(out, in)` and biases `(out, 1)`; batches are stored column-per-sample, so an
//! input batch has shape `(features, batch)`.
//!
//! Arithmetic follows a "fresh value" convention: `multiply`, `hadamard`,
//! `scale` and `row_sum` return newly allocated matrices and never alias their
//! operands. Only `subtract_in_place`, `fill` and `fill_random_uniform` mutate.
//!
//! Shape mismatches are programmer errors and panic via `assert!`.

use std::fmt;
use std::ops::{Index, IndexMut};

use rand::Rng;

use crate::matmul::gemm_f64;
use crate::{Error, Result};

/// Which operands of [`Matrix::multiply`] are logically transposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transpose {
    #[default]
    None,
    /// `op(A) = Aᵗ`.
    A,
    /// `op(B) = Bᵗ`.
    B,
    /// Both operands transposed.
    Both,
}

impl Transpose {
    #[inline]
    fn a(self) -> bool {
        matches!(self, Transpose::A | Transpose::Both)
    }

    #[inline]
    fn b(self) -> bool {
        matches!(self, Transpose::B | Transpose::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// A `0 x 0` matrix with no backing buffer.
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0.0)
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        let len = rows * cols;
        let data = if len == 0 { Vec::new() } else { vec![value; len] };
        Self { rows, cols, data }
    }

    /// Build from a row-major buffer; `data.len()` must equal `rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidShape(format!(
                "buffer of len {} cannot back a ({rows}, {cols}) matrix",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from per-row vectors (copies into contiguous storage).
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(Error::InvalidShape(format!(
                    "row {i} has len {}, expected {cols}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Self::from_vec(rows.len(), cols, data)
    }

    /// A matrix filled uniformly from `[lo, hi)`.
    pub fn random_uniform<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        lo: f64,
        hi: f64,
        rng: &mut R,
    ) -> Self {
        let mut m = Self::zeros(rows, cols);
        m.fill_random_uniform(lo, hi, rng);
        m
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when either dimension is zero (no backing buffer).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    #[inline]
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self[(row, col)]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self[(row, col)] = value;
    }

    /// Copy of column `col` (one sample of a batch).
    pub fn column(&self, col: usize) -> Vec<f64> {
        assert!(
            col < self.cols,
            "column {col} out of range for {} columns",
            self.cols
        );
        (0..self.rows).map(|r| self.data[r * self.cols + col]).collect()
    }

    /// Apply `f` element-wise into a new matrix.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// `alpha * op(A) * op(B) + beta * C`, returned as a new matrix.
    ///
    /// `c` only provides the additive term and the output shape; it is not
    /// modified. Shape contract:
    /// - `op(A).cols == op(B).rows`
    /// - `c.shape() == (op(A).rows, op(B).cols)`
    pub fn multiply(
        a: &Matrix,
        b: &Matrix,
        c: &Matrix,
        alpha: f64,
        beta: f64,
        mode: Transpose,
    ) -> Matrix {
        let (m, k, rsa, csa) = if mode.a() {
            (a.cols, a.rows, 1, a.cols)
        } else {
            (a.rows, a.cols, a.cols, 1)
        };
        let (kb, n, rsb, csb) = if mode.b() {
            (b.cols, b.rows, 1, b.cols)
        } else {
            (b.rows, b.cols, b.cols, 1)
        };

        assert_eq!(
            k, kb,
            "inner dimensions do not match: op(A) is ({m}, {k}), op(B) is ({kb}, {n}) [{mode:?}]"
        );
        assert_eq!(
            c.shape(),
            (m, n),
            "C has shape {:?}, expected ({m}, {n}) [{mode:?}]",
            c.shape()
        );

        let mut out = c.clone();
        gemm_f64(
            m,
            n,
            k,
            alpha,
            &a.data,
            rsa,
            csa,
            &b.data,
            rsb,
            csb,
            beta,
            &mut out.data,
            n,
            1,
        );
        out
    }

    /// `alpha * A * x + beta * bias`, with the single-column `bias` broadcast
    /// across every column of the result.
    pub fn multiply_bias_broadcast(
        a: &Matrix,
        x: &Matrix,
        bias: &Matrix,
        alpha: f64,
        beta: f64,
    ) -> Matrix {
        assert_eq!(
            a.cols, x.rows,
            "A has {} cols but x has {} rows",
            a.cols, x.rows
        );
        assert_eq!(
            bias.shape(),
            (a.rows, 1),
            "bias has shape {:?}, expected ({}, 1)",
            bias.shape(),
            a.rows
        );

        let seed = Matrix::zeros(a.rows, x.cols);
        let mut out = Matrix::multiply(a, x, &seed, alpha, 0.0, Transpose::None);
        let cols = out.cols;
        if cols > 0 {
            for (row, &b) in out.data.chunks_exact_mut(cols).zip(&bias.data) {
                for v in row {
                    *v += beta * b;
                }
            }
        }
        out
    }

    /// Element-wise product.
    pub fn hadamard(a: &Matrix, b: &Matrix) -> Matrix {
        assert_same_shape(a, b, "hadamard");
        Matrix {
            rows: a.rows,
            cols: a.cols,
            data: a.data.iter().zip(&b.data).map(|(x, y)| x * y).collect(),
        }
    }

    /// `self <- self - other`.
    pub fn subtract_in_place(&mut self, other: &Matrix) {
        assert_same_shape(self, other, "subtract");
        for (x, y) in self.data.iter_mut().zip(&other.data) {
            *x -= y;
        }
    }

    /// Element-wise difference `a - b` as a new matrix.
    pub fn difference(a: &Matrix, b: &Matrix) -> Matrix {
        let mut out = a.clone();
        out.subtract_in_place(b);
        out
    }

    /// Copy of `self` scaled by `k`.
    pub fn scale(&self, k: f64) -> Matrix {
        self.map(|v| v * k)
    }

    /// Sum each row across all columns; shape `(rows, 1)`.
    pub fn row_sum(&self) -> Matrix {
        let mut out = Matrix::zeros(self.rows, 1);
        if self.cols > 0 {
            for (dst, row) in out.data.iter_mut().zip(self.data.chunks_exact(self.cols)) {
                *dst = row.iter().sum();
            }
        }
        out
    }

    /// Overwrite every entry with a uniform sample from `[lo, hi)`.
    ///
    /// `lo == hi` fills the constant `lo`.
    pub fn fill_random_uniform<R: Rng + ?Sized>(&mut self, lo: f64, hi: f64, rng: &mut R) {
        assert!(
            lo.is_finite() && hi.is_finite() && lo <= hi,
            "invalid uniform range [{lo}, {hi})"
        );
        if lo == hi {
            self.fill(lo);
            return;
        }
        for v in &mut self.data {
            *v = rng.gen_range(lo..hi);
        }
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }
}

#[inline]
fn assert_same_shape(a: &Matrix, b: &Matrix, op: &str) {
    assert_eq!(
        a.shape(),
        b.shape(),
        "{op}: shape {:?} does not match {:?}",
        a.shape(),
        b.shape()
    );
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        assert!(
            row < self.rows && col < self.cols,
            "index ({row}, {col}) out of bounds for shape ({}, {})",
            self.rows,
            self.cols
        );
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        assert!(
            row < self.rows && col < self.cols,
            "index ({row}, {col}) out of bounds for shape ({}, {})",
            self.rows,
            self.cols
        );
        &mut self.data[row * self.cols + col]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "({}, {})", self.rows, self.cols)?;
        if self.cols == 0 {
            return Ok(());
        }
        for row in self.data.chunks_exact(self.cols) {
            let cells: Vec<String> = row.iter().map(|v| format!("{v:.6}")).collect();
            writeln!(f, "[{}]", cells.join(", "))?;
        }
        Ok(())
    }
}
