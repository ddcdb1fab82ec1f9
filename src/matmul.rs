//! Small GEMM wrapper used by the matrix primitives.
//!
//! Every multiply in the crate funnels through [`gemm_f64`]:
//! - default: a simple, safe triple-loop implementation
//! - optional: a faster backend via the `matrixmultiply` feature
//!
//! Transposed operands are expressed through strides only, so callers never
//! materialise a transposed copy.

/// `C = alpha * A * B + beta * C` over strided, row- or column-major views.
///
/// `A` is `m x k`, `B` is `k x n`, `C` is `m x n`. Element `(i, j)` of a view
/// with strides `(rs, cs)` lives at `i * rs + j * cs`.
#[allow(clippy::too_many_arguments)]
#[inline]
pub(crate) fn gemm_f64(
    m: usize,
    n: usize,
    k: usize,
    alpha: f64,
    a: &[f64],
    rsa: usize,
    csa: usize,
    b: &[f64],
    rsb: usize,
    csb: usize,
    beta: f64,
    c: &mut [f64],
    rsc: usize,
    csc: usize,
) {
    if m == 0 || n == 0 {
        return;
    }
    if k == 0 {
        // Empty inner dimension: the product term vanishes.
        for i in 0..m {
            for j in 0..n {
                let idx = i * rsc + j * csc;
                c[idx] = if beta == 0.0 { 0.0 } else { c[idx] * beta };
            }
        }
        return;
    }

    debug_assert!(a.len() > (m - 1) * rsa + (k - 1) * csa);
    debug_assert!(b.len() > (k - 1) * rsb + (n - 1) * csb);
    debug_assert!(c.len() > (m - 1) * rsc + (n - 1) * csc);

    #[cfg(feature = "matrixmultiply")]
    {
        // matrixmultiply supports arbitrary strides.
        // SAFETY: the debug assertions above describe the bounds every caller in
        // `matrix.rs` establishes with hard asserts before calling in.
        unsafe {
            matrixmultiply::dgemm(
                m,
                k,
                n,
                alpha,
                a.as_ptr(),
                rsa as isize,
                csa as isize,
                b.as_ptr(),
                rsb as isize,
                csb as isize,
                beta,
                c.as_mut_ptr(),
                rsc as isize,
                csc as isize,
            );
        }
    }

    #[cfg(not(feature = "matrixmultiply"))]
    for i in 0..m {
        let a0 = i * rsa;
        for j in 0..n {
            let b0 = j * csb;
            let mut acc = 0.0_f64;
            for p in 0..k {
                acc = a[a0 + p * csa].mul_add(b[p * rsb + b0], acc);
            }

            let idx = i * rsc + j * csc;
            // beta == 0 must not propagate NaN/inf already sitting in C.
            c[idx] = if beta == 0.0 {
                alpha * acc
            } else {
                alpha * acc + beta * c[idx]
            };
        }
    }
}
