//! Dense linear algebra used by both representations
//!
//! This module collects the numerical kernel shared by the Gaussian and Fock
//! states: tolerance-based comparison, combinatorial helpers, Cholesky and LU
//! factorisations, and the index bookkeeping needed to act with a single-mode
//! operator on one factor of a multi-mode Fock space.

use ndarray::{Array1, Array2, ArrayBase, Data, Dimension, Zip};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Absolute/relative tolerance pair with numpy `allclose` semantics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Absolute tolerance.
    pub atol: f64,
    /// Relative tolerance, scaled by the magnitude of the reference value.
    pub rtol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            atol: 1e-8,
            rtol: 1e-6,
        }
    }
}

impl Tolerance {
    /// Create a tolerance from both components.
    pub fn new(atol: f64, rtol: f64) -> Self {
        Self { atol, rtol }
    }

    /// A purely absolute tolerance.
    pub fn absolute(atol: f64) -> Self {
        Self { atol, rtol: 0.0 }
    }

    /// True when `|a - b| <= atol + rtol * |b|`.
    pub fn close(&self, diff: f64, reference: f64) -> bool {
        diff <= self.atol + self.rtol * reference
    }

    /// Compare any two values implementing [`ApproxEq`].
    pub fn all_close<T, U>(&self, a: &T, b: &U) -> bool
    where
        T: ApproxEq<U> + ?Sized,
        U: ?Sized,
    {
        a.approx_eq(b, self)
    }
}

/// Approximate equality under a [`Tolerance`].
pub trait ApproxEq<Rhs: ?Sized = Self> {
    fn approx_eq(&self, other: &Rhs, tol: &Tolerance) -> bool;
}

impl ApproxEq for f64 {
    fn approx_eq(&self, other: &f64, tol: &Tolerance) -> bool {
        tol.close((self - other).abs(), other.abs())
    }
}

impl ApproxEq for Complex64 {
    fn approx_eq(&self, other: &Complex64, tol: &Tolerance) -> bool {
        tol.close((self - other).norm(), other.norm())
    }
}

impl<A, S1, S2, D> ApproxEq<ArrayBase<S2, D>> for ArrayBase<S1, D>
where
    A: ApproxEq,
    S1: Data<Elem = A>,
    S2: Data<Elem = A>,
    D: Dimension,
{
    fn approx_eq(&self, other: &ArrayBase<S2, D>, tol: &Tolerance) -> bool {
        if self.shape() != other.shape() {
            return false;
        }
        Zip::from(self)
            .and(other)
            .fold(true, |acc, a, b| acc && a.approx_eq(b, tol))
    }
}

/// n! as a float.
pub fn factorial(n: usize) -> f64 {
    (1..=n).fold(1.0, |acc, k| acc * k as f64)
}

/// Binomial coefficient C(n, k) as a float, zero when k > n.
pub fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (1..=k).fold(1.0, |acc, i| acc * (n - k + i) as f64 / i as f64)
}

/// Conjugate transpose, always in standard layout.
pub fn dagger(m: &Array2<Complex64>) -> Array2<Complex64> {
    let (rows, cols) = m.dim();
    Array2::from_shape_fn((cols, rows), |(i, j)| m[[j, i]].conj())
}

/// Projector |ψ⟩⟨ψ|.
pub fn outer(psi: &Array1<Complex64>) -> Array2<Complex64> {
    let dim = psi.len();
    Array2::from_shape_fn((dim, dim), |(i, j)| psi[i] * psi[j].conj())
}

/// Identity matrix with complex entries.
pub fn complex_eye(dim: usize) -> Array2<Complex64> {
    Array2::from_diag(&Array1::from_elem(dim, Complex64::new(1.0, 0.0)))
}

/// Symplectic form Ω for `num_modes` modes in (x, p) per-mode ordering.
pub fn symplectic_form(num_modes: usize) -> Array2<f64> {
    let mut omega = Array2::zeros((2 * num_modes, 2 * num_modes));
    for k in 0..num_modes {
        omega[[2 * k, 2 * k + 1]] = 1.0;
        omega[[2 * k + 1, 2 * k]] = -1.0;
    }
    omega
}

/// Cholesky factor of a Hermitian matrix, `None` when a pivot is not positive.
pub fn cholesky_hermitian(a: &Array2<Complex64>) -> Option<Array2<Complex64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return None;
    }

    let mut l: Array2<Complex64> = Array2::zeros((n, n));
    for j in 0..n {
        let mut pivot = a[[j, j]].re;
        for k in 0..j {
            pivot -= l[[j, k]].norm_sqr();
        }
        if !(pivot > 0.0) {
            return None;
        }
        let diag = pivot.sqrt();
        l[[j, j]] = Complex64::new(diag, 0.0);

        for i in (j + 1)..n {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]].conj();
            }
            l[[i, j]] = sum / diag;
        }
    }
    Some(l)
}

/// PSD test: the matrix shifted by `shift * I` must admit a Cholesky factor.
pub fn is_positive_semidefinite(a: &Array2<Complex64>, shift: f64) -> bool {
    let shifted = a + &(complex_eye(a.nrows()) * Complex64::new(shift, 0.0));
    cholesky_hermitian(&shifted).is_some()
}

/// Determinant by LU decomposition with partial pivoting.
pub fn determinant(a: &Array2<f64>) -> f64 {
    let n = a.nrows();
    let mut lu = a.to_owned();
    let mut det = 1.0;

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| lu[[i, col]].abs().total_cmp(&lu[[j, col]].abs()))
            .unwrap_or(col);
        let pivot = lu[[pivot_row, col]];
        if pivot == 0.0 {
            return 0.0;
        }
        if pivot_row != col {
            for k in 0..n {
                lu.swap([col, k], [pivot_row, k]);
            }
            det = -det;
        }
        det *= pivot;

        for row in (col + 1)..n {
            let factor = lu[[row, col]] / pivot;
            for k in col..n {
                let v = lu[[col, k]];
                lu[[row, k]] -= factor * v;
            }
        }
    }
    det
}

/// Index bookkeeping for one mode of an N-mode Fock space.
///
/// A flat basis index is split into `(left, n, right)` where `n` is the photon
/// number of the target mode and `left`/`right` enumerate the modes before and
/// after it. Mode 0 is the most significant digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeIndexer {
    pub left: usize,
    pub cutoff: usize,
    pub right: usize,
}

impl ModeIndexer {
    pub fn new(num_modes: usize, cutoff: usize, mode: usize) -> Self {
        ModeIndexer {
            left: cutoff.pow(mode as u32),
            cutoff,
            right: cutoff.pow((num_modes - 1 - mode) as u32),
        }
    }

    /// Dimension of the full space.
    pub fn dim(&self) -> usize {
        self.left * self.cutoff * self.right
    }

    #[inline]
    pub fn join(&self, l: usize, n: usize, r: usize) -> usize {
        (l * self.cutoff + n) * self.right + r
    }
}

/// (1 ⊗ op ⊗ 1)|ψ⟩
pub fn apply_to_ket(
    psi: &Array1<Complex64>,
    op: &Array2<Complex64>,
    idx: &ModeIndexer,
) -> Array1<Complex64> {
    let zero = Complex64::new(0.0, 0.0);
    let mut out = Array1::zeros(psi.len());
    for l in 0..idx.left {
        for r in 0..idx.right {
            for a in 0..idx.cutoff {
                let mut acc = zero;
                for n in 0..idx.cutoff {
                    acc += op[[a, n]] * psi[idx.join(l, n, r)];
                }
                out[idx.join(l, a, r)] = acc;
            }
        }
    }
    out
}

/// (1 ⊗ op ⊗ 1) ρ
pub fn apply_to_rows(
    rho: &Array2<Complex64>,
    op: &Array2<Complex64>,
    idx: &ModeIndexer,
) -> Array2<Complex64> {
    let zero = Complex64::new(0.0, 0.0);
    let mut out = Array2::zeros(rho.dim());
    for l in 0..idx.left {
        for r in 0..idx.right {
            for a in 0..idx.cutoff {
                let dst = idx.join(l, a, r);
                for n in 0..idx.cutoff {
                    let u = op[[a, n]];
                    if u == zero {
                        continue;
                    }
                    out.row_mut(dst).scaled_add(u, &rho.row(idx.join(l, n, r)));
                }
            }
        }
    }
    out
}

/// ρ (1 ⊗ op ⊗ 1)†
pub fn apply_to_cols(
    rho: &Array2<Complex64>,
    op: &Array2<Complex64>,
    idx: &ModeIndexer,
) -> Array2<Complex64> {
    let zero = Complex64::new(0.0, 0.0);
    let mut out = Array2::zeros(rho.dim());
    for l in 0..idx.left {
        for r in 0..idx.right {
            for b in 0..idx.cutoff {
                let dst = idx.join(l, b, r);
                for m in 0..idx.cutoff {
                    let u = op[[b, m]];
                    if u == zero {
                        continue;
                    }
                    out.column_mut(dst)
                        .scaled_add(u.conj(), &rho.column(idx.join(l, m, r)));
                }
            }
        }
    }
    out
}

/// K ρ K† with K acting on one mode.
pub fn sandwich(
    rho: &Array2<Complex64>,
    op: &Array2<Complex64>,
    idx: &ModeIndexer,
) -> Array2<Complex64> {
    apply_to_cols(&apply_to_rows(rho, op, idx), op, idx)
}

/// Reduced density matrix of the indexed mode.
pub fn reduce_to_mode(rho: &Array2<Complex64>, idx: &ModeIndexer) -> Array2<Complex64> {
    let mut sigma = Array2::zeros((idx.cutoff, idx.cutoff));
    for l in 0..idx.left {
        for r in 0..idx.right {
            for a in 0..idx.cutoff {
                for b in 0..idx.cutoff {
                    sigma[[a, b]] += rho[[idx.join(l, a, r), idx.join(l, b, r)]];
                }
            }
        }
    }
    sigma
}

/// Reduced density matrix of the indexed mode of a pure state.
pub fn reduce_ket_to_mode(psi: &Array1<Complex64>, idx: &ModeIndexer) -> Array2<Complex64> {
    let mut sigma = Array2::zeros((idx.cutoff, idx.cutoff));
    for l in 0..idx.left {
        for r in 0..idx.right {
            for a in 0..idx.cutoff {
                let amp = psi[idx.join(l, a, r)];
                for b in 0..idx.cutoff {
                    sigma[[a, b]] += amp * psi[idx.join(l, b, r)].conj();
                }
            }
        }
    }
    sigma
}

/// Tr_mode(ρ) ⊗ σ, with σ placed back at the indexed mode.
pub fn replace_mode(
    rho: &Array2<Complex64>,
    sigma: &Array2<Complex64>,
    idx: &ModeIndexer,
) -> Array2<Complex64> {
    let zero = Complex64::new(0.0, 0.0);
    let mut out = Array2::zeros(rho.dim());
    for l in 0..idx.left {
        for r in 0..idx.right {
            for l2 in 0..idx.left {
                for r2 in 0..idx.right {
                    let mut rest = zero;
                    for n in 0..idx.cutoff {
                        rest += rho[[idx.join(l, n, r), idx.join(l2, n, r2)]];
                    }
                    if rest == zero {
                        continue;
                    }
                    for a in 0..idx.cutoff {
                        for b in 0..idx.cutoff {
                            out[[idx.join(l, a, r), idx.join(l2, b, r2)]] = rest * sigma[[a, b]];
                        }
                    }
                }
            }
        }
    }
    out
}
