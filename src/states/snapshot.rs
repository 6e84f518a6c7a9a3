//! Immutable state snapshots
//!
//! A snapshot is a copy of the circuit's state taken by
//! [`Circuit::state`](crate::Circuit::state); later circuit operations do
//! not affect it.

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rand::Rng;

use crate::config::Representation;
use crate::error::{check_mode, CvError, Result};
use crate::linalg::{determinant, outer, reduce_ket_to_mode, reduce_to_mode, ModeIndexer, Tolerance};
use crate::states::fock::FockStorage;

/// Snapshot of either representation
#[derive(Debug, Clone)]
pub enum StateSnapshot {
    Gaussian(GaussianSnapshot),
    Fock(FockSnapshot),
}

impl StateSnapshot {
    pub fn representation(&self) -> Representation {
        match self {
            StateSnapshot::Gaussian(_) => Representation::Gaussian,
            StateSnapshot::Fock(s) => Representation::Fock { cutoff: s.cutoff },
        }
    }

    pub fn num_modes(&self) -> usize {
        match self {
            StateSnapshot::Gaussian(s) => s.num_modes(),
            StateSnapshot::Fock(s) => s.num_modes,
        }
    }

    pub fn as_gaussian(&self) -> Option<&GaussianSnapshot> {
        match self {
            StateSnapshot::Gaussian(s) => Some(s),
            StateSnapshot::Fock(_) => None,
        }
    }

    pub fn as_fock(&self) -> Option<&FockSnapshot> {
        match self {
            StateSnapshot::Fock(s) => Some(s),
            StateSnapshot::Gaussian(_) => None,
        }
    }

    /// Full mean vector (Gaussian only).
    pub fn means(&self) -> Result<&Array1<f64>> {
        self.as_gaussian()
            .map(GaussianSnapshot::means)
            .ok_or_else(|| self.unsupported("means"))
    }

    /// Full covariance matrix (Gaussian only).
    pub fn cov(&self) -> Result<&Array2<f64>> {
        self.as_gaussian()
            .map(GaussianSnapshot::cov)
            .ok_or_else(|| self.unsupported("cov"))
    }

    /// State vector of a pure Fock state.
    pub fn ket(&self) -> Result<&Array1<Complex64>> {
        match self {
            StateSnapshot::Fock(s) => s.ket().ok_or_else(|| CvError::unsupported("ket", "mixed Fock")),
            StateSnapshot::Gaussian(_) => Err(self.unsupported("ket")),
        }
    }

    /// Joint density matrix (Fock only).
    pub fn dm(&self) -> Result<Array2<Complex64>> {
        self.as_fock()
            .map(FockSnapshot::dm)
            .ok_or_else(|| self.unsupported("dm"))
    }

    /// Trace of the state; always 1 for Gaussian states.
    pub fn trace(&self) -> f64 {
        match self {
            StateSnapshot::Gaussian(_) => 1.0,
            StateSnapshot::Fock(s) => s.trace(),
        }
    }

    pub fn is_pure(&self) -> bool {
        match self {
            StateSnapshot::Gaussian(s) => s.is_pure(),
            StateSnapshot::Fock(s) => s.is_pure(),
        }
    }

    pub fn purity(&self) -> f64 {
        match self {
            StateSnapshot::Gaussian(s) => s.purity(),
            StateSnapshot::Fock(s) => s.purity(),
        }
    }

    /// Quadrature means `(x, p)` of one mode.
    pub fn reduced_means(&self, mode: usize) -> Result<Array1<f64>> {
        match self {
            StateSnapshot::Gaussian(s) => s.reduced_gaussian(mode).map(|(m, _)| m),
            StateSnapshot::Fock(s) => s.quad_means(mode),
        }
    }

    /// 2×2 quadrature covariance of one mode.
    pub fn reduced_cov(&self, mode: usize) -> Result<Array2<f64>> {
        match self {
            StateSnapshot::Gaussian(s) => s.reduced_gaussian(mode).map(|(_, c)| c),
            StateSnapshot::Fock(s) => s.quad_cov(mode),
        }
    }

    pub fn mean_photon(&self, mode: usize) -> Result<f64> {
        match self {
            StateSnapshot::Gaussian(s) => s.mean_photon(mode),
            StateSnapshot::Fock(s) => s.mean_photon(mode),
        }
    }

    pub fn is_vacuum(&self, tol: f64) -> bool {
        match self {
            StateSnapshot::Gaussian(s) => s.is_vacuum(tol),
            StateSnapshot::Fock(s) => s.is_vacuum(tol),
        }
    }

    fn unsupported(&self, operation: &str) -> CvError {
        let representation = match self {
            StateSnapshot::Gaussian(_) => "Gaussian",
            StateSnapshot::Fock(_) => "Fock",
        };
        CvError::unsupported(operation, representation)
    }
}

/// Copy of a Gaussian state's moments
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianSnapshot {
    means: Array1<f64>,
    cov: Array2<f64>,
    hbar: f64,
    tolerance: Tolerance,
}

impl GaussianSnapshot {
    pub(crate) fn new(means: Array1<f64>, cov: Array2<f64>, hbar: f64, tolerance: Tolerance) -> Self {
        GaussianSnapshot {
            means,
            cov,
            hbar,
            tolerance,
        }
    }

    pub fn num_modes(&self) -> usize {
        self.means.len() / 2
    }

    pub fn means(&self) -> &Array1<f64> {
        &self.means
    }

    pub fn cov(&self) -> &Array2<f64> {
        &self.cov
    }

    pub fn hbar(&self) -> f64 {
        self.hbar
    }

    /// Means and covariance of a single mode.
    pub fn reduced_gaussian(&self, mode: usize) -> Result<(Array1<f64>, Array2<f64>)> {
        check_mode(mode, self.num_modes())?;
        let i = 2 * mode;
        let means = Array1::from(vec![self.means[i], self.means[i + 1]]);
        let cov = Array2::from_shape_fn((2, 2), |(a, b)| self.cov[[i + a, i + b]]);
        Ok((means, cov))
    }

    /// `(ħ/2)^N / sqrt(det V)`
    pub fn purity(&self) -> f64 {
        let det = determinant(&self.cov);
        (self.hbar / 2.0).powi(self.num_modes() as i32) / det.sqrt()
    }

    pub fn is_pure(&self) -> bool {
        self.tolerance.all_close(&self.purity(), &1.0)
    }

    /// `⟨n⟩ = (Tr V + |μ|²) / (2ħ) − 1/2` for one mode.
    pub fn mean_photon(&self, mode: usize) -> Result<f64> {
        let (means, cov) = self.reduced_gaussian(mode)?;
        Ok((cov[[0, 0]] + cov[[1, 1]] + means.dot(&means)) / (2.0 * self.hbar) - 0.5)
    }

    pub fn is_vacuum(&self, tol: f64) -> bool {
        let tol = Tolerance::absolute(tol);
        let dim = self.means.len();
        tol.all_close(&self.means, &Array1::zeros(dim))
            && tol.all_close(&self.cov, &(Array2::eye(dim) * (self.hbar / 2.0)))
    }
}

/// Copy of a Fock state
#[derive(Debug, Clone, PartialEq)]
pub struct FockSnapshot {
    num_modes: usize,
    cutoff: usize,
    hbar: f64,
    storage: FockStorage,
}

impl FockSnapshot {
    pub(crate) fn new(num_modes: usize, cutoff: usize, hbar: f64, storage: FockStorage) -> Self {
        FockSnapshot {
            num_modes,
            cutoff,
            hbar,
            storage,
        }
    }

    pub fn num_modes(&self) -> usize {
        self.num_modes
    }

    pub fn cutoff(&self) -> usize {
        self.cutoff
    }

    pub fn is_pure(&self) -> bool {
        matches!(self.storage, FockStorage::Pure(_))
    }

    pub fn ket(&self) -> Option<&Array1<Complex64>> {
        match &self.storage {
            FockStorage::Pure(psi) => Some(psi),
            FockStorage::Mixed(_) => None,
        }
    }

    pub fn dm(&self) -> Array2<Complex64> {
        match &self.storage {
            FockStorage::Pure(psi) => outer(psi),
            FockStorage::Mixed(rho) => rho.clone(),
        }
    }

    pub fn trace(&self) -> f64 {
        self.storage.trace()
    }

    /// `Tr ρ²`
    pub fn purity(&self) -> f64 {
        match &self.storage {
            FockStorage::Pure(_) => self.trace().powi(2),
            FockStorage::Mixed(rho) => rho.iter().map(|v| v.norm_sqr()).sum(),
        }
    }

    /// Reduced density matrix of one mode.
    pub fn reduced_dm(&self, mode: usize) -> Result<Array2<Complex64>> {
        check_mode(mode, self.num_modes)?;
        let idx = ModeIndexer::new(self.num_modes, self.cutoff, mode);
        Ok(match &self.storage {
            FockStorage::Pure(psi) => reduce_ket_to_mode(psi, &idx),
            FockStorage::Mixed(rho) => reduce_to_mode(rho, &idx),
        })
    }

    /// Probability of the joint photon-number pattern `n`.
    pub fn fock_prob(&self, n: &[usize]) -> Result<f64> {
        if n.len() != self.num_modes {
            return Err(CvError::invalid_parameter(
                "n",
                format!("expected {} photon numbers, got {}", self.num_modes, n.len()),
            ));
        }
        if let Some(&bad) = n.iter().find(|&&k| k >= self.cutoff) {
            return Err(CvError::invalid_parameter(
                "n",
                format!("photon number {} is outside cutoff {}", bad, self.cutoff),
            ));
        }
        let index = n.iter().fold(0, |acc, &k| acc * self.cutoff + k);
        Ok(match &self.storage {
            FockStorage::Pure(psi) => psi[index].norm_sqr(),
            FockStorage::Mixed(rho) => rho[[index, index]].re,
        })
    }

    pub fn mean_photon(&self, mode: usize) -> Result<f64> {
        let sigma = self.reduced_dm(mode)?;
        Ok((0..self.cutoff).map(|n| n as f64 * sigma[[n, n]].re).sum())
    }

    /// Quadrature means from `⟨a⟩`.
    pub fn quad_means(&self, mode: usize) -> Result<Array1<f64>> {
        let sigma = self.reduced_dm(mode)?;
        let a = expect_a(&sigma);
        let scale = (2.0 * self.hbar).sqrt();
        Ok(Array1::from(vec![scale * a.re, scale * a.im]))
    }

    /// Quadrature covariance from `⟨a⟩`, `⟨a²⟩` and `⟨a†a⟩`.
    pub fn quad_cov(&self, mode: usize) -> Result<Array2<f64>> {
        let sigma = self.reduced_dm(mode)?;
        let a = expect_a(&sigma);
        let a2 = expect_a_squared(&sigma);
        let n: f64 = (0..self.cutoff).map(|k| k as f64 * sigma[[k, k]].re).sum();

        let half = self.hbar / 2.0;
        let scale = (2.0 * self.hbar).sqrt();
        let (x, p) = (scale * a.re, scale * a.im);

        let xx = half * (1.0 + 2.0 * n + 2.0 * a2.re) - x * x;
        let pp = half * (1.0 + 2.0 * n - 2.0 * a2.re) - p * p;
        let xp = self.hbar * a2.im - x * p;
        Array2::from_shape_vec((2, 2), vec![xx, xp, xp, pp])
            .map_err(|e| CvError::numerical(e.to_string()))
    }

    /// Draw a photon number for one mode from its (renormalised) distribution.
    pub fn sample_photon_number<R: Rng>(&self, mode: usize, rng: &mut R) -> Result<usize> {
        let sigma = self.reduced_dm(mode)?;
        let probs: Vec<f64> = (0..self.cutoff).map(|n| sigma[[n, n]].re.max(0.0)).collect();
        let total: f64 = probs.iter().sum();
        if !(total > 0.0) {
            return Err(CvError::numerical("photon-number distribution has no weight"));
        }

        let mut u = rng.gen::<f64>() * total;
        for (n, p) in probs.iter().enumerate() {
            if u < *p {
                return Ok(n);
            }
            u -= p;
        }
        Ok(probs.iter().rposition(|&p| p > 0.0).unwrap_or(0))
    }

    /// Vacuum population within `tol` of one.
    pub fn is_vacuum(&self, tol: f64) -> bool {
        (self.storage.vacuum_population() - 1.0).abs() <= tol
    }
}

/// `⟨a⟩ = Σ √n ρ[n, n−1]`
fn expect_a(sigma: &Array2<Complex64>) -> Complex64 {
    (1..sigma.nrows())
        .map(|n| (n as f64).sqrt() * sigma[[n, n - 1]])
        .sum()
}

/// `⟨a²⟩ = Σ √(n(n−1)) ρ[n, n−2]`
fn expect_a_squared(sigma: &Array2<Complex64>) -> Complex64 {
    (2..sigma.nrows())
        .map(|n| ((n * (n - 1)) as f64).sqrt() * sigma[[n, n - 2]])
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{displacement_matrix, squeeze_matrix};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pure(psi: Array1<Complex64>) -> FockSnapshot {
        let cutoff = psi.len();
        FockSnapshot::new(1, cutoff, 2.0, FockStorage::Pure(psi))
    }

    #[test]
    fn test_coherent_quadratures() {
        let alpha = Complex64::new(0.4, -0.2);
        let snap = pure(displacement_matrix(alpha, 20).column(0).to_owned());

        let means = snap.quad_means(0).unwrap();
        assert!((means[0] - 2.0 * 0.4).abs() < 1e-9);
        assert!((means[1] + 2.0 * 0.2).abs() < 1e-9);

        let cov = snap.quad_cov(0).unwrap();
        assert!(Tolerance::absolute(1e-9).all_close(&cov, &Array2::eye(2)));
        assert!((snap.mean_photon(0).unwrap() - alpha.norm_sqr()).abs() < 1e-9);
    }

    #[test]
    fn test_squeezed_quadratures() {
        let r = 0.3;
        let snap = pure(squeeze_matrix(r, 0.0, 30).column(0).to_owned());
        let cov = snap.quad_cov(0).unwrap();
        assert!((cov[[0, 0]] - (-2.0 * r).exp()).abs() < 1e-8);
        assert!((cov[[1, 1]] - (2.0 * r).exp()).abs() < 1e-8);
        assert!(cov[[0, 1]].abs() < 1e-8);
    }

    #[test]
    fn test_fock_prob_and_sampling() {
        let mut psi = Array1::zeros(4);
        psi[2] = Complex64::new(1.0, 0.0);
        let snap = pure(psi);
        assert_eq!(snap.fock_prob(&[2]).unwrap(), 1.0);
        assert!(snap.fock_prob(&[4]).is_err());
        assert!(snap.fock_prob(&[1, 1]).is_err());

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            assert_eq!(snap.sample_photon_number(0, &mut rng).unwrap(), 2);
        }
    }

    #[test]
    fn test_gaussian_snapshot_queries() {
        let snap = GaussianSnapshot::new(
            Array1::from(vec![2.0, 0.0]),
            Array2::eye(2) * 3.0,
            2.0,
            Tolerance::default(),
        );
        assert!((snap.purity() - 1.0 / 3.0).abs() < 1e-12);
        assert!(!snap.is_pure());
        // Thermal nbar = 1 plus |alpha|^2 = 1
        assert!((snap.mean_photon(0).unwrap() - 2.0).abs() < 1e-12);
        assert!(snap.reduced_gaussian(1).is_err());
    }
}
