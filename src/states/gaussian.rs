//! Gaussian state representation
//!
//! A Gaussian state of N modes is fully described by its mean vector
//! (length 2N) and covariance matrix (2N × 2N), both in per-mode
//! `(x_0, p_0, x_1, p_1, …)` ordering. Vacuum has zero means and covariance
//! `(ħ/2) I`.

use std::fmt::{self, Display};

use ndarray::{s, Array1, Array2};
use num_complex::Complex64;
use tracing::debug;

use crate::channels::{Channel, GaussianMap, Preparation};
use crate::config::{Representation, SimulatorConfig};
use crate::error::{check_mode, CvError, Result};
use crate::linalg::{is_positive_semidefinite, symplectic_form, Tolerance};
use crate::states::snapshot::{GaussianSnapshot, StateSnapshot};
use crate::states::CvState;

/// Moments of an N-mode Gaussian state
#[derive(Clone, Debug)]
pub struct GaussianState {
    num_modes: usize,
    means: Array1<f64>,
    cov: Array2<f64>,
    config: SimulatorConfig,
}

impl GaussianState {
    /// The N-mode vacuum.
    pub fn vacuum(num_modes: usize, config: &SimulatorConfig) -> Self {
        GaussianState {
            num_modes,
            means: Array1::zeros(2 * num_modes),
            cov: Array2::eye(2 * num_modes) * config.vacuum_noise(),
            config: config.clone(),
        }
    }

    /// Build a state from explicit moments, checking shapes and physicality.
    pub fn from_moments(
        means: Array1<f64>,
        cov: Array2<f64>,
        config: &SimulatorConfig,
    ) -> Result<Self> {
        let len = means.len();
        if len == 0 || len % 2 != 0 {
            return Err(CvError::invalid_parameter(
                "means",
                format!("length {} is not twice a positive mode count", len),
            ));
        }
        if cov.dim() != (len, len) {
            return Err(CvError::invalid_parameter(
                "cov",
                format!("expected {}x{}, got {}x{}", len, len, cov.nrows(), cov.ncols()),
            ));
        }
        check_uncertainty(&cov, config.hbar, &config.tolerance)?;

        Ok(GaussianState {
            num_modes: len / 2,
            means,
            cov,
            config: config.clone(),
        })
    }

    pub fn means(&self) -> &Array1<f64> {
        &self.means
    }

    pub fn cov(&self) -> &Array2<f64> {
        &self.cov
    }

    pub fn hbar(&self) -> f64 {
        self.config.hbar
    }

    /// Apply `μ → xμ + d`, `V → xVxᵀ + y` to one mode.
    pub fn apply_map(&mut self, map: &GaussianMap, mode: usize) -> Result<()> {
        check_mode(mode, self.num_modes)?;
        let i = 2 * mode;

        let mut means = self.means.clone();
        let local = map.x.dot(&means.slice(s![i..i + 2])) + &map.d;
        means.slice_mut(s![i..i + 2]).assign(&local);

        // Rows then columns: cross-terms pick up x once, the block x twice
        let mut cov = self.cov.clone();
        let rows = map.x.dot(&cov.slice(s![i..i + 2, ..]));
        cov.slice_mut(s![i..i + 2, ..]).assign(&rows);
        let cols = cov.slice(s![.., i..i + 2]).dot(&map.x.t());
        cov.slice_mut(s![.., i..i + 2]).assign(&cols);
        let block = &cov.slice(s![i..i + 2, i..i + 2]) + &map.y;
        cov.slice_mut(s![i..i + 2, i..i + 2]).assign(&block);

        self.commit(means, cov)
    }

    /// Overwrite one mode with the given single-mode moments, dropping its correlations.
    pub fn replace_mode(&mut self, local_means: &Array1<f64>, local_cov: &Array2<f64>, mode: usize) -> Result<()> {
        check_mode(mode, self.num_modes)?;
        let i = 2 * mode;

        let mut means = self.means.clone();
        means.slice_mut(s![i..i + 2]).assign(local_means);

        let mut cov = self.cov.clone();
        cov.slice_mut(s![i..i + 2, ..]).fill(0.0);
        cov.slice_mut(s![.., i..i + 2]).fill(0.0);
        cov.slice_mut(s![i..i + 2, i..i + 2]).assign(local_cov);

        self.commit(means, cov)
    }

    pub fn loss(&mut self, transmissivity: f64, mode: usize) -> Result<()> {
        self.apply_channel(&Channel::Loss { transmissivity }, mode)
    }

    pub fn thermal_loss(&mut self, transmissivity: f64, nbar: f64, mode: usize) -> Result<()> {
        self.apply_channel(&Channel::ThermalLoss { transmissivity, nbar }, mode)
    }

    pub fn squeeze(&mut self, r: f64, phi: f64, mode: usize) -> Result<()> {
        self.apply_channel(&Channel::Squeeze { r, phi }, mode)
    }

    pub fn displace(&mut self, alpha: Complex64, mode: usize) -> Result<()> {
        self.apply_channel(&Channel::Displacement { alpha }, mode)
    }

    pub fn prepare_thermal_state(&mut self, nbar: f64, mode: usize) -> Result<()> {
        self.prepare(&Preparation::Thermal { nbar }, mode)
    }

    /// Whether the covariance satisfies `V + i(ħ/2)Ω ⪰ 0`.
    pub fn is_physical(&self) -> bool {
        check_uncertainty(&self.cov, self.config.hbar, &self.config.tolerance).is_ok()
    }

    fn commit(&mut self, means: Array1<f64>, cov: Array2<f64>) -> Result<()> {
        if self.config.check_physicality {
            check_uncertainty(&cov, self.config.hbar, &self.config.tolerance)?;
        }
        self.means = means;
        self.cov = cov;
        Ok(())
    }
}

/// Symmetry and Heisenberg uncertainty check on a covariance matrix.
fn check_uncertainty(cov: &Array2<f64>, hbar: f64, tol: &Tolerance) -> Result<()> {
    if !tol.all_close(cov, &cov.t()) {
        return Err(CvError::numerical("covariance matrix is not symmetric"));
    }

    let num_modes = cov.nrows() / 2;
    let omega = symplectic_form(num_modes);
    let half_hbar = hbar / 2.0;
    let m = Array2::from_shape_fn(cov.dim(), |(i, j)| {
        Complex64::new(cov[[i, j]], half_hbar * omega[[i, j]])
    });
    if !is_positive_semidefinite(&m, tol.atol.max(f64::EPSILON) * hbar) {
        return Err(CvError::numerical(
            "covariance matrix violates the uncertainty relation",
        ));
    }
    Ok(())
}

impl CvState for GaussianState {
    fn num_modes(&self) -> usize {
        self.num_modes
    }

    fn representation(&self) -> Representation {
        Representation::Gaussian
    }

    fn apply_channel(&mut self, channel: &Channel, mode: usize) -> Result<()> {
        channel.validate()?;
        debug!(%channel, mode, "gaussian channel");
        let map = channel.gaussian_map(self.config.hbar);
        self.apply_map(&map, mode)
    }

    fn prepare(&mut self, preparation: &Preparation, mode: usize) -> Result<()> {
        preparation.validate(None)?;
        debug!(preparation = preparation.name(), mode, "gaussian preparation");
        let (means, cov) = preparation.gaussian_moments(self.config.hbar)?;
        self.replace_mode(&means, &cov, mode)
    }

    fn is_vacuum(&self, tol: f64) -> bool {
        let tol = Tolerance::absolute(tol);
        let vacuum_cov = Array2::eye(2 * self.num_modes) * self.config.vacuum_noise();
        tol.all_close(&self.means, &Array1::zeros(2 * self.num_modes))
            && tol.all_close(&self.cov, &vacuum_cov)
    }

    fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::Gaussian(GaussianSnapshot::new(
            self.means.clone(),
            self.cov.clone(),
            self.config.hbar,
            self.config.tolerance,
        ))
    }
}

impl Display for GaussianState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}-mode Gaussian state (hbar = {}):", self.num_modes, self.config.hbar)?;
        for k in 0..self.num_modes {
            writeln!(
                f,
                "  mode {}: means ({:.6}, {:.6}), var ({:.6}, {:.6})",
                k,
                self.means[2 * k],
                self.means[2 * k + 1],
                self.cov[[2 * k, 2 * k]],
                self.cov[[2 * k + 1, 2 * k + 1]]
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_vacuum_moments() {
        let state = GaussianState::vacuum(2, &SimulatorConfig::default());
        assert_eq!(state.means().len(), 4);
        assert_eq!(state.cov(), &Array2::<f64>::eye(4));
        assert!(state.is_vacuum(1e-12));
        assert!(state.is_physical());
    }

    #[test]
    fn test_loss_scales_cross_terms_by_sqrt_t() {
        let config = SimulatorConfig::default();
        let mut state = GaussianState::vacuum(2, &config);
        // Correlate the two modes with a symmetric cross block
        let cov = array![
            [2.0, 0.0, 1.0, 0.0],
            [0.0, 2.0, 0.0, -1.0],
            [1.0, 0.0, 2.0, 0.0],
            [0.0, -1.0, 0.0, 2.0]
        ];
        state = GaussianState::from_moments(state.means().clone(), cov, &config).unwrap();

        state.loss(0.25, 0).unwrap();
        let cov = state.cov();
        assert!((cov[[0, 0]] - (0.25 * 2.0 + 0.75)).abs() < 1e-12);
        assert!((cov[[0, 2]] - 0.5).abs() < 1e-12);
        assert!((cov[[2, 0]] - 0.5).abs() < 1e-12);
        assert!((cov[[3, 1]] + 0.5).abs() < 1e-12);
        assert!((cov[[2, 2]] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_unphysical_moments_rejected() {
        let config = SimulatorConfig::default();
        let result = GaussianState::from_moments(
            Array1::zeros(2),
            array![[0.5, 0.0], [0.0, 0.5]],
            &config,
        );
        assert!(matches!(result, Err(CvError::NumericalInstability(_))));

        let result = GaussianState::from_moments(Array1::zeros(3), Array2::eye(3), &config);
        assert!(matches!(result, Err(CvError::InvalidParameter { .. })));
    }

    #[test]
    fn test_failed_operation_leaves_state_untouched() {
        let mut state = GaussianState::vacuum(1, &SimulatorConfig::default());
        state.displace(Complex64::new(0.5, 0.0), 0).unwrap();
        let before = state.means().clone();

        assert!(state.loss(1.5, 0).is_err());
        assert!(state.loss(0.5, 3).is_err());
        assert_eq!(state.means(), &before);
    }
}
