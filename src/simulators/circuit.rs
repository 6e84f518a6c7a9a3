//! The circuit front end
//!
//! A [`Circuit`] owns a fixed number of modes and exactly one state
//! representation, chosen at construction. It starts uninitialised; the
//! first [`Circuit::reset`] creates a vacuum state and every other
//! operation is rejected with [`CvError::InvalidState`] until then.

use num_complex::Complex64;
use tracing::debug;

use crate::channels::{Channel, Preparation};
use crate::config::{Representation, SimulatorConfig};
use crate::error::{check_mode, CvError, Result};
use crate::states::{CvState, FockState, GaussianState, StateSnapshot};

/// A CV circuit with a fixed mode count and representation
#[derive(Debug)]
pub struct Circuit {
    num_modes: usize,
    representation: Representation,
    config: SimulatorConfig,
    state: Option<Box<dyn CvState>>,
}

impl Circuit {
    /// Create an uninitialised circuit with the default configuration.
    pub fn new(num_modes: usize, representation: Representation) -> Result<Self> {
        Self::with_config(num_modes, representation, SimulatorConfig::default())
    }

    /// Create an uninitialised circuit with an explicit configuration.
    pub fn with_config(
        num_modes: usize,
        representation: Representation,
        config: SimulatorConfig,
    ) -> Result<Self> {
        config.validate()?;
        config.validate_representation(representation, num_modes)?;

        Ok(Circuit {
            num_modes,
            representation,
            config,
            state: None,
        })
    }

    pub fn num_modes(&self) -> usize {
        self.num_modes
    }

    pub fn representation(&self) -> Representation {
        self.representation
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Whether [`Circuit::reset`] has been called.
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Reinitialise every mode to vacuum.
    ///
    /// `pure` selects state-vector storage for the Fock representation and
    /// is ignored by the Gaussian one.
    pub fn reset(&mut self, pure: bool) {
        debug!(num_modes = self.num_modes, representation = %self.representation, pure, "reset");
        let state: Box<dyn CvState> = match self.representation {
            Representation::Gaussian => Box::new(GaussianState::vacuum(self.num_modes, &self.config)),
            Representation::Fock { cutoff } => Box::new(FockState::vacuum_unchecked(
                self.num_modes,
                cutoff,
                pure,
                &self.config,
            )),
        };
        self.state = Some(state);
    }

    /// Apply a channel to one mode.
    pub fn apply(&mut self, channel: Channel, mode: usize) -> Result<()> {
        let num_modes = self.num_modes;
        let state = self.active_mut(channel.name())?;
        check_mode(mode, num_modes)?;
        state.apply_channel(&channel, mode)
    }

    /// Replace one mode with a prepared state.
    pub fn prepare(&mut self, preparation: Preparation, mode: usize) -> Result<()> {
        let num_modes = self.num_modes;
        let state = self.active_mut(preparation.name())?;
        check_mode(mode, num_modes)?;
        state.prepare(&preparation, mode)
    }

    /// Loss channel with transmissivity `transmissivity ∈ [0, 1]`.
    pub fn loss(&mut self, transmissivity: f64, mode: usize) -> Result<()> {
        self.apply(Channel::Loss { transmissivity }, mode)
    }

    /// Loss channel coupling to a thermal environment with mean photon number `nbar`.
    pub fn thermal_loss(&mut self, transmissivity: f64, nbar: f64, mode: usize) -> Result<()> {
        self.apply(Channel::ThermalLoss { transmissivity, nbar }, mode)
    }

    /// Squeeze with `z = r e^{iφ}`; a real `z` squeezes the x quadrature.
    pub fn squeeze(&mut self, z: impl Into<Complex64>, mode: usize) -> Result<()> {
        self.apply(Channel::squeeze(z.into()), mode)
    }

    pub fn displacement(&mut self, alpha: impl Into<Complex64>, mode: usize) -> Result<()> {
        self.apply(Channel::Displacement { alpha: alpha.into() }, mode)
    }

    pub fn prepare_vacuum_state(&mut self, mode: usize) -> Result<()> {
        self.prepare(Preparation::Vacuum, mode)
    }

    /// Number state `|n⟩`; Fock representation only, `n` must be below the cutoff.
    pub fn prepare_fock_state(&mut self, n: usize, mode: usize) -> Result<()> {
        self.prepare(Preparation::Fock { n }, mode)
    }

    pub fn prepare_coherent_state(&mut self, alpha: impl Into<Complex64>, mode: usize) -> Result<()> {
        self.prepare(Preparation::Coherent { alpha: alpha.into() }, mode)
    }

    pub fn prepare_thermal_state(&mut self, nbar: f64, mode: usize) -> Result<()> {
        self.prepare(Preparation::Thermal { nbar }, mode)
    }

    pub fn prepare_squeezed_state(&mut self, r: f64, phi: f64, mode: usize) -> Result<()> {
        self.prepare(Preparation::Squeezed { r, phi }, mode)
    }

    /// Immutable copy of the current state.
    pub fn state(&self) -> Result<StateSnapshot> {
        Ok(self.active("state")?.snapshot())
    }

    /// Whether the state is vacuum within the absolute tolerance `tol`.
    pub fn is_vacuum(&self, tol: f64) -> Result<bool> {
        Ok(self.active("is_vacuum")?.is_vacuum(tol))
    }

    fn active(&self, operation: &str) -> Result<&dyn CvState> {
        self.state
            .as_deref()
            .ok_or_else(|| not_initialized(operation))
    }

    fn active_mut(&mut self, operation: &str) -> Result<&mut Box<dyn CvState>> {
        self.state
            .as_mut()
            .ok_or_else(|| not_initialized(operation))
    }
}

fn not_initialized(operation: &str) -> CvError {
    CvError::InvalidState(format!(
        "'{}' called before the circuit was reset",
        operation
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operations_require_reset() {
        let mut circuit = Circuit::new(1, Representation::Gaussian).unwrap();
        assert!(!circuit.is_initialized());
        assert!(matches!(circuit.loss(0.5, 0), Err(CvError::InvalidState(_))));
        assert!(matches!(circuit.state(), Err(CvError::InvalidState(_))));
        assert!(matches!(circuit.is_vacuum(1e-8), Err(CvError::InvalidState(_))));

        circuit.reset(true);
        assert!(circuit.is_initialized());
        assert!(circuit.loss(0.5, 0).is_ok());
    }

    #[test]
    fn test_mode_index_checked() {
        let mut circuit = Circuit::new(2, Representation::Fock { cutoff: 3 }).unwrap();
        circuit.reset(false);
        assert_eq!(
            circuit.displacement(0.1, 2),
            Err(CvError::index_out_of_range(2, 2))
        );
        assert_eq!(
            circuit.prepare_thermal_state(0.1, 5),
            Err(CvError::index_out_of_range(5, 2))
        );
    }

    #[test]
    fn test_representation_fixed_at_construction() {
        let circuit = Circuit::new(3, Representation::Fock { cutoff: 4 }).unwrap();
        assert_eq!(circuit.representation(), Representation::Fock { cutoff: 4 });
        assert_eq!(circuit.num_modes(), 3);
        assert!(Circuit::new(0, Representation::Gaussian).is_err());
    }
}
