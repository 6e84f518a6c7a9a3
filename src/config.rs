//! Simulator configuration
//!
//! Settings shared by every state a [`Circuit`](crate::Circuit) creates. The
//! representation itself (Gaussian or Fock with a cutoff) is chosen separately
//! with [`Representation`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CvError, Result};
use crate::linalg::Tolerance;

/// Internal representation of a circuit, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Representation {
    /// First and second moments.
    Gaussian,
    /// Photon-number basis truncated at `cutoff` levels per mode.
    Fock { cutoff: usize },
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Representation::Gaussian => write!(f, "Gaussian"),
            Representation::Fock { cutoff } => write!(f, "Fock (cutoff {})", cutoff),
        }
    }
}

/// Configuration for the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Value of ħ; the vacuum quadrature variance is `hbar / 2`.
    pub hbar: f64,
    /// Tolerance for the internal physicality checks.
    pub tolerance: Tolerance,
    /// Verify PSD / Hermiticity / trace after every operation.
    pub check_physicality: bool,
    /// Largest joint Fock dimension `cutoff^modes` a circuit may allocate.
    pub max_hilbert_dim: usize,
    /// Number of Kraus tables a Fock state keeps around.
    pub kraus_cache_capacity: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            hbar: 2.0,
            tolerance: Tolerance::default(),
            check_physicality: true,
            max_hilbert_dim: 4096,
            kraus_cache_capacity: 64,
        }
    }
}

impl SimulatorConfig {
    /// Vacuum noise `hbar / 2`.
    pub fn vacuum_noise(&self) -> f64 {
        self.hbar / 2.0
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.hbar.is_finite() && self.hbar > 0.0) {
            return Err(CvError::invalid_parameter("hbar", "must be finite and positive"));
        }
        if !(self.tolerance.atol >= 0.0 && self.tolerance.rtol >= 0.0) {
            return Err(CvError::invalid_parameter("tolerance", "components must be non-negative"));
        }
        if self.max_hilbert_dim == 0 {
            return Err(CvError::invalid_parameter("max_hilbert_dim", "must be at least 1"));
        }
        Ok(())
    }

    /// Validate a representation against this configuration for `num_modes` modes.
    pub fn validate_representation(&self, representation: Representation, num_modes: usize) -> Result<()> {
        if num_modes == 0 {
            return Err(CvError::invalid_parameter("num_modes", "a circuit needs at least one mode"));
        }
        if let Representation::Fock { cutoff } = representation {
            if cutoff == 0 {
                return Err(CvError::invalid_parameter("cutoff", "must be at least 1"));
            }
            let dim = u32::try_from(num_modes)
                .ok()
                .and_then(|n| cutoff.checked_pow(n))
                .filter(|&dim| dim <= self.max_hilbert_dim);
            if dim.is_none() {
                return Err(CvError::invalid_parameter(
                    "cutoff",
                    format!(
                        "{} modes at cutoff {} exceed the maximum Hilbert dimension {}",
                        num_modes, cutoff, self.max_hilbert_dim
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimulatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.vacuum_noise(), 1.0);
    }

    #[test]
    fn test_invalid_config() {
        let config = SimulatorConfig {
            hbar: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SimulatorConfig {
            max_hilbert_dim: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_representation_limits() {
        let config = SimulatorConfig::default();
        assert!(config.validate_representation(Representation::Gaussian, 5).is_ok());
        assert!(config.validate_representation(Representation::Fock { cutoff: 8 }, 4).is_ok());
        assert!(config.validate_representation(Representation::Fock { cutoff: 10 }, 4).is_err());
        assert!(config.validate_representation(Representation::Fock { cutoff: 0 }, 1).is_err());
        assert!(config.validate_representation(Representation::Gaussian, 0).is_err());
    }
}
