//! Error types for the simulator
//!
//! Every failure is local and synchronous. Operations validate their inputs
//! and compute the new state before committing it, so an `Err` always leaves
//! the circuit exactly as it was.

use thiserror::Error;

/// Result type alias for simulator operations.
pub type Result<T> = std::result::Result<T, CvError>;

/// Errors that can occur while building or querying a CV circuit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CvError {
    /// A channel, preparation or configuration parameter is out of its domain.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Reason why the parameter is invalid.
        reason: String,
    },

    /// A mode index does not address a mode of the circuit.
    #[error("Mode index {index} out of range for {num_modes}-mode circuit")]
    IndexOutOfRange {
        /// Offending mode index.
        index: usize,
        /// Number of modes in the circuit.
        num_modes: usize,
    },

    /// The circuit is not in a state that allows the operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A result failed a physicality check (PSD, Hermiticity, trace).
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// The operation has no meaning in the active representation.
    #[error("Operation '{operation}' is not supported by the {representation} representation")]
    Unsupported {
        /// Operation name.
        operation: String,
        /// Representation name.
        representation: String,
    },
}

impl CvError {
    /// Create an invalid parameter error.
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an index out of range error.
    pub fn index_out_of_range(index: usize, num_modes: usize) -> Self {
        Self::IndexOutOfRange { index, num_modes }
    }

    /// Create a numerical instability error.
    pub fn numerical(msg: impl Into<String>) -> Self {
        Self::NumericalInstability(msg.into())
    }

    /// Create an unsupported operation error.
    pub fn unsupported(operation: impl Into<String>, representation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            representation: representation.into(),
        }
    }
}

/// Check that `mode` addresses one of `num_modes` modes.
pub(crate) fn check_mode(mode: usize, num_modes: usize) -> Result<()> {
    if mode >= num_modes {
        return Err(CvError::index_out_of_range(mode, num_modes));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CvError::index_out_of_range(3, 2);
        assert!(err.to_string().contains('3'));
        assert!(err.to_string().contains("2-mode"));

        let err = CvError::invalid_parameter("transmissivity", "must lie in [0, 1]");
        assert!(err.to_string().contains("transmissivity"));
        assert!(err.to_string().contains("[0, 1]"));

        let err = CvError::unsupported("prepare_fock_state", "Gaussian");
        assert!(err.to_string().contains("prepare_fock_state"));
        assert!(err.to_string().contains("Gaussian"));
    }

    #[test]
    fn test_check_mode() {
        assert!(check_mode(0, 1).is_ok());
        assert_eq!(check_mode(1, 1), Err(CvError::index_out_of_range(1, 1)));
    }
}
