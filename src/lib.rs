//! Continuous-variable quantum optics simulator
//!
//! This crate simulates bosonic modes under Gaussian and non-Gaussian
//! channels in two interchangeable representations: Gaussian moments
//! (mean vector and covariance matrix) and a truncated photon-number (Fock)
//! basis holding either a state vector or a density matrix.

pub mod channels;
pub mod config;
pub mod error;
pub mod linalg;
pub mod simulators;
pub mod states;

pub use channels::{Channel, Preparation};
pub use config::{Representation, SimulatorConfig};
pub use error::{CvError, Result};
pub use linalg::Tolerance;
pub use simulators::Circuit;
pub use states::{FockSnapshot, GaussianSnapshot, StateSnapshot};

// Create a prelude module for convenient imports
pub mod prelude {
    pub use crate::channels::{Channel, Preparation};
    pub use crate::config::{Representation, SimulatorConfig};
    pub use crate::error::{CvError, Result};
    pub use crate::simulators::Circuit;
    pub use crate::states::{CvState, FockState, GaussianState, StateSnapshot};
    pub use num_complex::Complex64;
}

// Version and crate information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
