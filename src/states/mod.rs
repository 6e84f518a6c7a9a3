//! State representations
//!
//! A circuit owns exactly one of two representations: [`GaussianState`]
//! (first and second moments) or [`FockState`] (truncated photon-number
//! basis). Both implement [`CvState`], the channel-application contract the
//! circuit dispatches through.

pub mod fock;
pub mod gaussian;
pub mod snapshot;

use std::fmt::Debug;

use crate::channels::{Channel, Preparation};
use crate::config::Representation;
use crate::error::Result;

pub use fock::{FockState, FockStorage};
pub use gaussian::GaussianState;
pub use snapshot::{FockSnapshot, GaussianSnapshot, StateSnapshot};

/// Common contract of the Gaussian and Fock representations
pub trait CvState: Debug + Send {
    /// Number of modes
    fn num_modes(&self) -> usize;

    /// Which representation this is
    fn representation(&self) -> Representation;

    /// Apply a single-mode channel in place
    ///
    /// Validation happens before any mutation; on error the state is untouched.
    fn apply_channel(&mut self, channel: &Channel, mode: usize) -> Result<()>;

    /// Replace the reduced state of `mode` with a prepared state
    fn prepare(&mut self, preparation: &Preparation, mode: usize) -> Result<()>;

    /// True iff the state matches vacuum within the absolute tolerance `tol`
    fn is_vacuum(&self, tol: f64) -> bool;

    /// Immutable copy of the current state
    fn snapshot(&self) -> StateSnapshot;
}
