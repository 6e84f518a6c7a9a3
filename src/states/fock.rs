//! Fock-basis state representation
//!
//! The joint state of N modes is stored either as a state vector of length
//! `D^N` or as a `D^N × D^N` density matrix, with `D` the per-mode cutoff.
//! Unitary channels keep a pure state pure; every non-unitary channel
//! switches the storage to a density matrix.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::Arc;

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::channels::{basis_ket, Channel, FockAction, FockTarget, KrausKey, KrausSet, Preparation};
use crate::config::{Representation, SimulatorConfig};
use crate::error::{check_mode, CvError, Result};
use crate::linalg::{apply_to_ket, outer, replace_mode, sandwich, ModeIndexer};
use crate::states::snapshot::{FockSnapshot, StateSnapshot};
use crate::states::CvState;

/// Pure or mixed storage of a Fock state
#[derive(Debug, Clone, PartialEq)]
pub enum FockStorage {
    Pure(Array1<Complex64>),
    Mixed(Array2<Complex64>),
}

impl FockStorage {
    pub fn trace(&self) -> f64 {
        match self {
            FockStorage::Pure(psi) => psi.iter().map(|a| a.norm_sqr()).sum(),
            FockStorage::Mixed(rho) => rho.diag().iter().map(|d| d.re).sum(),
        }
    }

    /// Population of the joint vacuum `|0…0⟩`.
    pub fn vacuum_population(&self) -> f64 {
        match self {
            FockStorage::Pure(psi) => psi[0].norm_sqr(),
            FockStorage::Mixed(rho) => rho[[0, 0]].re,
        }
    }

    fn to_mixed(&self) -> Array2<Complex64> {
        match self {
            FockStorage::Pure(psi) => outer(psi),
            FockStorage::Mixed(rho) => rho.clone(),
        }
    }
}

/// An N-mode state in the photon-number basis truncated at `cutoff`
#[derive(Debug, Clone)]
pub struct FockState {
    num_modes: usize,
    cutoff: usize,
    storage: FockStorage,
    config: SimulatorConfig,
    kraus_cache: HashMap<KrausKey, Arc<Vec<KrausSet>>>,
}

impl FockState {
    /// The N-mode vacuum, pure or as a density matrix.
    pub fn vacuum(num_modes: usize, cutoff: usize, pure: bool, config: &SimulatorConfig) -> Result<Self> {
        config.validate()?;
        config.validate_representation(Representation::Fock { cutoff }, num_modes)?;
        Ok(Self::vacuum_unchecked(num_modes, cutoff, pure, config))
    }

    /// Vacuum for a `(num_modes, cutoff)` pair already validated against `config`.
    pub(crate) fn vacuum_unchecked(num_modes: usize, cutoff: usize, pure: bool, config: &SimulatorConfig) -> Self {
        let dim = cutoff.pow(num_modes as u32);
        let psi = basis_ket(0, dim);
        let storage = if pure {
            FockStorage::Pure(psi)
        } else {
            FockStorage::Mixed(outer(&psi))
        };

        FockState {
            num_modes,
            cutoff,
            storage,
            config: config.clone(),
            kraus_cache: HashMap::new(),
        }
    }

    pub fn cutoff(&self) -> usize {
        self.cutoff
    }

    /// Dimension `cutoff^num_modes` of the joint space.
    pub fn dimension(&self) -> usize {
        self.cutoff.pow(self.num_modes as u32)
    }

    pub fn is_pure(&self) -> bool {
        matches!(self.storage, FockStorage::Pure(_))
    }

    pub fn storage(&self) -> &FockStorage {
        &self.storage
    }

    pub fn trace(&self) -> f64 {
        self.storage.trace()
    }

    pub fn loss(&mut self, transmissivity: f64, mode: usize) -> Result<()> {
        self.apply_channel(&Channel::Loss { transmissivity }, mode)
    }

    pub fn thermal_loss(&mut self, transmissivity: f64, nbar: f64, mode: usize) -> Result<()> {
        self.apply_channel(&Channel::ThermalLoss { transmissivity, nbar }, mode)
    }

    pub fn prepare_fock_state(&mut self, n: usize, mode: usize) -> Result<()> {
        self.prepare(&Preparation::Fock { n }, mode)
    }

    pub fn prepare_coherent_state(&mut self, alpha: Complex64, mode: usize) -> Result<()> {
        self.prepare(&Preparation::Coherent { alpha }, mode)
    }

    /// Fock action of a channel, with Kraus tables built once per parameter set.
    fn action(&mut self, channel: &Channel) -> FockAction {
        let key = match channel.kraus_key() {
            Some(key) => key,
            None => return channel.fock_action(self.cutoff),
        };
        if let Some(stages) = self.kraus_cache.get(&key) {
            trace!(%channel, "kraus cache hit");
            return FockAction::Kraus(Arc::clone(stages));
        }

        let action = channel.fock_action(self.cutoff);
        if let FockAction::Kraus(stages) = &action {
            trace!(%channel, cutoff = self.cutoff, "built kraus tables");
            if self.kraus_cache.len() >= self.config.kraus_cache_capacity {
                self.kraus_cache.clear();
            }
            if self.config.kraus_cache_capacity > 0 {
                self.kraus_cache.insert(key, Arc::clone(stages));
            }
        }
        action
    }

    fn commit(&mut self, storage: FockStorage) -> Result<()> {
        if self.config.check_physicality {
            check_density(&storage, &self.config)?;
        }

        let trace = storage.trace();
        if !self.config.tolerance.close((trace - 1.0).abs(), 1.0) {
            warn!(trace, cutoff = self.cutoff, "population truncated at the Fock cutoff");
        }
        self.storage = storage;
        Ok(())
    }
}

/// `Σ_k K_k ρ K_k†` over the operators of one stage.
fn apply_kraus(rho: &Array2<Complex64>, kraus: &KrausSet, idx: &ModeIndexer) -> Array2<Complex64> {
    kraus
        .operators
        .par_iter()
        .map(|k| sandwich(rho, k, idx))
        .reduce(|| Array2::zeros(rho.dim()), |a, b| a + b)
}

fn apply_stages(rho: Array2<Complex64>, stages: &[KrausSet], idx: &ModeIndexer) -> Array2<Complex64> {
    stages
        .iter()
        .fold(rho, |rho, stage| apply_kraus(&rho, stage, idx))
}

/// Hermiticity, non-negative populations and trace ≤ 1.
fn check_density(storage: &FockStorage, config: &SimulatorConfig) -> Result<()> {
    let tol = &config.tolerance;
    let trace = storage.trace();
    if !trace.is_finite() || trace > 1.0 + tol.atol + tol.rtol {
        return Err(CvError::numerical(format!("trace {} exceeds one", trace)));
    }

    if let FockStorage::Mixed(rho) = storage {
        let dim = rho.nrows();
        for i in 0..dim {
            if rho[[i, i]].re < -tol.atol {
                return Err(CvError::numerical(format!(
                    "negative population {} at basis index {}",
                    rho[[i, i]].re,
                    i
                )));
            }
            for j in 0..i {
                if !tol.close((rho[[i, j]] - rho[[j, i]].conj()).norm(), rho[[j, i]].norm()) {
                    return Err(CvError::numerical("density matrix is not Hermitian"));
                }
            }
        }
    }
    Ok(())
}

impl CvState for FockState {
    fn num_modes(&self) -> usize {
        self.num_modes
    }

    fn representation(&self) -> Representation {
        Representation::Fock { cutoff: self.cutoff }
    }

    fn apply_channel(&mut self, channel: &Channel, mode: usize) -> Result<()> {
        channel.validate()?;
        check_mode(mode, self.num_modes)?;
        debug!(%channel, mode, pure = self.is_pure(), "fock channel");
        let idx = ModeIndexer::new(self.num_modes, self.cutoff, mode);

        let storage = match self.action(channel) {
            FockAction::Unitary(op) => match &self.storage {
                FockStorage::Pure(psi) => FockStorage::Pure(apply_to_ket(psi, &op, &idx)),
                FockStorage::Mixed(rho) => FockStorage::Mixed(sandwich(rho, &op, &idx)),
            },
            FockAction::Kraus(stages) => {
                FockStorage::Mixed(apply_stages(self.storage.to_mixed(), &stages, &idx))
            }
        };

        self.commit(storage)
    }

    fn prepare(&mut self, preparation: &Preparation, mode: usize) -> Result<()> {
        preparation.validate(Some(self.cutoff))?;
        check_mode(mode, self.num_modes)?;
        debug!(preparation = preparation.name(), mode, "fock preparation");

        let target = preparation.fock_target(self.cutoff);
        let storage = match (self.num_modes, &self.storage, target) {
            (1, FockStorage::Pure(_), FockTarget::Ket(psi)) => FockStorage::Pure(psi),
            (1, _, FockTarget::Ket(psi)) => FockStorage::Mixed(outer(&psi)),
            (1, _, FockTarget::Mixed(sigma)) => FockStorage::Mixed(sigma),
            (_, storage, target) => {
                let sigma = match target {
                    FockTarget::Ket(psi) => outer(&psi),
                    FockTarget::Mixed(sigma) => sigma,
                };
                let idx = ModeIndexer::new(self.num_modes, self.cutoff, mode);
                FockStorage::Mixed(replace_mode(&storage.to_mixed(), &sigma, &idx))
            }
        };

        self.commit(storage)
    }

    fn is_vacuum(&self, tol: f64) -> bool {
        (self.storage.vacuum_population() - 1.0).abs() <= tol
    }

    fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::Fock(FockSnapshot::new(
            self.num_modes,
            self.cutoff,
            self.config.hbar,
            self.storage.clone(),
        ))
    }
}

impl Display for FockState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{}-mode Fock state (cutoff {}, {}):",
            self.num_modes,
            self.cutoff,
            if self.is_pure() { "pure" } else { "mixed" }
        )?;

        let threshold = 1e-10;
        let dim = self.dimension();
        for i in 0..dim {
            let prob = match &self.storage {
                FockStorage::Pure(psi) => psi[i].norm_sqr(),
                FockStorage::Mixed(rho) => rho[[i, i]].re,
            };
            if prob > threshold {
                let mut digits = vec![0; self.num_modes];
                let mut rest = i;
                for d in digits.iter_mut().rev() {
                    *d = rest % self.cutoff;
                    rest /= self.cutoff;
                }
                let label: Vec<String> = digits.iter().map(|d| d.to_string()).collect();
                writeln!(f, "  |{}⟩: [{:.1}%]", label.join(","), prob * 100.0)?;
            }
        }
        Ok(())
    }
}
