//! Channel library
//!
//! Stateless definitions of every channel and state preparation the
//! simulator knows about. Each definition can be rendered for either
//! representation: as an affine moment map for Gaussian states, or as a
//! truncated unitary / Kraus decomposition for Fock states. Both backends
//! dispatch through this module so the physics cannot diverge between them.
//!
//! Conventions: `a = (x + i p) / sqrt(2ħ)`, squeezing
//! `S(z) = exp((z* a² − z a†²) / 2)` with `z = r e^{iφ}`, displacement
//! `D(α) = exp(α a† − α* a)`.

use std::fmt;
use std::sync::Arc;

use ndarray::{array, Array1, Array2};
use num_complex::Complex64;

use crate::error::{CvError, Result};
use crate::linalg::{binomial, complex_eye};

/// A single-mode channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Channel {
    /// Beamsplitter coupling to vacuum with transmissivity `transmissivity`.
    Loss { transmissivity: f64 },
    /// Beamsplitter coupling to a thermal mode with mean photon number `nbar`.
    ThermalLoss { transmissivity: f64, nbar: f64 },
    /// Squeezing unitary with magnitude `r` and angle `phi`.
    Squeeze { r: f64, phi: f64 },
    /// Displacement unitary.
    Displacement { alpha: Complex64 },
}

/// Affine single-mode moment map: `μ → xμ + d`, `V → xVxᵀ + y`.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianMap {
    pub x: Array2<f64>,
    pub y: Array2<f64>,
    pub d: Array1<f64>,
}

impl GaussianMap {
    fn new(x: Array2<f64>, y: Array2<f64>, d: Array1<f64>) -> Self {
        GaussianMap { x, y, d }
    }
}

/// Operator-sum decomposition `ρ → Σ K ρ K†` of one channel stage.
#[derive(Debug, Clone, PartialEq)]
pub struct KrausSet {
    pub operators: Vec<Array2<Complex64>>,
}

impl KrausSet {
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// `Σ K†K`, the identity on the untruncated part of the space.
    pub fn completeness(&self) -> Array2<Complex64> {
        let dim = self.operators.first().map_or(0, |k| k.nrows());
        self.operators
            .iter()
            .fold(Array2::zeros((dim, dim)), |acc, k| acc + crate::linalg::dagger(k).dot(k))
    }
}

/// What a channel does in the truncated Fock basis.
#[derive(Debug, Clone, PartialEq)]
pub enum FockAction {
    /// Truncated unitary; keeps pure states pure.
    Unitary(Array2<Complex64>),
    /// Kraus stages applied in order, shared with the per-state table cache.
    Kraus(Arc<Vec<KrausSet>>),
}

/// Cache key for the Kraus tables of a channel at a fixed cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KrausKey {
    kind: u8,
    transmissivity: u64,
    nbar: u64,
}

impl Channel {
    /// Squeezing from a complex parameter `z = r e^{iφ}`.
    pub fn squeeze(z: Complex64) -> Self {
        Channel::Squeeze {
            r: z.norm(),
            phi: z.arg(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Loss { .. } => "loss",
            Channel::ThermalLoss { .. } => "thermal_loss",
            Channel::Squeeze { .. } => "squeeze",
            Channel::Displacement { .. } => "displacement",
        }
    }

    /// Check every parameter is inside its physical domain.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Channel::Loss { transmissivity } => check_transmissivity(transmissivity),
            Channel::ThermalLoss { transmissivity, nbar } => {
                check_transmissivity(transmissivity)?;
                check_nbar(nbar)
            }
            Channel::Squeeze { r, phi } => check_squeezing(r, phi),
            Channel::Displacement { alpha } => check_alpha(alpha),
        }
    }

    /// Moment map of the channel. Assumes [`Channel::validate`] passed.
    pub fn gaussian_map(&self, hbar: f64) -> GaussianMap {
        let vacuum_noise = hbar / 2.0;
        match *self {
            Channel::Loss { transmissivity } => loss_map(transmissivity, 0.0, vacuum_noise),
            Channel::ThermalLoss { transmissivity, nbar } => {
                loss_map(transmissivity, nbar, vacuum_noise)
            }
            Channel::Squeeze { r, phi } => {
                GaussianMap::new(squeeze_symplectic(r, phi), Array2::zeros((2, 2)), Array1::zeros(2))
            }
            Channel::Displacement { alpha } => GaussianMap::new(
                Array2::eye(2),
                Array2::zeros((2, 2)),
                displacement_vector(alpha, hbar),
            ),
        }
    }

    /// Fock-basis action at the given cutoff. Assumes [`Channel::validate`] passed.
    pub fn fock_action(&self, cutoff: usize) -> FockAction {
        match *self {
            Channel::Loss { transmissivity } => {
                FockAction::Kraus(Arc::new(vec![loss_kraus(transmissivity, cutoff)]))
            }
            Channel::ThermalLoss { transmissivity, nbar } => {
                FockAction::Kraus(Arc::new(thermal_loss_kraus(transmissivity, nbar, cutoff)))
            }
            Channel::Squeeze { r, phi } => FockAction::Unitary(squeeze_matrix(r, phi, cutoff)),
            Channel::Displacement { alpha } => {
                FockAction::Unitary(displacement_matrix(alpha, cutoff))
            }
        }
    }

    /// Key under which the Kraus tables of this channel may be cached.
    pub fn kraus_key(&self) -> Option<KrausKey> {
        match *self {
            Channel::Loss { transmissivity } => Some(KrausKey {
                kind: 0,
                transmissivity: transmissivity.to_bits(),
                nbar: 0,
            }),
            Channel::ThermalLoss { transmissivity, nbar } => Some(KrausKey {
                kind: 1,
                transmissivity: transmissivity.to_bits(),
                nbar: nbar.to_bits(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Loss { transmissivity } => write!(f, "Loss(T={})", transmissivity),
            Channel::ThermalLoss { transmissivity, nbar } => {
                write!(f, "ThermalLoss(T={}, nbar={})", transmissivity, nbar)
            }
            Channel::Squeeze { r, phi } => write!(f, "Squeeze(r={}, phi={})", r, phi),
            Channel::Displacement { alpha } => {
                write!(f, "Displacement(alpha={}{:+}i)", alpha.re, alpha.im)
            }
        }
    }
}

fn check_transmissivity(t: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&t) {
        return Err(CvError::invalid_parameter(
            "transmissivity",
            format!("{} is outside [0, 1]", t),
        ));
    }
    Ok(())
}

/// Largest mean photon number for which `2n̄ + 1` still resolves the vacuum term.
const MAX_NBAR: f64 = 1.0 / f64::EPSILON;

fn check_nbar(nbar: f64) -> Result<()> {
    if !(nbar.is_finite() && nbar >= 0.0) {
        return Err(CvError::invalid_parameter(
            "nbar",
            format!("mean photon number {} must be finite and non-negative", nbar),
        ));
    }
    if nbar > MAX_NBAR {
        return Err(CvError::invalid_parameter(
            "nbar",
            format!("mean photon number {} is beyond representable precision", nbar),
        ));
    }
    Ok(())
}

fn check_squeezing(r: f64, phi: f64) -> Result<()> {
    if !(r.is_finite() && phi.is_finite()) {
        return Err(CvError::invalid_parameter("r", "squeezing must be finite"));
    }
    // Covariance grows as e^{2r}; the Fock vacuum amplitude shrinks as sqrt(sech r)
    if !(2.0 * r.abs()).exp().is_finite() || (1.0 / r.cosh()).sqrt() == 0.0 {
        return Err(CvError::invalid_parameter(
            "r",
            format!("squeezing {} is beyond representable precision", r),
        ));
    }
    Ok(())
}

fn check_alpha(alpha: Complex64) -> Result<()> {
    if !alpha.is_finite() {
        return Err(CvError::invalid_parameter("alpha", "amplitude must be finite"));
    }
    if (-0.5 * alpha.norm_sqr()).exp() == 0.0 {
        return Err(CvError::invalid_parameter(
            "alpha",
            format!("|alpha| = {} is beyond representable precision", alpha.norm()),
        ));
    }
    Ok(())
}

fn loss_map(t: f64, nbar: f64, vacuum_noise: f64) -> GaussianMap {
    let x = Array2::eye(2) * t.sqrt();
    let y = Array2::eye(2) * ((1.0 - t) * (2.0 * nbar + 1.0) * vacuum_noise);
    GaussianMap::new(x, y, Array1::zeros(2))
}

/// Symplectic matrix of `S(r e^{iφ})` in (x, p) ordering.
pub fn squeeze_symplectic(r: f64, phi: f64) -> Array2<f64> {
    let (ch, sh) = (r.cosh(), r.sinh());
    let (c, s) = (phi.cos(), phi.sin());
    array![[ch - sh * c, -sh * s], [-sh * s, ch + sh * c]]
}

/// Quadrature displacement `sqrt(2ħ) (Re α, Im α)`.
pub fn displacement_vector(alpha: Complex64, hbar: f64) -> Array1<f64> {
    let scale = (2.0 * hbar).sqrt();
    array![scale * alpha.re, scale * alpha.im]
}

/// Kraus operators of the pure-loss channel.
///
/// `K_l |n⟩ = sqrt(C(n, l)) T^{(n-l)/2} (1-T)^{l/2} |n-l⟩`, which reproduces
/// `N(T){|n⟩⟨m|} = Σ_l ((1-T)/T)^l T^{(n+m)/2} / l! sqrt(n! m! / ((n-l)! (m-l)!)) |n-l⟩⟨m-l|`.
/// T = 0 maps every level straight to vacuum.
pub fn loss_kraus(t: f64, cutoff: usize) -> KrausSet {
    if t == 0.0 {
        return full_loss_kraus(cutoff);
    }

    let mut operators = Vec::with_capacity(cutoff);
    for l in 0..cutoff {
        if l > 0 && t == 1.0 {
            break;
        }
        let mut k = Array2::zeros((cutoff, cutoff));
        let leak = (1.0 - t).powf(l as f64 / 2.0);
        for n in l..cutoff {
            let amp = binomial(n, l).sqrt() * t.powf((n - l) as f64 / 2.0) * leak;
            k[[n - l, n]] = Complex64::new(amp, 0.0);
        }
        operators.push(k);
    }
    KrausSet { operators }
}

/// Total loss: `K_l = |0⟩⟨l|`.
fn full_loss_kraus(cutoff: usize) -> KrausSet {
    let operators = (0..cutoff)
        .map(|l| {
            let mut k = Array2::zeros((cutoff, cutoff));
            k[[0, l]] = Complex64::new(1.0, 0.0);
            k
        })
        .collect();
    KrausSet { operators }
}

/// Kraus operators of the quantum-limited amplifier with gain `gain >= 1`.
///
/// `A_k |n⟩ = sqrt(C(n+k, k)) ((G-1)/G)^{k/2} G^{-(n+1)/2} |n+k⟩`; levels
/// pushed past the cutoff are dropped.
pub fn amplifier_kraus(gain: f64, cutoff: usize) -> KrausSet {
    if gain == 1.0 {
        return KrausSet {
            operators: vec![complex_eye(cutoff)],
        };
    }

    let ratio = (gain - 1.0) / gain;
    let operators = (0..cutoff)
        .map(|k| {
            let mut a = Array2::zeros((cutoff, cutoff));
            for n in 0..(cutoff - k) {
                let amp = binomial(n + k, k).sqrt()
                    * ratio.powf(k as f64 / 2.0)
                    * gain.powf(-((n + 1) as f64) / 2.0);
                a[[n + k, n]] = Complex64::new(amp, 0.0);
            }
            a
        })
        .collect();
    KrausSet { operators }
}

/// Thermal loss as pure loss `η = T/G` followed by amplification `G = 1 + (1-T) n̄`.
pub fn thermal_loss_kraus(t: f64, nbar: f64, cutoff: usize) -> Vec<KrausSet> {
    if nbar == 0.0 {
        return vec![loss_kraus(t, cutoff)];
    }
    let gain = 1.0 + (1.0 - t) * nbar;
    vec![loss_kraus(t / gain, cutoff), amplifier_kraus(gain, cutoff)]
}

/// Truncated matrix elements `⟨m|S(r e^{iφ})|n⟩`, exact for `m, n < cutoff`.
pub fn squeeze_matrix(r: f64, phi: f64, cutoff: usize) -> Array2<Complex64> {
    let mut s: Array2<Complex64> = Array2::zeros((cutoff, cutoff));
    if cutoff == 0 {
        return s;
    }
    let sech = 1.0 / r.cosh();
    let a = Complex64::from_polar(r.tanh(), phi);
    let sq = |k: usize| (k as f64).sqrt();

    s[[0, 0]] = Complex64::new(sech.sqrt(), 0.0);
    for m in (2..cutoff).step_by(2) {
        s[[m, 0]] = -(sq(m - 1) / sq(m)) * a * s[[m - 2, 0]];
    }
    for m in 0..cutoff {
        for n in 1..cutoff {
            if (m + n) % 2 != 0 {
                continue;
            }
            let mut v = Complex64::new(0.0, 0.0);
            if n >= 2 {
                v += (sq(n - 1) / sq(n)) * a.conj() * s[[m, n - 2]];
            }
            if m >= 1 {
                v += (sq(m) / sq(n)) * sech * s[[m - 1, n - 1]];
            }
            s[[m, n]] = v;
        }
    }
    s
}

/// Truncated matrix elements `⟨m|D(α)|n⟩`, exact for `m, n < cutoff`.
pub fn displacement_matrix(alpha: Complex64, cutoff: usize) -> Array2<Complex64> {
    let mut d: Array2<Complex64> = Array2::zeros((cutoff, cutoff));
    if cutoff == 0 {
        return d;
    }
    let sq = |k: usize| (k as f64).sqrt();

    d[[0, 0]] = Complex64::new((-0.5 * alpha.norm_sqr()).exp(), 0.0);
    for m in 1..cutoff {
        d[[m, 0]] = alpha / sq(m) * d[[m - 1, 0]];
    }
    for m in 0..cutoff {
        for n in 1..cutoff {
            let mut v = -alpha.conj() * d[[m, n - 1]];
            if m >= 1 {
                v += sq(m) * d[[m - 1, n - 1]];
            }
            d[[m, n]] = v / sq(n);
        }
    }
    d
}

/// A single-mode state preparation target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Preparation {
    Vacuum,
    Thermal { nbar: f64 },
    Coherent { alpha: Complex64 },
    Squeezed { r: f64, phi: f64 },
    Fock { n: usize },
}

/// Fock-basis target of a preparation.
#[derive(Debug, Clone, PartialEq)]
pub enum FockTarget {
    Ket(Array1<Complex64>),
    Mixed(Array2<Complex64>),
}

impl Preparation {
    pub fn name(&self) -> &'static str {
        match self {
            Preparation::Vacuum => "prepare_vacuum_state",
            Preparation::Thermal { .. } => "prepare_thermal_state",
            Preparation::Coherent { .. } => "prepare_coherent_state",
            Preparation::Squeezed { .. } => "prepare_squeezed_state",
            Preparation::Fock { .. } => "prepare_fock_state",
        }
    }

    /// Check the parameters; `cutoff` is `None` for the Gaussian representation.
    pub fn validate(&self, cutoff: Option<usize>) -> Result<()> {
        match *self {
            Preparation::Vacuum => Ok(()),
            Preparation::Thermal { nbar } => check_nbar(nbar),
            Preparation::Coherent { alpha } => check_alpha(alpha),
            Preparation::Squeezed { r, phi } => Channel::Squeeze { r, phi }.validate(),
            Preparation::Fock { n } => match cutoff {
                Some(cutoff) if n >= cutoff => Err(CvError::invalid_parameter(
                    "n",
                    format!("Fock state |{}⟩ lies outside the truncated space of cutoff {}", n, cutoff),
                )),
                Some(_) => Ok(()),
                None => Err(CvError::unsupported(self.name(), "Gaussian")),
            },
        }
    }

    /// Single-mode means and covariance.
    pub fn gaussian_moments(&self, hbar: f64) -> Result<(Array1<f64>, Array2<f64>)> {
        let vacuum_noise = hbar / 2.0;
        match *self {
            Preparation::Vacuum => Ok((Array1::zeros(2), Array2::eye(2) * vacuum_noise)),
            Preparation::Thermal { nbar } => Ok((
                Array1::zeros(2),
                Array2::eye(2) * ((2.0 * nbar + 1.0) * vacuum_noise),
            )),
            Preparation::Coherent { alpha } => Ok((
                displacement_vector(alpha, hbar),
                Array2::eye(2) * vacuum_noise,
            )),
            Preparation::Squeezed { r, phi } => {
                let s = squeeze_symplectic(r, phi);
                Ok((Array1::zeros(2), s.dot(&s.t()) * vacuum_noise))
            }
            Preparation::Fock { .. } => Err(CvError::unsupported(self.name(), "Gaussian")),
        }
    }

    /// Truncated Fock-basis target.
    pub fn fock_target(&self, cutoff: usize) -> FockTarget {
        match *self {
            Preparation::Vacuum => FockTarget::Ket(basis_ket(0, cutoff)),
            Preparation::Thermal { nbar } if nbar == 0.0 => FockTarget::Ket(basis_ket(0, cutoff)),
            Preparation::Thermal { nbar } => {
                let ratio = nbar / (1.0 + nbar);
                let diag = Array1::from_shape_fn(cutoff, |n| {
                    Complex64::new(ratio.powi(n as i32) / (1.0 + nbar), 0.0)
                });
                FockTarget::Mixed(Array2::from_diag(&diag))
            }
            Preparation::Coherent { alpha } => {
                FockTarget::Ket(displacement_matrix(alpha, cutoff).column(0).to_owned())
            }
            Preparation::Squeezed { r, phi } => {
                FockTarget::Ket(squeeze_matrix(r, phi, cutoff).column(0).to_owned())
            }
            Preparation::Fock { n } => FockTarget::Ket(basis_ket(n, cutoff)),
        }
    }
}

/// Basis vector |n⟩.
pub fn basis_ket(n: usize, cutoff: usize) -> Array1<Complex64> {
    let mut ket = Array1::zeros(cutoff);
    if n < cutoff {
        ket[n] = Complex64::new(1.0, 0.0);
    }
    ket
}
