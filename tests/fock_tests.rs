use cvsim::prelude::*;
use cvsim::Tolerance;
use ndarray::array;
use rand::rngs::StdRng;
use rand::SeedableRng;

const CUTOFF: usize = 25;
const TOL: f64 = 1e-4;

fn fock_circuit(pure: bool) -> Circuit {
    let mut circuit = Circuit::new(1, Representation::Fock { cutoff: CUTOFF }).unwrap();
    circuit.reset(pure);
    circuit
}

fn gaussian_circuit() -> Circuit {
    let mut circuit = Circuit::new(1, Representation::Gaussian).unwrap();
    circuit.reset(true);
    circuit
}

#[test]
fn test_reset_reproduces_vacuum() {
    for &pure in [true, false].iter() {
        let mut circuit = fock_circuit(pure);
        circuit.prepare_fock_state(3, 0).unwrap();
        circuit.reset(pure);

        let state = circuit.state().unwrap();
        assert_eq!(state.is_pure(), pure);
        let dm = state.dm().unwrap();
        assert_eq!(dm[[0, 0]], Complex64::new(1.0, 0.0));
        assert!(dm.iter().skip(1).all(|z| *z == Complex64::new(0.0, 0.0)));
        assert!(circuit.is_vacuum(0.0).unwrap());
    }
}

#[test]
fn test_thermal_loss_matches_gaussian_on_squeezed_state() {
    for &r in [0.1, 0.3].iter() {
        for &t in [0.2, 0.5, 0.9].iter() {
            for &nbar in [0.0, 0.2, 0.5].iter() {
                let mut fock = fock_circuit(true);
                fock.squeeze(r, 0).unwrap();
                fock.thermal_loss(t, nbar, 0).unwrap();

                let mut gaussian = gaussian_circuit();
                gaussian.squeeze(r, 0).unwrap();
                gaussian.thermal_loss(t, nbar, 0).unwrap();

                let fock_cov = fock.state().unwrap().reduced_cov(0).unwrap();
                let gaussian_cov = gaussian.state().unwrap().reduced_cov(0).unwrap();
                assert!(
                    Tolerance::absolute(TOL).all_close(&fock_cov, &gaussian_cov),
                    "r = {}, T = {}, nbar = {}: {} vs {}",
                    r,
                    t,
                    nbar,
                    fock_cov,
                    gaussian_cov
                );
            }
        }
    }
}

#[test]
fn test_thermal_loss_without_photons_is_loss() {
    for &t in [0.0, 0.3, 0.7, 1.0].iter() {
        let mut thermal = fock_circuit(true);
        thermal.squeeze(0.2, 0).unwrap();
        thermal.displacement(Complex64::new(0.3, 0.1), 0).unwrap();
        thermal.thermal_loss(t, 0.0, 0).unwrap();

        let mut lossy = fock_circuit(true);
        lossy.squeeze(0.2, 0).unwrap();
        lossy.displacement(Complex64::new(0.3, 0.1), 0).unwrap();
        lossy.loss(t, 0).unwrap();

        let a = thermal.state().unwrap().dm().unwrap();
        let b = lossy.state().unwrap().dm().unwrap();
        assert!(Tolerance::absolute(1e-10).all_close(&a, &b));
    }
}

#[test]
fn test_full_thermal_loss_prepares_thermal_state() {
    for &nbar in [0.1, 0.3].iter() {
        let mut circuit = fock_circuit(false);
        circuit.prepare_coherent_state(Complex64::new(0.5, 0.5), 0).unwrap();
        circuit.thermal_loss(0.0, nbar, 0).unwrap();

        let mut expected = fock_circuit(false);
        expected.prepare_thermal_state(nbar, 0).unwrap();

        let a = circuit.state().unwrap().dm().unwrap();
        let b = expected.state().unwrap().dm().unwrap();
        assert!(Tolerance::absolute(TOL).all_close(&a, &b));
    }
}

#[test]
fn test_squeezed_vacuum_moments() {
    let mut circuit = fock_circuit(true);
    circuit.prepare_squeezed_state(0.3, 0.0, 0).unwrap();
    let state = circuit.state().unwrap();
    assert!(state.is_pure());
    assert!(state.ket().is_ok());

    let expected = array![[(-0.6f64).exp(), 0.0], [0.0, 0.6f64.exp()]];
    assert!(Tolerance::absolute(TOL).all_close(&state.reduced_cov(0).unwrap(), &expected));
    assert!((state.mean_photon(0).unwrap() - 0.3f64.sinh().powi(2)).abs() < TOL);
}

#[test]
fn test_coherent_state_quadratures() {
    let mut circuit = fock_circuit(true);
    circuit.prepare_coherent_state(Complex64::new(0.5, -0.25), 0).unwrap();
    let state = circuit.state().unwrap();

    let means = state.reduced_means(0).unwrap();
    assert!((means[0] - 1.0).abs() < TOL);
    assert!((means[1] + 0.5).abs() < TOL);
    let cov = state.reduced_cov(0).unwrap();
    assert!(Tolerance::absolute(TOL).all_close(&cov, &array![[1.0, 0.0], [0.0, 1.0]]));
}

#[test]
fn test_channels_mix_pure_states() {
    let mut circuit = fock_circuit(true);
    circuit.prepare_coherent_state(0.4, 0).unwrap();
    circuit.displacement(0.1, 0).unwrap();
    assert!(circuit.state().unwrap().is_pure());

    circuit.loss(0.8, 0).unwrap();
    let state = circuit.state().unwrap();
    assert!(!state.is_pure());
    assert!(matches!(state.ket(), Err(CvError::Unsupported { .. })));
    // Loss on a coherent state keeps it pure as a physical state
    assert!((state.purity() - 1.0).abs() < TOL);
}

#[test]
fn test_sample_photon_number_of_number_state() {
    let mut circuit = fock_circuit(false);
    circuit.prepare_fock_state(4, 0).unwrap();
    let state = circuit.state().unwrap();
    let fock = state.as_fock().unwrap();

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        assert_eq!(fock.sample_photon_number(0, &mut rng).unwrap(), 4);
    }
}

#[test]
fn test_two_mode_prepare_and_reduce() {
    let mut circuit = Circuit::new(2, Representation::Fock { cutoff: 5 }).unwrap();
    circuit.reset(true);
    circuit.prepare_coherent_state(0.3, 1).unwrap();
    circuit.prepare_fock_state(2, 0).unwrap();

    let state = circuit.state().unwrap();
    let fock = state.as_fock().unwrap();
    let reduced = fock.reduced_dm(0).unwrap();
    // The coherent tail beyond the cutoff carries ~5e-8 of the population
    assert!((reduced[[2, 2]].re - state.trace()).abs() < 1e-12);
    assert!((reduced[[2, 2]].re - 1.0).abs() < 1e-6);
    assert!((fock.mean_photon(1).unwrap() - 0.09).abs() < 1e-6);
    assert!((state.trace() - 1.0).abs() < 1e-6);
}
