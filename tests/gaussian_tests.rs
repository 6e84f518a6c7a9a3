use cvsim::prelude::*;
use cvsim::Tolerance;
use ndarray::array;

const TOL: f64 = 1e-8;

fn gaussian_circuit() -> Circuit {
    let mut circuit = Circuit::new(1, Representation::Gaussian).unwrap();
    circuit.reset(true);
    circuit
}

/// Squeezed and displaced single-mode input
fn prepared_input(r: f64, phi: f64, alpha: Complex64) -> Circuit {
    let mut circuit = gaussian_circuit();
    circuit.squeeze(Complex64::from_polar(r, phi), 0).unwrap();
    circuit.displacement(alpha, 0).unwrap();
    circuit
}

fn assert_same_moments(a: &Circuit, b: &Circuit, tol: f64) {
    let a = a.state().unwrap();
    let b = b.state().unwrap();
    let tol = Tolerance::absolute(tol);
    assert!(tol.all_close(a.means().unwrap(), b.means().unwrap()));
    assert!(tol.all_close(a.cov().unwrap(), b.cov().unwrap()));
}

#[test]
fn test_reset_reproduces_vacuum() {
    let mut circuit = gaussian_circuit();
    circuit.displacement(Complex64::new(1.0, 2.0), 0).unwrap();
    circuit.squeeze(0.4, 0).unwrap();
    circuit.reset(true);

    let state = circuit.state().unwrap();
    assert_eq!(state.means().unwrap(), &array![0.0, 0.0]);
    assert_eq!(state.cov().unwrap(), &array![[1.0, 0.0], [0.0, 1.0]]);
    assert!(circuit.is_vacuum(0.0).unwrap());
}

#[test]
fn test_thermal_loss_without_photons_is_loss() {
    for &t in [0.0, 0.3, 0.5, 0.8, 1.0].iter() {
        for &(r, phi) in [(0.0, 0.0), (0.3, 0.0), (0.5, 1.1)].iter() {
            let alpha = Complex64::new(0.4, -0.7);
            let mut thermal = prepared_input(r, phi, alpha);
            thermal.thermal_loss(t, 0.0, 0).unwrap();
            let mut lossy = prepared_input(r, phi, alpha);
            lossy.loss(t, 0).unwrap();
            assert_same_moments(&thermal, &lossy, TOL);
        }
    }
}

#[test]
fn test_full_thermal_loss_prepares_thermal_state() {
    for &nbar in [0.0, 0.2, 1.0, 3.5].iter() {
        let mut circuit = prepared_input(0.6, 0.4, Complex64::new(1.5, 0.2));
        circuit.thermal_loss(0.0, nbar, 0).unwrap();

        let mut expected = gaussian_circuit();
        expected.prepare_thermal_state(nbar, 0).unwrap();
        assert_same_moments(&circuit, &expected, TOL);
    }
}

#[test]
fn test_thermal_loss_on_squeezed_state_covariance() {
    for &r in [0.0, 0.25, 0.7].iter() {
        for &t in [0.0, 0.4, 0.9, 1.0].iter() {
            for &nbar in [0.0, 0.5, 2.0].iter() {
                let mut circuit = gaussian_circuit();
                circuit.squeeze(r, 0).unwrap();
                circuit.thermal_loss(t, nbar, 0).unwrap();

                let noise = (1.0 - t) * (2.0 * nbar + 1.0);
                let expected = array![
                    [t * (-2.0 * r).exp() + noise, 0.0],
                    [0.0, t * (2.0 * r).exp() + noise]
                ];
                let state = circuit.state().unwrap();
                assert!(Tolerance::absolute(TOL).all_close(state.cov().unwrap(), &expected));
            }
        }
    }
}

#[test]
fn test_prepared_squeezed_state_matches_squeeze() {
    let mut prepared = gaussian_circuit();
    prepared.prepare_squeezed_state(0.5, 0.8, 0).unwrap();
    let mut squeezed = gaussian_circuit();
    squeezed.squeeze(Complex64::from_polar(0.5, 0.8), 0).unwrap();
    assert_same_moments(&prepared, &squeezed, TOL);

    let state = prepared.state().unwrap();
    assert!(state.is_pure());
    assert!((state.mean_photon(0).unwrap() - 0.5f64.sinh().powi(2)).abs() < TOL);
}

#[test]
fn test_displacement_mean_convention() {
    let mut circuit = gaussian_circuit();
    circuit.displacement(Complex64::new(0.5, -0.25), 0).unwrap();
    let means = circuit.state().unwrap().reduced_means(0).unwrap();
    // sqrt(2 hbar) with hbar = 2
    assert!((means[0] - 1.0).abs() < TOL);
    assert!((means[1] + 0.5).abs() < TOL);
}

#[test]
fn test_loss_on_one_mode_leaves_other_mode() {
    let mut circuit = Circuit::new(2, Representation::Gaussian).unwrap();
    circuit.reset(true);
    circuit.prepare_coherent_state(Complex64::new(1.0, 0.0), 0).unwrap();
    circuit.prepare_thermal_state(0.5, 1).unwrap();
    circuit.loss(0.0, 0).unwrap();

    let state = circuit.state().unwrap();
    let tol = Tolerance::absolute(TOL);
    assert!(tol.all_close(&state.reduced_cov(0).unwrap(), &array![[1.0, 0.0], [0.0, 1.0]]));
    assert!(tol.all_close(&state.reduced_cov(1).unwrap(), &array![[2.0, 0.0], [0.0, 2.0]]));
    assert!((state.mean_photon(1).unwrap() - 0.5).abs() < TOL);
    assert!(!state.is_vacuum(TOL));
}

#[test]
fn test_thermal_state_is_mixed() {
    let mut circuit = gaussian_circuit();
    circuit.prepare_thermal_state(1.0, 0).unwrap();
    let state = circuit.state().unwrap();
    assert!(!state.is_pure());
    assert!((state.purity() - 1.0 / 3.0).abs() < TOL);
}
