//! Convergence rates for smooth linear advection.
//!
//! The one-dimensional run integrates in time with RK4 and expects order
//! `p + 1`; the two-dimensional check measures the truncation error of the
//! residual itself.

mod common;

use std::f64::consts::PI;

use hashbrown::HashMap;
use ndarray::{ArrayView1, array};
use sbp_disc::disc::conservation_law::LinearAdvection;
use sbp_disc::disc::flux::LaxFriedrichsFlux;
use sbp_disc::disc::mesh::uniform_periodic_mesh;
use sbp_disc::disc::reference_approximation::ApproximationType;
use sbp_disc::disc::reference_element::Shape;

use common::{build_solver, rk4};

fn advect_sine(elements: usize, p: usize, t_final: f64) -> f64 {
    let mesh = uniform_periodic_mesh(Shape::Line, &[elements], &[0.0], &[1.0], 1).unwrap();
    let solver = build_solver(
        &mesh,
        ApproximationType::NodalTensor(p),
        LinearAdvection::new(&[1.0]),
        LaxFriedrichsFlux::default(),
        HashMap::new(),
    );
    let mut u = solver.project_function(|x: ArrayView1<f64>| array![(2.0 * PI * x[0]).sin()]);

    let h = 1.0 / elements as f64;
    let steps = (t_final / (0.02 * h)).ceil() as usize;
    let t = rk4(&solver, &mut u, 0.0, t_final / steps as f64, steps);

    solver.l2_error(u.view(), |x| array![(2.0 * PI * (x[0] - t)).sin()])[0]
}

#[test]
fn line_advection_converges_at_order_p_plus_one() {
    let p = 4;
    let errors: Vec<f64> = [4, 8, 16, 32, 64]
        .iter()
        .map(|&k| advect_sine(k, p, 0.5))
        .collect();
    let rates: Vec<f64> = errors.windows(2).map(|e| (e[0] / e[1]).log2()).collect();
    println!("errors {errors:?} rates {rates:?}");
    // the coarsest meshes are pre-asymptotic
    for rate in &rates[..2] {
        assert!(*rate > p as f64 - 1.0, "rates {rates:?}");
    }
    for rate in &rates[2..] {
        assert!(*rate > p as f64 + 0.5, "rates {rates:?}");
    }
}

#[test]
fn triangle_residual_truncation_error_decreases() {
    let p = 3;
    let velocity = [1.0, 0.5];
    let exact = |x: ArrayView1<f64>| (2.0 * PI * x[0]).sin() * (2.0 * PI * x[1]).cos();
    let derivative = move |x: ArrayView1<f64>| {
        let (sx, cx) = (2.0 * PI * x[0]).sin_cos();
        let (sy, cy) = (2.0 * PI * x[1]).sin_cos();
        -2.0 * PI * (velocity[0] * cx * cy - velocity[1] * sx * sy)
    };
    let errors: Vec<f64> = [4, 8, 16]
        .iter()
        .map(|&k| {
            let mesh = uniform_periodic_mesh(Shape::Tri, &[k, k], &[0.0; 2], &[1.0; 2], 1).unwrap();
            let solver = build_solver(
                &mesh,
                ApproximationType::CollapsedSem(p),
                LinearAdvection::new(&velocity),
                LaxFriedrichsFlux::default(),
                HashMap::new(),
            );
            let u = solver.project_function(|x: ArrayView1<f64>| array![exact(x)]);
            let du = solver.residual(u.view(), 0.0);
            solver.l2_error(du.view(), |x| array![derivative(x)])[0]
        })
        .collect();
    let rates: Vec<f64> = errors.windows(2).map(|e| (e[0] / e[1]).log2()).collect();
    println!("errors {errors:?} rates {rates:?}");
    assert!(rates.iter().all(|&r| r > p as f64 - 1.0), "rates {rates:?}");
}
