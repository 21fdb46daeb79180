//! Helpers shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use ndarray::{Array3, ArrayView1, ArrayView3, s};
use sbp_disc::disc::boundary::BoundaryConditions;
use sbp_disc::disc::conservation_law::ConservationLaw;
use sbp_disc::disc::flux::NumericalFlux;
use sbp_disc::disc::mesh::Mesh;
use sbp_disc::disc::operators::OperatorAlgorithm;
use sbp_disc::disc::reference_approximation::{ApproximationType, ReferenceApproximation};
use sbp_disc::disc::spatial_discretization::SpatialDiscretization;
use sbp_disc::solver::Solver;

pub fn discretize(
    mesh: &Mesh,
    approximation: ApproximationType,
    algorithm: OperatorAlgorithm,
) -> SpatialDiscretization<'_> {
    let reference = ReferenceApproximation::new(mesh.shape, approximation).unwrap();
    SpatialDiscretization::new(mesh, Arc::new(reference), algorithm).unwrap()
}

pub fn build_solver<'a, L: ConservationLaw, F: NumericalFlux<L>>(
    mesh: &'a Mesh,
    approximation: ApproximationType,
    law: L,
    flux: F,
    boundaries: BoundaryConditions,
) -> Solver<'a, L, F> {
    let disc = discretize(mesh, approximation, OperatorAlgorithm::default());
    Solver::new(disc, law, flux, boundaries).unwrap()
}

pub fn max_abs(u: ArrayView3<f64>) -> f64 {
    u.iter().fold(0.0, |m: f64, v| m.max(v.abs()))
}

/// `Σ_k u_k^T M_k du_k`.
pub fn energy_rate<L: ConservationLaw, F: NumericalFlux<L>>(
    solver: &Solver<'_, L, F>,
    u: ArrayView3<f64>,
    du: ArrayView3<f64>,
) -> f64 {
    let disc = &solver.disc;
    let wj = disc.physical_weights();
    let mut total = 0.0;
    for e in 0..disc.num_elements() {
        let ue = disc.operators.volume_interpolation.apply(u.slice(s![e, .., ..]));
        let due = disc.operators.volume_interpolation.apply(du.slice(s![e, .., ..]));
        total += (&ue * &due).sum_axis(ndarray::Axis(1)).dot(&wj.row(e));
    }
    total
}

/// Classical fourth-order Runge–Kutta from `t` to `t + steps * dt`.
pub fn rk4<L: ConservationLaw, F: NumericalFlux<L>>(
    solver: &Solver<'_, L, F>,
    u: &mut Array3<f64>,
    mut t: f64,
    dt: f64,
    steps: usize,
) -> f64 {
    for _ in 0..steps {
        let k1 = solver.residual(u.view(), t);
        let k2 = solver.residual((&*u + &(&k1 * (0.5 * dt))).view(), t + 0.5 * dt);
        let k3 = solver.residual((&*u + &(&k2 * (0.5 * dt))).view(), t + 0.5 * dt);
        let k4 = solver.residual((&*u + &(&k3 * dt)).view(), t + dt);
        *u += &((k1 + &(k2 * 2.0) + &(k3 * 2.0) + &k4) * (dt / 6.0));
        t += dt;
    }
    t
}

/// Values of `u` at the volume nodes together with their coordinates.
pub fn nodal_values<'a, L: ConservationLaw, F: NumericalFlux<L>>(
    solver: &'a Solver<'_, L, F>,
    u: ArrayView3<f64>,
) -> Vec<(ArrayView1<'a, f64>, ndarray::Array1<f64>)> {
    let disc = &solver.disc;
    let mut out = Vec::new();
    for e in 0..disc.num_elements() {
        let values = disc.operators.volume_interpolation.apply(u.slice(s![e, .., ..]));
        for (node, row) in values.outer_iter().enumerate() {
            out.push((
                disc.geometry.volume_coordinates.slice(s![e, node, ..]),
                row.to_owned(),
            ));
        }
    }
    out
}
