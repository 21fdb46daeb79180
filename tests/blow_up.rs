//! Non-physical states propagate as non-finite residual entries instead of
//! aborting the evaluation.

mod common;

use hashbrown::HashMap;
use ndarray::{Array3, ArrayView1, s};
use sbp_disc::Error;
use sbp_disc::disc::conservation_law::{ConservationLaw, Euler};
use sbp_disc::disc::mesh::{FacetConnection, uniform_periodic_mesh};
use sbp_disc::disc::reference_approximation::ApproximationType;
use sbp_disc::disc::reference_element::Shape;
use sbp_disc::disc::riemann_solver::HllcFlux;
use sbp_disc::solver::check_finite;

use common::build_solver;

fn element_is_finite(du: &Array3<f64>, e: usize) -> bool {
    du.slice(s![e, .., ..]).iter().all(|v| v.is_finite())
}

#[test]
fn negative_pressure_poisons_only_its_neighbourhood() {
    let law = Euler::new(1, 1.4);
    let mesh = uniform_periodic_mesh(Shape::Line, &[5], &[0.0], &[1.0], 1).unwrap();
    for approximation in [ApproximationType::NodalTensor(2), ApproximationType::ModalTensor(2)] {
        let solver = build_solver(&mesh, approximation, law.clone(), HllcFlux, HashMap::new());
        let mut u = solver.project_function(|_: ArrayView1<f64>| law.conservative(1.0, &[0.2], 1.0));
        let negative = solver.project_function(|_: ArrayView1<f64>| law.conservative(1.0, &[0.0], -1.0));
        let bad = 2;
        u.slice_mut(s![bad, .., ..]).assign(&negative.slice(s![bad, .., ..]));

        let du = solver.residual(u.view(), 0.0);

        let mut affected: Vec<usize> = mesh.connectivity[bad]
            .iter()
            .filter_map(|c| match c {
                FacetConnection::Interior { element, .. } => Some(*element),
                FacetConnection::Boundary(_) => None,
            })
            .collect();
        affected.push(bad);
        assert!(!element_is_finite(&du, bad), "{}", approximation.name());
        for e in 0..mesh.num_elements() {
            if !affected.contains(&e) {
                assert!(element_is_finite(&du, e), "{}: element {e}", approximation.name());
            }
        }
        let first = affected
            .iter()
            .copied()
            .filter(|&e| !element_is_finite(&du, e))
            .min();
        match check_finite(du.view()) {
            Err(Error::NumericalInstability { element, .. }) => {
                assert_eq!(Some(element), first, "{}", approximation.name())
            }
            other => panic!("{}: expected an instability, got {other:?}", approximation.name()),
        }
    }
}
