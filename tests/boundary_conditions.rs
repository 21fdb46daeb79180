//! Boundary conditions and source terms enter the residual at the right
//! place and time.

mod common;

use hashbrown::HashMap;
use ndarray::{Array1, ArrayView1, array, s};
use sbp_disc::disc::boundary::{
    BoundaryCondition, BoundaryConditions, ConstantBoundary, FunctionBoundary, OpenBoundary,
};
use sbp_disc::disc::conservation_law::{InviscidBurgers, LinearAdvection};
use sbp_disc::disc::flux::LaxFriedrichsFlux;
use sbp_disc::disc::mesh::{BoundaryTag, Mesh, uniform_mesh};
use sbp_disc::disc::reference_approximation::ApproximationType;
use sbp_disc::disc::reference_element::Shape;

use common::{build_solver, max_abs, nodal_values};

fn quadratic(x: ArrayView1<f64>) -> f64 {
    x[0] * x[0] + x[0] * x[1] - x[1]
}

fn every_tag(mesh: &Mesh, condition: impl Fn() -> Box<dyn BoundaryCondition>) -> BoundaryConditions {
    let mut boundaries: BoundaryConditions = HashMap::new();
    for tag in mesh.boundary_tags() {
        boundaries.insert(tag, condition());
    }
    boundaries
}

#[test]
fn time_dependent_inflow_is_evaluated_at_t() {
    let mesh = uniform_mesh(Shape::Line, &[4], &[0.0], &[1.0], 1).unwrap();
    let mut boundaries: BoundaryConditions = HashMap::new();
    boundaries.insert(
        BoundaryTag::Left,
        Box::new(FunctionBoundary {
            func: |x: ArrayView1<f64>, t: f64| array![x[0] - t],
        }),
    );
    boundaries.insert(BoundaryTag::Right, Box::new(OpenBoundary));
    let solver = build_solver(
        &mesh,
        ApproximationType::NodalTensor(2),
        LinearAdvection::new(&[1.0]),
        LaxFriedrichsFlux::default(),
        boundaries,
    );

    // u = x - t solves u_t + u_x = 0
    let u = solver.project_function(|x: ArrayView1<f64>| array![x[0] - 0.5]);
    let du = solver.residual(u.view(), 0.5);
    assert!(du.iter().all(|v| (v + 1.0).abs() < 1e-11));

    // evaluated at the wrong time only the inflow element sees the jump
    let du = solver.residual(u.view(), 0.0);
    assert!(du.slice(s![0, .., ..]).iter().any(|v| (v + 1.0).abs() > 1e-3));
    assert!(du.slice(s![1.., .., ..]).iter().all(|v| (v + 1.0).abs() < 1e-11));
}

#[test]
fn prescribed_polynomial_is_advected_exactly() {
    let mesh = uniform_mesh(Shape::Quad, &[2, 2], &[0.0; 2], &[1.0; 2], 1).unwrap();
    let tri_mesh = uniform_mesh(Shape::Tri, &[2, 2], &[0.0; 2], &[1.0; 2], 1).unwrap();
    let cases = [
        (&mesh, ApproximationType::NodalTensor(2)),
        (&mesh, ApproximationType::ModalTensor(2)),
        (&tri_mesh, ApproximationType::ModalTensor(2)),
    ];
    for (mesh, approximation) in cases {
        let boundaries = every_tag(mesh, || {
            Box::new(FunctionBoundary {
                func: |x: ArrayView1<f64>, _t: f64| array![quadratic(x)],
            }) as Box<dyn BoundaryCondition>
        });
        let solver = build_solver(
            mesh,
            approximation,
            LinearAdvection::new(&[1.0, 0.5]),
            LaxFriedrichsFlux::default(),
            boundaries,
        );
        let u = solver.project_function(|x: ArrayView1<f64>| array![quadratic(x)]);
        let du = solver.residual(u.view(), 0.0);
        for (x, value) in nodal_values(&solver, du.view()) {
            // -(1, 0.5) · ∇(x² + xy - y)
            let exact = -(2.0 * x[0] + x[1]) - 0.5 * (x[0] - 1.0);
            assert!(
                (value[0] - exact).abs() < 1e-10,
                "{approximation:?} at {x}: {} vs {exact}",
                value[0]
            );
        }
    }
}

#[test]
fn constant_boundary_state_is_steady() {
    let mesh = uniform_mesh(Shape::Tri, &[2, 2], &[0.0; 2], &[1.0; 2], 1).unwrap();
    let boundaries = every_tag(&mesh, || {
        Box::new(ConstantBoundary {
            value: array![1.5],
        }) as Box<dyn BoundaryCondition>
    });
    let solver = build_solver(
        &mesh,
        ApproximationType::CollapsedSem(3),
        InviscidBurgers::new(&[1.0, 0.5]),
        LaxFriedrichsFlux::default(),
        boundaries,
    );
    let u = solver.project_function(|_: ArrayView1<f64>| array![1.5]);
    assert!(max_abs(solver.residual(u.view(), 0.0).view()) < 1e-11);

    let v = solver.project_function(|_: ArrayView1<f64>| array![1.0]);
    assert!(max_abs(solver.residual(v.view(), 0.0).view()) > 1e-2);
}

#[test]
fn source_term_balances_the_flux_divergence() {
    let mesh = uniform_mesh(Shape::Quad, &[3, 2], &[0.0; 2], &[1.0; 2], 1).unwrap();
    let boundaries = every_tag(&mesh, || {
        Box::new(FunctionBoundary {
            func: |x: ArrayView1<f64>, _t: f64| array![x[0]],
        }) as Box<dyn BoundaryCondition>
    });
    let solver = build_solver(
        &mesh,
        ApproximationType::NodalTensor(2),
        LinearAdvection::new(&[1.0, 0.0]),
        LaxFriedrichsFlux::default(),
        boundaries,
    )
    .with_source(Box::new(|_: ArrayView1<f64>, _t: f64| -> Array1<f64> { array![1.0] }));
    let u = solver.project_function(|x: ArrayView1<f64>| array![x[0]]);
    assert!(max_abs(solver.residual(u.view(), 0.0).view()) < 1e-11);
}
