//! Dense and sum-factorized operator application give the same residual.

mod common;

use hashbrown::HashMap;
use ndarray::{ArrayView1, array};
use ndarray_stats::DeviationExt;
use sbp_disc::disc::boundary::{BoundaryCondition, BoundaryConditions, OpenBoundary};
use sbp_disc::disc::conservation_law::InviscidBurgers;
use sbp_disc::disc::flux::LaxFriedrichsFlux;
use sbp_disc::disc::mesh::{Mesh, sine_warp, uniform_mesh};
use sbp_disc::disc::operators::OperatorAlgorithm;
use sbp_disc::disc::reference_approximation::ApproximationType;
use sbp_disc::disc::reference_element::Shape;
use sbp_disc::solver::Solver;

use common::{discretize, max_abs};

fn open_boundaries(mesh: &Mesh) -> BoundaryConditions {
    let mut boundaries: BoundaryConditions = HashMap::new();
    for tag in mesh.boundary_tags() {
        boundaries.insert(tag, Box::new(OpenBoundary) as Box<dyn BoundaryCondition>);
    }
    boundaries
}

fn warped_box(shape: Shape) -> Mesh {
    let d = shape.dim();
    let (lower, upper) = (vec![0.0; d], vec![1.0; d]);
    let mut mesh = uniform_mesh(shape, &vec![2; d], &lower, &upper, 2).unwrap();
    mesh.warp(sine_warp(&lower, &upper, 0.02));
    mesh
}

fn smooth_state(x: ArrayView1<f64>) -> ndarray::Array1<f64> {
    let s: f64 = x.iter().enumerate().map(|(m, v)| (m as f64 + 1.0) * v).sum();
    array![1.0 + 0.5 * s.sin()]
}

#[test]
fn dense_and_tensor_product_residuals_agree() {
    for (shape, max_degree) in [(Shape::Tri, 6), (Shape::Tet, 6)] {
        let mesh = warped_box(shape);
        let direction = [1.0, 0.5, -0.25];
        for p in 1..=max_degree {
            for approximation in [ApproximationType::ModalTensor(p), ApproximationType::CollapsedSem(p)] {
                let residual = |algorithm| {
                    let disc = discretize(&mesh, approximation, algorithm);
                    let solver = Solver::new(
                        disc,
                        InviscidBurgers::new(&direction[..shape.dim()]),
                        LaxFriedrichsFlux::default(),
                        open_boundaries(&mesh),
                    )
                    .unwrap();
                    let u = solver.project_function(smooth_state);
                    (u.clone(), solver.residual(u.view(), 0.0))
                };
                let (u_dense, du_dense) = residual(OperatorAlgorithm::DenseMatrix);
                let (u_tensor, du_tensor) = residual(OperatorAlgorithm::MatrixFreeTensorProduct);

                let scale = 1.0 + max_abs(du_dense.view());
                assert!(u_dense.linf_dist(&u_tensor).unwrap() < 1e-11);
                let difference = du_dense.linf_dist(&du_tensor).unwrap();
                assert!(
                    difference < 1e-10 * scale,
                    "{shape:?} {approximation:?}: difference {difference:e}"
                );
            }
        }
    }
}
