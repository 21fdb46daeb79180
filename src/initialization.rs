//! Turns parsed parameters into validated discretization objects.
use std::f64::consts::PI;
use std::sync::Arc;

use hashbrown::HashMap;
use ndarray::{Array1, ArrayView1, array};
use tracing::info;

use crate::disc::boundary::{BoundaryCondition, BoundaryConditions, OpenBoundary};
use crate::disc::conservation_law::{
    ConservationLaw, Euler, InviscidBurgers, LinearAdvection, LinearAdvectionDiffusion,
};
use crate::disc::flux::{
    BassiRebay1, CentralFlux, EntropyConservativeFlux, LaxFriedrichsFlux, NumericalFlux,
};
use crate::disc::mesh::{Mesh, sine_warp, uniform_mesh, uniform_periodic_mesh};
use crate::disc::reference_approximation::{ApproximationType, ReferenceApproximation};
use crate::disc::riemann_solver::HllcFlux;
use crate::disc::spatial_discretization::SpatialDiscretization;
use crate::error::{Error, Result};
use crate::io::param_parser::{ConservationLawParams, DiscretizationParamParser, NumericalFluxParams};
use crate::solver::Solver;

pub type InitialCondition = Box<dyn Fn(ArrayView1<f64>) -> Array1<f64> + Send + Sync>;

/// Work to run once the parameters have been resolved to a concrete
/// conservation law and numerical flux.
pub trait SolverTask {
    type Output;
    fn run<L: ConservationLaw, F: NumericalFlux<L>>(
        self,
        solver: Solver<'_, L, F>,
        initial_condition: InitialCondition,
    ) -> Result<Self::Output>;
}

pub fn initialize_reference(params: &DiscretizationParamParser) -> Result<Arc<ReferenceApproximation>> {
    let approximation_type = ApproximationType::from_signed(params.approximation, params.polynomial_order)?;
    let reference =
        ReferenceApproximation::with_quadrature(params.shape, approximation_type, &params.quadrature)?;
    Ok(Arc::new(reference))
}

pub fn initialize_mesh(params: &DiscretizationParamParser) -> Result<Mesh> {
    let mut mesh = if params.periodic {
        uniform_periodic_mesh(
            params.shape,
            &params.elements,
            &params.lower,
            &params.upper,
            params.mapping_degree,
        )?
    } else {
        uniform_mesh(
            params.shape,
            &params.elements,
            &params.lower,
            &params.upper,
            params.mapping_degree,
        )?
    };
    if params.warp_amplitude != 0.0 {
        if params.mapping_degree < 2 {
            return Err(Error::ConfigurationMismatch(
                "a warped mesh needs a mapping degree of at least 2".to_string(),
            ));
        }
        mesh.warp(sine_warp(&params.lower, &params.upper, params.warp_amplitude));
    }
    Ok(mesh)
}

pub fn initialize_disc<'a>(
    mesh: &'a Mesh,
    params: &DiscretizationParamParser,
) -> Result<SpatialDiscretization<'a>> {
    let reference = initialize_reference(params)?;
    SpatialDiscretization::new(mesh, reference, params.operator_algorithm)
}

/// Open boundaries on every tag of the mesh.
pub fn open_boundaries(mesh: &Mesh) -> BoundaryConditions {
    let mut boundaries: BoundaryConditions = HashMap::new();
    for tag in mesh.boundary_tags() {
        boundaries.insert(tag, Box::new(OpenBoundary) as Box<dyn BoundaryCondition>);
    }
    boundaries
}

/// Smooth bump periodic on the box: a scalar for scalar laws, a density
/// wave at constant velocity and pressure for the Euler equations.
pub fn initial_condition(params: &DiscretizationParamParser) -> InitialCondition {
    let lower = params.lower.clone();
    let upper = params.upper.clone();
    let wave = move |x: ArrayView1<f64>| -> f64 {
        (0..x.len())
            .map(|m| (2.0 * PI * (x[m] - lower[m]) / (upper[m] - lower[m])).sin())
            .sum::<f64>()
    };
    match &params.conservation_law {
        ConservationLawParams::Euler { hcr } => {
            let law = Euler::new(params.shape.dim(), *hcr);
            let velocity = vec![0.5; law.dim];
            Box::new(move |x: ArrayView1<f64>| law.conservative(1.0 + 0.2 * wave(x), &velocity, 1.0))
        }
        _ => Box::new(move |x: ArrayView1<f64>| array![wave(x)]),
    }
}

/// Builds the solver matching the parameters and hands it to `task`.
pub fn initialize_solver<T: SolverTask>(
    disc: SpatialDiscretization<'_>,
    params: &DiscretizationParamParser,
    boundaries: BoundaryConditions,
    task: T,
) -> Result<T::Output> {
    let initial = initial_condition(params);
    info!(law = ?params.conservation_law, flux = ?params.numerical_flux, "initializing solver");
    match (&params.conservation_law, params.numerical_flux) {
        (ConservationLawParams::LinearAdvection { velocity }, flux) => {
            let law = LinearAdvection::new(velocity);
            match flux {
                NumericalFluxParams::Central => task.run(Solver::new(disc, law, CentralFlux, boundaries)?, initial),
                NumericalFluxParams::LaxFriedrichs { dissipation } => task.run(
                    Solver::new(disc, law, LaxFriedrichsFlux { dissipation }, boundaries)?,
                    initial,
                ),
                NumericalFluxParams::EntropyConservative => {
                    task.run(Solver::new(disc, law, EntropyConservativeFlux, boundaries)?, initial)
                }
                NumericalFluxParams::Hllc => Err(unsupported_flux("Hllc", "LinearAdvection")),
            }
        }
        (ConservationLawParams::LinearAdvectionDiffusion { velocity, diffusivity }, flux) => {
            let law = LinearAdvectionDiffusion::new(velocity, *diffusivity);
            let scheme = BassiRebay1 {
                penalty: params.penalty,
            };
            match flux {
                NumericalFluxParams::Central => task.run(
                    Solver::new(disc, law, CentralFlux, boundaries)?.with_second_order(scheme),
                    initial,
                ),
                NumericalFluxParams::LaxFriedrichs { dissipation } => task.run(
                    Solver::new(disc, law, LaxFriedrichsFlux { dissipation }, boundaries)?
                        .with_second_order(scheme),
                    initial,
                ),
                NumericalFluxParams::EntropyConservative => task.run(
                    Solver::new(disc, law, EntropyConservativeFlux, boundaries)?
                        .with_second_order(scheme),
                    initial,
                ),
                NumericalFluxParams::Hllc => {
                    Err(unsupported_flux("Hllc", "LinearAdvectionDiffusion"))
                }
            }
        }
        (ConservationLawParams::InviscidBurgers { direction }, flux) => {
            let law = InviscidBurgers::new(direction);
            match flux {
                NumericalFluxParams::Central => task.run(Solver::new(disc, law, CentralFlux, boundaries)?, initial),
                NumericalFluxParams::LaxFriedrichs { dissipation } => task.run(
                    Solver::new(disc, law, LaxFriedrichsFlux { dissipation }, boundaries)?,
                    initial,
                ),
                NumericalFluxParams::EntropyConservative => {
                    task.run(Solver::new(disc, law, EntropyConservativeFlux, boundaries)?, initial)
                }
                NumericalFluxParams::Hllc => Err(unsupported_flux("Hllc", "InviscidBurgers")),
            }
        }
        (ConservationLawParams::Euler { hcr }, flux) => {
            let law = Euler::new(params.shape.dim(), *hcr);
            match flux {
                NumericalFluxParams::Central => task.run(Solver::new(disc, law, CentralFlux, boundaries)?, initial),
                NumericalFluxParams::LaxFriedrichs { dissipation } => task.run(
                    Solver::new(disc, law, LaxFriedrichsFlux { dissipation }, boundaries)?,
                    initial,
                ),
                NumericalFluxParams::Hllc => task.run(Solver::new(disc, law, HllcFlux, boundaries)?, initial),
                NumericalFluxParams::EntropyConservative => {
                    Err(unsupported_flux("EntropyConservative", "Euler"))
                }
            }
        }
    }
}

fn unsupported_flux(flux: &str, law: &str) -> Error {
    Error::ConfigurationMismatch(format!("{flux} flux is not available for {law}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConstructionError;

    fn params(json: &str) -> DiscretizationParamParser {
        DiscretizationParamParser::from_json(json).unwrap()
    }

    const BASE: &str = r#"
        "shape": "Quad",
        "approximation": "NodalTensor",
        "elements": [3, 3],
        "lower": [0.0, 0.0],
        "upper": [1.0, 1.0],
        "periodic": true"#;

    struct ResidualNorm;

    impl SolverTask for ResidualNorm {
        type Output = f64;
        fn run<L: ConservationLaw, F: NumericalFlux<L>>(
            self,
            solver: Solver<'_, L, F>,
            initial_condition: InitialCondition,
        ) -> Result<f64> {
            let u = solver.project_function(initial_condition);
            let du = solver.residual(u.view(), 0.0);
            Ok(du.iter().fold(0.0, |m: f64, v| m.max(v.abs())))
        }
    }

    #[test]
    fn negative_order_is_a_construction_error() {
        let p = params(&format!(
            r#"{{ {BASE}, "polynomial_order": -2,
                "conservation_law": {{ "type": "LinearAdvection", "velocity": [1.0, 0.0] }} }}"#
        ));
        assert!(matches!(
            initialize_reference(&p),
            Err(Error::Construction(ConstructionError::NegativeDegree(-2)))
        ));
    }

    #[test]
    fn incompatible_flux_is_rejected() {
        let p = params(&format!(
            r#"{{ {BASE}, "polynomial_order": 2,
                "conservation_law": {{ "type": "InviscidBurgers", "direction": [1.0, 0.0] }},
                "numerical_flux": {{ "type": "Hllc" }} }}"#
        ));
        let mesh = initialize_mesh(&p).unwrap();
        let disc = initialize_disc(&mesh, &p).unwrap();
        let result = initialize_solver(disc, &p, open_boundaries(&mesh), ResidualNorm);
        assert!(matches!(result, Err(Error::ConfigurationMismatch(_))));
    }

    #[test]
    fn euler_density_wave_runs() {
        let p = params(&format!(
            r#"{{ {BASE}, "polynomial_order": 3, "mapping_degree": 3, "warp_amplitude": 0.02,
                "conservation_law": {{ "type": "Euler", "hcr": 1.4 }},
                "numerical_flux": {{ "type": "Hllc" }} }}"#
        ));
        let mesh = initialize_mesh(&p).unwrap();
        let disc = initialize_disc(&mesh, &p).unwrap();
        let norm = initialize_solver(disc, &p, open_boundaries(&mesh), ResidualNorm).unwrap();
        assert!(norm.is_finite() && norm > 0.0);
    }
}
