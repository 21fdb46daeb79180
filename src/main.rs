use ndarray::Array1;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sbp_disc::disc::conservation_law::ConservationLaw;
use sbp_disc::disc::flux::NumericalFlux;
use sbp_disc::initialization::{
    InitialCondition, SolverTask, initialize_disc, initialize_mesh, initialize_solver,
    open_boundaries,
};
use sbp_disc::io::param_parser::DiscretizationParamParser;
use sbp_disc::io::write_to_csv::write_to_csv;
use sbp_disc::solver::{Solver, check_finite};

/// Projects the initial condition, evaluates one residual and writes both.
struct ResidualReport<'p> {
    output_prefix: &'p str,
}

impl SolverTask for ResidualReport<'_> {
    type Output = ();
    fn run<L: ConservationLaw, F: NumericalFlux<L>>(
        self,
        solver: Solver<'_, L, F>,
        initial_condition: InitialCondition,
    ) -> sbp_disc::Result<()> {
        let u = solver.project_function(&initial_condition);
        let du = solver.residual(u.view(), 0.0);
        check_finite(du.view())?;
        let projection_error = solver.l2_error(u.view(), &initial_condition);
        let mass_rate: Array1<f64> = solver.integrate(du.view());
        info!(
            total = ?solver.integrate(u.view()).to_vec(),
            rate = ?mass_rate.to_vec(),
            projection_error = ?projection_error.to_vec(),
            "evaluated residual"
        );
        write_to_csv(
            u.view(),
            &solver.disc,
            &format!("{}_solution.csv", self.output_prefix),
        )?;
        write_to_csv(
            du.view(),
            &solver.disc,
            &format!("{}_residual.csv", self.output_prefix),
        )?;
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let input = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "inputs/discretization.json".to_string());
    let params = DiscretizationParamParser::parse(&input)?;
    let mesh = initialize_mesh(&params)?;
    let disc = initialize_disc(&mesh, &params)?;
    let boundaries = open_boundaries(&mesh);
    initialize_solver(
        disc,
        &params,
        boundaries,
        ResidualReport {
            output_prefix: "outputs/sbp",
        },
    )?;
    Ok(())
}
