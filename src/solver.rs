//! Semi-discrete residual in weak conservation form.
//!
//! For every element `k`,
//!
//! `M_k du_k = Σ_m V_η,m^T W Σ_n Λ_mn F_n(u, q) − Σ_f R_f^T B_f |nJ| F*`
//!
//! evaluated in phases: traces, exterior states, auxiliary gradient (second
//! order only), then volume, facet and source terms. Each phase runs in
//! parallel over elements.
use ndarray::{
    Array1, Array2, Array3, Array4, ArrayView1, ArrayView2, ArrayView3, ArrayView4,
    ArrayViewMut2, ArrayViewMut3, ArrayViewMut4, Axis, Zip, s,
};
use tracing::info;

use crate::disc::boundary::BoundaryConditions;
use crate::disc::conservation_law::{ConservationLaw, PdeType};
use crate::disc::flux::{BassiRebay1, NumericalFlux};
use crate::disc::spatial_discretization::{SpatialDiscretization, TraceTarget};
use crate::error::{Error, Result};

pub type SourceTerm = Box<dyn Fn(ArrayView1<f64>, f64) -> Array1<f64> + Send + Sync>;

pub struct Solver<'a, L: ConservationLaw, F: NumericalFlux<L>> {
    pub disc: SpatialDiscretization<'a>,
    pub law: L,
    pub flux: F,
    pub second_order: BassiRebay1,
    pub boundaries: BoundaryConditions,
    pub source: Option<SourceTerm>,
}

/// Facet traces of the primal and auxiliary variables.
struct Traces {
    /// `(K, N_q, N_c)`
    volume: Array3<f64>,
    /// `(K, N_f, N_c)`
    interior: Array3<f64>,
    exterior: Array3<f64>,
}

/// Auxiliary gradient at volume and facet nodes, `(K, d, N, N_c)`.
struct GradientTraces {
    volume: Array4<f64>,
    interior: Array4<f64>,
    exterior: Array4<f64>,
}

impl<'a, L: ConservationLaw, F: NumericalFlux<L>> Solver<'a, L, F> {
    pub fn new(
        disc: SpatialDiscretization<'a>,
        law: L,
        flux: F,
        boundaries: BoundaryConditions,
    ) -> Result<Self> {
        if law.dim() != disc.dim() {
            return Err(Error::ConfigurationMismatch(format!(
                "{}-dimensional conservation law on a {}-dimensional mesh",
                law.dim(),
                disc.dim()
            )));
        }
        if let Some(tag) = disc
            .mesh
            .boundary_tags()
            .into_iter()
            .find(|tag| !boundaries.contains_key(tag))
        {
            return Err(Error::ConfigurationMismatch(format!(
                "no boundary condition for {tag:?}"
            )));
        }
        info!(
            elements = disc.num_elements(),
            variables = law.num_vars(),
            pde_type = ?law.pde_type(),
            boundaries = boundaries.len(),
            "built solver"
        );
        Ok(Self {
            disc,
            law,
            flux,
            second_order: BassiRebay1::default(),
            boundaries,
            source: None,
        })
    }

    pub fn with_source(mut self, source: SourceTerm) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_second_order(mut self, scheme: BassiRebay1) -> Self {
        self.second_order = scheme;
        self
    }

    /// `(K, N_p, N_c)`.
    pub fn solution_shape(&self) -> (usize, usize, usize) {
        (
            self.disc.num_elements(),
            self.disc.num_solution_nodes(),
            self.law.num_vars(),
        )
    }

    /// `(K, d, N_p, N_c)`.
    pub fn auxiliary_shape(&self) -> (usize, usize, usize, usize) {
        let (k, np, nc) = self.solution_shape();
        (k, self.disc.dim(), np, nc)
    }

    /// Writes `du/dt` for the state `u` at time `t`.
    pub fn rhs(&self, du: ArrayViewMut3<f64>, u: ArrayView3<f64>, t: f64) {
        match self.law.pde_type() {
            PdeType::FirstOrder => self.evaluate(du, None, u, t),
            PdeType::SecondOrder => {
                let mut q = Array4::zeros(self.auxiliary_shape());
                self.evaluate(du, Some(q.view_mut()), u, t);
            }
        }
    }

    /// As [`Solver::rhs`], also returning the auxiliary gradient in `q`
    /// (left untouched for first-order laws).
    pub fn rhs_with_auxiliary(
        &self,
        du: ArrayViewMut3<f64>,
        q: ArrayViewMut4<f64>,
        u: ArrayView3<f64>,
        t: f64,
    ) {
        match self.law.pde_type() {
            PdeType::FirstOrder => self.evaluate(du, None, u, t),
            PdeType::SecondOrder => self.evaluate(du, Some(q), u, t),
        }
    }

    pub fn residual(&self, u: ArrayView3<f64>, t: f64) -> Array3<f64> {
        let mut du = Array3::zeros(u.raw_dim());
        self.rhs(du.view_mut(), u, t);
        du
    }

    fn evaluate(
        &self,
        mut du: ArrayViewMut3<f64>,
        q: Option<ArrayViewMut4<f64>>,
        u: ArrayView3<f64>,
        t: f64,
    ) {
        let traces = self.traces(u, t);
        let gradients = q.map(|mut q| {
            self.auxiliary(q.view_mut(), &traces);
            self.gradient_traces(q.view())
        });
        let disc = &self.disc;
        let reference = &disc.reference;
        let ops = &disc.operators;
        let (np, nc) = (u.shape()[1], u.shape()[2]);
        let (d, nq) = (disc.dim(), disc.num_volume_nodes());
        let weights = &reference.volume_quadrature.weights;

        Zip::indexed(du.outer_iter_mut()).par_for_each(|e, mut due| {
            let mut r = Array2::<f64>::zeros((np, nc));

            let metrics = disc.geometry.metrics.index_axis(Axis(0), e);
            let mut contravariant: Vec<Array2<f64>> =
                (0..d).map(|_| Array2::zeros((nq, nc))).collect();
            for node in 0..nq {
                let q_node = gradients
                    .as_ref()
                    .map(|g| g.volume.slice(s![e, .., node, ..]));
                let flux = self
                    .law
                    .physical_flux(traces.volume.slice(s![e, node, ..]), q_node);
                for (m, g) in contravariant.iter_mut().enumerate() {
                    for n in 0..d {
                        g.row_mut(node)
                            .scaled_add(weights[node] * metrics[[node, m, n]], &flux.row(n));
                    }
                }
            }
            for (m, g) in contravariant.iter().enumerate() {
                r += &ops.derivatives[m].apply_transpose(g.view());
            }

            for (f, facet) in reference.facets.iter().enumerate() {
                let start = reference.facet_offsets[f];
                let mut h = Array2::<f64>::zeros((facet.len(), nc));
                for (i, mut row) in h.outer_iter_mut().enumerate() {
                    let node = start + i;
                    let q_pair = gradients.as_ref().map(|g| {
                        (
                            g.interior.slice(s![e, .., node, ..]),
                            g.exterior.slice(s![e, .., node, ..]),
                        )
                    });
                    let flux = self.facet_flux(e, node, &traces, q_pair);
                    row.assign(&(flux * facet.weights[i]));
                }
                r -= &ops.extrapolations[f].apply_transpose(h.view());
            }

            if let Some(source) = &self.source {
                let mut s_q = Array2::<f64>::zeros((nq, nc));
                for (node, mut row) in s_q.outer_iter_mut().enumerate() {
                    let x = disc.geometry.volume_coordinates.slice(s![e, node, ..]);
                    let wj = weights[node] * disc.geometry.jacobian[[e, node]];
                    row.assign(&(source(x, t) * wj));
                }
                r += &ops.volume_interpolation.apply_transpose(s_q.view());
            }

            due.assign(&disc.apply_inverse_mass(e, r.view()));
        });
    }

    /// Volume values, facet traces and exterior states of `u`.
    fn traces(&self, u: ArrayView3<f64>, t: f64) -> Traces {
        let disc = &self.disc;
        let (k, _, nc) = u.dim();
        let (nq, nf) = (disc.num_volume_nodes(), disc.num_facet_nodes());
        let mut volume = Array3::<f64>::zeros((k, nq, nc));
        let mut interior = Array3::<f64>::zeros((k, nf, nc));
        Zip::from(volume.outer_iter_mut())
            .and(interior.outer_iter_mut())
            .and(u.outer_iter())
            .par_for_each(|mut vol, mut fac, ue| {
                vol.assign(&disc.operators.volume_interpolation.apply(ue));
                self.extrapolate(ue, fac.view_mut());
            });

        let mut exterior = Array3::<f64>::zeros((k, nf, nc));
        Zip::indexed(exterior.outer_iter_mut()).par_for_each(|e, mut ext| {
            for (i, target) in disc.trace_targets[e].iter().enumerate() {
                let u_in = interior.slice(s![e, i, ..]);
                match *target {
                    TraceTarget::Interior { element, node } => {
                        ext.row_mut(i).assign(&interior.slice(s![element, node, ..]));
                    }
                    TraceTarget::Degenerate => ext.row_mut(i).assign(&u_in),
                    TraceTarget::Boundary(tag) => {
                        if let Some(bc) = self.boundaries.get(&tag) {
                            let x = disc.geometry.facet_coordinates.slice(s![e, i, ..]);
                            let n = self.unit_normal(e, i);
                            bc.exterior_state(x, n.view(), t, u_in, ext.row_mut(i));
                        }
                    }
                }
            }
        });
        Traces {
            volume,
            interior,
            exterior,
        }
    }

    /// `R_f u` for every facet, concatenated into `out`.
    fn extrapolate(&self, ue: ArrayView2<f64>, mut out: ArrayViewMut2<f64>) {
        let reference = &self.disc.reference;
        for (f, facet) in reference.facets.iter().enumerate() {
            let start = reference.facet_offsets[f];
            out.slice_mut(s![start..start + facet.len(), ..])
                .assign(&self.disc.operators.extrapolations[f].apply(ue));
        }
    }

    /// `M Q_n = −Σ_m V_η,m^T W Λ_mn u + Σ_f R_f^T B_f nJ_n û`.
    fn auxiliary(&self, mut q: ArrayViewMut4<f64>, traces: &Traces) {
        let disc = &self.disc;
        let reference = &disc.reference;
        let ops = &disc.operators;
        let d = disc.dim();
        let weights = &reference.volume_quadrature.weights;
        let nc = traces.volume.shape()[2];
        let np = q.shape()[2];
        let lift_rows = |view: ArrayView2<f64>| -> Array2<f64> {
            let mut out = Array2::zeros((view.nrows(), nc));
            for (mut row, u) in out.outer_iter_mut().zip(view.outer_iter()) {
                row.assign(&self.law.auxiliary_flux(u));
            }
            out
        };

        Zip::indexed(q.outer_iter_mut()).par_for_each(|e, mut qe| {
            let metrics = disc.geometry.metrics.index_axis(Axis(0), e);
            let aux = lift_rows(traces.volume.index_axis(Axis(0), e));
            let aux_in = lift_rows(traces.interior.index_axis(Axis(0), e));
            let aux_out = lift_rows(traces.exterior.index_axis(Axis(0), e));
            for n in 0..d {
                let mut r = Array2::<f64>::zeros((np, nc));
                for m in 0..d {
                    let scale = &metrics.slice(s![.., m, n]) * weights;
                    let scaled = &aux * &scale.insert_axis(Axis(1));
                    r -= &ops.derivatives[m].apply_transpose(scaled.view());
                }
                for (f, facet) in reference.facets.iter().enumerate() {
                    let start = reference.facet_offsets[f];
                    let mut h = Array2::<f64>::zeros((facet.len(), nc));
                    for (i, mut row) in h.outer_iter_mut().enumerate() {
                        let node = start + i;
                        let hat = self
                            .second_order
                            .auxiliary_trace(aux_in.row(node), aux_out.row(node));
                        let nj = disc.geometry.scaled_normals[[e, node, n]];
                        row.assign(&(hat * (facet.weights[i] * nj)));
                    }
                    r += &ops.extrapolations[f].apply_transpose(h.view());
                }
                qe.index_axis_mut(Axis(0), n)
                    .assign(&disc.apply_inverse_mass(e, r.view()));
            }
        });
    }

    fn gradient_traces(&self, q: ArrayView4<f64>) -> GradientTraces {
        let disc = &self.disc;
        let (k, d, _, nc) = q.dim();
        let (nq, nf) = (disc.num_volume_nodes(), disc.num_facet_nodes());
        let mut volume = Array4::<f64>::zeros((k, d, nq, nc));
        let mut interior = Array4::<f64>::zeros((k, d, nf, nc));
        Zip::from(volume.outer_iter_mut())
            .and(interior.outer_iter_mut())
            .and(q.outer_iter())
            .par_for_each(|mut vol, mut fac, qe| {
                for n in 0..d {
                    let qn = qe.index_axis(Axis(0), n);
                    vol.index_axis_mut(Axis(0), n)
                        .assign(&disc.operators.volume_interpolation.apply(qn));
                    self.extrapolate(qn, fac.index_axis_mut(Axis(0), n));
                }
            });
        let mut exterior = Array4::<f64>::zeros((k, d, nf, nc));
        Zip::indexed(exterior.outer_iter_mut()).par_for_each(|e, mut ext| {
            for (i, target) in disc.trace_targets[e].iter().enumerate() {
                let (element, node) = match *target {
                    TraceTarget::Interior { element, node } => (element, node),
                    TraceTarget::Boundary(_) | TraceTarget::Degenerate => (e, i),
                };
                ext.slice_mut(s![.., i, ..])
                    .assign(&interior.slice(s![element, .., node, ..]));
            }
        });
        GradientTraces {
            volume,
            interior,
            exterior,
        }
    }

    fn unit_normal(&self, e: usize, node: usize) -> Array1<f64> {
        let nj = self.disc.geometry.scaled_normals.slice(s![e, node, ..]);
        let magnitude = self.disc.geometry.normal_magnitudes[[e, node]];
        if magnitude > 0.0 {
            &nj / magnitude
        } else {
            Array1::zeros(nj.len())
        }
    }

    /// `|nJ| F*` at one facet node.
    fn facet_flux(
        &self,
        e: usize,
        node: usize,
        traces: &Traces,
        q: Option<(ArrayView2<f64>, ArrayView2<f64>)>,
    ) -> Array1<f64> {
        let u_in = traces.interior.slice(s![e, node, ..]);
        let u_out = traces.exterior.slice(s![e, node, ..]);
        if self.disc.trace_targets[e][node] == TraceTarget::Degenerate {
            let nj = self.disc.geometry.scaled_normals.slice(s![e, node, ..]);
            let flux = self.law.physical_flux(u_in, q.map(|(q_in, _)| q_in));
            return nj.dot(&flux);
        }
        let magnitude = self.disc.geometry.normal_magnitudes[[e, node]];
        let n = self.unit_normal(e, node);
        let mut flux = self.flux.numerical_flux(&self.law, u_in, u_out, n.view());
        if let Some((q_in, q_out)) = q {
            flux -= &self
                .second_order
                .viscous_flux(&self.law, (u_in, q_in), (u_out, q_out), n.view());
        }
        flux * magnitude
    }

    /// L2 projection of `f` onto the approximation space.
    pub fn project_function(&self, f: impl Fn(ArrayView1<f64>) -> Array1<f64> + Sync) -> Array3<f64> {
        let disc = &self.disc;
        let (k, np, nc) = self.solution_shape();
        let weights = &disc.reference.volume_quadrature.weights;
        let mut u = Array3::<f64>::zeros((k, np, nc));
        Zip::indexed(u.outer_iter_mut()).par_for_each(|e, mut ue| {
            let mut values = Array2::<f64>::zeros((disc.num_volume_nodes(), nc));
            for (node, mut row) in values.outer_iter_mut().enumerate() {
                let x = disc.geometry.volume_coordinates.slice(s![e, node, ..]);
                let wj = weights[node] * disc.geometry.jacobian[[e, node]];
                row.assign(&(f(x) * wj));
            }
            let rhs = disc.operators.volume_interpolation.apply_transpose(values.view());
            ue.assign(&disc.apply_inverse_mass(e, rhs.view()));
        });
        u
    }

    /// `∫ u dx` per variable.
    pub fn integrate(&self, u: ArrayView3<f64>) -> Array1<f64> {
        let wj = self.disc.physical_weights();
        let mut total = Array1::<f64>::zeros(u.shape()[2]);
        for (e, ue) in u.outer_iter().enumerate() {
            let values = self.disc.operators.volume_interpolation.apply(ue);
            total += &wj.row(e).dot(&values);
        }
        total
    }

    /// `‖u − f‖_L2` per variable, evaluated with the volume quadrature.
    pub fn l2_error(
        &self,
        u: ArrayView3<f64>,
        exact: impl Fn(ArrayView1<f64>) -> Array1<f64>,
    ) -> Array1<f64> {
        let wj = self.disc.physical_weights();
        let mut total = Array1::<f64>::zeros(u.shape()[2]);
        for (e, ue) in u.outer_iter().enumerate() {
            let values = self.disc.operators.volume_interpolation.apply(ue);
            for (node, row) in values.outer_iter().enumerate() {
                let x = self.disc.geometry.volume_coordinates.slice(s![e, node, ..]);
                let diff = &row - &exact(x);
                total.scaled_add(wj[[e, node]], &(&diff * &diff));
            }
        }
        total.mapv(f64::sqrt)
    }
}

/// First non-finite entry of a residual, for integrators that want to stop
/// on blow-up.
pub fn check_finite(du: ArrayView3<f64>) -> Result<()> {
    match du.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((element, node, variable), _)) => Err(Error::NumericalInstability {
            element,
            node,
            variable,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disc::boundary::OpenBoundary;
    use crate::disc::conservation_law::LinearAdvection;
    use crate::disc::flux::LaxFriedrichsFlux;
    use crate::disc::mesh::{BoundaryTag, uniform_mesh, uniform_periodic_mesh};
    use crate::disc::operators::OperatorAlgorithm;
    use crate::disc::reference_approximation::{ApproximationType, ReferenceApproximation};
    use crate::disc::reference_element::Shape;
    use approx::assert_relative_eq;
    use hashbrown::HashMap;
    use ndarray::array;
    use std::sync::Arc;

    #[test]
    fn constant_state_has_zero_residual() {
        let mesh = uniform_periodic_mesh(Shape::Quad, &[3, 3], &[0.0; 2], &[1.0; 2], 1).unwrap();
        let reference =
            Arc::new(ReferenceApproximation::new(Shape::Quad, ApproximationType::NodalTensor(3)).unwrap());
        let disc =
            SpatialDiscretization::new(&mesh, reference, OperatorAlgorithm::default()).unwrap();
        let solver = Solver::new(
            disc,
            LinearAdvection::new(&[1.0, 0.5]),
            LaxFriedrichsFlux::default(),
            HashMap::new(),
        )
        .unwrap();
        let u = solver.project_function(|_| array![2.0]);
        let du = solver.residual(u.view(), 0.0);
        assert!(du.iter().all(|v| v.abs() < 1e-10));
        assert_relative_eq!(solver.integrate(u.view())[0], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn missing_boundary_condition_is_rejected() {
        let mesh = uniform_mesh(Shape::Line, &[4], &[0.0], &[1.0], 1).unwrap();
        let reference =
            Arc::new(ReferenceApproximation::new(Shape::Line, ApproximationType::NodalTensor(2)).unwrap());
        let disc =
            SpatialDiscretization::new(&mesh, reference, OperatorAlgorithm::default()).unwrap();
        let mut boundaries: BoundaryConditions = HashMap::new();
        boundaries.insert(BoundaryTag::Left, Box::new(OpenBoundary));
        let result = Solver::new(
            disc,
            LinearAdvection::new(&[1.0]),
            LaxFriedrichsFlux::default(),
            boundaries,
        );
        assert!(matches!(result, Err(Error::ConfigurationMismatch(_))));
    }

    #[test]
    fn check_finite_reports_location() {
        let mut du = Array3::<f64>::zeros((2, 3, 1));
        du[[1, 2, 0]] = f64::NAN;
        match check_finite(du.view()) {
            Err(Error::NumericalInstability {
                element,
                node,
                variable,
            }) => assert_eq!((element, node, variable), (1, 2, 0)),
            other => panic!("unexpected {other:?}"),
        }
    }
}
