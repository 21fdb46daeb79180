//! Curvilinear geometric factors.
//!
//! For every element, at the volume quadrature nodes: the Jacobian
//! determinant `J` of the map from computational to physical coordinates and
//! the metric terms `Λ_mn = J ∂η_m/∂x_n`; at the facet nodes: the scaled
//! normals `nJ_n = Σ_m n̂_m Λ_mn`.
//!
//! Collocation approximations differentiate the interpolated coordinates
//! with the reference operators: cofactors in 2-D and the conservative curl
//! form in 3-D, so that `Σ_m D_m Λ_mn = 0` holds discretely. Modal
//! approximations evaluate the exact Jacobian of the mapping and take its
//! adjugate.
use ndarray::{Array1, Array2, Array3, Array4, ArrayView1, ArrayView2, Axis, s};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::disc::basis::mapping::MappingBasis;
use crate::disc::mesh::Mesh;
use crate::disc::reference_approximation::ReferenceApproximation;
use crate::disc::reference_element::cross;
use crate::error::{Error, Result};

#[derive(Clone, Debug)]
pub struct GeometricFactors {
    /// `(K, N_q)`
    pub jacobian: Array2<f64>,
    /// `(K, N_q, d, d)`, indexed `[k, q, m, n]`.
    pub metrics: Array4<f64>,
    /// `(K, N_f, d)` over the concatenated facet nodes.
    pub scaled_normals: Array3<f64>,
    /// `(K, N_f)`
    pub normal_magnitudes: Array2<f64>,
    /// `(K, N_q, d)`
    pub volume_coordinates: Array3<f64>,
    /// `(K, N_f, d)`
    pub facet_coordinates: Array3<f64>,
}

struct ElementGeometry {
    x: Array2<f64>,
    jacobian: Array1<f64>,
    metrics: Array3<f64>,
    facet_x: Array2<f64>,
    nj: Array2<f64>,
}

impl GeometricFactors {
    pub fn new(mesh: &Mesh, reference: &ReferenceApproximation) -> Result<Self> {
        if mesh.shape != reference.shape {
            return Err(Error::ConfigurationMismatch(format!(
                "{:?} mesh with a {:?} reference approximation",
                mesh.shape, reference.shape
            )));
        }
        if mesh.mapping_degree > reference.degree() {
            warn!(
                mapping_degree = mesh.mapping_degree,
                degree = reference.degree(),
                "mapping degree exceeds the approximation degree"
            );
        }
        let d = reference.dim();
        let nq = reference.num_volume_nodes();
        let nf = reference.num_facet_nodes();
        let k = mesh.num_elements();

        let mapping = MappingBasis::new(mesh.shape, mesh.mapping_degree)?;
        let volume_interp =
            mapping.interpolation_matrix(reference.volume_quadrature.reference_points.view());
        let facet_points = concatenated_facet_points(reference);
        let facet_interp = mapping.interpolation_matrix(facet_points.view());
        let exact_derivatives = if reference.is_collocation() {
            None
        } else {
            Some((
                mapping.derivative_matrices(reference.volume_quadrature.reference_points.view()),
                mapping.derivative_matrices(facet_points.view()),
            ))
        };

        let elements: Vec<ElementGeometry> = (0..k)
            .into_par_iter()
            .map(|e| {
                let nodes = mesh.element_nodes(e);
                let x = volume_interp.dot(&nodes);
                let facet_x = facet_interp.dot(&nodes);
                let (jacobian, metrics, nj) = match &exact_derivatives {
                    None => discrete_metrics(reference, x.view()),
                    Some((vol, fac)) => exact_metrics(reference, nodes, vol, fac),
                };
                ElementGeometry {
                    x,
                    jacobian,
                    metrics,
                    facet_x,
                    nj,
                }
            })
            .collect();

        for (e, geo) in elements.iter().enumerate() {
            if let Some((node, &jacobian)) = geo
                .jacobian
                .iter()
                .enumerate()
                .find(|&(_, j)| !(j.is_finite() && *j > 0.0))
            {
                return Err(Error::DegenerateElement {
                    element: e,
                    node,
                    jacobian,
                });
            }
        }

        let mut factors = Self {
            jacobian: Array2::zeros((k, nq)),
            metrics: Array4::zeros((k, nq, d, d)),
            scaled_normals: Array3::zeros((k, nf, d)),
            normal_magnitudes: Array2::zeros((k, nf)),
            volume_coordinates: Array3::zeros((k, nq, d)),
            facet_coordinates: Array3::zeros((k, nf, d)),
        };
        for (e, geo) in elements.into_iter().enumerate() {
            factors.jacobian.row_mut(e).assign(&geo.jacobian);
            factors
                .metrics
                .slice_mut(s![e, .., .., ..])
                .assign(&geo.metrics);
            factors
                .normal_magnitudes
                .row_mut(e)
                .assign(&geo.nj.map_axis(Axis(1), |n| n.dot(&n).sqrt()));
            factors
                .scaled_normals
                .slice_mut(s![e, .., ..])
                .assign(&geo.nj);
            factors
                .volume_coordinates
                .slice_mut(s![e, .., ..])
                .assign(&geo.x);
            factors
                .facet_coordinates
                .slice_mut(s![e, .., ..])
                .assign(&geo.facet_x);
        }
        info!(
            elements = k,
            volume_nodes = nq,
            facet_nodes = nf,
            mapping_degree = mesh.mapping_degree,
            "computed geometric factors"
        );
        Ok(factors)
    }

    pub fn num_elements(&self) -> usize {
        self.jacobian.nrows()
    }
    /// `max_q |Σ_m D_m Λ_mn|` over all elements and directions `n`, for
    /// collocation approximations.
    pub fn metric_identity_defect(&self, reference: &ReferenceApproximation) -> f64 {
        let d = reference.dim();
        let mut defect: f64 = 0.0;
        for e in 0..self.num_elements() {
            let mut total = Array2::<f64>::zeros((reference.num_volume_nodes(), d));
            for m in 0..d {
                let lambda_m = self.metrics.slice(s![e, .., m, ..]);
                total += &reference.derivatives[m].apply(lambda_m);
            }
            defect = total.iter().fold(defect, |acc, v| acc.max(v.abs()));
        }
        defect
    }
}

fn concatenated_facet_points(reference: &ReferenceApproximation) -> Array2<f64> {
    let d = reference.dim();
    let mut points = Array2::<f64>::zeros((reference.num_facet_nodes(), d));
    for (f, facet) in reference.facets.iter().enumerate() {
        let start = reference.facet_offsets[f];
        points
            .slice_mut(s![start..start + facet.len(), ..])
            .assign(&facet.reference_points);
    }
    points
}

/// Metrics from discrete derivatives of the coordinates at the volume nodes.
fn discrete_metrics(
    reference: &ReferenceApproximation,
    x: ArrayView2<f64>,
) -> (Array1<f64>, Array3<f64>, Array2<f64>) {
    let d = reference.dim();
    let nq = x.nrows();
    // grads[m][[q, n]] = ∂x_n/∂η_m
    let grads: Vec<Array2<f64>> = reference.derivatives.iter().map(|op| op.apply(x)).collect();
    let mut jacobian = Array1::<f64>::zeros(nq);
    let mut metrics = Array3::<f64>::zeros((nq, d, d));
    match d {
        1 => {
            jacobian.assign(&grads[0].column(0));
            metrics.fill(1.0);
        }
        2 => {
            for q in 0..nq {
                let (xa, ya) = (grads[0][[q, 0]], grads[0][[q, 1]]);
                let (xb, yb) = (grads[1][[q, 0]], grads[1][[q, 1]]);
                jacobian[q] = xa * yb - xb * ya;
                metrics[[q, 0, 0]] = yb;
                metrics[[q, 0, 1]] = -xb;
                metrics[[q, 1, 0]] = -ya;
                metrics[[q, 1, 1]] = xa;
            }
        }
        _ => {
            for q in 0..nq {
                let g: Vec<Array1<f64>> = (0..3).map(|m| grads[m].row(q).to_owned()).collect();
                jacobian[q] = cross(g[0].view(), g[1].view()).dot(&g[2]);
            }
            for n in 0..3 {
                let (m, l) = ((n + 1) % 3, (n + 2) % 3);
                // flux[[q, k]] = x_l ∂x_m/∂η_k
                let mut flux = Array2::<f64>::zeros((nq, 3));
                for k in 0..3 {
                    let column = &x.column(l) * &grads[k].column(m);
                    flux.column_mut(k).assign(&column);
                }
                // dflux[j][[q, k]] = ∂/∂η_j (x_l ∂x_m/∂η_k)
                let dflux: Vec<Array2<f64>> = reference
                    .derivatives
                    .iter()
                    .map(|op| op.apply(flux.view()))
                    .collect();
                for q in 0..nq {
                    metrics[[q, 0, n]] = -(dflux[1][[q, 2]] - dflux[2][[q, 1]]);
                    metrics[[q, 1, n]] = -(dflux[2][[q, 0]] - dflux[0][[q, 2]]);
                    metrics[[q, 2, n]] = -(dflux[0][[q, 1]] - dflux[1][[q, 0]]);
                }
            }
        }
    }
    let mut nj = Array2::<f64>::zeros((reference.num_facet_nodes(), d));
    for (f, facet) in reference.facets.iter().enumerate() {
        let start = reference.facet_offsets[f];
        let mut block = nj.slice_mut(s![start..start + facet.len(), ..]);
        for m in 0..d {
            if facet.normal[m] == 0.0 {
                continue;
            }
            let lambda_m = metrics.index_axis(Axis(1), m);
            let traced = facet.extrapolation.apply(lambda_m);
            block.scaled_add(facet.normal[m], &traced);
        }
    }
    (jacobian, metrics, nj)
}

/// Metrics from the exact Jacobian of the mapping at every quadrature point.
fn exact_metrics(
    reference: &ReferenceApproximation,
    nodes: ArrayView2<f64>,
    volume_derivatives: &[Array2<f64>],
    facet_derivatives: &[Array2<f64>],
) -> (Array1<f64>, Array3<f64>, Array2<f64>) {
    let (jacobian, metrics) = adjugate(nodes, volume_derivatives);
    let (_, facet_metrics) = adjugate(nodes, facet_derivatives);
    let d = reference.dim();
    let mut nj = Array2::<f64>::zeros((reference.num_facet_nodes(), d));
    for (f, facet) in reference.facets.iter().enumerate() {
        let start = reference.facet_offsets[f];
        for i in start..start + facet.len() {
            for m in 0..d {
                for n in 0..d {
                    nj[[i, n]] += facet.normal[m] * facet_metrics[[i, m, n]];
                }
            }
        }
    }
    (jacobian, metrics, nj)
}

/// `J` and `adj(∂x/∂ξ)` at the points where `derivatives` were evaluated.
fn adjugate(nodes: ArrayView2<f64>, derivatives: &[Array2<f64>]) -> (Array1<f64>, Array3<f64>) {
    let d = derivatives.len();
    // g[m][[q, n]] = ∂x_n/∂ξ_m
    let g: Vec<Array2<f64>> = derivatives.iter().map(|dm| dm.dot(&nodes)).collect();
    let np = g[0].nrows();
    let mut jacobian = Array1::<f64>::zeros(np);
    let mut metrics = Array3::<f64>::zeros((np, d, d));
    for q in 0..np {
        match d {
            1 => {
                jacobian[q] = g[0][[q, 0]];
                metrics[[q, 0, 0]] = 1.0;
            }
            2 => {
                let (xa, ya) = (g[0][[q, 0]], g[0][[q, 1]]);
                let (xb, yb) = (g[1][[q, 0]], g[1][[q, 1]]);
                jacobian[q] = xa * yb - xb * ya;
                metrics[[q, 0, 0]] = yb;
                metrics[[q, 0, 1]] = -xb;
                metrics[[q, 1, 0]] = -ya;
                metrics[[q, 1, 1]] = xa;
            }
            _ => {
                for m in 0..3 {
                    let row = cross(g[(m + 1) % 3].row(q), g[(m + 2) % 3].row(q));
                    metrics.slice_mut(s![q, m, ..]).assign(&row);
                }
                let first: ArrayView1<f64> = metrics.slice(s![q, 0, ..]);
                jacobian[q] = first.dot(&g[0].row(q));
            }
        }
    }
    (jacobian, metrics)
}
