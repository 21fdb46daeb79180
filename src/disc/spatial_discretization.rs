//! A reference approximation placed on a mesh.
use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView2, Axis, s};
use ndarray_stats::QuantileExt;
use rayon::prelude::*;
use tracing::info;

use crate::disc::geometric::GeometricFactors;
use crate::disc::linalg::Inverse;
use crate::disc::mesh::{BoundaryTag, FacetConnection, Mesh};
use crate::disc::operators::{OperatorAlgorithm, ReferenceOperator};
use crate::disc::reference_approximation::ReferenceApproximation;
use crate::error::{Error, Result};

/// Where the exterior state of a facet node comes from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TraceTarget {
    /// Node of the neighbour's concatenated facet nodes.
    Interior { element: usize, node: usize },
    Boundary(BoundaryTag),
    /// Computational facet collapsed onto an edge or a vertex; the exterior
    /// state is the interior one.
    Degenerate,
}

#[derive(Clone, Debug)]
pub enum InverseMass {
    /// `1 / (W J)`, `(K, N_q)`.
    Diagonal(Array2<f64>),
    /// `(V^T diag(W J) V)^{-1}` per element.
    Dense(Vec<Array2<f64>>),
}

/// Reference operators in the form the chosen algorithm applies them.
#[derive(Clone, Debug)]
pub struct PreparedOperators {
    pub volume_interpolation: ReferenceOperator,
    pub derivatives: Vec<ReferenceOperator>,
    pub extrapolations: Vec<ReferenceOperator>,
}

impl PreparedOperators {
    pub fn new(reference: &ReferenceApproximation, algorithm: OperatorAlgorithm) -> Self {
        Self {
            volume_interpolation: reference.volume_interpolation.clone().prepare(algorithm),
            derivatives: reference
                .derivatives
                .iter()
                .map(|d| d.clone().prepare(algorithm))
                .collect(),
            extrapolations: reference
                .facets
                .iter()
                .map(|f| f.extrapolation.clone().prepare(algorithm))
                .collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SpatialDiscretization<'a> {
    pub mesh: &'a Mesh,
    pub reference: Arc<ReferenceApproximation>,
    pub geometry: GeometricFactors,
    pub algorithm: OperatorAlgorithm,
    pub operators: PreparedOperators,
    /// Per element, per concatenated facet node.
    pub trace_targets: Vec<Vec<TraceTarget>>,
    pub inverse_mass: InverseMass,
}

impl<'a> SpatialDiscretization<'a> {
    pub fn new(
        mesh: &'a Mesh,
        reference: Arc<ReferenceApproximation>,
        algorithm: OperatorAlgorithm,
    ) -> Result<Self> {
        let geometry = GeometricFactors::new(mesh, &reference)?;
        let trace_targets = match_facet_nodes(mesh, &reference, &geometry)?;
        let inverse_mass = inverse_mass(&reference, &geometry)?;
        let operators = PreparedOperators::new(&reference, algorithm);
        info!(
            shape = ?reference.shape,
            approximation = reference.approximation_type.name(),
            degree = reference.degree(),
            elements = mesh.num_elements(),
            ?algorithm,
            "built spatial discretization"
        );
        Ok(Self {
            mesh,
            reference,
            geometry,
            algorithm,
            operators,
            trace_targets,
            inverse_mass,
        })
    }

    pub fn dim(&self) -> usize {
        self.reference.dim()
    }
    pub fn num_elements(&self) -> usize {
        self.mesh.num_elements()
    }
    /// Solution coefficients per element.
    pub fn num_solution_nodes(&self) -> usize {
        self.reference.num_modes
    }
    pub fn num_volume_nodes(&self) -> usize {
        self.reference.num_volume_nodes()
    }
    pub fn num_facet_nodes(&self) -> usize {
        self.reference.num_facet_nodes()
    }
    /// `W J` at the volume nodes, `(K, N_q)`.
    pub fn physical_weights(&self) -> Array2<f64> {
        &self.geometry.jacobian * &self.reference.volume_quadrature.weights
    }
    /// `M_k^{-1} r` for the `(N_p, N_c)` array `r`.
    pub fn apply_inverse_mass(&self, element: usize, r: ArrayView2<f64>) -> Array2<f64> {
        match &self.inverse_mass {
            InverseMass::Diagonal(inv) => &r * &inv.row(element).insert_axis(Axis(1)),
            InverseMass::Dense(inv) => inv[element].dot(&r),
        }
    }
    /// Dense `V^T diag(W J) V` of one element.
    pub fn mass_matrix(&self, element: usize) -> Array2<f64> {
        let v = self.reference.volume_interpolation.to_dense();
        let wj = &self.geometry.jacobian.row(element) * &self.reference.volume_quadrature.weights;
        v.t().dot(&(&v * &wj.insert_axis(Axis(1))))
    }
}

fn inverse_mass(reference: &ReferenceApproximation, geometry: &GeometricFactors) -> Result<InverseMass> {
    let weights = &reference.volume_quadrature.weights;
    if reference.is_collocation() {
        let wj = &geometry.jacobian * weights;
        return Ok(InverseMass::Diagonal(wj.mapv(|v| 1.0 / v)));
    }
    let v = reference.volume_interpolation.to_dense();
    let inverses = geometry
        .jacobian
        .outer_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|jac| {
            let wj = &jac * weights;
            let mass = v.t().dot(&(&v * &wj.insert_axis(Axis(1))));
            mass.inv("mass").map_err(Error::from)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(InverseMass::Dense(inverses))
}

/// Pairs every facet node with the coincident node of the neighbouring
/// element, after applying the periodic offset of the connection.
fn match_facet_nodes(
    mesh: &Mesh,
    reference: &ReferenceApproximation,
    geometry: &GeometricFactors,
) -> Result<Vec<Vec<TraceTarget>>> {
    let d = reference.dim();
    (0..mesh.num_elements())
        .into_par_iter()
        .map(|e| {
            let coords = geometry.volume_coordinates.index_axis(Axis(0), e);
            let extent = (0..d)
                .map(|m| {
                    let column = coords.column(m);
                    let hi = column.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
                    let lo = column.fold(f64::INFINITY, |a, &b| a.min(b));
                    hi - lo
                })
                .fold(0.0, f64::max);
            let tol = 1e-8 * extent.max(f64::MIN_POSITIVE);

            let mut targets = vec![TraceTarget::Degenerate; reference.num_facet_nodes()];
            for (f, facet) in reference.facets.iter().enumerate() {
                let start = reference.facet_offsets[f];
                let Some(mesh_facet) = facet.mesh_facet else {
                    continue;
                };
                match &mesh.connectivity[e][mesh_facet] {
                    FacetConnection::Boundary(tag) => {
                        targets[start..start + facet.len()].fill(TraceTarget::Boundary(*tag));
                    }
                    FacetConnection::Interior {
                        element,
                        facet: neighbour_facet,
                        offset,
                    } => {
                        let f2 = reference
                            .facets
                            .iter()
                            .position(|fc| fc.mesh_facet == Some(*neighbour_facet))
                            .ok_or_else(|| {
                                Error::ConfigurationMismatch(format!(
                                    "no computational facet covers facet {neighbour_facet}"
                                ))
                            })?;
                        let start2 = reference.facet_offsets[f2];
                        let others = geometry.facet_coordinates.slice(s![
                            *element,
                            start2..start2 + reference.facets[f2].len(),
                            ..
                        ]);
                        for i in 0..facet.len() {
                            let mut x: Array1<f64> =
                                geometry.facet_coordinates.slice(s![e, start + i, ..]).to_owned();
                            for m in 0..d {
                                x[m] += offset[m];
                            }
                            let distances: Array1<f64> = others
                                .outer_iter()
                                .map(|y| {
                                    let diff = &y - &x;
                                    diff.dot(&diff).sqrt()
                                })
                                .collect();
                            let j = distances.argmin().map_err(|err| {
                                Error::ConfigurationMismatch(format!(
                                    "facet node {i} of element {e}: {err}"
                                ))
                            })?;
                            let distance = distances[j];
                            if distance > tol {
                                return Err(Error::ConfigurationMismatch(format!(
                                    "facet node {i} of element {e} has no match on element {element} (distance {distance:e})"
                                )));
                            }
                            targets[start + i] = TraceTarget::Interior {
                                element: *element,
                                node: start2 + j,
                            };
                        }
                    }
                }
            }
            Ok(targets)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disc::mesh::{uniform_mesh, uniform_periodic_mesh};
    use crate::disc::reference_approximation::ApproximationType;
    use crate::disc::reference_element::Shape;
    use approx::assert_relative_eq;

    fn build(
        shape: Shape,
        approximation: ApproximationType,
        mesh: &Mesh,
    ) -> SpatialDiscretization<'_> {
        let reference = Arc::new(ReferenceApproximation::new(shape, approximation).unwrap());
        SpatialDiscretization::new(mesh, reference, OperatorAlgorithm::default()).unwrap()
    }

    #[test]
    fn interior_matches_are_symmetric() {
        let mesh = uniform_periodic_mesh(Shape::Tet, &[3, 3, 3], &[0.0; 3], &[1.0; 3], 1).unwrap();
        for approximation in [ApproximationType::ModalTensor(2), ApproximationType::CollapsedSem(2)] {
            let disc = build(Shape::Tet, approximation, &mesh);
            assert_reciprocal(&disc);
        }
    }

    fn assert_reciprocal(disc: &SpatialDiscretization<'_>) {
        for (e, targets) in disc.trace_targets.iter().enumerate() {
            for (i, target) in targets.iter().enumerate() {
                if let TraceTarget::Interior { element, node } = *target {
                    assert_eq!(
                        disc.trace_targets[element][node],
                        TraceTarget::Interior { element: e, node: i }
                    );
                }
            }
        }
    }

    #[test]
    fn tetrahedra_match_in_any_vertex_order() {
        let vertices = ndarray::array![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 1.0, 1.0]
        ];
        let ids: Vec<usize> = (0..5).collect();
        for second in [vec![1, 2, 3, 4], vec![4, 3, 2, 1], vec![4, 1, 3, 2], vec![2, 4, 3, 1]] {
            let elements = vec![vec![0, 1, 2, 3], second.clone()];
            let mesh = Mesh::from_elements(Shape::Tet, vertices.view(), &elements, &ids, 1, |_| {
                BoundaryTag::Custom(0)
            })
            .unwrap();
            for approximation in [ApproximationType::ModalTensor(2), ApproximationType::CollapsedSem(2)] {
                let disc = build(Shape::Tet, approximation, &mesh);
                assert_reciprocal(&disc);
                let interior = disc.trace_targets[0]
                    .iter()
                    .filter(|t| matches!(t, TraceTarget::Interior { element: 1, .. }))
                    .count();
                let face = disc
                    .reference
                    .facets
                    .iter()
                    .find(|f| f.mesh_facet.is_some())
                    .map(|f| f.len())
                    .unwrap();
                assert_eq!(interior, face, "{second:?} {approximation:?}");
            }
        }
    }

    #[test]
    fn collapsed_triangle_marks_degenerate_nodes() {
        let mesh = uniform_mesh(Shape::Tri, &[2, 2], &[0.0, 0.0], &[1.0, 1.0], 1).unwrap();
        let disc = build(Shape::Tri, ApproximationType::CollapsedSem(2), &mesh);
        let start = disc.reference.facet_offsets[3];
        assert!(
            disc.trace_targets[0][start..]
                .iter()
                .all(|t| *t == TraceTarget::Degenerate)
        );
        assert!(
            disc.trace_targets
                .iter()
                .flatten()
                .any(|t| matches!(t, TraceTarget::Boundary(BoundaryTag::Left)))
        );
    }

    #[test]
    fn modal_mass_matrix_is_inverted() {
        let mesh = uniform_mesh(Shape::Quad, &[2, 2], &[0.0, 0.0], &[1.0, 2.0], 1).unwrap();
        let disc = build(Shape::Quad, ApproximationType::ModalTensor(3), &mesh);
        let mass = disc.mass_matrix(1);
        let identity = disc.apply_inverse_mass(1, mass.view());
        for ((i, j), v) in identity.indexed_iter() {
            assert_relative_eq!(*v, if i == j { 1.0 } else { 0.0 }, epsilon = 1e-11);
        }
        // orthonormal modes on an affine element: M = J I
        assert_relative_eq!(mass[[0, 0]], 0.125, epsilon = 1e-13);
    }
}
