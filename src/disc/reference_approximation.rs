//! Reference-element operators with the summation-by-parts property.
//!
//! Every approximation provides, in computational coordinates `η`:
//! the volume interpolation `V`, one derivative operator `V_η,m` per
//! direction, the volume weights `W` and, per facet, the extrapolation `R_f`,
//! the facet weights `B_f` and a constant normal `n̂_f` scaled by the facet
//! parametrization. They satisfy
//!
//! `V^T W V_η,m + V_η,m^T W V = Σ_f n̂_{f,m} R_f^T B_f R_f`.
//!
//! `CollapsedSem` works on the square/cube: the collapse map is left to the
//! element geometry, so its operators stay Kronecker products.
use ndarray::{Array1, Array2, array};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::disc::basis::lagrange1d::LagrangeBasis1D;
use crate::disc::basis::line::LineBasis;
use crate::disc::basis::tetrahedron::TetrahedronBasis;
use crate::disc::basis::triangle::TriangleBasis;
use crate::disc::basis::{Basis, num_modes, vandermonde};
use crate::disc::gauss_points::{GaussPoints1d, QuadratureFamily};
use crate::disc::linalg::max_abs;
use crate::disc::operators::ReferenceOperator;
use crate::disc::quadrature::{
    QuadratureRule, collapse_points, collapsed_exactness, facet_rules, plain_exactness,
    tensor_grid,
};
use crate::disc::reference_element::Shape;
use crate::error::ConstructionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApproximationType {
    /// Collocation on the Gauss tensor grid of a line, quad or hex.
    NodalTensor(usize),
    /// Orthonormal modal basis with (collapsed on simplices) tensor quadrature.
    ModalTensor(usize),
    /// Collocation on the collapsed tensor grid of a triangle or tetrahedron.
    CollapsedSem(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApproximationKind {
    NodalTensor,
    ModalTensor,
    CollapsedSem,
}

impl ApproximationType {
    /// Validates a degree coming from an untyped source.
    pub fn from_signed(kind: ApproximationKind, degree: i64) -> Result<Self, ConstructionError> {
        let p = usize::try_from(degree).map_err(|_| ConstructionError::NegativeDegree(degree))?;
        Ok(match kind {
            ApproximationKind::NodalTensor => ApproximationType::NodalTensor(p),
            ApproximationKind::ModalTensor => ApproximationType::ModalTensor(p),
            ApproximationKind::CollapsedSem => ApproximationType::CollapsedSem(p),
        })
    }
    pub fn degree(&self) -> usize {
        match *self {
            ApproximationType::NodalTensor(p)
            | ApproximationType::ModalTensor(p)
            | ApproximationType::CollapsedSem(p) => p,
        }
    }
    pub fn name(&self) -> &'static str {
        match self {
            ApproximationType::NodalTensor(_) => "NodalTensor",
            ApproximationType::ModalTensor(_) => "ModalTensor",
            ApproximationType::CollapsedSem(_) => "CollapsedSem",
        }
    }
    /// `V = I`: the solution is stored at the volume quadrature nodes.
    pub fn is_collocation(&self) -> bool {
        !matches!(self, ApproximationType::ModalTensor(_))
    }
}

/// One 1-D rule per computational direction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineRule {
    pub family: QuadratureFamily,
    pub points: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuadratureOverrides {
    /// Either empty (defaults), a single rule used in every direction, or one
    /// rule per computational direction.
    #[serde(default)]
    pub volume: Vec<LineRule>,
}

#[derive(Clone, Debug)]
pub struct ReferenceFacet {
    /// `R_f`: solution coefficients to facet nodes.
    pub extrapolation: ReferenceOperator,
    /// `B_f`.
    pub weights: Array1<f64>,
    /// `n̂_f` in computational coordinates.
    pub normal: Array1<f64>,
    pub points: Array2<f64>,
    pub reference_points: Array2<f64>,
    /// Facet of the element shape this computational facet covers; `None`
    /// for facets collapsed onto an edge or a vertex.
    pub mesh_facet: Option<usize>,
    /// Exactness over the physical facet (`None` for degenerate facets and
    /// point facets).
    pub exactness: Option<usize>,
}

impl ReferenceFacet {
    pub fn len(&self) -> usize {
        self.weights.len()
    }
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
    pub fn is_degenerate(&self) -> bool {
        self.mesh_facet.is_none()
    }
}

#[derive(Clone, Debug)]
pub struct ReferenceApproximation {
    pub shape: Shape,
    pub approximation_type: ApproximationType,
    /// Shape on which the operators act (the square/cube for collapsed
    /// constructions).
    pub computational_shape: Shape,
    pub num_modes: usize,
    pub volume_quadrature: QuadratureRule,
    pub volume_interpolation: ReferenceOperator,
    pub derivatives: Vec<ReferenceOperator>,
    pub facets: Vec<ReferenceFacet>,
    /// Start of each facet's nodes in the concatenated facet node list.
    pub facet_offsets: Vec<usize>,
}

impl ReferenceApproximation {
    pub fn new(shape: Shape, approximation_type: ApproximationType) -> Result<Self, ConstructionError> {
        Self::with_quadrature(shape, approximation_type, &QuadratureOverrides::default())
    }

    pub fn with_quadrature(
        shape: Shape,
        approximation_type: ApproximationType,
        overrides: &QuadratureOverrides,
    ) -> Result<Self, ConstructionError> {
        let p = approximation_type.degree();
        let rules = line_rules(shape, approximation_type, overrides)?;
        let (computational_shape, num_modes, volume_quadrature, volume_interpolation, derivatives, facets) =
            match (approximation_type, shape) {
                (ApproximationType::NodalTensor(_), Shape::Line | Shape::Quad | Shape::Hex) => {
                    let (v, d, facets) = collocation_operators(shape, &rules);
                    let vol = QuadratureRule::tensor(&rules)?;
                    (shape, vol.len(), vol, v, d, tensor_facet_exactness(facets, &rules, false)?)
                }
                (ApproximationType::CollapsedSem(_), Shape::Tri | Shape::Tet) => {
                    if let Some(rule) = rules.iter().find(|r| r.weight_exponent() != 0.0) {
                        return Err(ConstructionError::InvalidQuadrature(format!(
                            "{:?} is not a collocation rule",
                            rule.family
                        )));
                    }
                    // a node at η_k = 1 (k > 0) sits on the collapsed vertex or edge
                    if let Some((k, rule)) = rules
                        .iter()
                        .enumerate()
                        .skip(1)
                        .find(|(_, r)| r.points.iter().any(|&x| (1.0 - x).abs() < 1e-12))
                    {
                        return Err(ConstructionError::InvalidQuadrature(format!(
                            "{:?} places a node on the collapsed end of direction {k}",
                            rule.family
                        )));
                    }
                    let cshape = if shape == Shape::Tri { Shape::Quad } else { Shape::Hex };
                    let (points, weights) = tensor_grid(&rules);
                    let vol = QuadratureRule {
                        reference_points: collapse_points(shape, points.view()),
                        points,
                        weights,
                        exactness: collapsed_exactness(&rules)?,
                    };
                    let (v, d, mut facets) = collocation_operators(cshape, &rules);
                    for (f, facet) in facets.iter_mut().enumerate() {
                        facet.reference_points = collapse_points(shape, facet.points.view());
                        facet.mesh_facet = shape
                            .collapsed_facets()
                            .iter()
                            .position(|&c| c == (f / 2, f % 2));
                    }
                    (cshape, vol.len(), vol, v, d, tensor_facet_exactness(facets, &rules, true)?)
                }
                (ApproximationType::ModalTensor(_), Shape::Line | Shape::Quad | Shape::Hex) => {
                    let vol = QuadratureRule::tensor(&rules)?;
                    let (v, d, facets) = modal_tensor_operators(shape, p, &rules);
                    let nm = num_modes(shape, p);
                    (shape, nm, vol, v, d, tensor_facet_exactness(facets, &rules, false)?)
                }
                (ApproximationType::ModalTensor(_), Shape::Tri | Shape::Tet) => {
                    let vol = QuadratureRule::collapsed(shape, &rules)?;
                    let (volume, gradient) = match shape {
                        Shape::Tri => TriangleBasis::warped_factors(p, rules[0].points.view(), rules[1].points.view()),
                        _ => TetrahedronBasis::warped_factors(
                            p,
                            rules[0].points.view(),
                            rules[1].points.view(),
                            rules[2].points.view(),
                        ),
                    };
                    let v = ReferenceOperator::Warped(volume);
                    let d: Vec<ReferenceOperator> = gradient.into_iter().map(ReferenceOperator::Warped).collect();
                    let facets = modal_simplex_facets(shape, p, &rules)?;
                    (shape, num_modes(shape, p), vol, v, d, facets)
                }
                _ => {
                    return Err(ConstructionError::Unsupported {
                        shape,
                        approximation: approximation_type.name(),
                    });
                }
            };

        let required = 2 * p;
        debug!(
            ?shape,
            approximation = approximation_type.name(),
            volume_exactness = volume_quadrature.exactness,
            required,
            "checking quadrature exactness"
        );
        if volume_quadrature.exactness < required {
            return Err(ConstructionError::InsufficientQuadrature {
                which: "volume",
                degree: p,
                required,
                actual: volume_quadrature.exactness,
            });
        }
        if let Some(actual) = facets
            .iter()
            .filter_map(|f| f.exactness)
            .find(|&e| e < required)
        {
            return Err(ConstructionError::InsufficientQuadrature {
                which: "facet",
                degree: p,
                required,
                actual,
            });
        }

        let mut facet_offsets = Vec::with_capacity(facets.len() + 1);
        let mut offset = 0;
        for facet in facets.iter() {
            facet_offsets.push(offset);
            offset += facet.len();
        }
        facet_offsets.push(offset);

        let approximation = Self {
            shape,
            approximation_type,
            computational_shape,
            num_modes,
            volume_quadrature,
            volume_interpolation,
            derivatives,
            facets,
            facet_offsets,
        };
        info!(
            ?shape,
            approximation = approximation_type.name(),
            degree = p,
            num_modes = approximation.num_modes,
            volume_nodes = approximation.num_volume_nodes(),
            facet_nodes = approximation.num_facet_nodes(),
            "built reference approximation"
        );
        if tracing::enabled!(tracing::Level::DEBUG) {
            for m in 0..approximation.dim() {
                debug!(direction = m, defect = approximation.sbp_defect(m), "SBP defect");
            }
        }
        Ok(approximation)
    }

    pub fn dim(&self) -> usize {
        self.shape.dim()
    }
    pub fn degree(&self) -> usize {
        self.approximation_type.degree()
    }
    pub fn is_collocation(&self) -> bool {
        self.approximation_type.is_collocation()
    }
    pub fn num_volume_nodes(&self) -> usize {
        self.volume_quadrature.len()
    }
    /// Total number of facet nodes over all computational facets.
    pub fn num_facet_nodes(&self) -> usize {
        self.facet_offsets.last().copied().unwrap_or(0)
    }
    /// Lifting operator `R_f^T B_f` of facet `f` (the inverse mass is
    /// applied during assembly).
    pub fn lifting(&self, f: usize) -> Array2<f64> {
        let facet = &self.facets[f];
        let r = facet.extrapolation.to_dense();
        let mut lift = r.t().to_owned();
        for (mut column, &b) in lift.columns_mut().into_iter().zip(facet.weights.iter()) {
            column *= b;
        }
        lift
    }
    /// `‖V^T W V_η,m + V_η,m^T W V − Σ_f n̂_{f,m} R_f^T B_f R_f‖_max`.
    pub fn sbp_defect(&self, m: usize) -> f64 {
        let v = self.volume_interpolation.to_dense();
        let dm = self.derivatives[m].to_dense();
        let w = &self.volume_quadrature.weights;
        let wv = &v * &w.view().insert_axis(ndarray::Axis(1));
        let wd = &dm * &w.view().insert_axis(ndarray::Axis(1));
        let mut s = v.t().dot(&wd) + dm.t().dot(&wv);
        for facet in &self.facets {
            let r = facet.extrapolation.to_dense();
            let br = &r * &facet.weights.view().insert_axis(ndarray::Axis(1));
            s = s - facet.normal[m] * r.t().dot(&br);
        }
        max_abs(s.view())
    }
}

fn line_rules(
    shape: Shape,
    approximation_type: ApproximationType,
    overrides: &QuadratureOverrides,
) -> Result<Vec<GaussPoints1d>, ConstructionError> {
    let d = shape.dim();
    let p = approximation_type.degree();
    let lg = |n| LineRule {
        family: QuadratureFamily::LegendreGauss,
        points: n,
    };
    let jg = |alpha, n| LineRule {
        family: QuadratureFamily::JacobiGauss { alpha },
        points: n,
    };
    let defaults: Vec<LineRule> = match (approximation_type, shape) {
        (ApproximationType::ModalTensor(_), Shape::Tri) => vec![lg(p + 1), jg(1.0, p + 1)],
        (ApproximationType::ModalTensor(_), Shape::Tet) => {
            vec![lg(p + 1), jg(1.0, p + 1), jg(2.0, p + 1)]
        }
        // equal counts keep the face grids of neighbouring tetrahedra aligned
        (ApproximationType::CollapsedSem(_), Shape::Tet) => vec![lg(p + 2); 3],
        _ => vec![lg(p + 1); d],
    };
    let chosen = match overrides.volume.len() {
        0 => defaults,
        1 => vec![overrides.volume[0]; d],
        n if n == d => overrides.volume.clone(),
        n => {
            return Err(ConstructionError::InvalidQuadrature(format!(
                "{n} line rules given for a {d}-dimensional element"
            )));
        }
    };
    chosen
        .into_iter()
        .map(|r| GaussPoints1d::new(r.family, r.points))
        .collect()
}

/// `V = I`, `D_m` and the facet extrapolations of collocation on the tensor
/// grid of `rules` over the tensor shape `cshape`.
fn collocation_operators(
    cshape: Shape,
    rules: &[GaussPoints1d],
) -> (ReferenceOperator, Vec<ReferenceOperator>, Vec<ReferenceFacet>) {
    let dims: Vec<usize> = rules.iter().map(|r| r.len()).collect();
    let lagrange: Vec<LagrangeBasis1D> = rules
        .iter()
        .map(|r| LagrangeBasis1D::new(r.points.view()))
        .collect();
    let derivatives: Vec<ReferenceOperator> = lagrange
        .iter()
        .enumerate()
        .map(|(m, basis)| ReferenceOperator::TensorProduct {
            shape: dims.clone(),
            factors: vec![(m, basis.derivative_matrix())],
        })
        .collect();
    let facets = (0..cshape.num_facets())
        .map(|f| {
            let (axis, side) = (f / 2, f % 2);
            let end = if side == 0 { -1.0 } else { 1.0 };
            let row = lagrange[axis].interpolation_matrix(array![end].view());
            tensor_facet(
                cshape,
                f,
                rules,
                ReferenceOperator::TensorProduct {
                    shape: dims.clone(),
                    factors: vec![(axis, row)],
                },
            )
        })
        .collect();
    (
        ReferenceOperator::Identity(dims.iter().product()),
        derivatives,
        facets,
    )
}

fn modal_tensor_operators(
    shape: Shape,
    p: usize,
    rules: &[GaussPoints1d],
) -> (ReferenceOperator, Vec<ReferenceOperator>, Vec<ReferenceFacet>) {
    let d = shape.dim();
    let modes = vec![p + 1; d];
    let v1d: Vec<Array2<f64>> = rules
        .iter()
        .map(|r| LineBasis::vandermonde1d(p, r.points.view()))
        .collect();
    let volume = ReferenceOperator::TensorProduct {
        shape: modes.clone(),
        factors: v1d.iter().cloned().enumerate().collect(),
    };
    let derivatives = (0..d)
        .map(|m| ReferenceOperator::TensorProduct {
            shape: modes.clone(),
            factors: (0..d)
                .map(|k| {
                    if k == m {
                        (k, LineBasis::grad_vandermonde1d(p, rules[k].points.view()))
                    } else {
                        (k, v1d[k].clone())
                    }
                })
                .collect(),
        })
        .collect();
    let facets = (0..shape.num_facets())
        .map(|f| {
            let (axis, side) = (f / 2, f % 2);
            let end = if side == 0 { -1.0 } else { 1.0 };
            let factors = (0..d)
                .map(|k| {
                    if k == axis {
                        (k, LineBasis::vandermonde1d(p, array![end].view()))
                    } else {
                        (k, v1d[k].clone())
                    }
                })
                .collect();
            tensor_facet(
                shape,
                f,
                rules,
                ReferenceOperator::TensorProduct {
                    shape: modes.clone(),
                    factors,
                },
            )
        })
        .collect();
    (volume, derivatives, facets)
}

/// Facet `f` of a tensor shape with the volume rules restricted to the
/// remaining axes.
fn tensor_facet(
    cshape: Shape,
    f: usize,
    rules: &[GaussPoints1d],
    extrapolation: ReferenceOperator,
) -> ReferenceFacet {
    let frs = facet_rules(rules, f / 2);
    let (params, weights) = tensor_grid(&frs);
    let points = cshape.map_facet_points(f, params.view());
    ReferenceFacet {
        extrapolation,
        weights,
        normal: cshape.reference_normal(f),
        reference_points: points.clone(),
        points,
        mesh_facet: Some(f),
        exactness: None,
    }
}

fn tensor_facet_exactness(
    mut facets: Vec<ReferenceFacet>,
    rules: &[GaussPoints1d],
    collapsed: bool,
) -> Result<Vec<ReferenceFacet>, ConstructionError> {
    for (f, facet) in facets.iter_mut().enumerate() {
        let frs = facet_rules(rules, f / 2);
        if frs.is_empty() || facet.is_degenerate() {
            continue;
        }
        facet.exactness = Some(if collapsed {
            collapsed_exactness(&frs)?
        } else {
            plain_exactness(&frs)?
        });
    }
    Ok(facets)
}

/// Facets of a modal simplex approximation: Legendre–Gauss edges on
/// triangles, fully symmetric collapsed face rules on tetrahedra.
fn modal_simplex_facets(
    shape: Shape,
    p: usize,
    rules: &[GaussPoints1d],
) -> Result<Vec<ReferenceFacet>, ConstructionError> {
    let (params, weights, exactness) = match shape {
        Shape::Tri => {
            let edge = &rules[0];
            let exactness = plain_exactness(std::slice::from_ref(edge))?;
            (edge.points.clone().insert_axis(ndarray::Axis(1)), edge.weights.clone(), exactness)
        }
        _ => {
            let face = QuadratureRule::collapsed(Shape::Tri, &rules[..2])?.symmetrized_triangle();
            (face.reference_points, face.weights, face.exactness)
        }
    };
    Ok((0..shape.num_facets())
        .map(|f| {
            let points = shape.map_facet_points(f, params.view());
            ReferenceFacet {
                extrapolation: ReferenceOperator::Dense(vandermonde(shape, p, points.view())),
                weights: weights.clone(),
                normal: shape.reference_normal(f),
                reference_points: points.clone(),
                points,
                mesh_facet: Some(f),
                exactness: Some(exactness),
            }
        })
        .collect())
}
