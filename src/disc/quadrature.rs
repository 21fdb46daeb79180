//! Volume and facet quadrature rules built from 1-D Gauss rules.
use ndarray::{Array1, Array2, ArrayView2};

use crate::disc::gauss_points::GaussPoints1d;
use crate::disc::reference_element::Shape;
use crate::error::ConstructionError;

/// Distance below which two images of a symmetrized point are one node.
const MERGE_TOLERANCE: f64 = 1e-12;

#[derive(Clone, Debug)]
pub struct QuadratureRule {
    /// Points in computational coordinates (one row per point).
    pub points: Array2<f64>,
    /// The same points in reference coordinates.
    pub reference_points: Array2<f64>,
    pub weights: Array1<f64>,
    /// Highest total degree integrated exactly over the reference element.
    pub exactness: usize,
}

impl QuadratureRule {
    /// Tensor-product rule, first axis fastest. Computational and reference
    /// coordinates coincide.
    pub fn tensor(rules: &[GaussPoints1d]) -> Result<Self, ConstructionError> {
        let exactness = plain_exactness(rules)?;
        let (points, weights) = tensor_grid(rules);
        Ok(Self {
            reference_points: points.clone(),
            points,
            weights,
            exactness,
        })
    }
    /// Collapsed rule on the reference triangle or tetrahedron. The weights
    /// carry the Jacobian of the collapse map (minus whatever the Jacobi
    /// weights of the collapsed directions already absorb).
    pub fn collapsed(shape: Shape, rules: &[GaussPoints1d]) -> Result<Self, ConstructionError> {
        let exactness = collapsed_exactness(rules)?;
        let (eta, eta_weights) = tensor_grid(rules);
        let mut reference_points = Array2::<f64>::zeros(eta.dim());
        let mut weights = eta_weights;
        for (q, row) in eta.rows().into_iter().enumerate() {
            reference_points.row_mut(q).assign(&shape.collapse(row));
            weights[q] *= collapse_jacobian(row, rules);
        }
        Ok(Self {
            points: reference_points.clone(),
            reference_points,
            weights,
            exactness,
        })
    }
    /// Triangle rule averaged over the six permutations of the barycentric
    /// coordinates, so that the point set is invariant under every symmetry
    /// of the triangle. Images that coincide (points on a median) are merged
    /// and their weights summed.
    pub fn symmetrized_triangle(&self) -> Self {
        const PERMUTATIONS: [[usize; 3]; 6] = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        let mut merged: Vec<([f64; 2], f64)> = Vec::with_capacity(6 * self.len());
        for (p, &w) in self.reference_points.rows().into_iter().zip(self.weights.iter()) {
            let lambda = [-0.5 * (p[0] + p[1]), 0.5 * (1.0 + p[0]), 0.5 * (1.0 + p[1])];
            for perm in PERMUTATIONS.iter() {
                let image = [2.0 * lambda[perm[1]] - 1.0, 2.0 * lambda[perm[2]] - 1.0];
                match merged.iter_mut().find(|(q, _)| {
                    (q[0] - image[0]).abs() < MERGE_TOLERANCE && (q[1] - image[1]).abs() < MERGE_TOLERANCE
                }) {
                    Some((_, weight)) => *weight += w / 6.0,
                    None => merged.push((image, w / 6.0)),
                }
            }
        }
        let points = Array2::from_shape_fn((merged.len(), 2), |(i, m)| merged[i].0[m]);
        let weights = merged.iter().map(|(_, w)| *w).collect::<Array1<f64>>();
        Self {
            reference_points: points.clone(),
            points,
            weights,
            exactness: self.exactness,
        }
    }
    pub fn len(&self) -> usize {
        self.weights.len()
    }
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
    /// `Σ_q w_q f(ξ_q)` for a function of the reference coordinates.
    pub fn integrate(&self, f: impl Fn(ndarray::ArrayView1<f64>) -> f64) -> f64 {
        self.reference_points
            .rows()
            .into_iter()
            .zip(self.weights.iter())
            .map(|(p, &w)| w * f(p))
            .sum()
    }
}

/// Tensor grid of the 1-D rules (first axis fastest) and the product weights.
/// An empty list yields the single point of a zero-dimensional facet.
pub fn tensor_grid(rules: &[GaussPoints1d]) -> (Array2<f64>, Array1<f64>) {
    let dims: Vec<usize> = rules.iter().map(|r| r.len()).collect();
    let n: usize = dims.iter().product();
    let mut points = Array2::<f64>::zeros((n, rules.len()));
    let mut weights = Array1::<f64>::ones(n);
    for q in 0..n {
        let mut rest = q;
        for (k, rule) in rules.iter().enumerate() {
            let i = rest % dims[k];
            rest /= dims[k];
            points[[q, k]] = rule.points[i];
            weights[q] *= rule.weights[i];
        }
    }
    (points, weights)
}

/// Exactness of an uncollapsed tensor rule; Jacobi weights are rejected.
pub fn plain_exactness(rules: &[GaussPoints1d]) -> Result<usize, ConstructionError> {
    let mut exactness = usize::MAX;
    for rule in rules {
        if rule.weight_exponent() != 0.0 {
            return Err(ConstructionError::InvalidQuadrature(format!(
                "{:?} can only be used in a collapsed direction",
                rule.family
            )));
        }
        exactness = exactness.min(rule.exactness());
    }
    Ok(exactness)
}

/// Exactness over the simplex of a collapsed rule: direction `k` carries the
/// collapse Jacobian factor `(1 - η_k)^k`, part of which (`α_k`) may be
/// absorbed in the Jacobi weight.
pub fn collapsed_exactness(rules: &[GaussPoints1d]) -> Result<usize, ConstructionError> {
    let mut exactness = usize::MAX;
    for (k, rule) in rules.iter().enumerate() {
        let alpha = rule.weight_exponent();
        if alpha.fract() != 0.0 || alpha < 0.0 || alpha > k as f64 {
            return Err(ConstructionError::InvalidQuadrature(format!(
                "{:?} in collapsed direction {k} leaves a non-polynomial integrand",
                rule.family
            )));
        }
        let deficit = k - alpha as usize;
        exactness = exactness.min(rule.exactness().saturating_sub(deficit));
    }
    Ok(exactness)
}

/// Collapse Jacobian at a computational point, divided by the part the Jacobi
/// weights already carry.
fn collapse_jacobian(eta: ndarray::ArrayView1<f64>, rules: &[GaussPoints1d]) -> f64 {
    let mut jac = 1.0;
    for (k, rule) in rules.iter().enumerate().skip(1) {
        let remaining = k as i32 - rule.weight_exponent() as i32;
        jac *= (0.5 * (1.0 - eta[k])).powi(remaining) * 0.5_f64.powf(rule.weight_exponent());
    }
    jac
}

/// Restricts the tensor rule of a computational facet to the remaining axes.
pub fn facet_rules(rules: &[GaussPoints1d], axis: usize) -> Vec<GaussPoints1d> {
    rules
        .iter()
        .enumerate()
        .filter(|&(k, _)| k != axis)
        .map(|(_, r)| r.clone())
        .collect()
}

/// Reference coordinates of points given in the computational coordinates of
/// a collapsed construction.
pub fn collapse_points(shape: Shape, eta: ArrayView2<f64>) -> Array2<f64> {
    let mut xi = Array2::<f64>::zeros(eta.dim());
    for (q, row) in eta.rows().into_iter().enumerate() {
        xi.row_mut(q).assign(&shape.collapse(row));
    }
    xi
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disc::gauss_points::QuadratureFamily;
    use approx::assert_relative_eq;

    fn lg(n: usize) -> GaussPoints1d {
        GaussPoints1d::new(QuadratureFamily::LegendreGauss, n).unwrap()
    }
    fn jg(alpha: f64, n: usize) -> GaussPoints1d {
        GaussPoints1d::new(QuadratureFamily::JacobiGauss { alpha }, n).unwrap()
    }

    #[test]
    fn collapsed_triangle_integrates_monomials() {
        // ∫_T (1 + ξ1)^2 dξ = 4/3 over the reference triangle
        for rules in [vec![lg(3), jg(1.0, 3)], vec![lg(3), lg(4)]] {
            let rule = QuadratureRule::collapsed(Shape::Tri, &rules).unwrap();
            assert_relative_eq!(rule.weights.sum(), 2.0, epsilon = 1e-13);
            let val = rule.integrate(|p| (1.0 + p[0]).powi(2));
            assert_relative_eq!(val, 4.0 / 3.0, epsilon = 1e-13);
        }
    }

    #[test]
    fn collapsed_tetrahedron_volume_and_moment() {
        let rule = QuadratureRule::collapsed(Shape::Tet, &[lg(3), jg(1.0, 3), jg(2.0, 3)]).unwrap();
        assert_eq!(rule.exactness, 5);
        assert_relative_eq!(rule.weights.sum(), 4.0 / 3.0, epsilon = 1e-13);
        // ∫ (1 + ξ3) dξ = 4/3 * 1/2 (centroid at ξ3 = -1/2)
        assert_relative_eq!(rule.integrate(|p| 1.0 + p[2]), 2.0 / 3.0, epsilon = 1e-13);
        let lg_rule = QuadratureRule::collapsed(Shape::Tet, &[lg(3), lg(4), lg(4)]).unwrap();
        assert_eq!(lg_rule.exactness, 5);
        assert_relative_eq!(lg_rule.weights.sum(), 4.0 / 3.0, epsilon = 1e-13);
    }

    #[test]
    fn symmetrized_rule_keeps_exactness() {
        let rule = QuadratureRule::collapsed(Shape::Tri, &[lg(3), jg(1.0, 3)]).unwrap();
        let sym = rule.symmetrized_triangle();
        assert!(sym.len() <= 6 * rule.len());
        assert_relative_eq!(sym.weights.sum(), 2.0, epsilon = 1e-13);
        let f = |p: ndarray::ArrayView1<f64>| p[0].powi(3) * p[1] + p[1].powi(2);
        assert_relative_eq!(sym.integrate(f), rule.integrate(f), epsilon = 1e-13);
    }

    #[test]
    fn symmetrized_points_are_distinct() {
        // an odd count puts points on the medians of the triangle
        for n in [1, 2, 3, 4] {
            let rule = QuadratureRule::collapsed(Shape::Tri, &[lg(n), jg(1.0, n)]).unwrap();
            let sym = rule.symmetrized_triangle();
            let pts = &sym.reference_points;
            for i in 0..sym.len() {
                for j in 0..i {
                    let gap = (pts[[i, 0]] - pts[[j, 0]]).abs() + (pts[[i, 1]] - pts[[j, 1]]).abs();
                    assert!(gap > 1e-10, "n = {n}: points {i} and {j} coincide");
                }
            }
        }
        // the centroid of the one-point rule is its own image
        let one = QuadratureRule::collapsed(Shape::Tri, &[lg(1), jg(1.0, 1)]).unwrap();
        let centroid = one.symmetrized_triangle();
        assert_eq!(centroid.len(), 1);
        assert_relative_eq!(centroid.weights[0], 2.0, epsilon = 1e-13);
    }

    #[test]
    fn jacobi_rule_rejected_outside_collapsed_directions() {
        assert!(QuadratureRule::tensor(&[lg(3), jg(1.0, 3)]).is_err());
        assert!(QuadratureRule::collapsed(Shape::Tri, &[lg(3), jg(2.0, 3)]).is_err());
    }
}
