use ndarray::{Array1, Array2, ArrayView1};

/// Nodal Lagrange basis on a set of distinct 1-D points.
#[derive(Clone, Debug)]
pub struct LagrangeBasis1D {
    pub nodes: Array1<f64>,
    barycentric_weights: Array1<f64>,
}

impl LagrangeBasis1D {
    pub fn new(nodes: ArrayView1<f64>) -> Self {
        let n = nodes.len();
        let barycentric_weights = Array1::from_shape_fn(n, |j| {
            let product: f64 = (0..n)
                .filter(|&m| m != j)
                .map(|m| nodes[j] - nodes[m])
                .product();
            1.0 / product
        });
        Self {
            nodes: nodes.to_owned(),
            barycentric_weights,
        }
    }
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    /// Collocation derivative matrix `D[i, j] = ℓ_j'(x_i)`.
    pub fn derivative_matrix(&self) -> Array2<f64> {
        let n = self.len();
        let w = &self.barycentric_weights;
        let x = &self.nodes;
        let mut d = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            let mut diagonal = 0.0;
            for j in 0..n {
                if i != j {
                    d[[i, j]] = w[j] / w[i] / (x[i] - x[j]);
                    diagonal -= d[[i, j]];
                }
            }
            d[[i, i]] = diagonal;
        }
        d
    }
    /// `P[i, j] = ℓ_j(points[i])`.
    pub fn interpolation_matrix(&self, points: ArrayView1<f64>) -> Array2<f64> {
        let n = self.len();
        let mut p = Array2::<f64>::zeros((points.len(), n));
        for (i, &xi) in points.iter().enumerate() {
            if let Some(j) = self.nodes.iter().position(|&xj| (xi - xj).abs() < 1e-14) {
                p[[i, j]] = 1.0;
                continue;
            }
            let terms = Array1::from_shape_fn(n, |j| {
                self.barycentric_weights[j] / (xi - self.nodes[j])
            });
            let total = terms.sum();
            p.row_mut(i).assign(&(terms / total));
        }
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disc::gauss_points::{GaussPoints1d, QuadratureFamily};
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn derivative_is_exact_for_polynomials() {
        let rule = GaussPoints1d::new(QuadratureFamily::LegendreGauss, 5).unwrap();
        let basis = LagrangeBasis1D::new(rule.points.view());
        let d = basis.derivative_matrix();
        let f = rule.points.mapv(|x| x.powi(4) - 2.0 * x);
        let df = d.dot(&f);
        for (i, &x) in rule.points.iter().enumerate() {
            assert_relative_eq!(df[i], 4.0 * x.powi(3) - 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn interpolation_to_endpoints() {
        let rule = GaussPoints1d::new(QuadratureFamily::LegendreGauss, 3).unwrap();
        let basis = LagrangeBasis1D::new(rule.points.view());
        let p = basis.interpolation_matrix(array![-1.0, 1.0].view());
        let f = rule.points.mapv(|x| x * x);
        let fe = p.dot(&f);
        assert_relative_eq!(fe[0], 1.0, epsilon = 1e-14);
        assert_relative_eq!(fe[1], 1.0, epsilon = 1e-14);
        assert_relative_eq!(p.row(0).sum(), 1.0, epsilon = 1e-14);
    }
}
