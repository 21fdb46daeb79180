use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, array};
use statrs::function::gamma::gamma;

use crate::error::ConstructionError;

/// Gauss–Jacobi nodes and weights for the weight `(1-x)^alpha (1+x)^beta`
/// (Golub–Welsch), sorted by increasing node.
pub fn get_jacobi_gauss_points(
    alpha: f64,
    beta: f64,
    points_num: usize,
) -> Result<(Array1<f64>, Array1<f64>), ConstructionError> {
    let mu_0 = 2.0_f64.powf(alpha + beta + 1.0) * gamma(alpha + 1.0) * gamma(beta + 1.0)
        / gamma(alpha + beta + 2.0);
    if points_num == 1 {
        let x0 = (beta - alpha) / (alpha + beta + 2.0);
        return Ok((array![x0], array![mu_0]));
    }
    let dim = points_num;
    let mut j = DMatrix::<f64>::zeros(dim, dim);
    let h1 = Array1::from_iter((0..dim).map(|k| 2.0 * k as f64 + alpha + beta));
    for k in 0..dim {
        let denominator = h1[k] * (h1[k] + 2.0);
        j[(k, k)] = if denominator.abs() < 10.0 * f64::EPSILON {
            0.0
        } else {
            -(alpha.powi(2) - beta.powi(2)) / denominator
        };
    }
    // off-diagonal
    for k in 0..(dim - 1) {
        let l = k as f64 + 1.0;
        let numerator = l * (l + alpha + beta) * (l + alpha) * (l + beta);
        let denominator = (h1[k] + 1.0) * (h1[k] + 3.0);
        let off_diag_val = (2.0 / (h1[k] + 2.0)) * (numerator / denominator).sqrt();
        j[(k, k + 1)] = off_diag_val;
        j[(k + 1, k)] = off_diag_val;
    }
    let eigen = SymmetricEigen::new(j);
    let mut order: Vec<usize> = (0..dim).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));
    let points = Array1::from_iter(order.iter().map(|&i| eigen.eigenvalues[i]));
    let weights =
        Array1::from_iter(order.iter().map(|&i| eigen.eigenvectors[(0, i)].powi(2) * mu_0));
    if points.iter().chain(weights.iter()).any(|v| !v.is_finite()) {
        return Err(ConstructionError::InvalidQuadrature(format!(
            "Gauss-Jacobi({alpha}, {beta}) with {points_num} points did not converge"
        )));
    }
    Ok((points, weights))
}
