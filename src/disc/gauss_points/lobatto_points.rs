use ndarray::{Array1, s};

use super::legendre_points::get_jacobi_gauss_points;
use crate::error::ConstructionError;

/// Legendre–Gauss–Lobatto nodes and weights (`points_num >= 2`).
pub fn get_lobatto_points_interval(
    points_num: usize,
) -> Result<(Array1<f64>, Array1<f64>), ConstructionError> {
    let n = points_num;
    let mut points = Array1::<f64>::zeros(n);
    points[0] = -1.0;
    points[n - 1] = 1.0;
    if n > 2 {
        let (interior, _) = get_jacobi_gauss_points(1.0, 1.0, n - 2)?;
        points.slice_mut(s![1..n - 1]).assign(&interior);
    }
    // w_j = 2 / (n (n-1) P_{n-1}(x_j)^2)
    let scale = 2.0 / (n * (n - 1)) as f64;
    let weights = points.mapv(|x| scale / legendre(n - 1, x).powi(2));
    Ok((points, weights))
}

/// Classical (unnormalized) Legendre polynomial by three-term recurrence.
pub fn legendre(n: usize, x: f64) -> f64 {
    let (mut p_prev, mut p) = (1.0, x);
    if n == 0 {
        return p_prev;
    }
    for k in 1..n {
        let k = k as f64;
        let p_next = ((2.0 * k + 1.0) * x * p - k * p_prev) / (k + 1.0);
        p_prev = p;
        p = p_next;
    }
    p
}
