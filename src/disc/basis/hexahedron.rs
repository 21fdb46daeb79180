use ndarray::{Array2, ArrayView2};

use crate::disc::basis::Basis;
use crate::disc::reference_element::Shape;

/// Tensor-product Legendre modes `P_i(ξ1) P_j(ξ2) P_k(ξ3)`, `i` fastest.
pub struct HexahedronBasis;

impl HexahedronBasis {
    fn tensor(
        n: usize,
        npts: usize,
        f: [&Array2<f64>; 3],
    ) -> Array2<f64> {
        let nb = n + 1;
        Array2::from_shape_fn((npts, nb * nb * nb), |(q, sk)| {
            f[0][[q, sk % nb]] * f[1][[q, (sk / nb) % nb]] * f[2][[q, sk / (nb * nb)]]
        })
    }
}

impl Basis for HexahedronBasis {
    const SHAPE: Shape = Shape::Hex;
    fn num_modes(n: usize) -> usize {
        (n + 1).pow(3)
    }
    fn vandermonde(n: usize, xi: ArrayView2<f64>) -> Array2<f64> {
        let v: Vec<Array2<f64>> = (0..3)
            .map(|m| Self::vandermonde1d(n, xi.column(m)))
            .collect();
        Self::tensor(n, xi.nrows(), [&v[0], &v[1], &v[2]])
    }
    fn grad_vandermonde(n: usize, xi: ArrayView2<f64>) -> Vec<Array2<f64>> {
        let v: Vec<Array2<f64>> = (0..3)
            .map(|m| Self::vandermonde1d(n, xi.column(m)))
            .collect();
        let dv: Vec<Array2<f64>> = (0..3)
            .map(|m| Self::grad_vandermonde1d(n, xi.column(m)))
            .collect();
        let npts = xi.nrows();
        vec![
            Self::tensor(n, npts, [&dv[0], &v[1], &v[2]]),
            Self::tensor(n, npts, [&v[0], &dv[1], &v[2]]),
            Self::tensor(n, npts, [&v[0], &v[1], &dv[2]]),
        ]
    }
}
