use ndarray::{Array2, ArrayView2};

use crate::disc::basis::Basis;
use crate::disc::reference_element::Shape;

/// Tensor-product Legendre modes `P_i(ξ1) P_j(ξ2)`, `i` fastest.
pub struct QuadrilateralBasis;

impl Basis for QuadrilateralBasis {
    const SHAPE: Shape = Shape::Quad;
    fn num_modes(n: usize) -> usize {
        (n + 1).pow(2)
    }
    fn vandermonde(n: usize, xi: ArrayView2<f64>) -> Array2<f64> {
        let vr = Self::vandermonde1d(n, xi.column(0));
        let vs = Self::vandermonde1d(n, xi.column(1));
        let nb = n + 1;
        Array2::from_shape_fn((xi.nrows(), nb * nb), |(q, sk)| {
            vr[[q, sk % nb]] * vs[[q, sk / nb]]
        })
    }
    fn grad_vandermonde(n: usize, xi: ArrayView2<f64>) -> Vec<Array2<f64>> {
        let vr = Self::vandermonde1d(n, xi.column(0));
        let vs = Self::vandermonde1d(n, xi.column(1));
        let dvr = Self::grad_vandermonde1d(n, xi.column(0));
        let dvs = Self::grad_vandermonde1d(n, xi.column(1));
        let nb = n + 1;
        let shape = (xi.nrows(), nb * nb);
        vec![
            Array2::from_shape_fn(shape, |(q, sk)| dvr[[q, sk % nb]] * vs[[q, sk / nb]]),
            Array2::from_shape_fn(shape, |(q, sk)| vr[[q, sk % nb]] * dvs[[q, sk / nb]]),
        ]
    }
}
