use ndarray::{Array2, ArrayView2};

use crate::disc::basis::Basis;
use crate::disc::reference_element::Shape;

pub struct LineBasis;

impl Basis for LineBasis {
    const SHAPE: Shape = Shape::Line;
    fn num_modes(n: usize) -> usize {
        n + 1
    }
    fn vandermonde(n: usize, xi: ArrayView2<f64>) -> Array2<f64> {
        Self::vandermonde1d(n, xi.column(0))
    }
    fn grad_vandermonde(n: usize, xi: ArrayView2<f64>) -> Vec<Array2<f64>> {
        vec![Self::grad_vandermonde1d(n, xi.column(0))]
    }
}
