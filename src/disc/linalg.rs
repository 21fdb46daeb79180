//! Dense linear algebra on `ndarray` matrices, backed by `nalgebra`.
use nalgebra::DMatrix;
use ndarray::{Array2, ArrayView2};

use crate::error::ConstructionError;

pub fn to_dmatrix(a: ArrayView2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

pub fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

pub trait Inverse {
    /// Inverse of a square matrix; `what` names the matrix in the error.
    fn inv(&self, what: &'static str) -> Result<Array2<f64>, ConstructionError>;
}

impl Inverse for Array2<f64> {
    fn inv(&self, what: &'static str) -> Result<Array2<f64>, ConstructionError> {
        self.view().inv(what)
    }
}

impl Inverse for ArrayView2<'_, f64> {
    fn inv(&self, what: &'static str) -> Result<Array2<f64>, ConstructionError> {
        if self.nrows() != self.ncols() {
            return Err(ConstructionError::Singular(what));
        }
        let lu = to_dmatrix(*self).lu();
        let inverse = lu.try_inverse().ok_or(ConstructionError::Singular(what))?;
        if inverse.iter().any(|v| !v.is_finite()) {
            return Err(ConstructionError::Singular(what));
        }
        Ok(from_dmatrix(&inverse))
    }
}

/// Kronecker product `a ⊗ b`.
pub fn kron(a: ArrayView2<f64>, b: ArrayView2<f64>) -> Array2<f64> {
    let (ar, ac) = a.dim();
    let (br, bc) = b.dim();
    Array2::from_shape_fn((ar * br, ac * bc), |(i, j)| {
        a[[i / br, j / bc]] * b[[i % br, j % bc]]
    })
}

/// Largest absolute entry.
pub fn max_abs(a: ArrayView2<f64>) -> f64 {
    a.iter().fold(0.0, |m: f64, v| m.max(v.abs()))
}
