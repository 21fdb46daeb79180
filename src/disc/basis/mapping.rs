use ndarray::{Array2, ArrayView2};

use crate::disc::basis::{equispaced_nodes, grad_vandermonde, vandermonde};
use crate::disc::linalg::Inverse;
use crate::disc::reference_element::Shape;
use crate::error::ConstructionError;

/// Lagrange basis on the equispaced nodes of degree `degree`, used to
/// represent the element mapping `x(ξ)`.
#[derive(Clone, Debug)]
pub struct MappingBasis {
    pub shape: Shape,
    pub degree: usize,
    pub nodes: Array2<f64>,
    inv_vandermonde: Array2<f64>,
}

impl MappingBasis {
    pub fn new(shape: Shape, degree: usize) -> Result<Self, ConstructionError> {
        let nodes = equispaced_nodes(shape, degree)?;
        let inv_vandermonde = vandermonde(shape, degree, nodes.view()).inv("mapping Vandermonde")?;
        Ok(Self {
            shape,
            degree,
            nodes,
            inv_vandermonde,
        })
    }
    pub fn num_nodes(&self) -> usize {
        self.nodes.nrows()
    }
    /// Rows evaluate the nodal basis at `xi`.
    pub fn interpolation_matrix(&self, xi: ArrayView2<f64>) -> Array2<f64> {
        vandermonde(self.shape, self.degree, xi).dot(&self.inv_vandermonde)
    }
    /// `∂ℓ_j/∂ξ_m` at `xi`, one matrix per reference direction.
    pub fn derivative_matrices(&self, xi: ArrayView2<f64>) -> Vec<Array2<f64>> {
        grad_vandermonde(self.shape, self.degree, xi)
            .into_iter()
            .map(|g| g.dot(&self.inv_vandermonde))
            .collect()
    }
}
