//! Orthonormal polynomial bases on the reference elements.
//!
//! Every basis is expressed in reference coordinates `ξ` (one row per point).
//! The modes are orthonormal with respect to the reference measure, so the
//! modal mass matrix of an exact quadrature is the identity.
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use statrs::function::gamma::gamma;

use crate::disc::reference_element::Shape;
use crate::error::ConstructionError;

pub mod hexahedron;
pub mod lagrange1d;
pub mod line;
pub mod mapping;
pub mod quadrilateral;
pub mod tetrahedron;
pub mod triangle;

use hexahedron::HexahedronBasis;
use line::LineBasis;
use quadrilateral::QuadrilateralBasis;
use tetrahedron::TetrahedronBasis;
use triangle::TriangleBasis;

pub trait Basis {
    const SHAPE: Shape;
    /// Dimension of the total-degree (simplex) or tensor-degree space.
    fn num_modes(n: usize) -> usize;
    fn vandermonde(n: usize, xi: ArrayView2<f64>) -> Array2<f64>;
    /// `∂ψ_j/∂ξ_m` at every point, one matrix per reference direction.
    fn grad_vandermonde(n: usize, xi: ArrayView2<f64>) -> Vec<Array2<f64>>;

    /// Orthonormal Jacobi polynomial `P_n^(α,β)` by three-term recurrence.
    fn jacobi_polynomial(x: ArrayView1<f64>, alpha: f64, beta: f64, n: usize) -> Array1<f64> {
        let gamma0 = 2.0_f64.powf(alpha + beta + 1.0) / (alpha + beta + 1.0)
            * gamma(alpha + 1.0)
            * gamma(beta + 1.0)
            / gamma(alpha + beta + 1.0);
        let p0 = Array1::from_elem(x.len(), 1.0 / gamma0.sqrt());
        if n == 0 {
            return p0;
        }
        let gamma1 = (alpha + 1.0) * (beta + 1.0) / (alpha + beta + 3.0) * gamma0;
        let mut p1 = ((alpha + beta + 2.0) * &x * 0.5 + (alpha - beta) * 0.5) / gamma1.sqrt();
        if n == 1 {
            return p1;
        }
        let mut p_prev = p0;
        let mut a_old = 2.0 / (2.0 + alpha + beta)
            * ((alpha + 1.0) * (beta + 1.0) / (alpha + beta + 3.0)).sqrt();
        for i in 1..n {
            let i = i as f64;
            let h1 = 2.0 * i + alpha + beta;
            let a_new = 2.0 / (h1 + 2.0)
                * ((i + 1.0) * (i + 1.0 + alpha + beta) * (i + 1.0 + alpha) * (i + 1.0 + beta)
                    / (h1 + 1.0)
                    / (h1 + 3.0))
                    .sqrt();
            let b_new = -(alpha.powi(2) - beta.powi(2)) / h1 / (h1 + 2.0);
            let p_next = ((&x - b_new) * &p1 - a_old * &p_prev) / a_new;
            p_prev = p1;
            p1 = p_next;
            a_old = a_new;
        }
        p1
    }
    fn grad_jacobi_polynomial(r: ArrayView1<f64>, alpha: f64, beta: f64, n: usize) -> Array1<f64> {
        if n == 0 {
            return Array1::zeros(r.len());
        }
        let pn = Self::jacobi_polynomial(r, alpha + 1.0, beta + 1.0, n - 1);
        let nf = n as f64;
        (nf * (nf + alpha + beta + 1.0)).sqrt() * pn
    }
    /// Normalized Legendre modes `0..=n` at the points `r`.
    fn vandermonde1d(n: usize, r: ArrayView1<f64>) -> Array2<f64> {
        let mut v = Array2::<f64>::zeros((r.len(), n + 1));
        for j in 0..n + 1 {
            v.column_mut(j)
                .assign(&Self::jacobi_polynomial(r, 0.0, 0.0, j));
        }
        v
    }
    fn grad_vandermonde1d(n: usize, r: ArrayView1<f64>) -> Array2<f64> {
        let mut v = Array2::<f64>::zeros((r.len(), n + 1));
        for j in 0..n + 1 {
            v.column_mut(j)
                .assign(&Self::grad_jacobi_polynomial(r, 0.0, 0.0, j));
        }
        v
    }
}

/// `x^e` elementwise, or zeros for a negative exponent (the factor then
/// multiplies a vanishing mode derivative).
pub fn powi_or_zero(x: ArrayView1<f64>, e: i32) -> Array1<f64> {
    if e < 0 {
        Array1::zeros(x.len())
    } else {
        x.mapv(|v| v.powi(e))
    }
}

pub fn num_modes(shape: Shape, n: usize) -> usize {
    match shape {
        Shape::Line => LineBasis::num_modes(n),
        Shape::Quad => QuadrilateralBasis::num_modes(n),
        Shape::Hex => HexahedronBasis::num_modes(n),
        Shape::Tri => TriangleBasis::num_modes(n),
        Shape::Tet => TetrahedronBasis::num_modes(n),
    }
}

pub fn vandermonde(shape: Shape, n: usize, xi: ArrayView2<f64>) -> Array2<f64> {
    match shape {
        Shape::Line => LineBasis::vandermonde(n, xi),
        Shape::Quad => QuadrilateralBasis::vandermonde(n, xi),
        Shape::Hex => HexahedronBasis::vandermonde(n, xi),
        Shape::Tri => TriangleBasis::vandermonde(n, xi),
        Shape::Tet => TetrahedronBasis::vandermonde(n, xi),
    }
}

pub fn grad_vandermonde(shape: Shape, n: usize, xi: ArrayView2<f64>) -> Vec<Array2<f64>> {
    match shape {
        Shape::Line => LineBasis::grad_vandermonde(n, xi),
        Shape::Quad => QuadrilateralBasis::grad_vandermonde(n, xi),
        Shape::Hex => HexahedronBasis::grad_vandermonde(n, xi),
        Shape::Tri => TriangleBasis::grad_vandermonde(n, xi),
        Shape::Tet => TetrahedronBasis::grad_vandermonde(n, xi),
    }
}

/// Equispaced Lagrange nodes of degree `n` (tensor grid with the first
/// coordinate fastest, or the simplex lattice in the same order). For `n = 1`
/// these are the reference vertices in their canonical order.
pub fn equispaced_nodes(shape: Shape, n: usize) -> Result<Array2<f64>, ConstructionError> {
    if n == 0 {
        return Err(ConstructionError::Unsupported {
            shape,
            approximation: "mapping of degree 0",
        });
    }
    let h = 2.0 / n as f64;
    let d = shape.dim();
    let mut rows: Vec<Vec<f64>> = Vec::new();
    match shape {
        Shape::Line => {
            for i in 0..=n {
                rows.push(vec![-1.0 + h * i as f64]);
            }
        }
        Shape::Quad => {
            for j in 0..=n {
                for i in 0..=n {
                    rows.push(vec![-1.0 + h * i as f64, -1.0 + h * j as f64]);
                }
            }
        }
        Shape::Hex => {
            for k in 0..=n {
                for j in 0..=n {
                    for i in 0..=n {
                        rows.push(vec![
                            -1.0 + h * i as f64,
                            -1.0 + h * j as f64,
                            -1.0 + h * k as f64,
                        ]);
                    }
                }
            }
        }
        Shape::Tri => {
            for j in 0..=n {
                for i in 0..=n - j {
                    rows.push(vec![-1.0 + h * i as f64, -1.0 + h * j as f64]);
                }
            }
        }
        Shape::Tet => {
            for k in 0..=n {
                for j in 0..=n - k {
                    for i in 0..=n - j - k {
                        rows.push(vec![
                            -1.0 + h * i as f64,
                            -1.0 + h * j as f64,
                            -1.0 + h * k as f64,
                        ]);
                    }
                }
            }
        }
    }
    Ok(Array2::from_shape_fn((rows.len(), d), |(i, m)| rows[i][m]))
}
