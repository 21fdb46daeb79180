//! Reference operators and how they are applied.
//!
//! Operators act on `(N, nvars)` arrays, one column per conservative
//! variable. Tensor-product operators index their nodes with the first axis
//! fastest.
use ndarray::{Array2, Array3, Array4, ArrayView1, ArrayView2, Axis, s};
use serde::{Deserialize, Serialize};

use crate::disc::linalg::kron;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorAlgorithm {
    /// Every operator is materialized as a dense matrix.
    DenseMatrix,
    /// Tensor-product operators are applied one axis at a time.
    #[default]
    MatrixFreeTensorProduct,
}

#[derive(Clone, Debug)]
pub enum ReferenceOperator {
    Identity(usize),
    Dense(Array2<f64>),
    /// Kronecker product of 1-D matrices. `shape` holds the input size along
    /// each axis; axes without a factor are left untouched.
    TensorProduct {
        shape: Vec<usize>,
        factors: Vec<(usize, Array2<f64>)>,
    },
    /// Sum of warped products mapping simplex modes to the collapsed tensor
    /// grid.
    Warped(Vec<WarpedTerm>),
}

/// `ψ_ij(a, b) = A_i(a) B_ij(b)` on triangles and
/// `ψ_ijk(a, b, c) = A_i(a) B_ij(b) C_ijk(c)` on tetrahedra, with modes
/// ordered `(i, j[, k])`, last index fastest, total degree at most `n`.
/// Entries of `b` and `c` beyond the total degree are ignored.
#[derive(Clone, Debug)]
pub struct WarpedTerm {
    /// `a[[q, i]]`.
    pub a: Array2<f64>,
    /// `b[[q, i, j]]`.
    pub b: Array3<f64>,
    /// `c[[q, i, j, k]]`, tetrahedra only.
    pub c: Option<Array4<f64>>,
}

impl WarpedTerm {
    fn degree(&self) -> usize {
        self.a.ncols() - 1
    }
    fn num_points(&self) -> usize {
        self.a.nrows() * self.b.shape()[0] * self.c.as_ref().map_or(1, |c| c.shape()[0])
    }
    fn num_modes(&self) -> usize {
        let n = self.degree();
        match self.c {
            None => (n + 1) * (n + 2) / 2,
            Some(_) => (n + 1) * (n + 2) * (n + 3) / 6,
        }
    }

    /// `out += T u`.
    fn apply_into(&self, u: ArrayView2<f64>, out: &mut Array2<f64>) {
        let n = self.degree();
        let nvars = u.ncols();
        let (na, nb) = (self.a.nrows(), self.b.shape()[0]);
        let mut mode = 0;
        match &self.c {
            None => {
                for i in 0..=n {
                    let len = n + 1 - i;
                    let bi: ArrayView2<f64> = self.b.slice(s![.., i, ..len]);
                    let ui: ArrayView2<f64> = u.slice(s![mode..mode + len, ..]);
                    let g = bi.dot(&ui);
                    mode += len;
                    for qb in 0..nb {
                        for qa in 0..na {
                            out.row_mut(qa + na * qb).scaled_add(self.a[[qa, i]], &g.row(qb));
                        }
                    }
                }
            }
            Some(c) => {
                let nc = c.shape()[0];
                for i in 0..=n {
                    let mut g2 = Array3::<f64>::zeros((nc, nb, nvars));
                    for j in 0..=n - i {
                        let len = n + 1 - i - j;
                        let cij: ArrayView2<f64> = c.slice(s![.., i, j, ..len]);
                        let uij: ArrayView2<f64> = u.slice(s![mode..mode + len, ..]);
                        let g1 = cij.dot(&uij);
                        mode += len;
                        for qc in 0..nc {
                            for qb in 0..nb {
                                g2.slice_mut(s![qc, qb, ..])
                                    .scaled_add(self.b[[qb, i, j]], &g1.row(qc));
                            }
                        }
                    }
                    for qc in 0..nc {
                        for qb in 0..nb {
                            let line: ArrayView1<f64> = g2.slice(s![qc, qb, ..]);
                            for qa in 0..na {
                                out.row_mut(qa + na * (qb + nb * qc))
                                    .scaled_add(self.a[[qa, i]], &line);
                            }
                        }
                    }
                }
            }
        }
    }

    /// `out += T^T w`.
    fn apply_transpose_into(&self, w: ArrayView2<f64>, out: &mut Array2<f64>) {
        let n = self.degree();
        let nvars = w.ncols();
        let (na, nb) = (self.a.nrows(), self.b.shape()[0]);
        let mut mode = 0;
        match &self.c {
            None => {
                for i in 0..=n {
                    let len = n + 1 - i;
                    let mut h = Array2::<f64>::zeros((nb, nvars));
                    for qb in 0..nb {
                        let mut row = h.row_mut(qb);
                        for qa in 0..na {
                            row.scaled_add(self.a[[qa, i]], &w.row(qa + na * qb));
                        }
                    }
                    let bi: ArrayView2<f64> = self.b.slice(s![.., i, ..len]);
                    let mut target = out.slice_mut(s![mode..mode + len, ..]);
                    target += &bi.t().dot(&h);
                    mode += len;
                }
            }
            Some(c) => {
                let nc = c.shape()[0];
                for i in 0..=n {
                    let mut h2 = Array3::<f64>::zeros((nc, nb, nvars));
                    for qc in 0..nc {
                        for qb in 0..nb {
                            let mut line = h2.slice_mut(s![qc, qb, ..]);
                            for qa in 0..na {
                                line.scaled_add(self.a[[qa, i]], &w.row(qa + na * (qb + nb * qc)));
                            }
                        }
                    }
                    for j in 0..=n - i {
                        let len = n + 1 - i - j;
                        let mut h1 = Array2::<f64>::zeros((nc, nvars));
                        for qc in 0..nc {
                            let mut row = h1.row_mut(qc);
                            for qb in 0..nb {
                                row.scaled_add(self.b[[qb, i, j]], &h2.slice(s![qc, qb, ..]));
                            }
                        }
                        let cij: ArrayView2<f64> = c.slice(s![.., i, j, ..len]);
                        let mut target = out.slice_mut(s![mode..mode + len, ..]);
                        target += &cij.t().dot(&h1);
                        mode += len;
                    }
                }
            }
        }
    }
}

impl ReferenceOperator {
    pub fn nrows(&self) -> usize {
        match self {
            ReferenceOperator::Identity(n) => *n,
            ReferenceOperator::Dense(a) => a.nrows(),
            ReferenceOperator::TensorProduct { .. } => self.output_shape().iter().product(),
            ReferenceOperator::Warped(terms) => terms.first().map_or(0, |t| t.num_points()),
        }
    }
    pub fn ncols(&self) -> usize {
        match self {
            ReferenceOperator::Identity(n) => *n,
            ReferenceOperator::Dense(a) => a.ncols(),
            ReferenceOperator::TensorProduct { shape, .. } => shape.iter().product(),
            ReferenceOperator::Warped(terms) => terms.first().map_or(0, |t| t.num_modes()),
        }
    }
    fn output_shape(&self) -> Vec<usize> {
        match self {
            ReferenceOperator::TensorProduct { shape, factors } => {
                let mut out = shape.clone();
                for (axis, a) in factors {
                    out[*axis] = a.nrows();
                }
                out
            }
            _ => vec![self.nrows()],
        }
    }
    /// Prepares the operator for the chosen algorithm.
    pub fn prepare(self, algorithm: OperatorAlgorithm) -> Self {
        match algorithm {
            OperatorAlgorithm::DenseMatrix => ReferenceOperator::Dense(self.to_dense()),
            OperatorAlgorithm::MatrixFreeTensorProduct => self,
        }
    }
    pub fn to_dense(&self) -> Array2<f64> {
        match self {
            ReferenceOperator::Identity(n) => Array2::eye(*n),
            ReferenceOperator::Dense(a) => a.clone(),
            ReferenceOperator::TensorProduct { shape, factors } => {
                let mut dense = Array2::<f64>::eye(1);
                for (k, &n) in shape.iter().enumerate() {
                    let factor = factors
                        .iter()
                        .find(|(axis, _)| *axis == k)
                        .map(|(_, a)| a.clone())
                        .unwrap_or_else(|| Array2::eye(n));
                    dense = kron(factor.view(), dense.view());
                }
                dense
            }
            ReferenceOperator::Warped(_) => self.apply(Array2::eye(self.ncols()).view()),
        }
    }
    /// Warped operators have no factorized transpose and are materialized.
    pub fn transpose(&self) -> Self {
        match self {
            ReferenceOperator::Warped(_) => ReferenceOperator::Dense(self.to_dense().t().to_owned()),
            ReferenceOperator::Identity(n) => ReferenceOperator::Identity(*n),
            ReferenceOperator::Dense(a) => ReferenceOperator::Dense(a.t().to_owned()),
            ReferenceOperator::TensorProduct { .. } => {
                let shape = self.output_shape();
                let factors = match self {
                    ReferenceOperator::TensorProduct { factors, .. } => factors
                        .iter()
                        .map(|(axis, a)| (*axis, a.t().to_owned()))
                        .collect(),
                    _ => Vec::new(),
                };
                ReferenceOperator::TensorProduct { shape, factors }
            }
        }
    }
    /// `A u`.
    pub fn apply(&self, u: ArrayView2<f64>) -> Array2<f64> {
        match self {
            ReferenceOperator::Identity(_) => u.to_owned(),
            ReferenceOperator::Dense(a) => a.dot(&u),
            ReferenceOperator::TensorProduct { shape, factors } => {
                let mut dims = shape.clone();
                let mut out = u.to_owned();
                for (axis, a) in factors {
                    out = apply_along_axis(a.view(), out.view(), &dims, *axis);
                    dims[*axis] = a.nrows();
                }
                out
            }
            ReferenceOperator::Warped(terms) => {
                let mut out = Array2::<f64>::zeros((self.nrows(), u.ncols()));
                for term in terms {
                    term.apply_into(u, &mut out);
                }
                out
            }
        }
    }
    /// `A^T u`.
    pub fn apply_transpose(&self, u: ArrayView2<f64>) -> Array2<f64> {
        match self {
            ReferenceOperator::Identity(_) => u.to_owned(),
            ReferenceOperator::Dense(a) => a.t().dot(&u),
            ReferenceOperator::TensorProduct { factors, .. } => {
                let mut dims = self.output_shape();
                let mut out = u.to_owned();
                for (axis, a) in factors {
                    out = apply_along_axis(a.t(), out.view(), &dims, *axis);
                    dims[*axis] = a.ncols();
                }
                out
            }
            ReferenceOperator::Warped(terms) => {
                let mut out = Array2::<f64>::zeros((self.ncols(), u.ncols()));
                for term in terms {
                    term.apply_transpose_into(u, &mut out);
                }
                out
            }
        }
    }
}

/// Applies the 1-D matrix `a` along `axis` of the tensor of shape `dims`
/// (first axis fastest) stored in the rows of `u`.
pub fn apply_along_axis(
    a: ArrayView2<f64>,
    u: ArrayView2<f64>,
    dims: &[usize],
    axis: usize,
) -> Array2<f64> {
    let nvars = u.ncols();
    let inner: usize = dims[..axis].iter().product();
    let outer: usize = dims[axis + 1..].iter().product();
    let (m, n) = a.dim();
    let lanes = Array3::from_shape_fn((outer, n, inner * nvars), |(o, j, r)| {
        u[[r / nvars + inner * (j + n * o), r % nvars]]
    });
    let mut result = Array3::<f64>::zeros((outer, m, inner * nvars));
    for (mut out_block, in_block) in result
        .axis_iter_mut(Axis(0))
        .zip(lanes.axis_iter(Axis(0)))
    {
        out_block.assign(&a.dot(&in_block));
    }
    Array2::from_shape_fn((outer * m * inner, nvars), |(row, var)| {
        result[[row / (inner * m), (row / inner) % m, (row % inner) * nvars + var]]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use ndarray_stats::DeviationExt;

    fn sample_operator() -> ReferenceOperator {
        ReferenceOperator::TensorProduct {
            shape: vec![2, 3, 2],
            factors: vec![
                (0, array![[1.0, 2.0], [0.5, -1.0], [3.0, 0.0]]),
                (2, array![[0.0, 1.0]]),
                (1, array![[1.0, -1.0, 2.0], [0.3, 0.2, 0.1]]),
            ],
        }
    }

    #[test]
    fn tensor_application_matches_dense() {
        let op = sample_operator();
        assert_eq!(op.ncols(), 12);
        assert_eq!(op.nrows(), 6);
        let u = Array2::from_shape_fn((12, 2), |(i, v)| (i as f64 * 0.37 + v as f64).sin());
        let dense = op.to_dense();
        let tensor = op.apply(u.view());
        let reference = dense.dot(&u);
        assert!(tensor.linf_dist(&reference).unwrap() < 1e-13);
    }

    #[test]
    fn tensor_transpose_matches_dense() {
        let op = sample_operator();
        let v = Array2::from_shape_fn((6, 3), |(i, k)| (i as f64 - k as f64 * 0.5).cos());
        let tensor = op.apply_transpose(v.view());
        let reference = op.to_dense().t().dot(&v);
        assert!(tensor.linf_dist(&reference).unwrap() < 1e-13);
        let t = op.transpose().to_dense();
        assert!(t.linf_dist(&op.to_dense().t()).unwrap() < 1e-14);
    }

    #[test]
    fn dense_preparation_keeps_values() {
        let op = sample_operator();
        let u = Array2::from_shape_fn((12, 1), |(i, _)| i as f64);
        let a = op.apply(u.view());
        let b = op.clone().prepare(OperatorAlgorithm::DenseMatrix).apply(u.view());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-12);
        }
    }
}
