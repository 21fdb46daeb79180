use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2};

use crate::disc::basis::{Basis, powi_or_zero};
use crate::disc::operators::WarpedTerm;
use crate::disc::reference_element::Shape;

/// Dubiner basis on the reference triangle, ordered `(i, j)` with `j`
/// fastest, `i + j <= n`.
pub struct TriangleBasis;

impl TriangleBasis {
    pub fn rs_to_ab(r: ArrayView1<f64>, s: ArrayView1<f64>) -> (Array1<f64>, Array1<f64>) {
        let a = r
            .iter()
            .zip(s.iter())
            .map(|(&r_val, &s_val)| {
                if s_val != 1.0 {
                    2.0 * (1.0 + r_val) / (1.0 - s_val) - 1.0
                } else {
                    -1.0
                }
            })
            .collect::<Array1<f64>>();
        let b = s.to_owned();
        (a, b)
    }
    fn dubiner_basis(a: ArrayView1<f64>, b: ArrayView1<f64>, i: usize, j: usize) -> Array1<f64> {
        2.0_f64.sqrt()
            * Self::jacobi_polynomial(a, 0.0, 0.0, i)
            * Self::jacobi_polynomial(b, 2.0 * i as f64 + 1.0, 0.0, j)
            * (1.0 - &b).powi(i as i32)
    }
    fn grad_simplex_2d(
        a: ArrayView1<f64>,
        b: ArrayView1<f64>,
        id: usize,
        jd: usize,
    ) -> (Array1<f64>, Array1<f64>) {
        let fa = Self::jacobi_polynomial(a, 0.0, 0.0, id);
        let gb = Self::jacobi_polynomial(b, 2.0 * id as f64 + 1.0, 0.0, jd);
        let dfa = Self::grad_jacobi_polynomial(a, 0.0, 0.0, id);
        let dgb = Self::grad_jacobi_polynomial(b, 2.0 * id as f64 + 1.0, 0.0, jd);
        let half_1mb = 0.5 * (1.0 - &b);
        let id_i = id as i32;
        let mut dmode_dr = &dfa * &gb;
        if id > 0 {
            dmode_dr = half_1mb.powi(id_i - 1) * &dmode_dr;
        }
        let mut dmode_ds = &dfa * (&gb * (0.5 * (1.0 + &a)));
        if id > 0 {
            dmode_ds = half_1mb.powi(id_i - 1) * &dmode_ds;
        }
        let mut tmp = &dgb * half_1mb.powi(id_i);
        if id > 0 {
            tmp = tmp - 0.5 * id as f64 * &gb * half_1mb.powi(id_i - 1);
        }
        dmode_ds = dmode_ds + &fa * &tmp;
        let scale = 2.0_f64.powf(id as f64 + 0.5);
        (dmode_dr * scale, dmode_ds * scale)
    }

    /// Factors of the basis on the collapsed grid `a × b`.
    ///
    /// Returns the terms of `V` and of `∂/∂ξ1`, `∂/∂ξ2`; the `1/(1 - b)` of
    /// the chain rule is cancelled against the `(1 - b)^i` of each mode.
    pub fn warped_factors(
        n: usize,
        a: ArrayView1<f64>,
        b: ArrayView1<f64>,
    ) -> (Vec<WarpedTerm>, Vec<Vec<WarpedTerm>>) {
        let (na, nb) = (a.len(), b.len());
        let mut fa = Array2::<f64>::zeros((na, n + 1));
        let mut dfa = Array2::<f64>::zeros((na, n + 1));
        for i in 0..=n {
            fa.column_mut(i).assign(&Self::jacobi_polynomial(a, 0.0, 0.0, i));
            dfa.column_mut(i).assign(&Self::grad_jacobi_polynomial(a, 0.0, 0.0, i));
        }
        let mid_a = a.mapv(|x| 0.5 * (1.0 + x)).insert_axis(ndarray::Axis(1));
        let dfa_mid = &dfa * &mid_a;

        let half_1mb = b.mapv(|x| 0.5 * (1.0 - x));
        let mut mode = Array3::<f64>::zeros((nb, n + 1, n + 1));
        let mut lowered = Array3::<f64>::zeros((nb, n + 1, n + 1));
        let mut derivative = Array3::<f64>::zeros((nb, n + 1, n + 1));
        for i in 0..=n {
            let scale = 2.0_f64.powf(i as f64 + 0.5);
            let hi = half_1mb.mapv(|h| h.powi(i as i32));
            let hi1 = powi_or_zero(half_1mb.view(), i as i32 - 1);
            for j in 0..=n - i {
                let alpha = 2.0 * i as f64 + 1.0;
                let gb = Self::jacobi_polynomial(b, alpha, 0.0, j);
                let dgb = Self::grad_jacobi_polynomial(b, alpha, 0.0, j);
                mode.slice_mut(ndarray::s![.., i, j]).assign(&(&gb * &hi * scale));
                lowered.slice_mut(ndarray::s![.., i, j]).assign(&(&gb * &hi1 * scale));
                let d = &dgb * &hi - &gb * &hi1 * (0.5 * i as f64);
                derivative.slice_mut(ndarray::s![.., i, j]).assign(&(d * scale));
            }
        }

        let term = |outer: &Array2<f64>, inner: &Array3<f64>| WarpedTerm {
            a: outer.clone(),
            b: inner.clone(),
            c: None,
        };
        let volume = vec![term(&fa, &mode)];
        let gradient = vec![
            vec![term(&dfa, &lowered)],
            vec![term(&dfa_mid, &lowered), term(&fa, &derivative)],
        ];
        (volume, gradient)
    }
}

impl Basis for TriangleBasis {
    const SHAPE: Shape = Shape::Tri;
    fn num_modes(n: usize) -> usize {
        (n + 1) * (n + 2) / 2
    }
    fn vandermonde(n: usize, xi: ArrayView2<f64>) -> Array2<f64> {
        let mut v = Array2::<f64>::zeros((xi.nrows(), Self::num_modes(n)));
        let (a, b) = Self::rs_to_ab(xi.column(0), xi.column(1));
        let mut sk: usize = 0;
        for i in 0..n + 1 {
            for j in 0..n + 1 - i {
                v.column_mut(sk)
                    .assign(&Self::dubiner_basis(a.view(), b.view(), i, j));
                sk += 1;
            }
        }
        v
    }
    fn grad_vandermonde(n: usize, xi: ArrayView2<f64>) -> Vec<Array2<f64>> {
        let nm = Self::num_modes(n);
        let mut v2dr = Array2::<f64>::zeros((xi.nrows(), nm));
        let mut v2ds = Array2::<f64>::zeros((xi.nrows(), nm));
        let (a, b) = Self::rs_to_ab(xi.column(0), xi.column(1));
        let mut sk: usize = 0;
        for i in 0..n + 1 {
            for j in 0..n + 1 - i {
                let (v2dr_col, v2ds_col) = Self::grad_simplex_2d(a.view(), b.view(), i, j);
                v2dr.column_mut(sk).assign(&v2dr_col);
                v2ds.column_mut(sk).assign(&v2ds_col);
                sk += 1;
            }
        }
        vec![v2dr, v2ds]
    }
}
