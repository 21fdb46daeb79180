use ndarray::{Array1, Array2, Array3, Array4, ArrayView1, ArrayView2, Axis, s};

use crate::disc::basis::{Basis, powi_or_zero};
use crate::disc::operators::WarpedTerm;
use crate::disc::reference_element::Shape;

/// Proriol–Koornwinder–Dubiner basis on the reference tetrahedron, ordered
/// `(i, j, k)` with `k` fastest, `i + j + k <= n`.
pub struct TetrahedronBasis;

impl TetrahedronBasis {
    pub fn rst_to_abc(
        r: ArrayView1<f64>,
        s: ArrayView1<f64>,
        t: ArrayView1<f64>,
    ) -> (Array1<f64>, Array1<f64>, Array1<f64>) {
        let np = r.len();
        let mut a = Array1::<f64>::zeros(np);
        let mut b = Array1::<f64>::zeros(np);
        for i in 0..np {
            a[i] = if s[i] + t[i] != 0.0 {
                2.0 * (1.0 + r[i]) / (-s[i] - t[i]) - 1.0
            } else {
                -1.0
            };
            b[i] = if t[i] != 1.0 {
                2.0 * (1.0 + s[i]) / (1.0 - t[i]) - 1.0
            } else {
                -1.0
            };
        }
        (a, b, t.to_owned())
    }
    fn simplex3d_polynomial(
        a: &Array1<f64>,
        b: &Array1<f64>,
        c: &Array1<f64>,
        i: usize,
        j: usize,
        k: usize,
    ) -> Array1<f64> {
        let h1 = Self::jacobi_polynomial(a.view(), 0.0, 0.0, i);
        let h2 = Self::jacobi_polynomial(b.view(), 2.0 * i as f64 + 1.0, 0.0, j);
        let h3 = Self::jacobi_polynomial(c.view(), 2.0 * (i + j) as f64 + 2.0, 0.0, k);
        2.0 * 2.0_f64.sqrt()
            * &h1
            * &h2
            * (1.0 - b).powi(i as i32)
            * &h3
            * (1.0 - c).powi((i + j) as i32)
    }
    fn grad_simplex_3d(
        a: &Array1<f64>,
        b: &Array1<f64>,
        c: &Array1<f64>,
        id: usize,
        jd: usize,
        kd: usize,
    ) -> [Array1<f64>; 3] {
        let alpha_b = 2.0 * id as f64 + 1.0;
        let alpha_c = 2.0 * (id + jd) as f64 + 2.0;
        let fa = Self::jacobi_polynomial(a.view(), 0.0, 0.0, id);
        let dfa = Self::grad_jacobi_polynomial(a.view(), 0.0, 0.0, id);
        let gb = Self::jacobi_polynomial(b.view(), alpha_b, 0.0, jd);
        let dgb = Self::grad_jacobi_polynomial(b.view(), alpha_b, 0.0, jd);
        let hc = Self::jacobi_polynomial(c.view(), alpha_c, 0.0, kd);
        let dhc = Self::grad_jacobi_polynomial(c.view(), alpha_c, 0.0, kd);
        let half_1mb = 0.5 * (1.0 - b);
        let half_1mc = 0.5 * (1.0 - c);
        let (i, ij) = (id as i32, (id + jd) as i32);

        let mut dr = &dfa * &gb * &hc;
        if id > 0 {
            dr = dr * half_1mb.powi(i - 1);
        }
        if id + jd > 0 {
            dr = dr * half_1mc.powi(ij - 1);
        }

        let mut ds = 0.5 * (1.0 + a) * &dr;
        let mut tmp = &dgb * half_1mb.powi(i);
        if id > 0 {
            tmp = tmp - 0.5 * id as f64 * &gb * half_1mb.powi(i - 1);
        }
        if id + jd > 0 {
            tmp = tmp * half_1mc.powi(ij - 1);
        }
        let tmp = &fa * &tmp * &hc;
        ds = ds + &tmp;

        let mut dt = 0.5 * (1.0 + a) * &dr + 0.5 * (1.0 + b) * &tmp;
        let mut tmp_c = &dhc * half_1mc.powi(ij);
        if id + jd > 0 {
            tmp_c = tmp_c - 0.5 * (id + jd) as f64 * &hc * half_1mc.powi(ij - 1);
        }
        dt = dt + &fa * &gb * &tmp_c * half_1mb.powi(i);

        let scale = 2.0_f64.powf(2.0 * id as f64 + jd as f64 + 1.5);
        [dr * scale, ds * scale, dt * scale]
    }

    /// Factors of the basis on the collapsed grid `a × b × c`: the terms of
    /// `V` and of `∂/∂ξ1`, `∂/∂ξ2`, `∂/∂ξ3`.
    pub fn warped_factors(
        n: usize,
        a: ArrayView1<f64>,
        b: ArrayView1<f64>,
        c: ArrayView1<f64>,
    ) -> (Vec<WarpedTerm>, Vec<Vec<WarpedTerm>>) {
        let (na, nb, nc) = (a.len(), b.len(), c.len());
        let mut fa = Array2::<f64>::zeros((na, n + 1));
        let mut dfa = Array2::<f64>::zeros((na, n + 1));
        for i in 0..=n {
            fa.column_mut(i).assign(&Self::jacobi_polynomial(a, 0.0, 0.0, i));
            dfa.column_mut(i).assign(&Self::grad_jacobi_polynomial(a, 0.0, 0.0, i));
        }
        let dfa_mid = &dfa * &a.mapv(|x| 0.5 * (1.0 + x)).insert_axis(Axis(1));

        let half_1mb = b.mapv(|x| 0.5 * (1.0 - x));
        let half_1pb = b.mapv(|x| 0.5 * (1.0 + x));
        let mut gb_mode = Array3::<f64>::zeros((nb, n + 1, n + 1));
        let mut gb_lowered = Array3::<f64>::zeros((nb, n + 1, n + 1));
        let mut gb_derivative = Array3::<f64>::zeros((nb, n + 1, n + 1));
        let mut gb_derivative_mid = Array3::<f64>::zeros((nb, n + 1, n + 1));
        for i in 0..=n {
            let alpha = 2.0 * i as f64 + 1.0;
            let hi = half_1mb.mapv(|h| h.powi(i as i32));
            let hi1 = powi_or_zero(half_1mb.view(), i as i32 - 1);
            for j in 0..=n - i {
                let gb = Self::jacobi_polynomial(b, alpha, 0.0, j);
                let dgb = Self::grad_jacobi_polynomial(b, alpha, 0.0, j);
                gb_mode.slice_mut(s![.., i, j]).assign(&(&gb * &hi));
                gb_lowered.slice_mut(s![.., i, j]).assign(&(&gb * &hi1));
                let d = &dgb * &hi - &gb * &hi1 * (0.5 * i as f64);
                gb_derivative_mid.slice_mut(s![.., i, j]).assign(&(&d * &half_1pb));
                gb_derivative.slice_mut(s![.., i, j]).assign(&d);
            }
        }

        // the normalization 2^(2i + j + 3/2) is carried by the c factors
        let half_1mc = c.mapv(|x| 0.5 * (1.0 - x));
        let mut hc_mode = Array4::<f64>::zeros((nc, n + 1, n + 1, n + 1));
        let mut hc_lowered = Array4::<f64>::zeros((nc, n + 1, n + 1, n + 1));
        let mut hc_derivative = Array4::<f64>::zeros((nc, n + 1, n + 1, n + 1));
        for i in 0..=n {
            for j in 0..=n - i {
                let ij = (i + j) as i32;
                let alpha = 2.0 * (i + j) as f64 + 2.0;
                let scale = 2.0_f64.powf(2.0 * i as f64 + j as f64 + 1.5);
                let hij = half_1mc.mapv(|h| h.powi(ij));
                let hij1 = powi_or_zero(half_1mc.view(), ij - 1);
                for k in 0..=n - i - j {
                    let hc = Self::jacobi_polynomial(c, alpha, 0.0, k);
                    let dhc = Self::grad_jacobi_polynomial(c, alpha, 0.0, k);
                    hc_mode.slice_mut(s![.., i, j, k]).assign(&(&hc * &hij * scale));
                    hc_lowered.slice_mut(s![.., i, j, k]).assign(&(&hc * &hij1 * scale));
                    let d = &dhc * &hij - &hc * &hij1 * (0.5 * (i + j) as f64);
                    hc_derivative.slice_mut(s![.., i, j, k]).assign(&(d * scale));
                }
            }
        }

        let term = |outer: &Array2<f64>, middle: &Array3<f64>, inner: &Array4<f64>| WarpedTerm {
            a: outer.clone(),
            b: middle.clone(),
            c: Some(inner.clone()),
        };
        let volume = vec![term(&fa, &gb_mode, &hc_mode)];
        let gradient = vec![
            vec![term(&dfa, &gb_lowered, &hc_lowered)],
            vec![
                term(&dfa_mid, &gb_lowered, &hc_lowered),
                term(&fa, &gb_derivative, &hc_lowered),
            ],
            vec![
                term(&dfa_mid, &gb_lowered, &hc_lowered),
                term(&fa, &gb_derivative_mid, &hc_lowered),
                term(&fa, &gb_mode, &hc_derivative),
            ],
        ];
        (volume, gradient)
    }
}

impl Basis for TetrahedronBasis {
    const SHAPE: Shape = Shape::Tet;
    fn num_modes(n: usize) -> usize {
        (n + 1) * (n + 2) * (n + 3) / 6
    }
    fn vandermonde(n: usize, xi: ArrayView2<f64>) -> Array2<f64> {
        let mut v = Array2::<f64>::zeros((xi.nrows(), Self::num_modes(n)));
        let (a, b, c) = Self::rst_to_abc(xi.column(0), xi.column(1), xi.column(2));
        let mut sk = 0;
        for i in 0..=n {
            for j in 0..=(n - i) {
                for k in 0..=(n - i - j) {
                    v.column_mut(sk)
                        .assign(&Self::simplex3d_polynomial(&a, &b, &c, i, j, k));
                    sk += 1;
                }
            }
        }
        v
    }
    fn grad_vandermonde(n: usize, xi: ArrayView2<f64>) -> Vec<Array2<f64>> {
        let nm = Self::num_modes(n);
        let mut grads = vec![Array2::<f64>::zeros((xi.nrows(), nm)); 3];
        let (a, b, c) = Self::rst_to_abc(xi.column(0), xi.column(1), xi.column(2));
        let mut sk = 0;
        for i in 0..=n {
            for j in 0..=(n - i) {
                for k in 0..=(n - i - j) {
                    let cols = Self::grad_simplex_3d(&a, &b, &c, i, j, k);
                    for (g, col) in grads.iter_mut().zip(cols.iter()) {
                        g.column_mut(sk).assign(col);
                    }
                    sk += 1;
                }
            }
        }
        grads
    }
}
