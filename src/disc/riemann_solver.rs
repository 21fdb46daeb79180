use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::disc::conservation_law::{ConservationLaw, Euler};
use crate::disc::flux::NumericalFlux;

/// HLLC approximate Riemann solver in the frame of the facet normal, with
/// pressure-based wave speed estimates. Negative density or pressure yields
/// a NaN flux.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HllcFlux;

impl NumericalFlux<Euler> for HllcFlux {
    fn numerical_flux(
        &self,
        law: &Euler,
        u_in: ArrayView1<f64>,
        u_out: ArrayView1<f64>,
        n: ArrayView1<f64>,
    ) -> Array1<f64> {
        let hcr = law.hcr;
        let d = law.dim;
        let (rl, rr) = (u_in[0], u_out[0]);
        let (pl, pr) = (law.pressure(u_in), law.pressure(u_out));
        if !(rl > 0.0 && rr > 0.0 && pl > 0.0 && pr > 0.0) {
            return Array1::from_elem(d + 2, f64::NAN);
        }
        let (vl, vr) = (law.velocity(u_in), law.velocity(u_out));
        let (ul, ur) = (vl.dot(&n), vr.dot(&n));
        let cl = (hcr * pl / rl).sqrt();
        let cr = (hcr * pr / rr).sqrt();
        let fl = law.normal_inviscid_flux(u_in, n);
        let fr = law.normal_inviscid_flux(u_out, n);

        let p_star = {
            let zeta = (hcr - 1.0) / (2.0 * hcr);
            ((cl + cr - (hcr - 1.0) / 2.0 * (ur - ul)) / (cl / pl.powf(zeta) + cr / pr.powf(zeta)))
                .powf(1.0 / zeta)
        };
        let shock_factor = |p: f64| {
            if p_star <= p {
                1.0
            } else {
                (1.0 + (hcr + 1.0) / (2.0 * hcr) * (p_star / p - 1.0)).sqrt()
            }
        };
        let sl = ul - cl * shock_factor(pl);
        let sr = ur + cr * shock_factor(pr);
        if sl >= 0.0 {
            return fl;
        }
        if sr <= 0.0 {
            return fr;
        }
        let s_star = (pr - pl + rl * ul * (sl - ul) - rr * ur * (sr - ur))
            / (rl * (sl - ul) - rr * (sr - ur));
        let star_state = |u: ArrayView1<f64>, v: &Array1<f64>, un: f64, p: f64, s: f64| {
            let rho = u[0];
            let factor = rho * (s - un) / (s - s_star);
            let mut q = Array1::zeros(d + 2);
            q[0] = factor;
            for m in 0..d {
                q[m + 1] = factor * (v[m] + (s_star - un) * n[m]);
            }
            q[d + 1] = factor * (u[d + 1] / rho + (s_star - un) * (s_star + p / (rho * (s - un))));
            q
        };
        if s_star >= 0.0 {
            let q_star = star_state(u_in, &vl, ul, pl, sl);
            fl + (q_star - u_in) * sl
        } else {
            let q_star = star_state(u_out, &vr, ur, pr, sr);
            fr + (q_star - u_out) * sr
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn consistent_for_equal_states() {
        let law = Euler::new(2, 1.4);
        let u = law.conservative(1.1, &[0.3, -0.4], 0.9);
        let n = array![0.8, -0.6];
        let f = HllcFlux.numerical_flux(&law, u.view(), u.view(), n.view());
        let exact = law.normal_inviscid_flux(u.view(), n.view());
        for (a, b) in f.iter().zip(exact.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn sod_interface_flux_is_conservative() {
        let law = Euler::new(1, 1.4);
        let left = law.conservative(1.0, &[0.0], 1.0);
        let right = law.conservative(0.125, &[0.0], 0.1);
        let forward = HllcFlux.numerical_flux(&law, left.view(), right.view(), array![1.0].view());
        let backward =
            HllcFlux.numerical_flux(&law, right.view(), left.view(), array![-1.0].view());
        for (a, b) in forward.iter().zip(backward.iter()) {
            assert_relative_eq!(*a, -*b, epsilon = 1e-12);
        }
        assert!(forward[0] > 0.0);
    }

    #[test]
    fn negative_pressure_gives_nan() {
        let law = Euler::new(1, 1.4);
        let bad = array![1.0, 0.0, -1.0];
        let good = law.conservative(1.0, &[0.0], 1.0);
        let f = HllcFlux.numerical_flux(&law, bad.view(), good.view(), array![1.0].view());
        assert!(f.iter().all(|v| v.is_nan()));
    }
}
