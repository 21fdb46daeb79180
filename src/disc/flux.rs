//! Numerical fluxes `F*(u⁻, u⁺, n)` per unit facet area, `n` the unit
//! outward normal of the interior element.
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::disc::conservation_law::{
    ConservationLaw, InviscidBurgers, LinearAdvection, LinearAdvectionDiffusion,
};

pub trait NumericalFlux<L: ConservationLaw>: Send + Sync {
    fn numerical_flux(
        &self,
        law: &L,
        u_in: ArrayView1<f64>,
        u_out: ArrayView1<f64>,
        n: ArrayView1<f64>,
    ) -> Array1<f64>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CentralFlux;

impl<L: ConservationLaw> NumericalFlux<L> for CentralFlux {
    fn numerical_flux(
        &self,
        law: &L,
        u_in: ArrayView1<f64>,
        u_out: ArrayView1<f64>,
        n: ArrayView1<f64>,
    ) -> Array1<f64> {
        (law.normal_inviscid_flux(u_in, n) + law.normal_inviscid_flux(u_out, n)) * 0.5
    }
}

/// Central flux with `dissipation · λ_max / 2 · (u⁻ − u⁺)`; a dissipation of
/// one is the Rusanov (local Lax–Friedrichs) flux.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaxFriedrichsFlux {
    pub dissipation: f64,
}

impl Default for LaxFriedrichsFlux {
    fn default() -> Self {
        Self { dissipation: 1.0 }
    }
}

impl<L: ConservationLaw> NumericalFlux<L> for LaxFriedrichsFlux {
    fn numerical_flux(
        &self,
        law: &L,
        u_in: ArrayView1<f64>,
        u_out: ArrayView1<f64>,
        n: ArrayView1<f64>,
    ) -> Array1<f64> {
        let wave_speed = law
            .max_wave_speed(u_in, n)
            .max(law.max_wave_speed(u_out, n));
        let central = (law.normal_inviscid_flux(u_in, n) + law.normal_inviscid_flux(u_out, n)) * 0.5;
        central + (&u_in - &u_out) * (0.5 * self.dissipation * wave_speed)
    }
}

/// Two-point flux conserving the square entropy `u²/2`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntropyConservativeFlux;

impl NumericalFlux<LinearAdvection> for EntropyConservativeFlux {
    fn numerical_flux(
        &self,
        law: &LinearAdvection,
        u_in: ArrayView1<f64>,
        u_out: ArrayView1<f64>,
        n: ArrayView1<f64>,
    ) -> Array1<f64> {
        CentralFlux.numerical_flux(law, u_in, u_out, n)
    }
}

impl NumericalFlux<LinearAdvectionDiffusion> for EntropyConservativeFlux {
    fn numerical_flux(
        &self,
        law: &LinearAdvectionDiffusion,
        u_in: ArrayView1<f64>,
        u_out: ArrayView1<f64>,
        n: ArrayView1<f64>,
    ) -> Array1<f64> {
        CentralFlux.numerical_flux(law, u_in, u_out, n)
    }
}

impl NumericalFlux<InviscidBurgers> for EntropyConservativeFlux {
    fn numerical_flux(
        &self,
        law: &InviscidBurgers,
        u_in: ArrayView1<f64>,
        u_out: ArrayView1<f64>,
        n: ArrayView1<f64>,
    ) -> Array1<f64> {
        let (ul, ur) = (u_in[0], u_out[0]);
        let an = law.direction.dot(&n);
        Array1::from_elem(1, an * (ul * ul + ul * ur + ur * ur) / 6.0)
    }
}

/// First Bassi–Rebay scheme for second-order terms: both the auxiliary
/// trace and the viscous flux are averages, with an optional jump penalty
/// that enters the total normal flux as `penalty · (u⁻ − u⁺)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BassiRebay1 {
    pub penalty: f64,
}

impl BassiRebay1 {
    pub fn auxiliary_trace(&self, u_in: ArrayView1<f64>, u_out: ArrayView1<f64>) -> Array1<f64> {
        (&u_in + &u_out) * 0.5
    }
    /// `n · F_vis*`, subtracted from the inviscid numerical flux.
    pub fn viscous_flux<L: ConservationLaw>(
        &self,
        law: &L,
        (u_in, q_in): (ArrayView1<f64>, ArrayView2<f64>),
        (u_out, q_out): (ArrayView1<f64>, ArrayView2<f64>),
        n: ArrayView1<f64>,
    ) -> Array1<f64> {
        let average =
            (law.normal_viscous_flux(u_in, q_in, n) + law.normal_viscous_flux(u_out, q_out, n)) * 0.5;
        average - (&u_in - &u_out) * self.penalty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn fluxes_are_consistent() {
        let law = InviscidBurgers::new(&[1.0, 0.5]);
        let u = array![1.3];
        let n = array![0.6, 0.8];
        let exact = law.normal_inviscid_flux(u.view(), n.view());
        let lf = LaxFriedrichsFlux::default().numerical_flux(&law, u.view(), u.view(), n.view());
        let ec = EntropyConservativeFlux.numerical_flux(&law, u.view(), u.view(), n.view());
        assert_relative_eq!(lf[0], exact[0], epsilon = 1e-14);
        assert_relative_eq!(ec[0], exact[0], epsilon = 1e-14);
    }

    #[test]
    fn rusanov_is_upwind_for_advection() {
        let law = LinearAdvection::new(&[2.0]);
        let n = array![1.0];
        let f = LaxFriedrichsFlux::default().numerical_flux(
            &law,
            array![3.0].view(),
            array![-1.0].view(),
            n.view(),
        );
        assert_relative_eq!(f[0], 6.0, epsilon = 1e-14);
    }

    #[test]
    fn fluxes_are_conservative() {
        let law = InviscidBurgers::new(&[1.0]);
        let (a, b) = (array![0.7], array![-0.2]);
        let n = array![1.0];
        let m = array![-1.0];
        let flux = LaxFriedrichsFlux { dissipation: 0.5 };
        let forward = flux.numerical_flux(&law, a.view(), b.view(), n.view());
        let backward = flux.numerical_flux(&law, b.view(), a.view(), m.view());
        assert_relative_eq!(forward[0], -backward[0], epsilon = 1e-14);
    }

    #[test]
    fn bassi_rebay_penalizes_jumps() {
        let law = LinearAdvectionDiffusion::new(&[0.0], 1.0);
        let q = array![[2.0]];
        let n = array![1.0];
        let br1 = BassiRebay1 { penalty: 0.5 };
        let f = br1.viscous_flux(
            &law,
            (array![1.0].view(), q.view()),
            (array![0.0].view(), q.view()),
            n.view(),
        );
        assert_relative_eq!(f[0], 2.0 - 0.5, epsilon = 1e-14);
        assert_relative_eq!(
            br1.auxiliary_trace(array![1.0].view(), array![0.0].view())[0],
            0.5
        );
    }
}
