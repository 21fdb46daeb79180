//! Systems of conservation laws `∂u/∂t + ∇·(F_inv(u) − F_vis(u, q)) = s`,
//! `q = ∇u`.
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut2};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PdeType {
    FirstOrder,
    /// Needs the auxiliary gradient `q = ∇u`.
    SecondOrder,
}

/// Flux arrays are `(d, N_c)`: row `n` is the flux in physical direction `n`.
pub trait ConservationLaw: Send + Sync {
    fn dim(&self) -> usize;
    fn num_vars(&self) -> usize;
    fn pde_type(&self) -> PdeType {
        PdeType::FirstOrder
    }
    fn inviscid_flux(&self, u: ArrayView1<f64>, flux: ArrayViewMut2<f64>);
    /// `q` is `(d, N_c)`.
    fn viscous_flux(&self, _u: ArrayView1<f64>, _q: ArrayView2<f64>, _flux: ArrayViewMut2<f64>) {}
    /// `F_inv(u) − F_vis(u, q)`.
    fn physical_flux(&self, u: ArrayView1<f64>, q: Option<ArrayView2<f64>>) -> Array2<f64> {
        let mut flux = Array2::zeros((self.dim(), self.num_vars()));
        self.inviscid_flux(u, flux.view_mut());
        if let Some(q) = q {
            let mut viscous = Array2::zeros((self.dim(), self.num_vars()));
            self.viscous_flux(u, q, viscous.view_mut());
            flux -= &viscous;
        }
        flux
    }
    /// State whose gradient is reconstructed as the auxiliary variable.
    fn auxiliary_flux(&self, u: ArrayView1<f64>) -> Array1<f64> {
        u.to_owned()
    }
    fn max_wave_speed(&self, u: ArrayView1<f64>, n: ArrayView1<f64>) -> f64;
    /// `n · F_inv(u)`.
    fn normal_inviscid_flux(&self, u: ArrayView1<f64>, n: ArrayView1<f64>) -> Array1<f64> {
        let mut flux = Array2::zeros((self.dim(), self.num_vars()));
        self.inviscid_flux(u, flux.view_mut());
        n.dot(&flux)
    }
    /// `n · F_vis(u, q)`.
    fn normal_viscous_flux(
        &self,
        u: ArrayView1<f64>,
        q: ArrayView2<f64>,
        n: ArrayView1<f64>,
    ) -> Array1<f64> {
        let mut flux = Array2::zeros((self.dim(), self.num_vars()));
        self.viscous_flux(u, q, flux.view_mut());
        n.dot(&flux)
    }
}

/// `∂u/∂t + ∇·(a u) = 0`.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearAdvection {
    pub velocity: Array1<f64>,
}

impl LinearAdvection {
    pub fn new(velocity: &[f64]) -> Self {
        Self {
            velocity: Array1::from(velocity.to_vec()),
        }
    }
}

impl ConservationLaw for LinearAdvection {
    fn dim(&self) -> usize {
        self.velocity.len()
    }
    fn num_vars(&self) -> usize {
        1
    }
    fn inviscid_flux(&self, u: ArrayView1<f64>, mut flux: ArrayViewMut2<f64>) {
        flux.column_mut(0).assign(&(&self.velocity * u[0]));
    }
    fn max_wave_speed(&self, _u: ArrayView1<f64>, n: ArrayView1<f64>) -> f64 {
        self.velocity.dot(&n).abs()
    }
}

/// `∂u/∂t + ∇·(a u − b ∇u) = 0`.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearAdvectionDiffusion {
    pub velocity: Array1<f64>,
    pub diffusivity: f64,
}

impl LinearAdvectionDiffusion {
    pub fn new(velocity: &[f64], diffusivity: f64) -> Self {
        Self {
            velocity: Array1::from(velocity.to_vec()),
            diffusivity,
        }
    }
}

impl ConservationLaw for LinearAdvectionDiffusion {
    fn dim(&self) -> usize {
        self.velocity.len()
    }
    fn num_vars(&self) -> usize {
        1
    }
    fn pde_type(&self) -> PdeType {
        PdeType::SecondOrder
    }
    fn inviscid_flux(&self, u: ArrayView1<f64>, mut flux: ArrayViewMut2<f64>) {
        flux.column_mut(0).assign(&(&self.velocity * u[0]));
    }
    fn viscous_flux(&self, _u: ArrayView1<f64>, q: ArrayView2<f64>, mut flux: ArrayViewMut2<f64>) {
        flux.assign(&(&q * self.diffusivity));
    }
    fn max_wave_speed(&self, _u: ArrayView1<f64>, n: ArrayView1<f64>) -> f64 {
        self.velocity.dot(&n).abs()
    }
}

/// `∂u/∂t + ∇·(a u²/2) = 0`.
#[derive(Clone, Debug, PartialEq)]
pub struct InviscidBurgers {
    pub direction: Array1<f64>,
}

impl InviscidBurgers {
    pub fn new(direction: &[f64]) -> Self {
        Self {
            direction: Array1::from(direction.to_vec()),
        }
    }
}

impl ConservationLaw for InviscidBurgers {
    fn dim(&self) -> usize {
        self.direction.len()
    }
    fn num_vars(&self) -> usize {
        1
    }
    fn inviscid_flux(&self, u: ArrayView1<f64>, mut flux: ArrayViewMut2<f64>) {
        flux.column_mut(0)
            .assign(&(&self.direction * (0.5 * u[0] * u[0])));
    }
    fn max_wave_speed(&self, u: ArrayView1<f64>, n: ArrayView1<f64>) -> f64 {
        (self.direction.dot(&n) * u[0]).abs()
    }
}

/// Compressible Euler equations in `d` dimensions; variables
/// `(ρ, ρv_1, .., ρv_d, E)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Euler {
    pub dim: usize,
    /// Ratio of specific heats.
    pub hcr: f64,
}

impl Euler {
    pub fn new(dim: usize, hcr: f64) -> Self {
        Self { dim, hcr }
    }
    pub fn velocity(&self, u: ArrayView1<f64>) -> Array1<f64> {
        Array1::from_shape_fn(self.dim, |n| u[n + 1] / u[0])
    }
    pub fn pressure(&self, u: ArrayView1<f64>) -> f64 {
        let momentum = u.slice(ndarray::s![1..=self.dim]);
        (self.hcr - 1.0) * (u[self.dim + 1] - 0.5 * momentum.dot(&momentum) / u[0])
    }
    pub fn sound_speed(&self, u: ArrayView1<f64>) -> f64 {
        (self.hcr * self.pressure(u) / u[0]).sqrt()
    }
    /// Conservative variables from density, velocity and pressure.
    pub fn conservative(&self, rho: f64, v: &[f64], p: f64) -> Array1<f64> {
        let mut u = Array1::zeros(self.dim + 2);
        u[0] = rho;
        let mut kinetic = 0.0;
        for (n, &vn) in v.iter().enumerate().take(self.dim) {
            u[n + 1] = rho * vn;
            kinetic += vn * vn;
        }
        u[self.dim + 1] = p / (self.hcr - 1.0) + 0.5 * rho * kinetic;
        u
    }
}

impl ConservationLaw for Euler {
    fn dim(&self) -> usize {
        self.dim
    }
    fn num_vars(&self) -> usize {
        self.dim + 2
    }
    fn inviscid_flux(&self, u: ArrayView1<f64>, mut flux: ArrayViewMut2<f64>) {
        let d = self.dim;
        let v = self.velocity(u);
        let p = self.pressure(u);
        for n in 0..d {
            flux[[n, 0]] = u[n + 1];
            for m in 0..d {
                flux[[n, m + 1]] = u[m + 1] * v[n];
            }
            flux[[n, n + 1]] += p;
            flux[[n, d + 1]] = v[n] * (u[d + 1] + p);
        }
    }
    fn max_wave_speed(&self, u: ArrayView1<f64>, n: ArrayView1<f64>) -> f64 {
        self.velocity(u).dot(&n).abs() + self.sound_speed(u)
    }
}
