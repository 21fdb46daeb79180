//! Exterior states for boundary facets.
use hashbrown::HashMap;
use ndarray::{Array1, ArrayView1, ArrayViewMut1};

use crate::disc::mesh::BoundaryTag;

pub trait BoundaryCondition: Send + Sync {
    /// Writes the exterior state seen by the facet node at `x` with unit
    /// outward normal `n`.
    fn exterior_state(
        &self,
        x: ArrayView1<f64>,
        n: ArrayView1<f64>,
        t: f64,
        u_in: ArrayView1<f64>,
        u_out: ArrayViewMut1<f64>,
    );
}

pub type BoundaryConditions = HashMap<BoundaryTag, Box<dyn BoundaryCondition>>;

#[derive(Clone, Debug)]
pub struct ConstantBoundary {
    pub value: Array1<f64>,
}

impl BoundaryCondition for ConstantBoundary {
    fn exterior_state(
        &self,
        _x: ArrayView1<f64>,
        _n: ArrayView1<f64>,
        _t: f64,
        _u_in: ArrayView1<f64>,
        mut u_out: ArrayViewMut1<f64>,
    ) {
        u_out.assign(&self.value);
    }
}

/// Exterior state prescribed as a function of position and time.
#[derive(Clone)]
pub struct FunctionBoundary<F> {
    pub func: F,
}

impl<F> BoundaryCondition for FunctionBoundary<F>
where
    F: Fn(ArrayView1<f64>, f64) -> Array1<f64> + Send + Sync,
{
    fn exterior_state(
        &self,
        x: ArrayView1<f64>,
        _n: ArrayView1<f64>,
        t: f64,
        _u_in: ArrayView1<f64>,
        mut u_out: ArrayViewMut1<f64>,
    ) {
        u_out.assign(&(self.func)(x, t));
    }
}

/// Copies the interior state.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenBoundary;

impl BoundaryCondition for OpenBoundary {
    fn exterior_state(
        &self,
        _x: ArrayView1<f64>,
        _n: ArrayView1<f64>,
        _t: f64,
        u_in: ArrayView1<f64>,
        mut u_out: ArrayViewMut1<f64>,
    ) {
        u_out.assign(&u_in);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn function_boundary_sees_position_and_time() {
        let bc = FunctionBoundary {
            func: |x: ArrayView1<f64>, t: f64| array![x[0] + t],
        };
        let mut out = array![0.0];
        bc.exterior_state(
            array![1.5].view(),
            array![-1.0].view(),
            0.25,
            array![9.0].view(),
            out.view_mut(),
        );
        assert_eq!(out[0], 1.75);
    }

    #[test]
    fn open_boundary_extrapolates() {
        let mut out = array![0.0, 0.0];
        OpenBoundary.exterior_state(
            array![0.0].view(),
            array![1.0].view(),
            0.0,
            array![2.0, 3.0].view(),
            out.view_mut(),
        );
        assert_eq!(out, array![2.0, 3.0]);
    }
}
