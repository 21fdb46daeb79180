use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::ConstructionError;

pub mod legendre_points;
pub mod lobatto_points;

/// Family of a one-dimensional quadrature rule on `[-1, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum QuadratureFamily {
    LegendreGauss,
    LegendreGaussLobatto,
    /// Gauss–Jacobi rule for the weight `(1 - x)^alpha`.
    JacobiGauss { alpha: f64 },
}

#[derive(Clone, Debug)]
pub struct GaussPoints1d {
    pub family: QuadratureFamily,
    pub points: Array1<f64>,
    pub weights: Array1<f64>,
}
impl GaussPoints1d {
    pub fn new(family: QuadratureFamily, points_num: usize) -> Result<Self, ConstructionError> {
        if points_num == 0 {
            return Err(ConstructionError::InvalidQuadrature(
                "a rule needs at least one point".to_string(),
            ));
        }
        let (points, weights) = match family {
            QuadratureFamily::LegendreGauss => {
                legendre_points::get_jacobi_gauss_points(0.0, 0.0, points_num)?
            }
            QuadratureFamily::LegendreGaussLobatto => {
                if points_num < 2 {
                    return Err(ConstructionError::InvalidQuadrature(
                        "Gauss-Lobatto rules need at least two points".to_string(),
                    ));
                }
                lobatto_points::get_lobatto_points_interval(points_num)?
            }
            QuadratureFamily::JacobiGauss { alpha } => {
                if alpha <= -1.0 {
                    return Err(ConstructionError::InvalidQuadrature(format!(
                        "Jacobi weight exponent must exceed -1, got {alpha}"
                    )));
                }
                legendre_points::get_jacobi_gauss_points(alpha, 0.0, points_num)?
            }
        };
        Ok(Self {
            family,
            points,
            weights,
        })
    }
    pub fn len(&self) -> usize {
        self.points.len()
    }
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
    /// Highest polynomial degree integrated exactly (against the family's
    /// weight function).
    pub fn exactness(&self) -> usize {
        let n = self.len();
        match self.family {
            QuadratureFamily::LegendreGaussLobatto => 2 * n - 3,
            _ => 2 * n - 1,
        }
    }
    /// Exponent `alpha` of the weight function `(1 - x)^alpha` built into the
    /// weights.
    pub fn weight_exponent(&self) -> f64 {
        match self.family {
            QuadratureFamily::JacobiGauss { alpha } => alpha,
            _ => 0.0,
        }
    }
}
