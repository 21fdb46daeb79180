use std::fs;

use serde::Deserialize;

use crate::disc::operators::OperatorAlgorithm;
use crate::disc::reference_approximation::{ApproximationKind, QuadratureOverrides};
use crate::disc::reference_element::Shape;
use crate::error::Result;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ConservationLawParams {
    LinearAdvection { velocity: Vec<f64> },
    LinearAdvectionDiffusion { velocity: Vec<f64>, diffusivity: f64 },
    InviscidBurgers { direction: Vec<f64> },
    Euler { hcr: f64 },
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "type")]
pub enum NumericalFluxParams {
    Central,
    LaxFriedrichs { dissipation: f64 },
    EntropyConservative,
    Hllc,
}

impl Default for NumericalFluxParams {
    fn default() -> Self {
        NumericalFluxParams::LaxFriedrichs { dissipation: 1.0 }
    }
}

fn default_mapping_degree() -> usize {
    1
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct DiscretizationParamParser {
    pub shape: Shape,
    pub approximation: ApproximationKind,
    /// Kept signed so that negative orders are reported as construction
    /// errors rather than parse errors.
    pub polynomial_order: i64,
    #[serde(default = "default_mapping_degree")]
    pub mapping_degree: usize,
    pub elements: Vec<usize>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    #[serde(default)]
    pub periodic: bool,
    #[serde(default)]
    pub operator_algorithm: OperatorAlgorithm,
    #[serde(default)]
    pub quadrature: QuadratureOverrides,
    pub conservation_law: ConservationLawParams,
    #[serde(default)]
    pub numerical_flux: NumericalFluxParams,
    /// Bassi–Rebay penalty for second-order laws.
    #[serde(default)]
    pub penalty: f64,
    /// Amplitude of the sinusoidal mesh perturbation, relative to the box.
    #[serde(default)]
    pub warp_amplitude: f64,
}

impl DiscretizationParamParser {
    pub fn parse(file_path: &str) -> Result<Self> {
        let file_content = fs::read_to_string(file_path)?;
        Self::from_json(&file_content)
    }
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}
