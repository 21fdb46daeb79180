//! Error taxonomy.
//!
//! Setup-time failures (bad reference parameters, broken meshes, inconsistent
//! configuration) abort construction. Residual evaluation never returns an
//! error: NaN/Inf are left in the output for the time integrator to inspect.

use thiserror::Error;

use crate::disc::reference_element::Shape;

/// Failure while building reference-element operators.
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("polynomial degree must be non-negative, got {0}")]
    NegativeDegree(i64),

    #[error(
        "{which} quadrature is exact to degree {actual}, but degree {required} is needed for an SBP operator of degree {degree}"
    )]
    InsufficientQuadrature {
        which: &'static str,
        degree: usize,
        required: usize,
        actual: usize,
    },

    #[error("{approximation} is not supported on {shape:?}")]
    Unsupported {
        shape: Shape,
        approximation: &'static str,
    },

    #[error("invalid quadrature override: {0}")]
    InvalidQuadrature(String),

    #[error("singular {0} matrix")]
    Singular(&'static str),
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error("element {element} is degenerate: Jacobian determinant {jacobian:e} at volume node {node}")]
    DegenerateElement {
        element: usize,
        node: usize,
        jacobian: f64,
    },

    #[error("non-finite value in element {element}, node {node}, variable {variable}")]
    NumericalInstability {
        element: usize,
        node: usize,
        variable: usize,
    },

    #[error("configuration mismatch: {0}")]
    ConfigurationMismatch(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
