//! The supervised function approximator behind the preference model.
//!
//! A small dense multi-layer perceptron trained one example at a time. The
//! building blocks are deliberately fixed at construction: layer sizes,
//! activation, termination criteria and training method all live in a
//! [`ModelSpec`] that travels with the weights.

pub mod activation;
pub mod network;
pub mod optimizer;
pub mod spec;

use std::fmt;

pub use activation::Activation;
pub use network::{DenseLayer, Network};
pub use optimizer::{BackpropParams, RpropParams, TrainMethod};
pub use spec::{ModelSpec, TermCriteria};

#[derive(Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// The model spec or stored weights do not describe a usable network.
    InvalidArchitecture(String),
    /// Feature vector width differs from the input layer.
    DimensionMismatch { expected: usize, got: usize },
    /// A NaN or infinity appeared where a finite value is required.
    NonFinite(String),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::InvalidArchitecture(msg) => write!(f, "invalid architecture: {msg}"),
            NetworkError::DimensionMismatch { expected, got } => write!(
                f,
                "feature width mismatch: network expects {expected}, got {got}"
            ),
            NetworkError::NonFinite(what) => write!(f, "non-finite value in {what}"),
        }
    }
}

impl std::error::Error for NetworkError {}
