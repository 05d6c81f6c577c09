//! Declared architecture of a preference network.

use serde::{Deserialize, Serialize};

use super::activation::Activation;
use super::optimizer::TrainMethod;
use super::NetworkError;
use crate::sampler::FEATURE_WIDTH;

/// When a single training call stops.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TermCriteria {
    /// Upper bound on weight updates per call.
    pub max_iterations: usize,
    /// Stop once `|output - target|` drops below this.
    pub epsilon: f32,
}

impl Default for TermCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            epsilon: 1e-2,
        }
    }
}

/// Everything that defines a network apart from its learned weights.
///
/// The layer sizes, activation, termination criteria and training method must
/// not change once a model has been trained; [`ModelSpec::incompatibility`]
/// reports a difference in any of them. The seed only affects initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub layer_sizes: Vec<usize>,
    pub activation: Activation,
    pub termination: TermCriteria,
    pub method: TrainMethod,
    pub seed: u64,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            layer_sizes: vec![FEATURE_WIDTH, 6, 9, 6, 1],
            activation: Activation::default(),
            termination: TermCriteria::default(),
            method: TrainMethod::default(),
            seed: 42,
        }
    }
}

impl ModelSpec {
    pub fn validate(&self) -> Result<(), NetworkError> {
        let invalid = |msg: String| Err(NetworkError::InvalidArchitecture(msg));

        if self.layer_sizes.len() < 3 {
            return invalid(format!(
                "expected input, at least one hidden and an output layer, got {} layers",
                self.layer_sizes.len()
            ));
        }
        if self.layer_sizes[0] != FEATURE_WIDTH {
            return invalid(format!(
                "input layer must have {FEATURE_WIDTH} units, got {}",
                self.layer_sizes[0]
            ));
        }
        if self.layer_sizes.last() != Some(&1) {
            return invalid(format!(
                "output layer must have 1 unit, got {:?}",
                self.layer_sizes.last()
            ));
        }
        if self.layer_sizes.contains(&0) {
            return invalid("layer sizes must be non-zero".to_string());
        }
        if self.termination.max_iterations == 0 {
            return invalid("termination max_iterations must be non-zero".to_string());
        }
        if !self.termination.epsilon.is_finite() || self.termination.epsilon <= 0.0 {
            return invalid(format!(
                "termination epsilon must be positive, got {}",
                self.termination.epsilon
            ));
        }

        self.activation
            .validate()
            .map_err(NetworkError::InvalidArchitecture)?;
        self.method
            .validate()
            .map_err(NetworkError::InvalidArchitecture)
    }

    /// Describes the first difference that would make weights trained under
    /// `self` meaningless under `other`, or `None` if they are interchangeable.
    pub fn incompatibility(&self, other: &ModelSpec) -> Option<String> {
        if self.layer_sizes != other.layer_sizes {
            return Some(format!(
                "layer sizes {:?} vs {:?}",
                self.layer_sizes, other.layer_sizes
            ));
        }
        if self.activation != other.activation {
            return Some(format!(
                "activation {:?} vs {:?}",
                self.activation, other.activation
            ));
        }
        if self.termination != other.termination {
            return Some(format!(
                "termination {:?} vs {:?}",
                self.termination, other.termination
            ));
        }
        if self.method != other.method {
            return Some(format!("training method {:?} vs {:?}", self.method, other.method));
        }
        None
    }

    pub fn num_parameters(&self) -> usize {
        self.layer_sizes
            .windows(2)
            .map(|pair| pair[0] * pair[1] + pair[1])
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_spec_is_valid() {
        let spec = ModelSpec::default();
        spec.validate().expect("default spec");
        assert_eq!(spec.layer_sizes, vec![3, 6, 9, 6, 1]);
        assert_eq!(spec.num_parameters(), 24 + 63 + 60 + 7);
    }

    #[test]
    fn rejects_wrong_input_or_output_width() {
        let spec = ModelSpec {
            layer_sizes: vec![4, 6, 1],
            ..ModelSpec::default()
        };
        assert!(spec.validate().is_err());

        let spec = ModelSpec {
            layer_sizes: vec![3, 6, 2],
            ..ModelSpec::default()
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn requires_a_hidden_layer() {
        let spec = ModelSpec {
            layer_sizes: vec![3, 1],
            ..ModelSpec::default()
        };
        let err = spec.validate().expect_err("no hidden layer");
        assert!(matches!(err, NetworkError::InvalidArchitecture(_)));
    }

    #[test]
    fn seed_does_not_affect_compatibility() {
        let a = ModelSpec::default();
        let b = ModelSpec {
            seed: 7,
            ..ModelSpec::default()
        };
        assert!(a.incompatibility(&b).is_none());

        let c = ModelSpec {
            layer_sizes: vec![3, 4, 1],
            ..ModelSpec::default()
        };
        let reason = a.incompatibility(&c).expect("different layers");
        assert!(reason.contains("layer sizes"));
    }
}
