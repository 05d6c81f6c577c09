//! Activation functions applied by every dense layer, output included.

use serde::{Deserialize, Serialize};

/// Element-wise activation shared by all layers of a network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Activation {
    /// `f(x) = beta * (1 - e^(-alpha x)) / (1 + e^(-alpha x))`, range `(-beta, beta)`.
    SymmetricSigmoid { alpha: f32, beta: f32 },
    /// `f(x) = x`
    Identity,
}

impl Activation {
    pub fn apply(&self, x: f32) -> f32 {
        match *self {
            // beta * tanh(alpha * x / 2) is the same curve without overflow in exp().
            Activation::SymmetricSigmoid { alpha, beta } => beta * (alpha * x * 0.5).tanh(),
            Activation::Identity => x,
        }
    }

    /// Derivative expressed through the activation's own output `y = f(x)`,
    /// which is what the backward pass has cached.
    pub fn derivative_from_output(&self, y: f32) -> f32 {
        match *self {
            Activation::SymmetricSigmoid { alpha, beta } => {
                let ratio = y / beta;
                alpha * beta * 0.5 * (1.0 - ratio * ratio)
            }
            Activation::Identity => 1.0,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        match *self {
            Activation::SymmetricSigmoid { alpha, beta } => {
                if !alpha.is_finite() || alpha <= 0.0 {
                    return Err(format!("activation alpha must be positive, got {alpha}"));
                }
                if !beta.is_finite() || beta <= 0.0 {
                    return Err(format!("activation beta must be positive, got {beta}"));
                }
                Ok(())
            }
            Activation::Identity => Ok(()),
        }
    }
}

impl Default for Activation {
    fn default() -> Self {
        Activation::SymmetricSigmoid {
            alpha: 1.0,
            beta: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_sigmoid_is_odd_and_bounded() {
        let act = Activation::default();
        assert_eq!(act.apply(0.0), 0.0);
        assert!((act.apply(1.5) + act.apply(-1.5)).abs() < 1e-6);
        assert!(act.apply(100.0) <= 1.0);
        assert!(act.apply(-100.0) >= -1.0);
    }

    #[test]
    fn matches_exponential_definition() {
        let act = Activation::SymmetricSigmoid {
            alpha: 2.0,
            beta: 1.5,
        };
        let x = 0.7f32;
        let e = (-2.0 * x).exp();
        let expected = 1.5 * (1.0 - e) / (1.0 + e);
        assert!((act.apply(x) - expected).abs() < 1e-6);
    }

    #[test]
    fn derivative_agrees_with_finite_difference() {
        let act = Activation::default();
        let x = 0.3f32;
        let h = 1e-3f32;
        let numeric = (act.apply(x + h) - act.apply(x - h)) / (2.0 * h);
        let analytic = act.derivative_from_output(act.apply(x));
        assert!((numeric - analytic).abs() < 1e-3);
    }

    #[test]
    fn rejects_non_positive_parameters() {
        let act = Activation::SymmetricSigmoid {
            alpha: 0.0,
            beta: 1.0,
        };
        assert!(act.validate().is_err());
        assert!(Activation::Identity.validate().is_ok());
    }
}
