//! Weight-update rules for single-example supervised training.
//!
//! Optimizer state (RPROP step sizes, momentum terms) is keyed by parameter
//! name and lives only for the duration of one training call; the network's
//! weights are the only state carried between calls.

use std::collections::HashMap;

use ndarray::{Array, Dimension};
use serde::{Deserialize, Serialize};

/// Resilient back-propagation (iRprop-) parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RpropParams {
    /// Step size every weight starts a training call with.
    pub initial_step: f32,
    /// Growth factor applied while the gradient keeps its sign.
    pub step_increase: f32,
    /// Shrink factor applied when the gradient flips sign.
    pub step_decrease: f32,
    pub min_step: f32,
    pub max_step: f32,
}

impl Default for RpropParams {
    fn default() -> Self {
        Self {
            initial_step: 0.1,
            step_increase: 1.2,
            step_decrease: 0.5,
            min_step: f32::EPSILON,
            max_step: 50.0,
        }
    }
}

/// Classic gradient descent with momentum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackpropParams {
    pub learning_rate: f32,
    pub momentum: f32,
}

impl Default for BackpropParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            momentum: 0.1,
        }
    }
}

/// Training algorithm family of a network. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TrainMethod {
    Rprop(RpropParams),
    Backprop(BackpropParams),
}

impl Default for TrainMethod {
    fn default() -> Self {
        TrainMethod::Rprop(RpropParams::default())
    }
}

impl TrainMethod {
    pub fn name(&self) -> &'static str {
        match self {
            TrainMethod::Rprop(_) => "rprop",
            TrainMethod::Backprop(_) => "backprop",
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        let positive = |name: &str, value: f32| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(format!("{name} must be positive, got {value}"))
            }
        };

        match self {
            TrainMethod::Rprop(p) => {
                positive("rprop initial_step", p.initial_step)?;
                positive("rprop min_step", p.min_step)?;
                positive("rprop max_step", p.max_step)?;
                if p.step_increase <= 1.0 || !p.step_increase.is_finite() {
                    return Err(format!(
                        "rprop step_increase must be greater than 1, got {}",
                        p.step_increase
                    ));
                }
                if !(p.step_decrease > 0.0 && p.step_decrease < 1.0) {
                    return Err(format!(
                        "rprop step_decrease must lie in (0, 1), got {}",
                        p.step_decrease
                    ));
                }
                if p.min_step > p.max_step {
                    return Err("rprop min_step exceeds max_step".to_string());
                }
                Ok(())
            }
            TrainMethod::Backprop(p) => {
                positive("backprop learning_rate", p.learning_rate)?;
                if !(0.0..1.0).contains(&p.momentum) {
                    return Err(format!(
                        "backprop momentum must lie in [0, 1), got {}",
                        p.momentum
                    ));
                }
                Ok(())
            }
        }
    }
}

#[derive(Clone, Copy, Default)]
struct RpropCell {
    step: f32,
    prev_grad: f32,
}

/// Per-call optimizer built from a [`TrainMethod`].
pub(crate) enum Optimizer {
    Rprop {
        params: RpropParams,
        cells: HashMap<String, Vec<RpropCell>>,
    },
    Backprop {
        params: BackpropParams,
        velocities: HashMap<String, Vec<f32>>,
    },
}

impl Optimizer {
    pub(crate) fn new(method: &TrainMethod) -> Self {
        match *method {
            TrainMethod::Rprop(params) => Optimizer::Rprop {
                params,
                cells: HashMap::new(),
            },
            TrainMethod::Backprop(params) => Optimizer::Backprop {
                params,
                velocities: HashMap::new(),
            },
        }
    }

    /// Updates `param` in place from `gradient` (dE/dparam).
    pub(crate) fn step<D: Dimension>(
        &mut self,
        param_name: &str,
        param: &mut Array<f32, D>,
        gradient: &Array<f32, D>,
    ) {
        match self {
            Optimizer::Rprop { params, cells } => {
                let state = cells.entry(param_name.to_string()).or_insert_with(|| {
                    vec![
                        RpropCell {
                            step: params.initial_step,
                            prev_grad: 0.0,
                        };
                        param.len()
                    ]
                });

                for ((weight, &grad), cell) in
                    param.iter_mut().zip(gradient.iter()).zip(state.iter_mut())
                {
                    let trend = grad * cell.prev_grad;
                    if trend > 0.0 {
                        cell.step = (cell.step * params.step_increase).min(params.max_step);
                        *weight -= sign(grad) * cell.step;
                        cell.prev_grad = grad;
                    } else if trend < 0.0 {
                        // Overshot a minimum: shrink and skip this update.
                        cell.step = (cell.step * params.step_decrease).max(params.min_step);
                        cell.prev_grad = 0.0;
                    } else {
                        *weight -= sign(grad) * cell.step;
                        cell.prev_grad = grad;
                    }
                }
            }
            Optimizer::Backprop { params, velocities } => {
                let velocity = velocities
                    .entry(param_name.to_string())
                    .or_insert_with(|| vec![0.0; param.len()]);

                for ((weight, &grad), v) in
                    param.iter_mut().zip(gradient.iter()).zip(velocity.iter_mut())
                {
                    *v = params.momentum * *v - params.learning_rate * grad;
                    *weight += *v;
                }
            }
        }
    }
}

fn sign(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}
