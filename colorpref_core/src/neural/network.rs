//! Dense multi-layer perceptron regressing a single scalar.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::optimizer::Optimizer;
use super::spec::ModelSpec;
use super::NetworkError;
use crate::training::{squared_error, TrainingMode, TrainingReport};

/// One fully connected layer: `y = f(W x + b)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// `[outputs, inputs]`
    pub weights: Array2<f32>,
    /// `[outputs]`
    pub bias: Array1<f32>,
}

/// Network weights together with the `ModelSpec` that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    spec: ModelSpec,
    layers: Vec<DenseLayer>,
}

impl Network {
    /// Builds a network with deterministic, seed-derived initial weights.
    pub fn new(spec: ModelSpec) -> Result<Self, NetworkError> {
        spec.validate()?;
        let layers = initial_layers(&spec);
        Ok(Self { spec, layers })
    }

    /// Reassembles a network from stored parts, checking every shape against the
    /// model spec.
    pub fn from_parts(spec: ModelSpec, layers: Vec<DenseLayer>) -> Result<Self, NetworkError> {
        spec.validate()?;
        let expected = spec.layer_sizes.len() - 1;
        if layers.len() != expected {
            return Err(NetworkError::InvalidArchitecture(format!(
                "expected {expected} weight layers, found {}",
                layers.len()
            )));
        }

        for (idx, (layer, pair)) in layers.iter().zip(spec.layer_sizes.windows(2)).enumerate() {
            let (inputs, outputs) = (pair[0], pair[1]);
            if layer.weights.dim() != (outputs, inputs) || layer.bias.len() != outputs {
                return Err(NetworkError::InvalidArchitecture(format!(
                    "layer {idx} has weights {:?} and bias {}, expected ({outputs}, {inputs}) and {outputs}",
                    layer.weights.dim(),
                    layer.bias.len()
                )));
            }
            if layer.weights.iter().chain(layer.bias.iter()).any(|v| !v.is_finite()) {
                return Err(NetworkError::NonFinite(format!("layer {idx} parameters")));
            }
        }

        Ok(Self { spec, layers })
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub fn input_width(&self) -> usize {
        self.spec.layer_sizes[0]
    }

    /// Scalar network output for `features`.
    pub fn predict(&self, features: &[f32]) -> Result<f32, NetworkError> {
        self.check_width(features)?;
        let activations = self.forward_all(ArrayView1::from(features));
        let output = activations.last().map(|a| a[0]).unwrap_or(f32::NAN);
        if output.is_finite() {
            Ok(output)
        } else {
            Err(NetworkError::NonFinite("network output".to_string()))
        }
    }

    /// Fits the network to one `(features, target)` example.
    ///
    /// [`TrainingMode::Initial`] first resets the weights to their seeded
    /// initial values; [`TrainingMode::Incremental`] starts from the current
    /// weights. On error the weights are left exactly as they were.
    pub fn train(
        &mut self,
        features: &[f32],
        target: f32,
        mode: TrainingMode,
    ) -> Result<TrainingReport, NetworkError> {
        self.check_width(features)?;
        if !target.is_finite() {
            return Err(NetworkError::NonFinite("training target".to_string()));
        }

        let backup = self.layers.clone();
        if mode == TrainingMode::Initial {
            self.layers = initial_layers(&self.spec);
        }

        let result = self.fit(ArrayView1::from(features), target, mode);
        if result.is_err() {
            self.layers = backup;
        }
        result
    }

    fn fit(
        &mut self,
        input: ArrayView1<f32>,
        target: f32,
        mode: TrainingMode,
    ) -> Result<TrainingReport, NetworkError> {
        let term = self.spec.termination;
        let mut optimizer = Optimizer::new(&self.spec.method);
        let mut iterations = 0;
        let mut first_error = None;

        loop {
            let activations = self.forward_all(input);
            let output = activations.last().map(|a| a[0]).unwrap_or(f32::NAN);
            let residual = output - target;
            if !residual.is_finite() {
                return Err(NetworkError::NonFinite(format!(
                    "output after {iterations} updates"
                )));
            }

            let error = residual.abs();
            let initial_error = *first_error.get_or_insert(error);
            let converged = error < term.epsilon;
            if converged || iterations >= term.max_iterations {
                tracing::trace!(
                    iterations,
                    loss = squared_error(output, target),
                    converged,
                    "training call finished"
                );
                return Ok(TrainingReport {
                    mode,
                    iterations,
                    initial_error,
                    final_error: error,
                    converged,
                });
            }

            let gradients = self.backward(&activations, residual);
            for (idx, (grad_weights, grad_bias)) in gradients.into_iter().enumerate() {
                optimizer.step(
                    &format!("layer{idx}_weights"),
                    &mut self.layers[idx].weights,
                    &grad_weights,
                );
                optimizer.step(
                    &format!("layer{idx}_bias"),
                    &mut self.layers[idx].bias,
                    &grad_bias,
                );
            }
            iterations += 1;
        }
    }

    /// Activations of every layer; index 0 is the input itself.
    fn forward_all(&self, input: ArrayView1<f32>) -> Vec<Array1<f32>> {
        let activation = self.spec.activation;
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        let mut current = input.to_owned();

        for layer in &self.layers {
            let next = (layer.weights.dot(&current) + &layer.bias).mapv(|v| activation.apply(v));
            activations.push(std::mem::replace(&mut current, next));
        }
        activations.push(current);

        activations
    }

    /// Gradients of `0.5 * residual^2` with respect to every layer's
    /// parameters, ordered first layer to last.
    fn backward(
        &self,
        activations: &[Array1<f32>],
        residual: f32,
    ) -> Vec<(Array2<f32>, Array1<f32>)> {
        let activation = self.spec.activation;
        let derivative = |a: &Array1<f32>| a.mapv(|y| activation.derivative_from_output(y));

        let last = self.layers.len();
        let mut delta = derivative(&activations[last]) * residual;
        let mut gradients = Vec::with_capacity(last);

        for idx in (0..last).rev() {
            let prev = &activations[idx];
            let grad_weights = delta
                .view()
                .insert_axis(Axis(1))
                .dot(&prev.view().insert_axis(Axis(0)));
            let grad_bias = delta.clone();

            if idx > 0 {
                delta = self.layers[idx].weights.t().dot(&delta) * derivative(prev);
            }
            gradients.push((grad_weights, grad_bias));
        }

        gradients.reverse();
        gradients
    }

    fn check_width(&self, features: &[f32]) -> Result<(), NetworkError> {
        if features.len() != self.input_width() {
            return Err(NetworkError::DimensionMismatch {
                expected: self.input_width(),
                got: features.len(),
            });
        }
        Ok(())
    }
}

/// Xavier-uniform weights and zero biases, derived only from the model seed.
fn initial_layers(spec: &ModelSpec) -> Vec<DenseLayer> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(spec.seed);

    spec.layer_sizes
        .windows(2)
        .map(|pair| {
            let (inputs, outputs) = (pair[0], pair[1]);
            let scale = (6.0 / (inputs + outputs) as f32).sqrt();
            let weights = Array2::from_shape_fn((outputs, inputs), |_| {
                (rng.gen::<f32>() - 0.5) * 2.0 * scale
            });
            DenseLayer {
                weights,
                bias: Array1::zeros(outputs),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::{Activation, BackpropParams, TrainMethod};

    const FEATURES: [f32; 3] = [0.2, 0.2, 0.2];

    #[test]
    fn test_network_creation() {
        let net = Network::new(ModelSpec::default()).unwrap();
        let shapes: Vec<_> = net.layers().iter().map(|l| l.weights.dim()).collect();
        assert_eq!(shapes, vec![(6, 3), (9, 6), (6, 9), (1, 6)]);
        assert!(net.layers().iter().all(|l| l.bias.iter().all(|&b| b == 0.0)));
    }

    #[test]
    fn initialization_is_seed_deterministic() {
        let a = Network::new(ModelSpec::default()).unwrap();
        let b = Network::new(ModelSpec::default()).unwrap();
        let c = Network::new(ModelSpec {
            seed: 1,
            ..ModelSpec::default()
        })
        .unwrap();
        assert_eq!(a, b);
        assert_ne!(a.layers(), c.layers());
    }

    #[test]
    fn forward_pass_keeps_every_layer_activation() {
        let net = Network::new(ModelSpec::default()).unwrap();
        let activations = net.forward_all(ArrayView1::from(&FEATURES[..]));
        let widths: Vec<_> = activations.iter().map(|a| a.len()).collect();
        assert_eq!(widths, vec![3, 6, 9, 6, 1]);
        assert_eq!(activations[0].as_slice().unwrap(), &FEATURES[..]);
        assert_eq!(activations[4][0], net.predict(&FEATURES).unwrap());
    }

    #[test]
    fn predictions_stay_inside_activation_range() {
        let net = Network::new(ModelSpec::default()).unwrap();
        let out = net.predict(&[0.9, -0.9, 0.5]).unwrap();
        assert!(out > -1.0 && out < 1.0);
    }

    #[test]
    fn rejects_wrong_feature_width() {
        let mut net = Network::new(ModelSpec::default()).unwrap();
        let err = net.predict(&[0.1, 0.2]).expect_err("width");
        assert_eq!(err, NetworkError::DimensionMismatch { expected: 3, got: 2 });
        assert!(net.train(&[0.1], 0.0, TrainingMode::Initial).is_err());
    }

    #[test]
    fn test_train_step_fits_single_example() {
        let mut net = Network::new(ModelSpec::default()).unwrap();
        let report = net.train(&FEATURES, 0.6, TrainingMode::Initial).unwrap();

        assert!(report.converged, "{report:?}");
        assert!(report.iterations > 0);
        assert!(report.final_error < 1e-2);
        assert!((net.predict(&FEATURES).unwrap() - 0.6).abs() < 1e-2);
    }

    #[test]
    fn gradients_match_finite_differences() {
        let spec = ModelSpec {
            layer_sizes: vec![3, 4, 1],
            ..ModelSpec::default()
        };
        let net = Network::new(spec).unwrap();
        let target = 0.3f32;
        let input = ArrayView1::from(&FEATURES[..]);

        let activations = net.forward_all(input);
        let residual = activations[2][0] - target;
        let gradients = net.backward(&activations, residual);

        let loss = |n: &Network| squared_error(n.predict(&FEATURES).unwrap(), target);
        let h = 1e-2f32;
        let mut probe = net.clone();
        probe.layers[0].weights[[1, 2]] += h;
        let plus = loss(&probe);
        probe.layers[0].weights[[1, 2]] -= 2.0 * h;
        let minus = loss(&probe);
        let numeric = (plus - minus) / (2.0 * h);

        assert!(
            (numeric - gradients[0].0[[1, 2]]).abs() < 1e-3,
            "numeric {numeric} vs analytic {}",
            gradients[0].0[[1, 2]]
        );
    }

    #[test]
    fn incremental_mode_keeps_weights_when_already_fitted() {
        let mut net = Network::new(ModelSpec::default()).unwrap();
        net.train(&FEATURES, 0.6, TrainingMode::Initial).unwrap();
        let fitted = net.clone();

        let report = net.train(&FEATURES, 0.6, TrainingMode::Incremental).unwrap();
        assert_eq!(report.iterations, 0);
        assert_eq!(net, fitted);
    }

    #[test]
    fn initial_mode_resets_to_seeded_weights() {
        let fresh = Network::new(ModelSpec::default()).unwrap();
        let mut net = fresh.clone();
        net.train(&FEATURES, 0.6, TrainingMode::Initial).unwrap();
        let mut again = fresh.clone();
        again.train(&FEATURES, 0.6, TrainingMode::Initial).unwrap();

        // Initial training is a pure function of the seed and example.
        assert_eq!(net, again);
    }

    #[test]
    fn backprop_method_also_converges() {
        let spec = ModelSpec {
            method: TrainMethod::Backprop(BackpropParams::default()),
            termination: crate::neural::TermCriteria {
                max_iterations: 5_000,
                epsilon: 1e-2,
            },
            ..ModelSpec::default()
        };
        let mut net = Network::new(spec).unwrap();
        let report = net.train(&FEATURES, -0.9, TrainingMode::Initial).unwrap();
        assert!(report.final_error < report.initial_error);
    }

    #[test]
    fn identity_activation_is_linear() {
        let spec = ModelSpec {
            activation: Activation::Identity,
            ..ModelSpec::default()
        };
        let net = Network::new(spec).unwrap();
        let zero = net.predict(&[0.0, 0.0, 0.0]).unwrap();
        assert_eq!(zero, 0.0);
    }

    #[test]
    fn from_parts_rejects_mismatched_shapes() {
        let net = Network::new(ModelSpec::default()).unwrap();
        let mut layers = net.layers().to_vec();
        layers.pop();
        let err = Network::from_parts(ModelSpec::default(), layers).expect_err("short");
        assert!(matches!(err, NetworkError::InvalidArchitecture(_)));

        let rebuilt = Network::from_parts(net.spec().clone(), net.layers().to_vec()).unwrap();
        assert_eq!(rebuilt, net);
    }
}
