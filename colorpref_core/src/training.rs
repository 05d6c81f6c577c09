use serde::{Deserialize, Serialize};

/// How a training call treats the existing weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingMode {
    /// Re-initialize weights from the seed, then fit the example.
    Initial,
    /// Warm start from the current weights.
    Incremental,
}

/// Outcome of supervising the network on one example.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub mode: TrainingMode,
    /// Weight updates performed.
    pub iterations: usize,
    /// `|output - target|` before the first update.
    pub initial_error: f32,
    /// `|output - target|` when training stopped.
    pub final_error: f32,
    /// Whether the error dropped below the termination epsilon.
    pub converged: bool,
}

/// Half squared error, the loss minimized per example.
pub fn squared_error(output: f32, target: f32) -> f32 {
    let diff = output - target;
    0.5 * diff * diff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squared_error_is_symmetric() {
        assert_eq!(squared_error(0.5, 0.0), squared_error(-0.5, 0.0));
        assert!((squared_error(1.0, 0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn mode_serializes_in_snake_case() {
        let json = serde_json::to_string(&TrainingMode::Incremental).unwrap();
        assert_eq!(json, "\"incremental\"");
    }
}
