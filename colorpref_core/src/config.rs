//! Application configuration via TOML files.
//!
//! Every key is optional; missing sections fall back to the defaults below,
//! which reproduce the stock 3-6-9-6-1 RPROP model on a 0..10 rating slider.
//!
//! ```toml
//! [model]
//! path = "model.bin"
//! layer_sizes = [3, 6, 9, 6, 1]
//! seed = 42
//! on_corrupt = "reset"
//!
//! [model.activation]
//! kind = "symmetric_sigmoid"
//! alpha = 1.0
//! beta = 1.0
//!
//! [model.termination]
//! max_iterations = 1000
//! epsilon = 0.01
//!
//! [model.training]
//! method = "rprop"
//!
//! [rating]
//! max = 10.0
//! resolution = 0.1
//!
//! [session]
//! autosave_every = 1
//! journal = "logs/session.jsonl"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::CorruptPolicy;
use crate::neural::{
    Activation, BackpropParams, ModelSpec, RpropParams, TermCriteria, TrainMethod,
};
use crate::rating::{RatingScale, DEFAULT_MAX_RATING, DEFAULT_RESOLUTION};

/// Default location of the persisted model.
pub const DEFAULT_MODEL_PATH: &str = "model.bin";

/// Fully validated configuration.
///
/// # Examples
///
/// ```
/// use colorpref_core::PreferenceConfig;
///
/// let config: PreferenceConfig = "[model]\nseed = 7".parse().unwrap();
/// assert_eq!(config.model.spec.seed, 7);
/// assert_eq!(config.model.spec.layer_sizes, vec![3, 6, 9, 6, 1]);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct PreferenceConfig {
    pub model: ModelConfig,
    pub rating: RatingScale,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelConfig {
    /// Where the model is restored from and persisted to.
    pub path: PathBuf,
    pub spec: ModelSpec,
    pub on_corrupt: CorruptPolicy,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionConfig {
    /// Persist after every N training calls; 0 disables autosave.
    pub autosave_every: usize,
    /// Optional JSONL journal of session events.
    pub journal: Option<PathBuf>,
}

impl Default for PreferenceConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig {
                path: PathBuf::from(DEFAULT_MODEL_PATH),
                spec: ModelSpec::default(),
                on_corrupt: CorruptPolicy::default(),
            },
            rating: RatingScale::default(),
            session: SessionConfig {
                autosave_every: 1,
                journal: None,
            },
        }
    }
}

impl PreferenceConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path)?;
        contents.parse()
    }

    /// Like [`load_from_file`](Self::load_from_file), but a missing file yields
    /// the defaults. A file that exists and fails to parse is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load_from_file(&path) {
            Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %path.as_ref().display(),
                    "config file not found, falling back to defaults"
                );
                Ok(Self::default())
            }
            other => other,
        }
    }
}

impl FromStr for PreferenceConfig {
    type Err = ConfigError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let raw: RawConfig =
            toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))?;

        let spec = ModelSpec {
            layer_sizes: raw.model.layer_sizes,
            activation: raw.model.activation.into(),
            termination: TermCriteria {
                max_iterations: raw.model.termination.max_iterations,
                epsilon: raw.model.termination.epsilon,
            },
            method: raw.model.training.into(),
            seed: raw.model.seed,
        };
        spec.validate()
            .map_err(|err| ConfigError::Parse(format!("model: {err}")))?;

        let rating = RatingScale::new(raw.rating.max, raw.rating.resolution).ok_or_else(|| {
            ConfigError::Parse(format!(
                "rating: max ({}) and resolution ({}) must be positive with resolution <= max",
                raw.rating.max, raw.rating.resolution
            ))
        })?;

        if raw.model.path.as_os_str().is_empty() {
            return Err(ConfigError::Parse("model.path must not be empty".into()));
        }

        Ok(Self {
            model: ModelConfig {
                path: raw.model.path,
                spec,
                on_corrupt: raw.model.on_corrupt,
            },
            rating,
            session: SessionConfig {
                autosave_every: raw.session.autosave_every,
                journal: raw.session.journal,
            },
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    model: RawModel,
    rating: RawRating,
    session: RawSession,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawModel {
    path: PathBuf,
    layer_sizes: Vec<usize>,
    seed: u64,
    on_corrupt: CorruptPolicy,
    activation: RawActivation,
    termination: RawTermination,
    training: RawTraining,
}

impl Default for RawModel {
    fn default() -> Self {
        let spec = ModelSpec::default();
        Self {
            path: PathBuf::from(DEFAULT_MODEL_PATH),
            layer_sizes: spec.layer_sizes,
            seed: spec.seed,
            on_corrupt: CorruptPolicy::default(),
            activation: RawActivation::default(),
            termination: RawTermination::default(),
            training: RawTraining::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RawActivation {
    SymmetricSigmoid {
        #[serde(default = "default_sigmoid_param")]
        alpha: f32,
        #[serde(default = "default_sigmoid_param")]
        beta: f32,
    },
    Identity,
}

impl Default for RawActivation {
    fn default() -> Self {
        RawActivation::SymmetricSigmoid {
            alpha: default_sigmoid_param(),
            beta: default_sigmoid_param(),
        }
    }
}

impl From<RawActivation> for Activation {
    fn from(raw: RawActivation) -> Self {
        match raw {
            RawActivation::SymmetricSigmoid { alpha, beta } => {
                Activation::SymmetricSigmoid { alpha, beta }
            }
            RawActivation::Identity => Activation::Identity,
        }
    }
}

fn default_sigmoid_param() -> f32 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawTermination {
    max_iterations: usize,
    epsilon: f32,
}

impl Default for RawTermination {
    fn default() -> Self {
        let term = TermCriteria::default();
        Self {
            max_iterations: term.max_iterations,
            epsilon: term.epsilon,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
enum RawTraining {
    Rprop(RawRprop),
    Backprop(RawBackprop),
}

impl Default for RawTraining {
    fn default() -> Self {
        RawTraining::Rprop(RawRprop::default())
    }
}

impl From<RawTraining> for TrainMethod {
    fn from(raw: RawTraining) -> Self {
        match raw {
            RawTraining::Rprop(p) => TrainMethod::Rprop(RpropParams {
                initial_step: p.initial_step,
                step_increase: p.step_increase,
                step_decrease: p.step_decrease,
                min_step: p.min_step,
                max_step: p.max_step,
            }),
            RawTraining::Backprop(p) => TrainMethod::Backprop(BackpropParams {
                learning_rate: p.learning_rate,
                momentum: p.momentum,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawRprop {
    initial_step: f32,
    step_increase: f32,
    step_decrease: f32,
    min_step: f32,
    max_step: f32,
}

impl Default for RawRprop {
    fn default() -> Self {
        let p = RpropParams::default();
        Self {
            initial_step: p.initial_step,
            step_increase: p.step_increase,
            step_decrease: p.step_decrease,
            min_step: p.min_step,
            max_step: p.max_step,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawBackprop {
    learning_rate: f32,
    momentum: f32,
}

impl Default for RawBackprop {
    fn default() -> Self {
        let p = BackpropParams::default();
        Self {
            learning_rate: p.learning_rate,
            momentum: p.momentum,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawRating {
    max: f32,
    resolution: f32,
}

impl Default for RawRating {
    fn default() -> Self {
        Self {
            max: DEFAULT_MAX_RATING,
            resolution: DEFAULT_RESOLUTION,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawSession {
    autosave_every: usize,
    journal: Option<PathBuf>,
}

impl Default for RawSession {
    fn default() -> Self {
        Self {
            autosave_every: 1,
            journal: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "IO error: {}", err),
            ConfigError::Parse(err) => write!(f, "Parse error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: PreferenceConfig = "".parse().unwrap();
        assert_eq!(config.model.path, PathBuf::from("model.bin"));
        assert_eq!(config.model.spec, ModelSpec::default());
        assert_eq!(config.model.on_corrupt, CorruptPolicy::Reset);
        assert_eq!(config.rating, RatingScale::default());
        assert_eq!(config.session.autosave_every, 1);
        assert!(config.session.journal.is_none());
    }

    #[test]
    fn parses_full_config() {
        let toml = r#"
[model]
path = "state/prefs.bin"
layer_sizes = [3, 8, 1]
seed = 9
on_corrupt = "abort"

[model.activation]
kind = "symmetric_sigmoid"
alpha = 0.5

[model.termination]
max_iterations = 200
epsilon = 0.05

[model.training]
method = "backprop"
learning_rate = 0.2

[rating]
max = 5.0
resolution = 0.5

[session]
autosave_every = 3
journal = "logs/session.jsonl"
"#;
        let config: PreferenceConfig = toml.parse().unwrap();
        assert_eq!(config.model.path, PathBuf::from("state/prefs.bin"));
        assert_eq!(config.model.spec.layer_sizes, vec![3, 8, 1]);
        assert_eq!(config.model.spec.seed, 9);
        assert_eq!(config.model.on_corrupt, CorruptPolicy::Abort);
        assert_eq!(
            config.model.spec.activation,
            Activation::SymmetricSigmoid {
                alpha: 0.5,
                beta: 1.0
            }
        );
        assert_eq!(config.model.spec.termination.max_iterations, 200);
        assert!((config.model.spec.termination.epsilon - 0.05).abs() < f32::EPSILON);
        match config.model.spec.method {
            TrainMethod::Backprop(p) => {
                assert!((p.learning_rate - 0.2).abs() < f32::EPSILON);
                assert!((p.momentum - 0.1).abs() < f32::EPSILON);
            }
            other => panic!("unexpected method: {other:?}"),
        }
        assert_eq!(config.rating.max_rating(), 5.0);
        assert_eq!(config.session.autosave_every, 3);
        assert_eq!(
            config.session.journal,
            Some(PathBuf::from("logs/session.jsonl"))
        );
    }

    #[test]
    fn rprop_method_alone_takes_default_parameters() {
        let config: PreferenceConfig = "[model.training]\nmethod = \"rprop\"".parse().unwrap();
        assert_eq!(config.model.spec.method, TrainMethod::default());
    }

    #[test]
    fn identity_activation_parses() {
        let config: PreferenceConfig = "[model.activation]\nkind = \"identity\"".parse().unwrap();
        assert_eq!(config.model.spec.activation, Activation::Identity);
    }

    #[test]
    fn rejects_invalid_architecture() {
        let result: Result<PreferenceConfig, _> = "[model]\nlayer_sizes = [2, 4, 1]".parse();
        assert!(matches!(result, Err(ConfigError::Parse(msg)) if msg.contains("input layer")));
    }

    #[test]
    fn rejects_invalid_rating_scale() {
        let result: Result<PreferenceConfig, _> = "[rating]\nmax = 0.0".parse();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_keys() {
        let result: Result<PreferenceConfig, _> = "[session]\nautosave = 2".parse();
        assert!(result.is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join(format!("colorpref_{}.toml", uuid::Uuid::new_v4()));
        let config = PreferenceConfig::load_or_default(&path).unwrap();
        assert_eq!(config.model.spec, ModelSpec::default());
    }

    #[test]
    fn unreadable_file_is_still_an_error() {
        let path = std::env::temp_dir().join(format!("colorpref_{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[model\nseed = ").unwrap();
        let result = PreferenceConfig::load_or_default(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
