//! # Color Preference Core
//!
//! Learns how much a person likes colors. Random HSV colors are shown one at a
//! time, the person rates each on a slider, and a small multi-layer perceptron
//! is trained incrementally on every rating. The model persists across runs.
//!
//! ## Quick Start
//!
//! ```rust
//! use colorpref_core::{encode, ColorSample, ModelSpec, PreferenceModel, RatingScale};
//!
//! let scale = RatingScale::default();
//! let mut model = PreferenceModel::create(ModelSpec::default()).unwrap();
//!
//! let color = ColorSample::new([0.2, 0.2, 0.2]).unwrap();
//! let features = encode(&color);
//! model.train_one(&features, scale.encode_rating(8.0).unwrap()).unwrap();
//!
//! let rating = scale.decode_target(model.predict(&features).unwrap());
//! assert!((rating - 8.0).abs() < 0.5);
//! ```
//!
//! ## Core Modules
//!
//! - [`sampler`] - Random colors and their feature encoding
//! - [`rating`] - Slider ratings to model targets and back
//! - [`neural`] - The MLP regressor and its optimizers
//! - [`model`] - Trained/untrained lifecycle and persistence
//! - [`session`] - The interactive rating loop
//! - [`config`] - TOML configuration
//! - [`logging`] - JSONL session journal

pub mod checkpoint;
pub mod color;
pub mod config;
pub mod logging;
pub mod model;
pub mod neural;
pub mod rating;
pub mod sampler;
pub mod session;
pub mod training;

pub use checkpoint::{CheckpointError, Checkpointable};
pub use config::{ConfigError, ModelConfig, PreferenceConfig, SessionConfig};
pub use logging::{SessionEvent, SessionJournal};
pub use model::{CorruptPolicy, ModelError, ModelOrigin, PreferenceModel, RestoreError};
pub use neural::{Activation, ModelSpec, Network, NetworkError, TermCriteria, TrainMethod};
pub use rating::{RatingError, RatingScale};
pub use sampler::{encode, ColorSample, ColorSampler, EncodedFeatures};
pub use session::{
    ColorView, ModelGuard, PredictOutcome, SessionController, SessionError, SessionOptions,
};
pub use training::{TrainingMode, TrainingReport};
