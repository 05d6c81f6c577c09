//! Lifecycle of the preference regressor.
//!
//! [`PreferenceModel`] owns a [`Network`] exclusively and tracks whether it has
//! ever been trained. The only transitions are `untrained -> trained` and
//! `trained -> trained`; the architecture is fixed for the model's lifetime.
//!
//! Startup goes through [`PreferenceModel::open`], which distinguishes a
//! missing checkpoint (create a fresh model) from a corrupt or incompatible
//! one (handled according to a [`CorruptPolicy`]).

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::checkpoint::{CheckpointError, Checkpointable};
use crate::neural::{DenseLayer, ModelSpec, Network, NetworkError};
use crate::sampler::EncodedFeatures;
use crate::training::{TrainingMode, TrainingReport};

const MODEL_CHECKPOINT_VERSION: u32 = 1;

/// Suffix appended to a checkpoint that is moved aside by [`CorruptPolicy::Reset`].
pub const CORRUPT_SUFFIX: &str = ".corrupt";

#[derive(Serialize, Deserialize)]
struct PreferenceModelCheckpoint {
    version: u32,
    spec: ModelSpec,
    layers: Vec<DenseLayer>,
    trained: bool,
    examples_seen: u64,
}

/// Why a stored model could not be restored.
#[derive(Debug)]
pub enum RestoreError {
    /// Nothing stored at the path yet.
    NotFound(PathBuf),
    /// The file exists but could not be read back as a model.
    Corrupt {
        path: PathBuf,
        source: CheckpointError,
    },
    /// The file holds a valid model built with a different architecture.
    Incompatible { path: PathBuf, reason: String },
}

impl fmt::Display for RestoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestoreError::NotFound(path) => write!(f, "no saved model at {}", path.display()),
            RestoreError::Corrupt { path, source } => {
                write!(f, "saved model at {} is unreadable: {source}", path.display())
            }
            RestoreError::Incompatible { path, reason } => write!(
                f,
                "saved model at {} does not match the configured architecture ({reason})",
                path.display()
            ),
        }
    }
}

impl std::error::Error for RestoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RestoreError::Corrupt { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ModelError {
    /// Prediction requested before any training.
    NotTrained,
    /// Training target outside the `[-1, 1]` target scale.
    TargetOutOfRange(f32),
    Network(NetworkError),
    Checkpoint(CheckpointError),
    Restore(RestoreError),
    /// Filesystem failure outside the checkpoint codec.
    Io(std::io::Error),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::NotTrained => write!(f, "model has not been trained yet"),
            ModelError::TargetOutOfRange(target) => {
                write!(f, "training target {target} is outside [-1, 1]")
            }
            ModelError::Network(err) => write!(f, "network error: {err}"),
            ModelError::Checkpoint(err) => write!(f, "{err}"),
            ModelError::Restore(err) => write!(f, "{err}"),
            ModelError::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Network(err) => Some(err),
            ModelError::Checkpoint(err) => Some(err),
            ModelError::Restore(err) => Some(err),
            ModelError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NetworkError> for ModelError {
    fn from(err: NetworkError) -> Self {
        ModelError::Network(err)
    }
}

impl From<CheckpointError> for ModelError {
    fn from(err: CheckpointError) -> Self {
        ModelError::Checkpoint(err)
    }
}

impl From<RestoreError> for ModelError {
    fn from(err: RestoreError) -> Self {
        ModelError::Restore(err)
    }
}

/// What [`PreferenceModel::open`] does with an unreadable or incompatible file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptPolicy {
    /// Move the file aside, start a fresh model and save it in place.
    #[default]
    Reset,
    /// Refuse to start.
    Abort,
}

/// Where the model returned by [`PreferenceModel::open`] came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOrigin {
    Restored,
    Created,
    /// A bad file was moved to `backup` and replaced by a fresh model.
    Reset { reason: String, backup: PathBuf },
}

/// The user's color-preference regressor.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceModel {
    network: Network,
    trained: bool,
    examples_seen: u64,
}

impl PreferenceModel {
    /// Fresh, untrained model with the given architecture.
    pub fn create(spec: ModelSpec) -> Result<Self, ModelError> {
        Ok(Self {
            network: Network::new(spec)?,
            trained: false,
            examples_seen: 0,
        })
    }

    /// Loads the model stored at `path`, refusing one whose architecture
    /// differs from `spec`.
    pub fn restore<P: AsRef<Path>>(path: P, spec: &ModelSpec) -> Result<Self, RestoreError> {
        let path = path.as_ref();
        let model = Self::load_checkpoint(path).map_err(|source| {
            if source.is_not_found() {
                RestoreError::NotFound(path.to_path_buf())
            } else {
                RestoreError::Corrupt {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        if let Some(reason) = model.spec().incompatibility(spec) {
            return Err(RestoreError::Incompatible {
                path: path.to_path_buf(),
                reason,
            });
        }

        Ok(model)
    }

    /// Startup entry point: restore, or create and immediately save a fresh
    /// model when nothing usable is stored.
    pub fn open<P: AsRef<Path>>(
        path: P,
        spec: &ModelSpec,
        policy: CorruptPolicy,
    ) -> Result<(Self, ModelOrigin), ModelError> {
        let path = path.as_ref();
        match Self::restore(path, spec) {
            Ok(model) => {
                tracing::info!(
                    path = %path.display(),
                    trained = model.is_trained(),
                    examples = model.examples_seen(),
                    "restored preference model"
                );
                Ok((model, ModelOrigin::Restored))
            }
            Err(RestoreError::NotFound(_)) => {
                tracing::info!(path = %path.display(), "no saved model, creating a fresh one");
                let model = Self::create(spec.clone())?;
                model.persist(path)?;
                Ok((model, ModelOrigin::Created))
            }
            Err(err) => match policy {
                CorruptPolicy::Abort => Err(ModelError::Restore(err)),
                CorruptPolicy::Reset => {
                    let backup = quarantine(path)?;
                    tracing::warn!(
                        backup = %backup.display(),
                        "{err}; starting over with a fresh model"
                    );
                    let model = Self::create(spec.clone())?;
                    model.persist(path)?;
                    Ok((
                        model,
                        ModelOrigin::Reset {
                            reason: err.to_string(),
                            backup,
                        },
                    ))
                }
            },
        }
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Number of training calls this model has absorbed, across sessions.
    pub fn examples_seen(&self) -> u64 {
        self.examples_seen
    }

    pub fn spec(&self) -> &ModelSpec {
        self.network.spec()
    }


    /// Supervises the model on exactly one example.
    ///
    /// The first call establishes the weights from scratch; every later call
    /// warm-starts from the learned weights. Inputs and targets are used as
    /// given, without rescaling.
    pub fn train_one(
        &mut self,
        features: &EncodedFeatures,
        target: f32,
    ) -> Result<TrainingReport, ModelError> {
        if !target.is_finite() || !(-1.0..=1.0).contains(&target) {
            return Err(ModelError::TargetOutOfRange(target));
        }

        let mode = if self.trained {
            TrainingMode::Incremental
        } else {
            TrainingMode::Initial
        };
        let report = self.network.train(features.as_slice(), target, mode)?;
        self.trained = true;
        self.examples_seen += 1;

        tracing::debug!(
            ?mode,
            iterations = report.iterations,
            initial_error = report.initial_error,
            final_error = report.final_error,
            converged = report.converged,
            "trained on one example"
        );
        Ok(report)
    }

    /// Model output for `features`, on the target scale.
    pub fn predict(&self, features: &EncodedFeatures) -> Result<f32, ModelError> {
        if !self.trained {
            return Err(ModelError::NotTrained);
        }
        Ok(self.network.predict(features.as_slice())?)
    }

    /// Writes architecture, weights and training state to `path`.
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        self.save_checkpoint(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "persisted preference model");
        Ok(())
    }
}

impl Checkpointable for PreferenceModel {
    fn save_checkpoint<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
        let snapshot = PreferenceModelCheckpoint {
            version: MODEL_CHECKPOINT_VERSION,
            spec: self.network.spec().clone(),
            layers: self.network.layers().to_vec(),
            trained: self.trained,
            examples_seen: self.examples_seen,
        };

        Self::write_snapshot(&snapshot, path)
    }

    fn load_checkpoint<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        let snapshot: PreferenceModelCheckpoint = Self::read_snapshot(path)?;
        if snapshot.version != MODEL_CHECKPOINT_VERSION {
            return Err(CheckpointError::VersionMismatch {
                expected: MODEL_CHECKPOINT_VERSION,
                found: snapshot.version,
            });
        }
        if !snapshot.trained && snapshot.examples_seen > 0 {
            return Err(CheckpointError::InvalidFormat(format!(
                "untrained model claims {} examples",
                snapshot.examples_seen
            )));
        }

        let network = Network::from_parts(snapshot.spec, snapshot.layers)
            .map_err(|err| CheckpointError::InvalidFormat(err.to_string()))?;

        Ok(Self {
            network,
            trained: snapshot.trained,
            examples_seen: snapshot.examples_seen,
        })
    }
}

/// Moves an unusable checkpoint to `<path>.corrupt`, replacing any older one.
fn quarantine(path: &Path) -> Result<PathBuf, ModelError> {
    let mut name = OsString::from(path.as_os_str());
    name.push(CORRUPT_SUFFIX);
    let backup = PathBuf::from(name);
    std::fs::rename(path, &backup).map_err(ModelError::Io)?;
    Ok(backup)
}
