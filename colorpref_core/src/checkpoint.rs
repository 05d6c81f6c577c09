//! Checkpoint trait and error handling for deterministic model persistence.
//!
//! [`Checkpointable`] enforces a versioned serialization contract: each
//! implementation stores a version header alongside its payload so that files
//! written by an incompatible build are rejected during load. Every call opens,
//! writes or reads, flushes and closes its file before returning.
//!
//! Writes go to a sibling `*.tmp` file that is synced and then renamed over the
//! destination, so an interrupted save leaves the previous checkpoint intact.

use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use bincode::Options;

/// Errors that can occur while saving or loading checkpoints.
#[derive(Debug)]
pub enum CheckpointError {
    /// Underlying I/O failure while reading or writing checkpoint files.
    Io(std::io::Error),
    /// Serialization or deserialization error from the binary codec.
    Serialization(bincode::Error),
    /// The file was well formed but carries an unsupported format version.
    VersionMismatch { expected: u32, found: u32 },
    /// The file decoded but its contents are structurally inconsistent.
    InvalidFormat(String),
}

impl CheckpointError {
    /// True when the failure is simply "there is no checkpoint at this path".
    pub fn is_not_found(&self) -> bool {
        matches!(self, CheckpointError::Io(err) if err.kind() == std::io::ErrorKind::NotFound)
    }
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointError::Io(err) => write!(f, "I/O error while accessing checkpoint: {err}"),
            CheckpointError::Serialization(err) => {
                write!(f, "Failed to (de)serialize checkpoint payload: {err}")
            }
            CheckpointError::VersionMismatch { expected, found } => write!(
                f,
                "Checkpoint version mismatch: expected {expected}, found {found}",
            ),
            CheckpointError::InvalidFormat(msg) => {
                write!(f, "Checkpoint file has invalid structure: {msg}")
            }
        }
    }
}

impl std::error::Error for CheckpointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CheckpointError::Io(err) => Some(err),
            CheckpointError::Serialization(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CheckpointError {
    fn from(err: std::io::Error) -> Self {
        CheckpointError::Io(err)
    }
}

impl From<bincode::Error> for CheckpointError {
    fn from(err: bincode::Error) -> Self {
        CheckpointError::Serialization(err)
    }
}

/// Upper bound on a decoded checkpoint, guarding against garbage length
/// prefixes in corrupt files.
const MAX_CHECKPOINT_BYTES: u64 = 16 * 1024 * 1024;

/// Deterministic binary codec options shared by all checkpoint implementations.
fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_CHECKPOINT_BYTES)
        .allow_trailing_bytes()
        .with_little_endian()
}

/// Staging file a snapshot is written to before it replaces `path`.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_staged<T: serde::Serialize>(staging: &Path, snapshot: &T) -> Result<(), CheckpointError> {
    let file = File::create(staging)?;
    let mut writer = BufWriter::new(file);
    codec().serialize_into(&mut writer, snapshot)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

/// Components that support deterministic persistence implement this trait.
pub trait Checkpointable: Sized {
    /// Save the current state to `path` using the deterministic codec.
    fn save_checkpoint<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError>;

    /// Load a state from `path`.
    fn load_checkpoint<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError>;

    /// Utility for writing a serializable snapshot with the shared codec.
    fn write_snapshot<P, T>(snapshot: &T, path: P) -> Result<(), CheckpointError>
    where
        P: AsRef<Path>,
        T: serde::Serialize,
    {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let staging = staging_path(path);
        let result = write_staged(&staging, snapshot)
            .and_then(|()| fs::rename(&staging, path).map_err(CheckpointError::from));
        if result.is_err() && staging.is_file() {
            fs::remove_file(&staging).ok();
        }
        result
    }

    /// Utility for reading a serializable snapshot with the shared codec.
    fn read_snapshot<P, T>(path: P) -> Result<T, CheckpointError>
    where
        P: AsRef<Path>,
        T: serde::de::DeserializeOwned,
    {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Ok(codec().deserialize_from(&mut reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Probe {
        version: u32,
        values: Vec<f32>,
    }

    impl Checkpointable for Probe {
        fn save_checkpoint<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
            Self::write_snapshot(self, path)
        }

        fn load_checkpoint<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
            Self::read_snapshot(path)
        }
    }

    fn temp_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("colorpref_{tag}_{}", uuid::Uuid::new_v4()))
            .join("probe.bin")
    }

    #[test]
    fn roundtrip_creates_parent_directories() {
        let path = temp_path("roundtrip");
        let probe = Probe {
            version: 1,
            values: vec![0.25, -0.5, 1.0],
        };

        probe.save_checkpoint(&path).expect("save");
        let restored = Probe::load_checkpoint(&path).expect("load");
        std::fs::remove_dir_all(path.parent().unwrap()).ok();

        assert_eq!(restored, probe);
    }

    #[test]
    fn overwrite_replaces_previous_snapshot() {
        let path = temp_path("overwrite");
        let first = Probe {
            version: 1,
            values: vec![1.0],
        };
        let second = Probe {
            version: 2,
            values: vec![2.0, 3.0],
        };

        first.save_checkpoint(&path).expect("first save");
        second.save_checkpoint(&path).expect("second save");
        let restored = Probe::load_checkpoint(&path).expect("load");
        let staging_left = staging_path(&path).exists();
        std::fs::remove_dir_all(path.parent().unwrap()).ok();

        assert_eq!(restored, second);
        assert!(!staging_left);
    }

    #[test]
    fn failed_save_keeps_previous_snapshot() {
        let path = temp_path("failed_save");
        let saved = Probe {
            version: 1,
            values: vec![0.5, 0.25],
        };
        saved.save_checkpoint(&path).expect("save");

        // A directory in the staging slot makes the next write fail.
        std::fs::create_dir_all(staging_path(&path)).unwrap();
        let newer = Probe {
            version: 2,
            values: vec![9.0],
        };
        assert!(newer.save_checkpoint(&path).is_err());

        let restored = Probe::load_checkpoint(&path).expect("previous snapshot");
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
        assert_eq!(restored, saved);
    }

    #[test]
    fn missing_file_is_reported_as_not_found() {
        let err = Probe::load_checkpoint(temp_path("missing")).expect_err("missing");
        assert!(err.is_not_found());
    }

    #[test]
    fn garbage_is_a_serialization_error() {
        let path = temp_path("garbage");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not a checkpoint").unwrap();

        let err = Probe::load_checkpoint(&path).expect_err("garbage");
        std::fs::remove_dir_all(path.parent().unwrap()).ok();

        assert!(!err.is_not_found());
        assert!(matches!(err, CheckpointError::Serialization(_)));
    }
}
