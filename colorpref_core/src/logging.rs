//! Append-only JSONL journal of session events.
//!
//! Each line is one [`JournalEntry`]: a sequence number, a millisecond
//! timestamp, the color that was on screen and what happened to it.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::sampler::ColorSample;
use crate::training::TrainingReport;

fn append_json_line<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    serde_json::to_writer(&mut file, value)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    file.write_all(b"\n")
}

fn timestamp_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// What the user did with the current sample.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Train {
        rating: f32,
        target: f32,
        report: TrainingReport,
    },
    Skip,
    /// `rating` is `None` when the model was not trained yet.
    Predict { rating: Option<f32> },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub sequence: usize,
    pub timestamp_ms: u128,
    pub hsv: [f32; 3],
    pub hex: String,
    #[serde(flatten)]
    pub event: SessionEvent,
}

#[derive(Debug)]
pub struct SessionJournal {
    path: PathBuf,
    sequence: usize,
}

impl SessionJournal {
    /// Opens (lazily) a journal at `path`. Parent directories are created on
    /// the first write.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            sequence: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries written by this journal instance.
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    pub fn record(&mut self, sample: &ColorSample, event: SessionEvent) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let entry = JournalEntry {
            sequence: self.sequence,
            timestamp_ms: timestamp_ms(),
            hsv: sample.hsv(),
            hex: sample.to_hex(),
            event,
        };
        append_json_line(&self.path, &entry)?;
        self.sequence += 1;
        Ok(())
    }
}
