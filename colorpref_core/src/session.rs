//! Interactive rating loop: show a color, take a rating, learn, repeat.
//!
//! The controller is front-end agnostic. Anything that can paint a color and a
//! line of text implements [`ColorView`]; the front end forwards the user's
//! train / skip / predict actions to the `on_*` methods.

use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use crate::logging::{SessionEvent, SessionJournal};
use crate::model::{ModelError, PreferenceModel};
use crate::rating::{RatingError, RatingScale};
use crate::sampler::{encode, ColorSample, ColorSampler};
use crate::training::TrainingReport;

/// Text shown when a prediction is requested before any training.
pub const NOT_ENOUGH_DATA: &str = "Not enough data.";

/// Display collaborator driven by [`SessionController`].
pub trait ColorView {
    fn show_color(&mut self, sample: &ColorSample);
    fn show_prediction_text(&mut self, text: &str);
    fn clear_prediction_text(&mut self);
}

/// Owns the model together with the path it is persisted to.
///
/// Dropping an unfinished guard saves the model; failures at that point can
/// only be logged. Call [`finish`](Self::finish) to save and see the error.
#[derive(Debug)]
pub struct ModelGuard {
    model: PreferenceModel,
    path: PathBuf,
    armed: bool,
}

impl ModelGuard {
    pub fn new<P: Into<PathBuf>>(model: PreferenceModel, path: P) -> Self {
        Self {
            model,
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn model(&self) -> &PreferenceModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut PreferenceModel {
        &mut self.model
    }

    /// Persist without disarming; used for autosave.
    pub fn save(&self) -> Result<(), ModelError> {
        self.model.persist(&self.path)
    }

    /// Persist once more and disarm the drop handler.
    pub fn finish(mut self) -> Result<(), ModelError> {
        self.armed = false;
        self.model.persist(&self.path)
    }
}

impl Deref for ModelGuard {
    type Target = PreferenceModel;

    fn deref(&self) -> &Self::Target {
        &self.model
    }
}

impl Drop for ModelGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.model.persist(&self.path) {
            Ok(()) => tracing::info!(path = %self.path.display(), "model saved on exit"),
            Err(err) => tracing::error!(
                path = %self.path.display(),
                error = %err,
                "failed to save model on exit"
            ),
        }
    }
}

/// Failure of a session action. Nothing was trained when one is returned.
#[derive(Debug)]
pub enum SessionError {
    Rating(RatingError),
    Model(ModelError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Rating(err) => write!(f, "{err}"),
            SessionError::Model(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Rating(err) => Some(err),
            SessionError::Model(err) => Some(err),
        }
    }
}

impl From<RatingError> for SessionError {
    fn from(err: RatingError) -> Self {
        SessionError::Rating(err)
    }
}

impl From<ModelError> for SessionError {
    fn from(err: ModelError) -> Self {
        SessionError::Model(err)
    }
}

/// Result of a prediction request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PredictOutcome {
    NotEnoughData,
    /// Decoded rating, not clamped to the slider range.
    Rating(f32),
}

#[derive(Debug)]
pub struct SessionOptions {
    /// Persist after every N training calls; 0 disables autosave.
    pub autosave_every: usize,
    pub journal: Option<SessionJournal>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            autosave_every: 1,
            journal: None,
        }
    }
}

pub struct SessionController<V: ColorView> {
    guard: ModelGuard,
    sampler: ColorSampler,
    scale: RatingScale,
    view: V,
    current: ColorSample,
    autosave_every: usize,
    trained_since_save: usize,
    journal: Option<SessionJournal>,
}

impl<V: ColorView> SessionController<V> {
    /// Builds the controller and shows the first sample.
    pub fn new(
        guard: ModelGuard,
        mut sampler: ColorSampler,
        scale: RatingScale,
        view: V,
        options: SessionOptions,
    ) -> Self {
        let current = sampler.next_sample();
        let mut controller = Self {
            guard,
            sampler,
            scale,
            view,
            current,
            autosave_every: options.autosave_every,
            trained_since_save: 0,
            journal: options.journal,
        };
        controller.present_current();
        controller
    }

    pub fn current_sample(&self) -> &ColorSample {
        &self.current
    }

    pub fn model(&self) -> &PreferenceModel {
        self.guard.model()
    }

    pub fn scale(&self) -> &RatingScale {
        &self.scale
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Trains on the current sample with `rating`, then moves to a new one.
    ///
    /// The rating is snapped to the scale's resolution before encoding. A
    /// rejected rating leaves the current sample on screen. Once the model has
    /// absorbed the example the session always advances; autosave and journal
    /// failures past that point are logged, and autosave is retried on the
    /// next training call.
    pub fn on_train_requested(&mut self, rating: f32) -> Result<TrainingReport, SessionError> {
        self.scale.encode_rating(rating)?;
        let rating = self.scale.quantize(rating);
        let target = self.scale.encode_rating(rating)?;
        let features = encode(&self.current);
        let report = self.guard.model_mut().train_one(&features, target)?;

        let sample = self.current;
        self.next_cycle();

        self.trained_since_save += 1;
        if self.autosave_every > 0 && self.trained_since_save >= self.autosave_every {
            match self.guard.save() {
                Ok(()) => self.trained_since_save = 0,
                Err(err) => tracing::error!(
                    path = %self.guard.path().display(),
                    unsaved = self.trained_since_save,
                    error = %err,
                    "autosave failed"
                ),
            }
        }

        self.journal(
            &sample,
            SessionEvent::Train {
                rating,
                target,
                report,
            },
        );
        Ok(report)
    }

    pub fn on_skip_requested(&mut self) {
        let sample = self.current;
        self.journal(&sample, SessionEvent::Skip);
        self.next_cycle();
    }

    /// Shows the model's opinion of the current sample. Does not advance.
    pub fn on_predict_requested(&mut self) -> Result<PredictOutcome, SessionError> {
        let outcome = if self.guard.is_trained() {
            let output = self.guard.predict(&encode(&self.current))?;
            let rating = self.scale.decode_target(output);
            self.view
                .show_prediction_text(&RatingScale::format_rating(rating));
            PredictOutcome::Rating(rating)
        } else {
            self.view.show_prediction_text(NOT_ENOUGH_DATA);
            PredictOutcome::NotEnoughData
        };

        let rating = match outcome {
            PredictOutcome::Rating(rating) => Some(rating),
            PredictOutcome::NotEnoughData => None,
        };
        let sample = self.current;
        self.journal(&sample, SessionEvent::Predict { rating });
        Ok(outcome)
    }

    /// Training calls not yet covered by a successful autosave.
    pub fn unsaved_examples(&self) -> usize {
        self.trained_since_save
    }

    /// Saves the model and reports any persistence error.
    pub fn shutdown(self) -> Result<(), ModelError> {
        self.guard.finish()
    }

    fn next_cycle(&mut self) {
        self.current = self.sampler.next_sample();
        self.present_current();
    }

    fn present_current(&mut self) {
        self.view.clear_prediction_text();
        self.view.show_color(&self.current);
    }

    fn journal(&mut self, sample: &ColorSample, event: SessionEvent) {
        if let Some(journal) = self.journal.as_mut() {
            if let Err(err) = journal.record(sample, event) {
                tracing::warn!(
                    path = %journal.path().display(),
                    error = %err,
                    "failed to append to session journal"
                );
            }
        }
    }
}
