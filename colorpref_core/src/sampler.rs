//! Random color samples and their model-facing encoding.
//!
//! A [`ColorSample`] is an HSV triple with every channel in `[0, 1)`. The model
//! never sees raw samples; it consumes [`EncodedFeatures`], the same triple
//! rescaled to `(-1, 1)` via `x' = 2x - 1`.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::color::{hsv_to_rgb, rgb_to_rgb8, to_hex};

/// Width of the feature vector the model consumes.
pub const FEATURE_WIDTH: usize = 3;

/// A color in HSV space, each channel in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorSample {
    hsv: [f32; FEATURE_WIDTH],
}

impl ColorSample {
    /// Build a sample from explicit channels. Returns `None` if any channel is
    /// outside `[0, 1)` or not finite.
    pub fn new(hsv: [f32; FEATURE_WIDTH]) -> Option<Self> {
        if hsv.iter().all(|c| c.is_finite() && (0.0..1.0).contains(c)) {
            Some(Self { hsv })
        } else {
            None
        }
    }

    pub fn hsv(&self) -> [f32; FEATURE_WIDTH] {
        self.hsv
    }

    pub fn hue(&self) -> f32 {
        self.hsv[0]
    }

    pub fn saturation(&self) -> f32 {
        self.hsv[1]
    }

    pub fn value(&self) -> f32 {
        self.hsv[2]
    }

    /// RGB in `[0, 1]` for display.
    pub fn to_rgb(&self) -> [f32; 3] {
        hsv_to_rgb(self.hsv)
    }

    pub fn to_rgb8(&self) -> [u8; 3] {
        rgb_to_rgb8(self.to_rgb())
    }

    /// `#RRGGBB` form of the displayed color.
    pub fn to_hex(&self) -> String {
        to_hex(self.to_rgb8())
    }
}

/// Model input: a [`ColorSample`] rescaled component-wise to `(-1, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncodedFeatures([f32; FEATURE_WIDTH]);

impl EncodedFeatures {
    /// Wrap an already normalized feature vector.
    pub fn from_array(values: [f32; FEATURE_WIDTH]) -> Self {
        Self(values)
    }

    pub fn as_array(&self) -> &[f32; FEATURE_WIDTH] {
        &self.0
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Affine `[0, 1) -> (-1, 1)` rescale of every channel.
pub fn encode(sample: &ColorSample) -> EncodedFeatures {
    EncodedFeatures(sample.hsv.map(|c| c * 2.0 - 1.0))
}

/// Source of uniformly distributed color samples.
pub struct ColorSampler {
    rng: StdRng,
}

impl ColorSampler {
    /// Sampler seeded from operating-system entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sampler for reproducible sessions.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw the next sample; channels are independent and uniform on `[0, 1)`.
    pub fn next_sample(&mut self) -> ColorSample {
        ColorSample {
            hsv: [self.rng.gen(), self.rng.gen(), self.rng.gen()],
        }
    }
}
