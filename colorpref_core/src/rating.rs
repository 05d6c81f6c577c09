//! Conversion between the user-facing rating scale and the model target scale.
//!
//! Ratings live on `[0, max_rating]`; the model is supervised on
//! `t = r / half - 1` with `half = max_rating / 2`, and outputs are mapped
//! back with `r = t * half + half`. Both directions read `max_rating` from the
//! same [`RatingScale`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default upper bound of the rating slider.
pub const DEFAULT_MAX_RATING: f32 = 10.0;
/// Default slider granularity.
pub const DEFAULT_RESOLUTION: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatingError {
    /// Rating was NaN or infinite.
    NotFinite,
    /// Rating fell outside `[0, max]`.
    OutOfRange { rating: f32, max: f32 },
}

impl fmt::Display for RatingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatingError::NotFinite => write!(f, "rating must be a finite number"),
            RatingError::OutOfRange { rating, max } => {
                write!(f, "rating {rating} is outside the range 0..={max}")
            }
        }
    }
}

impl std::error::Error for RatingError {}

/// Bounded rating scale shared by encoding and decoding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingScale {
    max_rating: f32,
    resolution: f32,
}

impl RatingScale {
    /// Returns `None` unless both bounds are finite and positive.
    pub fn new(max_rating: f32, resolution: f32) -> Option<Self> {
        let valid = max_rating.is_finite()
            && max_rating > 0.0
            && resolution.is_finite()
            && resolution > 0.0
            && resolution <= max_rating;
        valid.then_some(Self {
            max_rating,
            resolution,
        })
    }

    pub fn max_rating(&self) -> f32 {
        self.max_rating
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    fn half(&self) -> f32 {
        self.max_rating / 2.0
    }

    /// Map a rating in `[0, max]` onto the target scale `[-1, 1]`.
    pub fn encode_rating(&self, rating: f32) -> Result<f32, RatingError> {
        if !rating.is_finite() {
            return Err(RatingError::NotFinite);
        }
        if !(0.0..=self.max_rating).contains(&rating) {
            return Err(RatingError::OutOfRange {
                rating,
                max: self.max_rating,
            });
        }
        Ok(rating / self.half() - 1.0)
    }

    /// Map a model output back onto the rating scale. Not clamped: a model
    /// output slightly beyond `[-1, 1]` decodes slightly beyond `[0, max]`.
    pub fn decode_target(&self, target: f32) -> f32 {
        target * self.half() + self.half()
    }

    /// Snap a rating to the nearest slider step, keeping it inside the domain.
    pub fn quantize(&self, rating: f32) -> f32 {
        let steps = (rating / self.resolution).round();
        (steps * self.resolution).clamp(0.0, self.max_rating)
    }

    /// One fractional digit, as displayed to the user.
    pub fn format_rating(rating: f32) -> String {
        format!("{rating:.1}")
    }
}

impl Default for RatingScale {
    fn default() -> Self {
        Self {
            max_rating: DEFAULT_MAX_RATING,
            resolution: DEFAULT_RESOLUTION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_inverts_encode_across_the_domain() {
        let scale = RatingScale::default();
        for step in 0..=100 {
            let rating = step as f32 / 10.0;
            let target = scale.encode_rating(rating).unwrap();
            assert!((-1.0..=1.0).contains(&target));
            let decoded = scale.decode_target(target);
            assert!((decoded - rating).abs() < 1e-5, "{rating} -> {decoded}");
        }
    }

    #[test]
    fn endpoints_and_midpoint() {
        let scale = RatingScale::default();
        assert_eq!(scale.encode_rating(0.0).unwrap(), -1.0);
        assert_eq!(scale.encode_rating(5.0).unwrap(), 0.0);
        assert_eq!(scale.encode_rating(10.0).unwrap(), 1.0);
        assert!((scale.encode_rating(8.0).unwrap() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn rejects_out_of_domain_ratings() {
        let scale = RatingScale::default();
        assert_eq!(
            scale.encode_rating(10.5),
            Err(RatingError::OutOfRange {
                rating: 10.5,
                max: 10.0
            })
        );
        assert!(matches!(
            scale.encode_rating(-0.1),
            Err(RatingError::OutOfRange { .. })
        ));
        assert_eq!(scale.encode_rating(f32::NAN), Err(RatingError::NotFinite));
    }

    #[test]
    fn custom_scale_keeps_directions_consistent() {
        let scale = RatingScale::new(5.0, 0.5).unwrap();
        assert_eq!(scale.encode_rating(2.5).unwrap(), 0.0);
        assert_eq!(scale.decode_target(1.0), 5.0);
    }

    #[test]
    fn quantize_snaps_to_resolution() {
        let scale = RatingScale::default();
        assert!((scale.quantize(7.34) - 7.3).abs() < 1e-5);
        assert!((scale.quantize(7.36) - 7.4).abs() < 1e-5);
        assert_eq!(scale.quantize(10.04), 10.0);
    }

    #[test]
    fn formats_one_fractional_digit() {
        assert_eq!(RatingScale::format_rating(7.96), "8.0");
        assert_eq!(RatingScale::format_rating(3.14159), "3.1");
    }

    #[test]
    fn invalid_scales_are_refused() {
        assert!(RatingScale::new(0.0, 0.1).is_none());
        assert!(RatingScale::new(10.0, 0.0).is_none());
        assert!(RatingScale::new(f32::INFINITY, 0.1).is_none());
    }
}
