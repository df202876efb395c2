use serde_derive::{Deserialize, Serialize};

use crate::error::Error;

/// COCO ids of car, motorcycle, bus and truck
pub const COCO_VEHICLE_CLASSES: [i32; 4] = [2, 3, 5, 7];

/// Noise model of the per-track Kalman predictor.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MotionConfig {
    /// Diagonal of the initial covariance for `[cx, cy, w, h, vx, vy, vw, vh]`
    pub initial_variance: [f32; 8],
    /// Uncertainty of observed `(cx, cy, w, h)`
    pub measurement_noise: [f32; 4],
    /// Uncertainty added by each transition
    pub process_noise: [f32; 8],
    /// Vertical speed (px/frame) under which a track counts as stationary
    pub direction_epsilon: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            initial_variance: [10.0, 10.0, 10.0, 10.0, 10000.0, 10000.0, 10000.0, 10000.0],
            measurement_noise: [1.0, 1.0, 10.0, 10.0],
            process_noise: [1.0, 1.0, 1.0, 1.0, 0.01, 0.01, 0.0001, 0.0001],
            direction_epsilon: 0.5,
        }
    }
}

impl MotionConfig {
    pub fn validate(&self) -> Result<(), Error> {
        let positive = |v: &f32| v.is_finite() && *v > 0.0;

        if !self.initial_variance.iter().all(positive) {
            return Err(Error::config(
                "motion.initial_variance",
                "all entries must be positive",
            ));
        }

        if !self.measurement_noise.iter().all(positive) {
            return Err(Error::config(
                "motion.measurement_noise",
                "all entries must be positive",
            ));
        }

        if !self.process_noise.iter().all(|v| v.is_finite() && *v >= 0.0) {
            return Err(Error::config(
                "motion.process_noise",
                "entries must be non-negative",
            ));
        }

        if !(self.direction_epsilon.is_finite() && self.direction_epsilon >= 0.0) {
            return Err(Error::config(
                "motion.direction_epsilon",
                "must be non-negative",
            ));
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Frames a track may go unmatched before it is removed
    pub max_age: u32,
    /// Consecutive matches needed to confirm a track
    pub min_hits: u32,
    /// Minimum IoU for a track/detection pair to count as a match
    pub iou_threshold: f32,
    /// Frames a tentative track may go unmatched before it is removed
    pub tentative_max_age: u32,
    pub min_detection_score: f32,
    /// Accepted detector classes, empty accepts everything
    pub vehicle_classes: Vec<i32>,
    /// Upper bound on simultaneously live tracks
    pub max_tracks: usize,
    pub motion: MotionConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_age: 15,
            min_hits: 3,
            iou_threshold: 0.3,
            tentative_max_age: 1,
            min_detection_score: 0.0,
            vehicle_classes: COCO_VEHICLE_CLASSES.to_vec(),
            max_tracks: 256,
            motion: MotionConfig::default(),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.min_hits == 0 {
            return Err(Error::config("min_hits", "must be at least 1"));
        }

        if !(self.iou_threshold.is_finite() && self.iou_threshold > 0.0 && self.iou_threshold <= 1.0)
        {
            return Err(Error::config("iou_threshold", "must be in (0, 1]"));
        }

        if self.tentative_max_age > self.max_age {
            return Err(Error::config(
                "tentative_max_age",
                format!("must not exceed max_age ({})", self.max_age),
            ));
        }

        if !self.min_detection_score.is_finite() {
            return Err(Error::config("min_detection_score", "must be finite"));
        }

        if self.max_tracks == 0 {
            return Err(Error::config("max_tracks", "must be at least 1"));
        }

        self.motion.validate()
    }

    #[inline]
    pub fn accepts_class(&self, class: i32) -> bool {
        self.vehicle_classes.is_empty() || self.vehicle_classes.contains(&class)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PlateConfig {
    /// OCR confidence a reading must exceed to be considered
    pub min_ocr_score: f32,
    /// Largest plate-to-vehicle area ratio still taken for a plate
    pub max_area_ratio: f32,
    /// Seconds a plate record survives without being seen again
    pub staleness_secs: f64,
    /// Only accept texts laid out like a registration plate
    pub require_valid_format: bool,
}

impl Default for PlateConfig {
    fn default() -> Self {
        Self {
            min_ocr_score: 0.85,
            max_area_ratio: 0.3,
            staleness_secs: 5.0,
            require_valid_format: true,
        }
    }
}

impl PlateConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.min_ocr_score.is_finite() && (0.0..=1.0).contains(&self.min_ocr_score)) {
            return Err(Error::config("min_ocr_score", "must be in [0, 1]"));
        }

        if !(self.max_area_ratio.is_finite() && self.max_area_ratio > 0.0) {
            return Err(Error::config("max_area_ratio", "must be positive"));
        }

        if !(self.staleness_secs.is_finite() && self.staleness_secs >= 0.0) {
            return Err(Error::config("staleness_secs", "must be non-negative"));
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    pub tracker: TrackerConfig,
    pub plates: PlateConfig,
}

impl SceneConfig {
    pub fn validate(&self) -> Result<(), Error> {
        self.tracker.validate()?;
        self.plates.validate()
    }
}
