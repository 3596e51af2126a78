//! Train and car settings as they are stored on scene nodes.

use std::fmt;

use serde::Serialize;

use crate::geom::Vec3;
use crate::scene::CurveId;

/// Car length used when a car has no override of its own.
pub const DEFAULT_CAR_LENGTH: f64 = 30.0;

/// Distance between the two wheel axles of a car without an override.
pub const DEFAULT_WHEEL_DISTANCE: f64 = 25.0;

/// Offset added to sampled positions to form an up reference when the train
/// has no rail curve.
pub const DEFAULT_UP: Vec3 = Vec3::Y;

/// Settings of one train, attached to its root node.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    /// Curve the train follows.
    pub path: Option<CurveId>,
    /// Optional curve supplying the up reference for every sample.
    pub rail: Option<CurveId>,
    /// Start offset along the path as a fraction of its length. Any value is
    /// accepted; it is normalized during placement.
    pub offset: f64,
    /// Wrap offsets around the path instead of clamping them.
    pub circular: bool,
    pub default_length: f64,
    pub default_wheel_distance: f64,
    /// Arc-length table resolution for the path and rail samplers.
    pub subdivision: Option<usize>,
    /// Status written by the last placement pass.
    pub info: PlacementReport,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            path: None,
            rail: None,
            offset: 0.0,
            circular: false,
            default_length: DEFAULT_CAR_LENGTH,
            default_wheel_distance: DEFAULT_WHEEL_DISTANCE,
            subdivision: None,
            info: PlacementReport::default(),
        }
    }
}

impl TrainConfig {
    #[must_use]
    pub fn with_path(path: CurveId) -> Self {
        Self {
            path: Some(path),
            ..Self::default()
        }
    }

    /// A fresh car override holding a copy of the current defaults.
    #[must_use]
    pub fn seed_override(&self) -> CarOverride {
        CarOverride {
            length: self.default_length,
            wheel_distance: self.default_wheel_distance,
            label: String::new(),
        }
    }
}

/// Per-car values superseding the train defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct CarOverride {
    pub length: f64,
    pub wheel_distance: f64,
    /// Display label; kept in sync with the car's name by placement.
    pub label: String,
}

impl Default for CarOverride {
    fn default() -> Self {
        Self {
            length: DEFAULT_CAR_LENGTH,
            wheel_distance: DEFAULT_WHEEL_DISTANCE,
            label: String::new(),
        }
    }
}

/// Outcome of one placement pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementReport {
    pub car_count: usize,
    pub track_length: Option<f64>,
    pub error: Option<String>,
}

impl PlacementReport {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for PlacementReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cars: {}", self.car_count)?;
        match self.track_length {
            Some(length) => writeln!(f, "Track length: {length:.3}")?,
            None => writeln!(f, "Track length: -")?,
        }
        match &self.error {
            Some(error) => write!(f, "Error: {error}"),
            None => write!(f, "Error: none"),
        }
    }
}
