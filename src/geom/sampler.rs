//! Arc-length sampling of placed curves.
//!
//! The [`CurveSampler`] trait is the seam between the train placement code and
//! whatever provides uniform (arc-length) parameterization. [`ArcLengthSampler`]
//! is the implementation used by default: it builds an [`ArcLengthTable`] over
//! the world-space curve and inverts it piecewise linearly.

use super::core::{Point3, Vec3};
use super::curve::{ArcLengthTable, Curve3};
use super::spline::SplineCurve;

/// Number of table samples used when no explicit resolution is configured.
pub const DEFAULT_SAMPLER_RESOLUTION: usize = 256;

/// Smallest accepted table resolution.
const MIN_SAMPLER_RESOLUTION: usize = 2;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SamplerError {
    #[error("sample range [{start}, {end}] is not a finite, non-decreasing interval")]
    InvalidRange { start: f64, end: f64 },
    #[error("sampler resolution {requested} is below the minimum of {min}")]
    ResolutionTooLow { requested: usize, min: usize },
    #[error("curve evaluates to non-finite points")]
    NonFiniteCurve,
}

/// Arc-length parameterization of one curve, prepared over a parameter range.
///
/// Implementations are built per use and are not expected to track later
/// changes to the curve they were initialized from.
pub trait CurveSampler: Sized {
    /// Prepares the parameterization of `curve` over the native parameter
    /// `range`, sampling it `resolution` times.
    fn init(curve: &SplineCurve, range: (f64, f64), resolution: usize) -> Result<Self, SamplerError>;

    /// Total arc length over the prepared range, in world units.
    fn length(&self) -> f64;

    /// Maps an arc-length fraction in `[0, 1]` to the native parameter.
    fn uniform_to_natural(&self, u: f64) -> f64;

    /// World-space point at a native parameter.
    fn sample_point(&self, t: f64) -> Point3;

    /// World-space tangent direction at a native parameter.
    fn sample_tangent(&self, t: f64) -> Vec3;
}

/// Table-driven [`CurveSampler`].
#[derive(Debug, Clone)]
pub struct ArcLengthSampler {
    curve: SplineCurve,
    table: ArcLengthTable,
    resolution: usize,
}

impl ArcLengthSampler {
    /// Resolution requested at `init`. Corner samples come on top of it.
    #[must_use]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Entries in the underlying table.
    #[must_use]
    pub fn table_len(&self) -> usize {
        self.table.sample_count()
    }
}

impl CurveSampler for ArcLengthSampler {
    fn init(curve: &SplineCurve, range: (f64, f64), resolution: usize) -> Result<Self, SamplerError> {
        let (start, end) = range;
        if !start.is_finite() || !end.is_finite() || end < start {
            return Err(SamplerError::InvalidRange { start, end });
        }
        if resolution < MIN_SAMPLER_RESOLUTION {
            return Err(SamplerError::ResolutionTooLow {
                requested: resolution,
                min: MIN_SAMPLER_RESOLUTION,
            });
        }

        let table = ArcLengthTable::build(curve, range, resolution);
        if !table.total_length().is_finite() {
            return Err(SamplerError::NonFiniteCurve);
        }

        Ok(Self {
            curve: curve.clone(),
            table,
            resolution,
        })
    }

    fn length(&self) -> f64 {
        self.table.total_length()
    }

    fn uniform_to_natural(&self, u: f64) -> f64 {
        self.table.parameter_at_fraction(u)
    }

    fn sample_point(&self, t: f64) -> Point3 {
        self.curve.point_at(t)
    }

    fn sample_tangent(&self, t: f64) -> Vec3 {
        self.curve.world_tangent_at(t)
    }
}
