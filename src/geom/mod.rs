//! Geometry kernel: vectors, transforms, curves and arc-length sampling.

mod core;
mod curve;
mod sampler;
mod spline;

pub use core::{Point3, Tolerance, Transform, Vec3};
pub use curve::{ArcLengthTable, Arc3, Circle3, CubicBezier3, Curve3, Line3, Polyline3};
pub use sampler::{ArcLengthSampler, CurveSampler, DEFAULT_SAMPLER_RESOLUTION, SamplerError};
pub use spline::{CurveShape, SplineCurve};
