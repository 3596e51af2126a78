use std::f64::consts::TAU;

use super::core::{Point3, Tolerance, Vec3};

/// Parametric curve in 3D. The native parameter runs over [`Curve3::domain`]
/// and is generally not proportional to arc length.
pub trait Curve3 {
    fn point_at(&self, t: f64) -> Point3;

    #[must_use]
    fn domain(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    #[must_use]
    fn is_closed(&self) -> bool {
        false
    }

    /// Native parameters of corners, where the curve is not smooth.
    #[must_use]
    fn breakpoints(&self) -> Vec<f64> {
        Vec::new()
    }

    /// Central difference over a step relative to the domain, one-sided at
    /// the ends.
    #[must_use]
    fn derivative_at(&self, t: f64) -> Vec3 {
        let (a, b) = self.domain();
        let h = Tolerance::DERIVATIVE.relative_to(b - a);
        let (t0, t1) = ((t - h).max(a), (t + h).min(b));
        if !h.is_finite() || t1 <= t0 {
            return Vec3::ZERO;
        }
        self.point_at(t1).sub_point(self.point_at(t0)) * (1.0 / (t1 - t0))
    }

    /// Unit tangent, `None` where the derivative vanishes.
    #[must_use]
    fn tangent_at(&self, t: f64) -> Option<Vec3> {
        self.derivative_at(t).normalized()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line3 {
    pub start: Point3,
    pub end: Point3,
}

impl Line3 {
    #[must_use]
    pub const fn new(start: Point3, end: Point3) -> Self {
        Self { start, end }
    }
}

impl Curve3 for Line3 {
    fn point_at(&self, t: f64) -> Point3 {
        self.start.lerp(self.end, t)
    }

    fn derivative_at(&self, _t: f64) -> Vec3 {
        self.end.sub_point(self.start)
    }
}

/// Polyline whose parameter is the fraction of its total length, so vertices
/// sit at their cumulative length over the total.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline3 {
    points: Vec<Point3>,
    /// Length up to each vertex; a closed polyline has one more entry for the
    /// return to the first point.
    cumulative: Vec<f64>,
    closed: bool,
}

impl Polyline3 {
    /// A closed polyline may repeat its first point at the end; the repeat is
    /// dropped.
    pub fn new(mut points: Vec<Point3>, closed: bool) -> Result<Self, String> {
        if closed && points.len() > 2 && points.first() == points.last() {
            points.pop();
        }
        if points.len() < 2 {
            return Err("polyline requires at least 2 points".to_owned());
        }

        let segments = if closed { points.len() } else { points.len() - 1 };
        let mut cumulative = Vec::with_capacity(segments + 1);
        let mut total = 0.0;
        cumulative.push(total);
        for i in 0..segments {
            total += points[(i + 1) % points.len()].sub_point(points[i]).length();
            cumulative.push(total);
        }

        Ok(Self {
            points,
            cumulative,
            closed,
        })
    }

    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    fn has_length(&self) -> bool {
        let total = self.total_length();
        total > 0.0 && total.is_finite()
    }
}

impl Curve3 for Polyline3 {
    fn point_at(&self, t: f64) -> Point3 {
        if !self.has_length() {
            return self.points[0];
        }

        let target = t.clamp(0.0, 1.0) * self.total_length();
        let last_segment = self.cumulative.len() - 2;
        let segment = self
            .cumulative
            .partition_point(|&length| length <= target)
            .saturating_sub(1)
            .min(last_segment);

        let start = self.points[segment];
        let end = self.points[(segment + 1) % self.points.len()];
        let span = self.cumulative[segment + 1] - self.cumulative[segment];
        if span == 0.0 {
            return start;
        }
        start.lerp(end, ((target - self.cumulative[segment]) / span).clamp(0.0, 1.0))
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn breakpoints(&self) -> Vec<f64> {
        if !self.has_length() {
            return Vec::new();
        }
        let total = self.total_length();
        self.cumulative.iter().map(|length| length / total).collect()
    }
}

/// Full circle, starting on `x_axis` and turning towards `y_axis`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle3 {
    pub center: Point3,
    pub x_axis: Vec3,
    pub y_axis: Vec3,
    pub radius: f64,
}

impl Circle3 {
    /// `x_axis` is projected into the plane of `normal`.
    #[must_use]
    pub fn from_center_xaxis_normal(center: Point3, x_axis: Vec3, normal: Vec3, radius: f64) -> Self {
        let (x_axis, y_axis) = plane_axes(x_axis, normal);
        Self {
            center,
            x_axis,
            y_axis,
            radius,
        }
    }

    fn as_arc(&self) -> Arc3 {
        Arc3 {
            center: self.center,
            x_axis: self.x_axis,
            y_axis: self.y_axis,
            radius: self.radius,
            start_angle: 0.0,
            sweep_angle: TAU,
        }
    }
}

impl Curve3 for Circle3 {
    fn point_at(&self, t: f64) -> Point3 {
        // Both ends of the domain return the identical seam point.
        let t = if t >= 1.0 { 0.0 } else { t };
        self.as_arc().point_at(t)
    }

    fn is_closed(&self) -> bool {
        true
    }

    fn derivative_at(&self, t: f64) -> Vec3 {
        self.as_arc().derivative_at(t)
    }
}

/// Circular arc from `start_angle` over `sweep_angle` radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc3 {
    pub center: Point3,
    pub x_axis: Vec3,
    pub y_axis: Vec3,
    pub radius: f64,
    pub start_angle: f64,
    pub sweep_angle: f64,
}

impl Arc3 {
    #[must_use]
    pub fn from_center_xaxis_normal(
        center: Point3,
        x_axis: Vec3,
        normal: Vec3,
        radius: f64,
        start_angle: f64,
        sweep_angle: f64,
    ) -> Self {
        let (x_axis, y_axis) = plane_axes(x_axis, normal);
        Self {
            center,
            x_axis,
            y_axis,
            radius,
            start_angle,
            sweep_angle,
        }
    }

    fn angle_at(&self, t: f64) -> f64 {
        self.start_angle + self.sweep_angle * t.clamp(0.0, 1.0)
    }
}

impl Curve3 for Arc3 {
    fn point_at(&self, t: f64) -> Point3 {
        let (sin, cos) = self.angle_at(t).sin_cos();
        self.center
            .add_vec(self.x_axis * (self.radius * cos) + self.y_axis * (self.radius * sin))
    }

    fn derivative_at(&self, t: f64) -> Vec3 {
        let (sin, cos) = self.angle_at(t).sin_cos();
        let speed = self.radius * self.sweep_angle;
        self.y_axis * (speed * cos) - self.x_axis * (speed * sin)
    }

    fn is_closed(&self) -> bool {
        (self.sweep_angle.abs() - TAU).abs() < 1e-9
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier3 {
    pub p0: Point3,
    pub p1: Point3,
    pub p2: Point3,
    pub p3: Point3,
}

impl CubicBezier3 {
    #[must_use]
    pub const fn new(p0: Point3, p1: Point3, p2: Point3, p3: Point3) -> Self {
        Self { p0, p1, p2, p3 }
    }
}

impl Curve3 for CubicBezier3 {
    fn point_at(&self, t: f64) -> Point3 {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        // Bernstein weights sum to one, so the blend is taken relative to p0.
        let offset = self.p1.sub_point(self.p0) * (3.0 * u * u * t)
            + self.p2.sub_point(self.p0) * (3.0 * u * t * t)
            + self.p3.sub_point(self.p0) * (t * t * t);
        self.p0.add_vec(offset)
    }

    fn derivative_at(&self, t: f64) -> Vec3 {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        self.p1.sub_point(self.p0) * (3.0 * u * u)
            + self.p2.sub_point(self.p1) * (6.0 * u * t)
            + self.p3.sub_point(self.p2) * (3.0 * t * t)
    }
}

/// Orthonormal in-plane axes for a plane with `normal`, the first one as close
/// to `x_hint` as the plane allows.
fn plane_axes(x_hint: Vec3, normal: Vec3) -> (Vec3, Vec3) {
    let z = normal.normalized().unwrap_or(Vec3::Z);
    let x = (x_hint - z * x_hint.dot(z))
        .normalized()
        .or_else(|| {
            let helper = if z.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
            z.cross(helper).normalized()
        })
        .unwrap_or(Vec3::X);
    (x, z.cross(x))
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TableEntry {
    parameter: f64,
    length: f64,
}

/// Cumulative chord lengths over a parameter range of a curve, inverted
/// piecewise linearly to map arc length back to the native parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcLengthTable {
    entries: Vec<TableEntry>,
}

impl ArcLengthTable {
    /// Samples `curve` at `samples` evenly spaced native parameters in
    /// `range` (at least two) plus every breakpoint inside it, and accumulates
    /// the chord lengths. Corners are always table entries, so polylines
    /// measure exactly.
    #[must_use]
    pub fn build<C: Curve3 + ?Sized>(curve: &C, range: (f64, f64), samples: usize) -> Self {
        let samples = samples.max(2);
        let (t0, t1) = range;
        let span = t1 - t0;
        let merge = span.abs() * 1e-12;

        let mut parameters: Vec<f64> = (0..samples)
            .map(|i| t0 + span * (i as f64 / (samples - 1) as f64))
            .collect();
        parameters.extend(
            curve
                .breakpoints()
                .into_iter()
                .filter(|&t| t > t0 + merge && t < t1 - merge),
        );
        parameters.sort_by(f64::total_cmp);
        parameters.dedup_by(|later, earlier| (*later - *earlier).abs() <= merge);

        let mut entries = Vec::with_capacity(parameters.len());
        let mut prev = curve.point_at(t0);
        let mut length = 0.0;
        for parameter in parameters {
            let point = curve.point_at(parameter);
            length += point.sub_point(prev).length();
            entries.push(TableEntry { parameter, length });
            prev = point;
        }

        Self { entries }
    }

    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.entries.last().map_or(0.0, |e| e.length)
    }

    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.entries.len()
    }

    /// Native parameter at `fraction` of the total length, clamped into
    /// `[0, 1]`.
    #[must_use]
    pub fn parameter_at_fraction(&self, fraction: f64) -> f64 {
        self.parameter_at_length(fraction.clamp(0.0, 1.0) * self.total_length())
    }

    /// Native parameter at an absolute arc length from the range start.
    #[must_use]
    pub fn parameter_at_length(&self, target: f64) -> f64 {
        let (Some(first), Some(last)) = (self.entries.first(), self.entries.last()) else {
            return 0.0;
        };
        if target <= 0.0 {
            return first.parameter;
        }
        if target >= last.length {
            return last.parameter;
        }

        // First entry reaching the target; the one before it starts the chord.
        let above = self.entries.partition_point(|e| e.length < target);
        let (e0, e1) = (self.entries[above - 1], self.entries[above]);
        let chord = e1.length - e0.length;
        if chord <= 0.0 {
            return e1.parameter;
        }
        e0.parameter + (e1.parameter - e0.parameter) * ((target - e0.length) / chord)
    }
}
