//! World-placed curves.
//!
//! A [`SplineCurve`] pairs a local [`CurveShape`] with the world matrix of the
//! object carrying it. Its [`Curve3`] implementation evaluates in world space,
//! so arc lengths measured on it are in world units.

use super::core::{Point3, Transform, Vec3};
use super::curve::{Arc3, Circle3, CubicBezier3, Curve3, Line3, Polyline3};

/// The local geometry of a spline object.
#[derive(Debug, Clone, PartialEq)]
pub enum CurveShape {
    Line(Line3),
    Polyline(Polyline3),
    Circle(Circle3),
    Arc(Arc3),
    CubicBezier(CubicBezier3),
}

impl CurveShape {
    fn as_curve(&self) -> &dyn Curve3 {
        match self {
            Self::Line(c) => c,
            Self::Polyline(c) => c,
            Self::Circle(c) => c,
            Self::Arc(c) => c,
            Self::CubicBezier(c) => c,
        }
    }

    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Line(_) => "line",
            Self::Polyline(_) => "polyline",
            Self::Circle(_) => "circle",
            Self::Arc(_) => "arc",
            Self::CubicBezier(_) => "bezier",
        }
    }
}

impl Curve3 for CurveShape {
    fn point_at(&self, t: f64) -> Point3 {
        self.as_curve().point_at(t)
    }

    fn domain(&self) -> (f64, f64) {
        self.as_curve().domain()
    }

    fn is_closed(&self) -> bool {
        self.as_curve().is_closed()
    }

    fn breakpoints(&self) -> Vec<f64> {
        self.as_curve().breakpoints()
    }

    fn derivative_at(&self, t: f64) -> Vec3 {
        self.as_curve().derivative_at(t)
    }
}

/// A curve shape placed in the world by its object's matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SplineCurve {
    pub shape: CurveShape,
    pub world: Transform,
}

impl SplineCurve {
    #[must_use]
    pub fn new(shape: CurveShape) -> Self {
        Self {
            shape,
            world: Transform::identity(),
        }
    }

    #[must_use]
    pub fn with_world(shape: CurveShape, world: Transform) -> Self {
        Self { shape, world }
    }

    /// Unit tangent of the local shape, carried through the orientation part of
    /// the world matrix. Scale in the matrix is not divided out again.
    #[must_use]
    pub fn world_tangent_at(&self, t: f64) -> Vec3 {
        let local = self.shape.tangent_at(t).unwrap_or(Vec3::ZERO);
        self.world.apply_vec(local)
    }
}

impl Curve3 for SplineCurve {
    fn point_at(&self, t: f64) -> Point3 {
        self.world.apply_point(self.shape.point_at(t))
    }

    fn domain(&self) -> (f64, f64) {
        self.shape.domain()
    }

    fn is_closed(&self) -> bool {
        self.shape.is_closed()
    }

    fn breakpoints(&self) -> Vec<f64> {
        self.shape.breakpoints()
    }

    fn derivative_at(&self, t: f64) -> Vec3 {
        self.world.apply_vec(self.shape.derivative_at(t))
    }
}
