//! Curve objects stored in the scene.

use std::fmt;

use crate::geom::SplineCurve;

/// Identifier for a curve object within the scene.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Ord, PartialOrd)]
pub struct CurveId(pub usize);

impl CurveId {
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }
}

impl fmt::Display for CurveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "curve #{}", self.0)
    }
}

/// A curve object as the host stores it.
#[derive(Debug, Clone, PartialEq)]
pub enum CurveEntry {
    /// An object that is a spline itself.
    Spline { name: String, curve: SplineCurve },
    /// An object that generates its spline from another curve object, such as
    /// a modifier or instance. Its effective curve is the target's.
    Generator { name: String, target: CurveId },
}

impl CurveEntry {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Spline { name, .. } | Self::Generator { name, .. } => name,
        }
    }

    #[must_use]
    pub fn as_spline(&self) -> Option<&SplineCurve> {
        match self {
            Self::Spline { curve, .. } => Some(curve),
            Self::Generator { .. } => None,
        }
    }
}
