use std::ops::{Add, Mul, Neg, Sub};

/// Direction or displacement in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const X: Self = Self::new(1.0, 0.0, 0.0);
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);
    /// Neutral scale.
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    #[must_use]
    pub const fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[must_use]
    pub const fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    #[must_use]
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    #[must_use]
    pub const fn mul_scalar(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    /// Unit vector, or `None` for zero and non-finite input.
    #[must_use]
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        (len.is_finite() && len > 0.0).then(|| self.mul_scalar(1.0 / len))
    }

    /// Divides by the length unchecked. A zero vector comes out non-finite;
    /// use [`Vec3::normalized`] to detect that case instead.
    #[must_use]
    pub fn unit(self) -> Self {
        self.mul_scalar(1.0 / self.length())
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        self.mul_scalar(rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        self.mul_scalar(-1.0)
    }
}

/// Position in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ORIGIN: Self = Self::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn add_vec(self, v: Vec3) -> Self {
        Self::new(self.x + v.x, self.y + v.y, self.z + v.z)
    }

    /// Displacement from `rhs` to `self`.
    #[must_use]
    pub const fn sub_point(self, rhs: Self) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    #[must_use]
    pub fn lerp(self, rhs: Self, t: f64) -> Self {
        self.add_vec(rhs.sub_point(self).mul_scalar(t))
    }
}

impl Add<Vec3> for Point3 {
    type Output = Self;
    fn add(self, rhs: Vec3) -> Self {
        self.add_vec(rhs)
    }
}

impl Sub<Vec3> for Point3 {
    type Output = Self;
    fn sub(self, rhs: Vec3) -> Self {
        self.add_vec(-rhs)
    }
}

impl Sub for Point3 {
    type Output = Vec3;
    fn sub(self, rhs: Self) -> Vec3 {
        self.sub_point(rhs)
    }
}

/// Affine 4x4 transform, stored row-major. Columns 0..3 hold the X/Y/Z axes,
/// column 3 the origin. Axis lengths carry the scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    m: [[f64; 4]; 4],
}

impl Transform {
    #[must_use]
    pub const fn identity() -> Self {
        Self::from_axes(Point3::ORIGIN, Vec3::X, Vec3::Y, Vec3::Z)
    }

    /// Axes are stored as given; their lengths become the scale.
    #[must_use]
    pub const fn from_axes(origin: Point3, x_axis: Vec3, y_axis: Vec3, z_axis: Vec3) -> Self {
        Self {
            m: [
                [x_axis.x, y_axis.x, z_axis.x, origin.x],
                [x_axis.y, y_axis.y, z_axis.y, origin.y],
                [x_axis.z, y_axis.z, z_axis.z, origin.z],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Frame at `position` whose Z axis looks at `target`. `up_reference` is a
    /// point, not a direction, and fixes the roll:
    ///
    /// - Z = normalize(target - position)
    /// - X = normalize(Z x (position - up_reference))
    /// - Y = normalize(Z x X)
    ///
    /// The result is orthonormal with unit scale. Degenerate input (target on
    /// top of `position`, or `up_reference` on the Z line) yields non-finite
    /// axes.
    #[must_use]
    pub fn target_align(position: Point3, target: Point3, up_reference: Point3) -> Self {
        let z_axis = target.sub_point(position).unit();
        let x_axis = z_axis.cross(position.sub_point(up_reference)).unit();
        let y_axis = z_axis.cross(x_axis).unit();
        Self::from_axes(position, x_axis, y_axis, z_axis)
    }

    #[must_use]
    pub const fn translate(offset: Vec3) -> Self {
        Self::from_axes(Point3::new(offset.x, offset.y, offset.z), Vec3::X, Vec3::Y, Vec3::Z)
    }

    #[must_use]
    pub const fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self::from_axes(
            Point3::ORIGIN,
            Vec3::new(sx, 0.0, 0.0),
            Vec3::new(0.0, sy, 0.0),
            Vec3::new(0.0, 0.0, sz),
        )
    }

    /// Rotation about +Z by `angle` radians.
    #[must_use]
    pub fn rotate_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_axes(Point3::ORIGIN, Vec3::new(c, s, 0.0), Vec3::new(-s, c, 0.0), Vec3::Z)
    }

    /// `self` applied after `other`.
    #[must_use]
    pub fn compose(self, other: Self) -> Self {
        let mut m = [[0.0; 4]; 4];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.m[i][k] * other.m[k][j]).sum();
            }
        }
        Self { m }
    }

    #[must_use]
    pub const fn x_axis(self) -> Vec3 {
        Vec3::new(self.m[0][0], self.m[1][0], self.m[2][0])
    }

    #[must_use]
    pub const fn y_axis(self) -> Vec3 {
        Vec3::new(self.m[0][1], self.m[1][1], self.m[2][1])
    }

    #[must_use]
    pub const fn z_axis(self) -> Vec3 {
        Vec3::new(self.m[0][2], self.m[1][2], self.m[2][2])
    }

    #[must_use]
    pub const fn origin(self) -> Point3 {
        Point3::new(self.m[0][3], self.m[1][3], self.m[2][3])
    }

    #[must_use]
    pub const fn translation(self) -> Vec3 {
        Vec3::new(self.m[0][3], self.m[1][3], self.m[2][3])
    }

    /// Scale carried by the transform.
    #[must_use]
    pub fn axis_lengths(self) -> Vec3 {
        Vec3::new(
            self.x_axis().length(),
            self.y_axis().length(),
            self.z_axis().length(),
        )
    }

    /// Rescales each axis to the given length, keeping directions and origin.
    /// Zero axes stay zero.
    #[must_use]
    pub fn with_axis_lengths(self, lengths: Vec3) -> Self {
        let resize = |axis: Vec3, len: f64| axis.normalized().map_or(axis, |dir| dir * len);
        Self::from_axes(
            self.origin(),
            resize(self.x_axis(), lengths.x),
            resize(self.y_axis(), lengths.y),
            resize(self.z_axis(), lengths.z),
        )
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.m.iter().flatten().all(|v| v.is_finite())
    }

    #[must_use]
    pub fn apply_point(self, p: Point3) -> Point3 {
        self.origin().add_vec(self.apply_vec(Vec3::new(p.x, p.y, p.z)))
    }

    /// Applies the 3x3 part only.
    #[must_use]
    pub fn apply_vec(self, v: Vec3) -> Vec3 {
        self.x_axis() * v.x + self.y_axis() * v.y + self.z_axis() * v.z
    }

    #[must_use]
    pub const fn as_matrix(&self) -> &[[f64; 4]; 4] {
        &self.m
    }
}

impl Mul for Transform {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        self.compose(rhs)
    }
}

/// Absolute tolerance for comparisons and numeric steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub eps: f64,
}

impl Tolerance {
    /// Finite-difference step, relative to the domain span.
    pub const DERIVATIVE: Self = Self { eps: 1e-6 };
    /// Placement comparisons.
    pub const LOOSE: Self = Self { eps: 1e-6 };

    #[must_use]
    pub const fn new(eps: f64) -> Self {
        Self { eps }
    }

    #[must_use]
    pub fn relative_to(self, span: f64) -> f64 {
        self.eps * span.abs()
    }

    #[must_use]
    pub fn approx_eq_f64(self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.eps
    }

    #[must_use]
    pub fn approx_eq_point3(self, a: Point3, b: Point3) -> bool {
        a.sub_point(b).length() <= self.eps
    }

    #[must_use]
    pub fn approx_eq_vec3(self, a: Vec3, b: Vec3) -> bool {
        (a - b).length() <= self.eps
    }
}
