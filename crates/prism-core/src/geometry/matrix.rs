//! Classified 2-D affine transform.
//!
//! A [`Matrix`] stores the six coefficients of an affine map together with a
//! [`MatrixKind`] tag describing which simple shape the coefficients are known
//! to have. Composition, inversion and point transforms dispatch on the tag so
//! that the common cases (identity, pure translation, axis-aligned scale) skip
//! the full 2x2 arithmetic.
//!
//! # Conventions
//!
//! Points are row vectors multiplied on the left: `p' = p * M`, so
//!
//! ```text
//! x' = x * m11 + y * m21 + offset_x
//! y' = x * m12 + y * m22 + offset_y
//! ```
//!
//! and `a * b` means "apply `a`, then `b`".
//!
//! # Classification invariant
//!
//! The tag is conservative: it may be looser than the coefficients (an
//! `Unknown` matrix can still be numerically the identity) but never tighter.
//! Every mutation path either re-derives the tag or widens it.
//!
//! ```rust
//! use prism_core::geometry::{Matrix, MatrixKind, Point};
//!
//! let mut m = Matrix::identity();
//! m.scale(2.0, 3.0);
//! m.translate(10.0, 20.0);
//! assert_eq!(m.kind(), MatrixKind::ScalingAndTranslation);
//! assert_eq!(m.transform_point(Point::new(1.0, 1.0)), Point::new(12.0, 23.0));
//! ```

use std::fmt;
use std::ops::{Mul, MulAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::float_util;
use super::point::{Point, Vector};
use crate::error::{GeometryError, GeometryResult};
use crate::logging::LogCategory;

/// Shape the coefficients of a [`Matrix`] are known to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatrixKind {
    /// Exactly `(1, 0, 0, 1, 0, 0)`.
    Identity,
    /// Unit diagonal, zero off-diagonal; offsets arbitrary.
    Translation,
    /// Zero off-diagonal and zero offsets; diagonal arbitrary.
    Scaling,
    /// Zero off-diagonal; diagonal and offsets arbitrary.
    ScalingAndTranslation,
    /// No structural guarantee.
    Unknown,
}

impl MatrixKind {
    /// Whether the diagonal may differ from `(1, 1)`.
    #[inline]
    pub fn has_scaling(self) -> bool {
        matches!(self, MatrixKind::Scaling | MatrixKind::ScalingAndTranslation)
    }

    /// Whether the offsets may be non-zero.
    #[inline]
    pub fn has_translation(self) -> bool {
        matches!(
            self,
            MatrixKind::Translation | MatrixKind::ScalingAndTranslation
        )
    }

    /// Widen to admit a non-unit diagonal.
    #[inline]
    pub fn with_scaling(self) -> Self {
        match self {
            MatrixKind::Identity | MatrixKind::Scaling => MatrixKind::Scaling,
            MatrixKind::Translation | MatrixKind::ScalingAndTranslation => {
                MatrixKind::ScalingAndTranslation
            }
            MatrixKind::Unknown => MatrixKind::Unknown,
        }
    }

    /// Widen to admit non-zero offsets.
    #[inline]
    pub fn with_translation(self) -> Self {
        match self {
            MatrixKind::Identity | MatrixKind::Translation => MatrixKind::Translation,
            MatrixKind::Scaling | MatrixKind::ScalingAndTranslation => {
                MatrixKind::ScalingAndTranslation
            }
            MatrixKind::Unknown => MatrixKind::Unknown,
        }
    }

    /// Tightest tag the given coefficients justify.
    pub fn classify(m11: f64, m12: f64, m21: f64, m22: f64, offset_x: f64, offset_y: f64) -> Self {
        if m12 != 0.0 || m21 != 0.0 {
            return MatrixKind::Unknown;
        }
        let mut kind = MatrixKind::Identity;
        if m11 != 1.0 || m22 != 1.0 {
            kind = kind.with_scaling();
        }
        if offset_x != 0.0 || offset_y != 0.0 {
            kind = kind.with_translation();
        }
        kind
    }
}

/// 2-D affine transform with a conservative classification tag.
///
/// Coefficients are private so that every write goes through a path that
/// keeps the tag honest. Equality compares coefficients only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(from = "[f64; 6]", into = "[f64; 6]")]
pub struct Matrix {
    m11: f64,
    m12: f64,
    m21: f64,
    m22: f64,
    offset_x: f64,
    offset_y: f64,
    kind: MatrixKind,
}

impl Matrix {
    /// The identity transform.
    pub const IDENTITY: Matrix = Matrix {
        m11: 1.0,
        m12: 0.0,
        m21: 0.0,
        m22: 1.0,
        offset_x: 0.0,
        offset_y: 0.0,
        kind: MatrixKind::Identity,
    };

    /// Create a matrix from explicit coefficients; the tag is derived.
    pub fn new(m11: f64, m12: f64, m21: f64, m22: f64, offset_x: f64, offset_y: f64) -> Self {
        Self {
            m11,
            m12,
            m21,
            m22,
            offset_x,
            offset_y,
            kind: MatrixKind::classify(m11, m12, m21, m22, offset_x, offset_y),
        }
    }

    #[inline]
    const fn with_kind(
        m11: f64,
        m12: f64,
        m21: f64,
        m22: f64,
        offset_x: f64,
        offset_y: f64,
        kind: MatrixKind,
    ) -> Self {
        Self {
            m11,
            m12,
            m21,
            m22,
            offset_x,
            offset_y,
            kind,
        }
    }

    /// The identity transform.
    pub const fn identity() -> Self {
        Self::IDENTITY
    }

    /// Pure translation by `(dx, dy)`.
    pub const fn translation(dx: f64, dy: f64) -> Self {
        Self::with_kind(1.0, 0.0, 0.0, 1.0, dx, dy, MatrixKind::Translation)
    }

    /// Axis-aligned scale about the origin.
    pub const fn scaling(sx: f64, sy: f64) -> Self {
        Self::with_kind(sx, 0.0, 0.0, sy, 0.0, 0.0, MatrixKind::Scaling)
    }

    /// Axis-aligned scale about `(center_x, center_y)`.
    pub fn scaling_at(sx: f64, sy: f64, center_x: f64, center_y: f64) -> Self {
        Self::with_kind(
            sx,
            0.0,
            0.0,
            sy,
            center_x - sx * center_x,
            center_y - sy * center_y,
            MatrixKind::ScalingAndTranslation,
        )
    }

    /// Rotation by `angle` degrees about the origin.
    pub fn rotation(angle: f64) -> Self {
        Self::rotation_at(angle, 0.0, 0.0)
    }

    /// Rotation by `angle` degrees about `(center_x, center_y)`.
    ///
    /// The angle is reduced modulo 360 before conversion so large angles do
    /// not lose precision in the trigonometry.
    pub fn rotation_at(angle: f64, center_x: f64, center_y: f64) -> Self {
        let angle = angle % 360.0;
        Self::rotation_radians(angle.to_radians(), center_x, center_y)
    }

    /// Rotation by `angle` radians about `(center_x, center_y)`.
    ///
    /// Always tagged `Unknown`, even for angles where the result happens to
    /// be a pure scale.
    pub fn rotation_radians(angle: f64, center_x: f64, center_y: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        let dx = center_x * (1.0 - cos) + center_y * sin;
        let dy = center_y * (1.0 - cos) - center_x * sin;
        Self::with_kind(cos, sin, -sin, cos, dx, dy, MatrixKind::Unknown)
    }

    /// Skew by `skew_x` and `skew_y` degrees.
    pub fn skew(skew_x: f64, skew_y: f64) -> Self {
        let skew_x = (skew_x % 360.0).to_radians();
        let skew_y = (skew_y % 360.0).to_radians();
        Self::with_kind(
            1.0,
            skew_y.tan(),
            skew_x.tan(),
            1.0,
            0.0,
            0.0,
            MatrixKind::Unknown,
        )
    }

    #[inline]
    pub fn m11(&self) -> f64 {
        self.m11
    }

    #[inline]
    pub fn m12(&self) -> f64 {
        self.m12
    }

    #[inline]
    pub fn m21(&self) -> f64 {
        self.m21
    }

    #[inline]
    pub fn m22(&self) -> f64 {
        self.m22
    }

    #[inline]
    pub fn offset_x(&self) -> f64 {
        self.offset_x
    }

    #[inline]
    pub fn offset_y(&self) -> f64 {
        self.offset_y
    }

    /// Current classification tag.
    #[inline]
    pub fn kind(&self) -> MatrixKind {
        self.kind
    }

    /// Coefficients as `[m11, m12, m21, m22, offset_x, offset_y]`.
    #[inline]
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.m11,
            self.m12,
            self.m21,
            self.m22,
            self.offset_x,
            self.offset_y,
        ]
    }

    pub fn set_m11(&mut self, value: f64) {
        if self.kind == MatrixKind::Identity {
            *self = Self::with_kind(value, 0.0, 0.0, 1.0, 0.0, 0.0, MatrixKind::Scaling);
        } else {
            self.m11 = value;
            self.kind = self.kind.with_scaling();
        }
    }

    pub fn set_m12(&mut self, value: f64) {
        if self.kind == MatrixKind::Identity {
            *self = Self::with_kind(1.0, value, 0.0, 1.0, 0.0, 0.0, MatrixKind::Unknown);
        } else {
            self.m12 = value;
            self.kind = MatrixKind::Unknown;
        }
    }

    pub fn set_m21(&mut self, value: f64) {
        if self.kind == MatrixKind::Identity {
            *self = Self::with_kind(1.0, 0.0, value, 1.0, 0.0, 0.0, MatrixKind::Unknown);
        } else {
            self.m21 = value;
            self.kind = MatrixKind::Unknown;
        }
    }

    pub fn set_m22(&mut self, value: f64) {
        if self.kind == MatrixKind::Identity {
            *self = Self::with_kind(1.0, 0.0, 0.0, value, 0.0, 0.0, MatrixKind::Scaling);
        } else {
            self.m22 = value;
            self.kind = self.kind.with_scaling();
        }
    }

    pub fn set_offset_x(&mut self, value: f64) {
        if self.kind == MatrixKind::Identity {
            *self = Self::translation(value, 0.0);
        } else {
            self.offset_x = value;
            self.kind = self.kind.with_translation();
        }
    }

    pub fn set_offset_y(&mut self, value: f64) {
        if self.kind == MatrixKind::Identity {
            *self = Self::translation(0.0, value);
        } else {
            self.offset_y = value;
            self.kind = self.kind.with_translation();
        }
    }

    /// Reset to the identity transform.
    pub fn set_identity(&mut self) {
        *self = Self::IDENTITY;
    }

    /// `true` if tagged identity or if the coefficients are exactly identity.
    pub fn is_identity(&self) -> bool {
        self.kind == MatrixKind::Identity
            || (self.m11 == 1.0
                && self.m12 == 0.0
                && self.m21 == 0.0
                && self.m22 == 1.0
                && self.offset_x == 0.0
                && self.offset_y == 0.0)
    }

    /// Determinant of the linear part, computed per tag.
    pub fn determinant(&self) -> f64 {
        match self.kind {
            MatrixKind::Identity | MatrixKind::Translation => 1.0,
            MatrixKind::Scaling | MatrixKind::ScalingAndTranslation => self.m11 * self.m22,
            MatrixKind::Unknown => self.m11 * self.m22 - self.m12 * self.m21,
        }
    }

    /// Whether [`invert`](Self::invert) would succeed.
    pub fn has_inverse(&self) -> bool {
        !float_util::is_zero(self.determinant())
    }

    /// Replace this matrix with its inverse.
    ///
    /// # Errors
    ///
    /// [`GeometryError::NotInvertible`] if the determinant is zero within
    /// tolerance. The matrix is left unchanged in that case.
    pub fn invert(&mut self) -> GeometryResult<()> {
        let determinant = self.determinant();
        if float_util::is_zero(determinant) {
            crate::prism_debug!(
                LogCategory::Geometry,
                "refusing to invert singular matrix {} (det={})",
                self,
                determinant
            );
            return Err(GeometryError::NotInvertible { determinant });
        }

        match self.kind {
            MatrixKind::Identity => {}
            MatrixKind::Translation => {
                self.offset_x = -self.offset_x;
                self.offset_y = -self.offset_y;
            }
            MatrixKind::Scaling => {
                self.m11 = 1.0 / self.m11;
                self.m22 = 1.0 / self.m22;
            }
            MatrixKind::ScalingAndTranslation => {
                self.m11 = 1.0 / self.m11;
                self.m22 = 1.0 / self.m22;
                self.offset_x = -self.offset_x * self.m11;
                self.offset_y = -self.offset_y * self.m22;
            }
            MatrixKind::Unknown => {
                let inv_det = 1.0 / determinant;
                let Matrix {
                    m11,
                    m12,
                    m21,
                    m22,
                    offset_x,
                    offset_y,
                    ..
                } = *self;
                *self = Self::with_kind(
                    m22 * inv_det,
                    -m12 * inv_det,
                    -m21 * inv_det,
                    m11 * inv_det,
                    (m21 * offset_y - offset_x * m22) * inv_det,
                    (offset_x * m12 - m11 * offset_y) * inv_det,
                    MatrixKind::Unknown,
                );
            }
        }
        Ok(())
    }

    /// The inverse, leaving `self` untouched.
    pub fn inverse(&self) -> GeometryResult<Matrix> {
        let mut inverse = *self;
        inverse.invert()?;
        Ok(inverse)
    }

    /// Compose two transforms: the result applies `a` first, then `b`.
    ///
    /// Pairs of simple tags use specialised formulas; anything involving an
    /// `Unknown` operand falls back to [`multiply_general`](Self::multiply_general).
    pub fn multiply(a: Matrix, b: Matrix) -> Matrix {
        use MatrixKind::*;

        match (a.kind, b.kind) {
            (_, Identity) => a,
            (Identity, _) => b,
            (_, Translation) => Matrix {
                offset_x: a.offset_x + b.offset_x,
                offset_y: a.offset_y + b.offset_y,
                kind: a.kind.with_translation(),
                ..a
            },
            (Translation, _) => Matrix {
                offset_x: a.offset_x * b.m11 + a.offset_y * b.m21 + b.offset_x,
                offset_y: a.offset_x * b.m12 + a.offset_y * b.m22 + b.offset_y,
                kind: if b.kind == Unknown {
                    Unknown
                } else {
                    ScalingAndTranslation
                },
                ..b
            },
            (Scaling, Scaling) => Matrix {
                m11: a.m11 * b.m11,
                m22: a.m22 * b.m22,
                ..a
            },
            (Scaling, ScalingAndTranslation) => Matrix {
                m11: a.m11 * b.m11,
                m22: a.m22 * b.m22,
                offset_x: b.offset_x,
                offset_y: b.offset_y,
                kind: ScalingAndTranslation,
                ..a
            },
            (ScalingAndTranslation, Scaling) => Matrix {
                m11: a.m11 * b.m11,
                m22: a.m22 * b.m22,
                offset_x: a.offset_x * b.m11,
                offset_y: a.offset_y * b.m22,
                ..a
            },
            (ScalingAndTranslation, ScalingAndTranslation) => Matrix {
                m11: a.m11 * b.m11,
                m22: a.m22 * b.m22,
                offset_x: b.m11 * a.offset_x + b.offset_x,
                offset_y: b.m22 * a.offset_y + b.offset_y,
                ..a
            },
            _ => Self::multiply_general(&a, &b),
        }
    }

    /// Full 2x2-plus-offset composition with no tag dispatch.
    ///
    /// The result is always tagged `Unknown`.
    pub fn multiply_general(a: &Matrix, b: &Matrix) -> Matrix {
        Self::with_kind(
            a.m11 * b.m11 + a.m12 * b.m21,
            a.m11 * b.m12 + a.m12 * b.m22,
            a.m21 * b.m11 + a.m22 * b.m21,
            a.m21 * b.m12 + a.m22 * b.m22,
            a.offset_x * b.m11 + a.offset_y * b.m21 + b.offset_x,
            a.offset_x * b.m12 + a.offset_y * b.m22 + b.offset_y,
            MatrixKind::Unknown,
        )
    }

    /// `self = self * other`
    pub fn append(&mut self, other: Matrix) {
        *self = Self::multiply(*self, other);
    }

    /// `self = other * self`
    pub fn prepend(&mut self, other: Matrix) {
        *self = Self::multiply(other, *self);
    }

    /// Append a translation. Adjusts the offsets directly.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self.kind {
            MatrixKind::Identity => *self = Self::translation(dx, dy),
            _ => {
                self.offset_x += dx;
                self.offset_y += dy;
                self.kind = self.kind.with_translation();
            }
        }
    }

    pub fn translate_prepend(&mut self, dx: f64, dy: f64) {
        self.prepend(Self::translation(dx, dy));
    }

    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.append(Self::scaling(sx, sy));
    }

    pub fn scale_prepend(&mut self, sx: f64, sy: f64) {
        self.prepend(Self::scaling(sx, sy));
    }

    pub fn scale_at(&mut self, sx: f64, sy: f64, center_x: f64, center_y: f64) {
        self.append(Self::scaling_at(sx, sy, center_x, center_y));
    }

    pub fn scale_at_prepend(&mut self, sx: f64, sy: f64, center_x: f64, center_y: f64) {
        self.prepend(Self::scaling_at(sx, sy, center_x, center_y));
    }

    /// Append a rotation of `angle` degrees about the origin.
    pub fn rotate(&mut self, angle: f64) {
        self.append(Self::rotation(angle));
    }

    pub fn rotate_prepend(&mut self, angle: f64) {
        self.prepend(Self::rotation(angle));
    }

    /// Append a rotation of `angle` degrees about `(center_x, center_y)`.
    pub fn rotate_at(&mut self, angle: f64, center_x: f64, center_y: f64) {
        self.append(Self::rotation_at(angle, center_x, center_y));
    }

    pub fn rotate_at_prepend(&mut self, angle: f64, center_x: f64, center_y: f64) {
        self.prepend(Self::rotation_at(angle, center_x, center_y));
    }

    /// Append a skew, angles in degrees.
    pub fn skew_by(&mut self, skew_x: f64, skew_y: f64) {
        self.append(Self::skew(skew_x, skew_y));
    }

    pub fn skew_prepend(&mut self, skew_x: f64, skew_y: f64) {
        self.prepend(Self::skew(skew_x, skew_y));
    }

    /// Map a point, including translation.
    pub fn transform_point(&self, point: Point) -> Point {
        let Point { x, y } = point;
        match self.kind {
            MatrixKind::Identity => point,
            MatrixKind::Translation => Point::new(x + self.offset_x, y + self.offset_y),
            MatrixKind::Scaling => Point::new(x * self.m11, y * self.m22),
            MatrixKind::ScalingAndTranslation => Point::new(
                x * self.m11 + self.offset_x,
                y * self.m22 + self.offset_y,
            ),
            MatrixKind::Unknown => Point::new(
                x * self.m11 + y * self.m21 + self.offset_x,
                x * self.m12 + y * self.m22 + self.offset_y,
            ),
        }
    }

    /// Map a vector; translation does not apply.
    pub fn transform_vector(&self, vector: Vector) -> Vector {
        let Vector { x, y } = vector;
        match self.kind {
            MatrixKind::Identity | MatrixKind::Translation => vector,
            MatrixKind::Scaling | MatrixKind::ScalingAndTranslation => {
                Vector::new(x * self.m11, y * self.m22)
            }
            MatrixKind::Unknown => Vector::new(
                x * self.m11 + y * self.m21,
                x * self.m12 + y * self.m22,
            ),
        }
    }

    pub fn transform_points(&self, points: &mut [Point]) {
        if self.kind == MatrixKind::Identity {
            return;
        }
        for point in points.iter_mut() {
            *point = self.transform_point(*point);
        }
    }

    pub fn transform_vectors(&self, vectors: &mut [Vector]) {
        if matches!(self.kind, MatrixKind::Identity | MatrixKind::Translation) {
            return;
        }
        for vector in vectors.iter_mut() {
            *vector = self.transform_vector(*vector);
        }
    }

    /// Coefficient-wise comparison using [`float_util::are_close`].
    pub fn approx_eq(&self, other: &Matrix) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| float_util::are_close(*a, *b))
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl PartialEq for Matrix {
    fn eq(&self, other: &Self) -> bool {
        self.to_array() == other.to_array()
    }
}

impl From<[f64; 6]> for Matrix {
    fn from([m11, m12, m21, m22, offset_x, offset_y]: [f64; 6]) -> Self {
        Self::new(m11, m12, m21, m22, offset_x, offset_y)
    }
}

impl From<Matrix> for [f64; 6] {
    fn from(matrix: Matrix) -> Self {
        matrix.to_array()
    }
}

impl Mul for Matrix {
    type Output = Matrix;

    fn mul(self, rhs: Matrix) -> Matrix {
        Matrix::multiply(self, rhs)
    }
}

impl MulAssign for Matrix {
    fn mul_assign(&mut self, rhs: Matrix) {
        self.append(rhs);
    }
}

impl Mul<Matrix> for Point {
    type Output = Point;

    fn mul(self, rhs: Matrix) -> Point {
        rhs.transform_point(self)
    }
}

impl Mul<Matrix> for Vector {
    type Output = Vector;

    fn mul(self, rhs: Matrix) -> Vector {
        rhs.transform_vector(self)
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identity() {
            return f.write_str("Identity");
        }
        write!(
            f,
            "{},{},{},{},{},{}",
            self.m11, self.m12, self.m21, self.m22, self.offset_x, self.offset_y
        )
    }
}

impl FromStr for Matrix {
    type Err = GeometryError;

    /// Accepts `Identity` or six numbers separated by commas and/or whitespace.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed == "Identity" {
            return Ok(Self::IDENTITY);
        }

        let mut tokens = Vec::with_capacity(6);
        for piece in trimmed.split(',') {
            let before = tokens.len();
            tokens.extend(piece.split_whitespace());
            if tokens.len() == before {
                return Err(GeometryError::parse(input, "empty value between separators"));
            }
        }
        if tokens.len() != 6 {
            return Err(GeometryError::parse(
                input,
                format!("expected 6 values, found {}", tokens.len()),
            ));
        }

        let mut values = [0.0; 6];
        for (slot, token) in values.iter_mut().zip(tokens) {
            *slot = token
                .parse::<f64>()
                .map_err(|e| GeometryError::parse(input, format!("'{}': {}", token, e)))?;
        }
        Ok(Self::from(values))
    }
}
