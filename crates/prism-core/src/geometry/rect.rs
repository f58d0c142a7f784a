//! Axis-aligned rectangles and sizes.
//!
//! Both types have a distinguished *empty* value distinct from a zero-area
//! value: `Rect::EMPTY` sits at `+∞` with `-∞` extent, so that unioning with
//! it is a no-op and intersecting with it yields empty.

use serde::{Deserialize, Serialize};

use super::matrix::{Matrix, MatrixKind};
use super::point::{Point, Vector};
use crate::error::{GeometryError, GeometryResult};

/// Width and height
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "SizeRepr")]
pub struct Size {
    width: f64,
    height: f64,
}

impl Size {
    /// The empty size; neither zero nor a valid extent.
    pub const EMPTY: Size = Size {
        width: f64::NEG_INFINITY,
        height: f64::NEG_INFINITY,
    };

    /// Create a new size; both dimensions must be non-negative
    pub fn new(width: f64, height: f64) -> GeometryResult<Self> {
        if width < 0.0 || height < 0.0 {
            return Err(GeometryError::NegativeDimension { width, height });
        }
        Ok(Self { width, height })
    }

    pub const fn zero() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width < 0.0
    }
}

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RectRepr")]
pub struct Rect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl Rect {
    /// The empty rectangle.
    pub const EMPTY: Rect = Rect {
        x: f64::INFINITY,
        y: f64::INFINITY,
        width: f64::NEG_INFINITY,
        height: f64::NEG_INFINITY,
    };

    /// Create a rectangle; width and height must be non-negative.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> GeometryResult<Self> {
        if width < 0.0 || height < 0.0 {
            return Err(GeometryError::NegativeDimension { width, height });
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Smallest rectangle containing both points.
    pub fn from_points(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self {
            x,
            y,
            width: (a.x.max(b.x) - x).max(0.0),
            height: (a.y.max(b.y) - y).max(0.0),
        }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        if size.is_empty() {
            return Self::EMPTY;
        }
        Self {
            x: origin.x,
            y: origin.y,
            width: size.width,
            height: size.height,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width < 0.0
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.y
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn right(&self) -> f64 {
        if self.is_empty() {
            f64::NEG_INFINITY
        } else {
            self.x + self.width
        }
    }

    pub fn bottom(&self) -> f64 {
        if self.is_empty() {
            f64::NEG_INFINITY
        } else {
            self.y + self.height
        }
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.left(), self.top())
    }

    pub fn top_right(&self) -> Point {
        Point::new(self.right(), self.top())
    }

    pub fn bottom_left(&self) -> Point {
        Point::new(self.left(), self.bottom())
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.right(), self.bottom())
    }

    pub fn size(&self) -> Size {
        if self.is_empty() {
            return Size::EMPTY;
        }
        Size {
            width: self.width,
            height: self.height,
        }
    }

    /// Inclusive containment test
    pub fn contains(&self, point: Point) -> bool {
        !self.is_empty()
            && point.x >= self.x
            && point.x - self.width <= self.x
            && point.y >= self.y
            && point.y - self.height <= self.y
    }

    /// Whether the rectangles share any point, edges included
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        other.left() <= self.right()
            && other.right() >= self.left()
            && other.top() <= self.bottom()
            && other.bottom() >= self.top()
    }

    /// Overlap of two rectangles, or `None` when disjoint
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        Some(Rect {
            x: left,
            y: top,
            width: (self.right().min(other.right()) - left).max(0.0),
            height: (self.bottom().min(other.bottom()) - top).max(0.0),
        })
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        Rect {
            x: left,
            y: top,
            width: (self.right().max(other.right()) - left).max(0.0),
            height: (self.bottom().max(other.bottom()) - top).max(0.0),
        }
    }

    /// Translate by `offset`; empty stays empty
    pub fn offset(&self, offset: Vector) -> Rect {
        if self.is_empty() {
            return *self;
        }
        Rect {
            x: self.x + offset.x,
            y: self.y + offset.y,
            ..*self
        }
    }

    /// Axis-aligned bounds of this rectangle after `matrix`.
    pub fn transform(&self, matrix: &Matrix) -> Rect {
        if self.is_empty() || matrix.is_identity() {
            return *self;
        }

        match matrix.kind() {
            MatrixKind::Unknown => {
                let mut corners = [
                    self.top_left(),
                    self.top_right(),
                    self.bottom_right(),
                    self.bottom_left(),
                ];
                matrix.transform_points(&mut corners);
                let mut bounds = Rect::from_points(corners[0], corners[1]);
                for corner in &corners[2..] {
                    bounds = bounds.union(&Rect::from_points(*corner, *corner));
                }
                bounds
            }
            kind => {
                let mut result = *self;
                if kind.has_scaling() {
                    result.x *= matrix.m11();
                    result.y *= matrix.m22();
                    result.width *= matrix.m11();
                    result.height *= matrix.m22();
                    // A negative scale flips the rect around its origin.
                    if result.width < 0.0 {
                        result.x += result.width;
                        result.width = -result.width;
                    }
                    if result.height < 0.0 {
                        result.y += result.height;
                        result.height = -result.height;
                    }
                }
                if kind.has_translation() {
                    result.x += matrix.offset_x();
                    result.y += matrix.offset_y();
                }
                result
            }
        }
    }
}

// Deserialized values go through the validating constructors.
#[derive(Deserialize)]
struct SizeRepr {
    width: f64,
    height: f64,
}

impl TryFrom<SizeRepr> for Size {
    type Error = GeometryError;

    fn try_from(repr: SizeRepr) -> GeometryResult<Self> {
        if repr.width == f64::NEG_INFINITY && repr.height == f64::NEG_INFINITY {
            return Ok(Size::EMPTY);
        }
        Size::new(repr.width, repr.height)
    }
}

#[derive(Deserialize)]
struct RectRepr {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl TryFrom<RectRepr> for Rect {
    type Error = GeometryError;

    fn try_from(repr: RectRepr) -> GeometryResult<Self> {
        if repr.width == f64::NEG_INFINITY && repr.height == f64::NEG_INFINITY {
            return Ok(Rect::EMPTY);
        }
        Rect::new(repr.x, repr.y, repr.width, repr.height)
    }
}

impl Default for Rect {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        }
    }
}
