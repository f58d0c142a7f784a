//! Conversions to and from the math crates used by renderers.
//!
//! Incoming values always go through [`Matrix::new`], so the classification
//! tag is re-derived rather than trusted.

use glam::{DAffine2, DMat2, DVec2};

use super::matrix::Matrix;
use super::point::{Point, Vector};

impl From<Matrix> for DAffine2 {
    fn from(m: Matrix) -> Self {
        DAffine2::from_mat2_translation(
            DMat2::from_cols(DVec2::new(m.m11(), m.m12()), DVec2::new(m.m21(), m.m22())),
            DVec2::new(m.offset_x(), m.offset_y()),
        )
    }
}

impl From<DAffine2> for Matrix {
    fn from(a: DAffine2) -> Self {
        Matrix::new(
            a.matrix2.x_axis.x,
            a.matrix2.x_axis.y,
            a.matrix2.y_axis.x,
            a.matrix2.y_axis.y,
            a.translation.x,
            a.translation.y,
        )
    }
}

// euclid uses the same row-vector layout, so the fields line up one to one.
impl From<Matrix> for euclid::default::Transform2D<f64> {
    fn from(m: Matrix) -> Self {
        euclid::default::Transform2D::new(
            m.m11(),
            m.m12(),
            m.m21(),
            m.m22(),
            m.offset_x(),
            m.offset_y(),
        )
    }
}

impl From<euclid::default::Transform2D<f64>> for Matrix {
    fn from(t: euclid::default::Transform2D<f64>) -> Self {
        Matrix::new(t.m11, t.m12, t.m21, t.m22, t.m31, t.m32)
    }
}

impl From<Point> for DVec2 {
    fn from(p: Point) -> Self {
        DVec2::new(p.x, p.y)
    }
}

impl From<DVec2> for Point {
    fn from(v: DVec2) -> Self {
        Point::new(v.x, v.y)
    }
}

impl From<Vector> for DVec2 {
    fn from(v: Vector) -> Self {
        DVec2::new(v.x, v.y)
    }
}

impl From<DVec2> for Vector {
    fn from(v: DVec2) -> Self {
        Vector::new(v.x, v.y)
    }
}
