//! 2-D geometry primitives

pub mod float_util;
mod interop;
pub mod matrix;
pub mod point;
pub mod rect;

pub use matrix::{Matrix, MatrixKind};
pub use point::{Point, Vector};
pub use rect::{Rect, Size};
