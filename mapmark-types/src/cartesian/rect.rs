use crate::cartesian::size::Size;
use crate::cartesian::ScreenPoint;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle. Used for frames of annotation views.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x_min: f64,
    /// Top edge.
    pub y_min: f64,
    /// Right edge.
    pub x_max: f64,
    /// Bottom edge.
    pub y_max: f64,
}

impl Rect {
    /// Creates a rectangle from its edges.
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Creates a rectangle with the top left corner at `(x, y)`.
    pub fn from_origin(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Creates a rectangle with the top left corner at `origin`.
    pub fn from_origin_size(origin: ScreenPoint, size: Size) -> Self {
        Self::from_origin(origin.x, origin.y, size.width(), size.height())
    }

    /// Top left corner.
    pub fn origin(&self) -> ScreenPoint {
        ScreenPoint::new(self.x_min, self.y_min)
    }

    /// Width and height.
    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    /// Width.
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// Height.
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Returns a copy of the rectangle moved by the given offset.
    pub fn offset_by(&self, dx: f64, dy: f64) -> Self {
        Self {
            x_min: self.x_min + dx,
            y_min: self.y_min + dy,
            x_max: self.x_max + dx,
            y_max: self.y_max + dy,
        }
    }

    /// Returns true if the point is inside the rectangle or on its border.
    pub fn contains(&self, point: &ScreenPoint) -> bool {
        point.x >= self.x_min && point.x <= self.x_max && point.y >= self.y_min && point.y <= self.y_max
    }
}
