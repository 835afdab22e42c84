//! Types in screen coordinates: positions of gestures and frames of annotation views.
//!
//! Screen coordinates have the origin in the top left corner of the map view with the `y` axis pointing down.

mod rect;
mod size;

pub use nalgebra::Vector2;
pub use rect::Rect;
pub use size::Size;

/// Point on the screen.
pub type ScreenPoint = nalgebra::Point2<f64>;
