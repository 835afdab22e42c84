use num_traits::Float;
use serde::{Deserialize, Serialize};

/// Width and height of a view or a frame, in screen points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size<Num = f64> {
    width: Num,
    height: Num,
}

impl<Num: Copy> Size<Num> {
    /// Creates a new size.
    pub fn new(width: Num, height: Num) -> Self {
        Self { width, height }
    }

    /// Width.
    pub fn width(&self) -> Num {
        self.width
    }

    /// Height.
    pub fn height(&self) -> Num {
        self.height
    }
}

impl<Num: Float> Size<Num> {
    /// Rounds both dimensions up, so that a measured view is never smaller than its content.
    pub fn ceil(&self) -> Self {
        Self {
            width: self.width.ceil(),
            height: self.height.ceil(),
        }
    }
}
