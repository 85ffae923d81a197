use crate::shared::resolution::Resolution;

/// An axis-aligned face bounding box in source-capture pixel units.
///
/// Coordinates are floating point: interpolation and velocity
/// extrapolation produce sub-pixel positions, and rounding is left to
/// the rendering surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_array([x, y, width, height]: [f64; 4]) -> Self {
        Self::new(x, y, width, height)
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.x, self.y, self.width, self.height]
    }

    /// Linear blend of all four components: `t = 0` yields `self`,
    /// `t = 1` yields `other`.
    pub fn lerp(&self, other: &BoundingBox, t: f64) -> BoundingBox {
        let blend = |a: f64, b: f64| a + (b - a) * t;
        BoundingBox {
            x: blend(self.x, other.x),
            y: blend(self.y, other.y),
            width: blend(self.width, other.width),
            height: blend(self.height, other.height),
        }
    }

    pub fn translated(&self, dx: f64, dy: f64) -> BoundingBox {
        BoundingBox {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Clamp the position so the box stays fully inside a frame of the
    /// given size. A box larger than the frame pins to the origin.
    pub fn clamped_to(&self, frame: Resolution) -> BoundingBox {
        let max_x = (frame.width as f64 - self.width).max(0.0);
        let max_y = (frame.height as f64 - self.height).max(0.0);
        BoundingBox {
            x: self.x.clamp(0.0, max_x),
            y: self.y.clamp(0.0, max_y),
            ..*self
        }
    }

    /// Scale coordinates from one resolution into another.
    pub fn scaled(&self, from: Resolution, to: Resolution) -> BoundingBox {
        if from == to || from.width == 0 || from.height == 0 {
            return *self;
        }
        let sx = to.width as f64 / from.width as f64;
        let sy = to.height as f64 / from.height as f64;
        BoundingBox {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
        }
    }
}
