use serde::{Deserialize, Serialize};

/// Represents a point in map units or fractional pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: &Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn multiply(&self, scalar: f64) -> Point {
        Point::new(self.x * scalar, self.y * scalar)
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn floor(&self) -> Point {
        Point::new(self.x.floor(), self.y.floor())
    }

    /// Rounds half away from zero onto the integer pixel lattice
    pub fn round(&self) -> Pixel {
        Pixel::new(self.x.round() as i32, self.y.round() as i32)
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// An integer pixel offset. Tile positions live on this lattice so adjacent
/// tiles never drift apart by accumulated rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pixel {
    pub x: i32,
    pub y: i32,
}

impl Pixel {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Pixel {
        Pixel::new(self.x + dx, self.y + dy)
    }

    pub fn add(&self, other: &Pixel) -> Pixel {
        self.offset(other.x, other.y)
    }

    pub fn subtract(&self, other: &Pixel) -> Pixel {
        Pixel::new(self.x - other.x, self.y - other.y)
    }

    pub fn to_point(&self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }
}

/// Pixel dimensions of a tile or of the viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    pub fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    pub fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Scales both dimensions, rounding up so the result still covers the
    /// scaled area
    pub fn scaled(&self, ratio: f64) -> Size {
        Size::new(
            (self.w as f64 * ratio).ceil() as u32,
            (self.h as f64 * ratio).ceil() as u32,
        )
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::square(crate::core::constants::TILE_SIZE)
    }
}

/// A fractional on-screen rectangle, used when a tile is drawn stretched
/// (e.g. a back-buffer scaled across a resolution change)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub origin: Point,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    pub fn new(origin: Point, width: f64, height: f64) -> Self {
        Self {
            origin,
            width,
            height,
        }
    }

    pub fn from_pixel(position: Pixel, size: Size) -> Self {
        Self::new(position.to_point(), size.w as f64, size.h as f64)
    }
}
