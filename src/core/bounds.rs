use crate::core::geo::Point;
use crate::traits::GeometryOps;
use crate::{GridError, Result};
use serde::{Deserialize, Serialize};

/// Represents a rectangle in map units.
///
/// The y axis points up: `bottom <= top`. Callers constructing bounds with
/// [`Bounds::new`] must keep `left <= right` and `bottom <= top`; use
/// [`Bounds::try_new`] when the input is not trusted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl Bounds {
    /// Creates new bounds without checking the ordering invariant
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        debug_assert!(left <= right && bottom <= top, "inverted bounds");
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Creates new bounds, rejecting inverted or non-finite input
    pub fn try_new(left: f64, bottom: f64, right: f64, top: f64) -> Result<Self> {
        let finite = [left, bottom, right, top].iter().all(|v| v.is_finite());
        if !finite || left > right || bottom > top {
            return Err(GridError::InvalidBounds(format!(
                "({}, {}, {}, {})",
                left, bottom, right, top
            ))
            .into());
        }
        Ok(Self::new(left, bottom, right, top))
    }

    /// Creates bounds from a center point and size in map units
    pub fn from_center_and_size(center: Point, width: f64, height: f64) -> Self {
        let half_width = width / 2.0;
        let half_height = height / 2.0;
        Self::new(
            center.x - half_width,
            center.y - half_height,
            center.x + half_width,
            center.y + half_height,
        )
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) / 2.0,
            (self.bottom + self.top) / 2.0,
        )
    }

    /// Upper-left corner, the anchor every tile is positioned by
    pub fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }

    /// Checks if the bounds contain a point, edges included
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.left
            && point.x <= self.right
            && point.y >= self.bottom
            && point.y <= self.top
    }

    /// Checks whether `other` lies inside these bounds.
    ///
    /// With `partial` set, any overlap is enough. With `inclusive` set,
    /// shared edges count as contained/overlapping.
    pub fn contains_bounds(&self, other: &Bounds, partial: bool, inclusive: bool) -> bool {
        if partial {
            return if inclusive {
                self.intersects(other)
            } else {
                other.left < self.right
                    && other.right > self.left
                    && other.bottom < self.top
                    && other.top > self.bottom
            };
        }

        if inclusive {
            other.left >= self.left
                && other.right <= self.right
                && other.bottom >= self.bottom
                && other.top <= self.top
        } else {
            other.left > self.left
                && other.right < self.right
                && other.bottom > self.bottom
                && other.top < self.top
        }
    }

    /// Checks if the bounds intersect with another bounds, touching edges
    /// included
    pub fn intersects(&self, other: &Bounds) -> bool {
        !(other.right < self.left
            || other.left > self.right
            || other.top < self.bottom
            || other.bottom > self.top)
    }

    /// Gets the intersection of two bounds
    pub fn intersection(&self, other: &Bounds) -> Option<Bounds> {
        if !self.intersects(other) {
            return None;
        }

        Some(Bounds::new(
            self.left.max(other.left),
            self.bottom.max(other.bottom),
            self.right.min(other.right),
            self.top.min(other.top),
        ))
    }

    /// Extends the bounds to include a point
    pub fn extend(&mut self, point: &Point) {
        self.left = self.left.min(point.x);
        self.bottom = self.bottom.min(point.y);
        self.right = self.right.max(point.x);
        self.top = self.top.max(point.y);
    }

    /// Returns the union of this bounds and another bounds
    pub fn extend_with(&self, other: &Bounds) -> Bounds {
        Bounds::new(
            self.left.min(other.left),
            self.bottom.min(other.bottom),
            self.right.max(other.right),
            self.top.max(other.top),
        )
    }

    /// Returns a new bounds grown by `dx` horizontally and `dy` vertically
    /// on every edge
    pub fn expanded(&self, dx: f64, dy: f64) -> Bounds {
        Bounds::new(
            self.left - dx,
            self.bottom - dy,
            self.right + dx,
            self.top + dy,
        )
    }

    /// Returns these bounds moved by `(dx, dy)` map units
    pub fn translate(&self, dx: f64, dy: f64) -> Bounds {
        Bounds::new(
            self.left + dx,
            self.bottom + dy,
            self.right + dx,
            self.top + dy,
        )
    }

    /// Scales the bounds by `ratio` around `origin` (the center when `None`)
    pub fn scale(&self, ratio: f64, origin: Option<Point>) -> Bounds {
        let origin = origin.unwrap_or_else(|| self.center());
        let left = (self.left - origin.x) * ratio + origin.x;
        let bottom = (self.bottom - origin.y) * ratio + origin.y;
        let right = (self.right - origin.x) * ratio + origin.x;
        let top = (self.top - origin.y) * ratio + origin.y;
        Bounds::new(left.min(right), bottom.min(top), left.max(right), bottom.max(top))
    }

    /// Checks if the bounds are valid (left <= right, bottom <= top)
    pub fn is_valid(&self) -> bool {
        self.left <= self.right && self.bottom <= self.top
    }

    pub fn area(&self) -> f64 {
        if !self.is_valid() {
            0.0
        } else {
            self.width() * self.height()
        }
    }

    /// Compares two bounds with a tolerance for accumulated float error
    pub fn approx_eq(&self, other: &Bounds, epsilon: f64) -> bool {
        (self.left - other.left).abs() <= epsilon
            && (self.bottom - other.bottom).abs() <= epsilon
            && (self.right - other.right).abs() <= epsilon
            && (self.top - other.top).abs() <= epsilon
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

impl std::fmt::Display for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.left, self.bottom, self.right, self.top
        )
    }
}

/// Implement unified geometry operations for Bounds
impl GeometryOps<Point> for Bounds {
    fn contains_point(&self, point: &Point) -> bool {
        self.contains(point)
    }

    fn intersects_bounds(&self, other: &Self) -> bool {
        self.intersects(other)
    }

    fn extend_with_point(&mut self, point: &Point) {
        self.extend(point)
    }

    fn center(&self) -> Point {
        self.center()
    }

    fn is_valid(&self) -> bool {
        self.is_valid()
    }

    fn area(&self) -> f64 {
        self.area()
    }
}
