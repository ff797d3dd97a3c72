use serde::{Deserialize, Serialize};

/// A point in the table's coordinate space (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Bounding box of two points, in any order.
    pub fn from_points(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self {
            x,
            y,
            width: a.x.max(b.x) - x,
            height: a.y.max(b.y) - y,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Smallest rectangle containing both.
    #[must_use]
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Restrict to `bounds`; a rectangle entirely outside collapses onto
    /// the nearest edge.
    #[must_use]
    pub fn clamp_to(&self, bounds: &Rect) -> Rect {
        let x1 = self.x.clamp(bounds.x, bounds.right());
        let y1 = self.y.clamp(bounds.y, bounds.bottom());
        let x2 = self.right().clamp(bounds.x, bounds.right());
        let y2 = self.bottom().clamp(bounds.y, bounds.bottom());
        Rect {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Overlap test where `self` is shrunk by `tolerance` on every side.
    ///
    /// With a positive tolerance, touching borders do not count, and a
    /// degenerate `other` (a point or a line) still hits a cell it lies
    /// inside.
    pub fn hits(&self, other: &Rect, tolerance: f32) -> bool {
        let tol_x = tolerance.min(self.width / 2.0);
        let tol_y = tolerance.min(self.height / 2.0);
        self.x + tol_x <= other.right()
            && self.right() - tol_x >= other.x
            && self.y + tol_y <= other.bottom()
            && self.bottom() - tol_y >= other.y
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points_normalizes() {
        let r = Rect::from_points(Point::new(10.0, 5.0), Point::new(2.0, 8.0));
        assert_eq!(r, Rect::new(2.0, 5.0, 8.0, 3.0));
    }

    #[test]
    fn test_hits_ignores_shared_border() {
        let cell = Rect::new(0.0, 0.0, 100.0, 30.0);
        let right_neighbour = Rect::new(100.0, 0.0, 100.0, 30.0);
        assert!(!cell.hits(&right_neighbour, 3.0));
        assert!(!right_neighbour.hits(&cell, 3.0));
    }

    #[test]
    fn test_hits_point_inside() {
        let cell = Rect::new(0.0, 0.0, 100.0, 30.0);
        let point = Rect::new(50.0, 15.0, 0.0, 0.0);
        assert!(cell.hits(&point, 3.0));
    }

    #[test]
    fn test_hits_small_overlap_within_tolerance() {
        let cell = Rect::new(0.0, 0.0, 100.0, 30.0);
        let sliver = Rect::new(98.0, 0.0, 50.0, 30.0);
        assert!(!cell.hits(&sliver, 3.0));
        let overlap = Rect::new(90.0, 0.0, 50.0, 30.0);
        assert!(cell.hits(&overlap, 3.0));
    }

    #[test]
    fn test_clamp_to_bounds() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        let r = Rect::new(-20.0, 50.0, 200.0, 100.0).clamp_to(&bounds);
        assert_eq!(r, Rect::new(0.0, 50.0, 100.0, 50.0));
    }
}
