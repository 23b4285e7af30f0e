//! Plain geometry shared by shapes, gradients and properties.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Rotate around `center` by `degrees` (clockwise in screen space).
    pub fn rotated_about(self, center: Point, degrees: f32) -> Point {
        if degrees == 0.0 {
            return self;
        }
        let (sin, cos) = degrees.to_radians().sin_cos();
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        Point::new(center.x + dx * cos - dy * sin, center.y + dx * sin + dy * cos)
    }
}

/// Axis-aligned bounding rectangle stored as edges.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Bounds {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Min/max extent over `points`. `None` when there are no points.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Bounds::new(first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            bounds.left = bounds.left.min(p.x);
            bounds.right = bounds.right.max(p.x);
            bounds.top = bounds.top.min(p.y);
            bounds.bottom = bounds.bottom.max(p.y);
        }
        Some(bounds)
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.left + self.width() / 2.0,
            self.top + self.height() / 2.0,
        )
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }

    /// AABB overlap test.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.left < other.right
            && self.right > other.left
            && self.top < other.bottom
            && self.bottom > other.top
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Bounds {
        Bounds::new(self.left + dx, self.top + dy, self.right + dx, self.bottom + dy)
    }

    /// Keep the rectangle from inverting during a resize drag.
    pub fn ensure_positive(mut self) -> Bounds {
        if self.left > self.right {
            self.right = self.left + 1.0;
        }
        if self.top > self.bottom {
            self.bottom = self.top + 1.0;
        }
        self
    }

    /// The same rectangle with left ≤ right and top ≤ bottom, swapping
    /// edges as needed. Used for rubber-band rectangles.
    pub fn normalized(self) -> Bounds {
        Bounds::new(
            self.left.min(self.right),
            self.top.min(self.bottom),
            self.left.max(self.right),
            self.top.max(self.bottom),
        )
    }

    /// Map `p` from `self` into `target` with a uniform scale + translate
    /// pivoted on both centers.
    pub fn map_point(&self, target: &Bounds, p: Point) -> Point {
        let (sx, sy) = self.scale_to(target);
        let from = self.center();
        let to = target.center();
        Point::new(to.x + (p.x - from.x) * sx, to.y + (p.y - from.y) * sy)
    }

    /// Map a nested rectangle from `self` into `target`.
    pub fn map_bounds(&self, target: &Bounds, inner: &Bounds) -> Bounds {
        let a = self.map_point(target, Point::new(inner.left, inner.top));
        let b = self.map_point(target, Point::new(inner.right, inner.bottom));
        Bounds::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
    }

    fn scale_to(&self, target: &Bounds) -> (f32, f32) {
        let sx = if self.width() > 0.0 {
            target.width() / self.width()
        } else {
            1.0
        };
        let sy = if self.height() > 0.0 {
            target.height() / self.height()
        } else {
            1.0
        };
        (sx, sy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_from_points_is_min_max_extent() {
        let b = Bounds::from_points(&[
            Point::new(10.0, 40.0),
            Point::new(-5.0, 12.0),
            Point::new(30.0, 0.0),
        ])
        .unwrap();
        assert_eq!(b, Bounds::new(-5.0, 0.0, 30.0, 40.0));
        assert!(Bounds::from_points(&[]).is_none());
    }

    #[test]
    fn map_point_scales_about_centers() {
        let from = Bounds::new(0.0, 0.0, 100.0, 100.0);
        let to = Bounds::new(50.0, 50.0, 250.0, 150.0);
        assert_eq!(from.map_point(&to, Point::new(0.0, 0.0)), Point::new(50.0, 50.0));
        assert_eq!(
            from.map_point(&to, Point::new(100.0, 100.0)),
            Point::new(250.0, 150.0)
        );
        assert_eq!(from.map_point(&to, from.center()), to.center());
    }

    #[test]
    fn ensure_positive_fixes_inverted_edges() {
        let b = Bounds::new(10.0, 10.0, 5.0, 2.0).ensure_positive();
        assert_eq!(b, Bounds::new(10.0, 10.0, 11.0, 11.0));
    }

    #[test]
    fn normalized_swaps_edges() {
        let b = Bounds::new(30.0, 30.0, 10.0, 5.0).normalized();
        assert_eq!(b, Bounds::new(10.0, 5.0, 30.0, 30.0));
    }

    #[test]
    fn rotation_about_center() {
        let p = Point::new(10.0, 0.0).rotated_about(Point::new(0.0, 0.0), 90.0);
        assert!((p.x - 0.0).abs() < 1e-4);
        assert!((p.y - 10.0).abs() < 1e-4);
    }
}
