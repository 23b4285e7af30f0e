//! Hit testing: point → shape lookup.
//!
//! Walks the sketch front to back, so the shape painted last wins.
//! Bounds are checked first; closed outlines then refine the answer with
//! the exact path, and lines accept points within a small slop.

use crate::path::{shape_path, to_kurbo};
use folio_core::{Bounds, EntityId, Point, Shape, ShapeKind, Sketch};
use kurbo::{Line, ParamCurveNearest, Shape as _};

/// Distance from a line within which a click still selects it.
const LINE_SLOP: f64 = 3.0;

/// Topmost top-level shape at `p`. Clicking inside a group selects the
/// group.
pub fn hit_test(sketch: &Sketch, p: Point) -> Option<EntityId> {
    sketch
        .shapes()
        .iter()
        .rev()
        .find(|shape| hits(shape, p))
        .map(|shape| shape.id)
}

/// Topmost leaf shape at `p`, looking inside groups.
pub fn hit_test_deep(sketch: &Sketch, p: Point) -> Option<EntityId> {
    sketch
        .shapes()
        .iter()
        .rev()
        .find_map(|shape| deepest(shape, p))
}

fn deepest(shape: &Shape, p: Point) -> Option<EntityId> {
    if !shape.visible {
        return None;
    }
    match shape.kind() {
        ShapeKind::Group(children) => {
            let local = p.rotated_about(shape.bounds().center(), -shape.rotation);
            children.iter().rev().find_map(|c| deepest(c, local))
        }
        _ => hits(shape, p).then_some(shape.id),
    }
}

fn hits(shape: &Shape, p: Point) -> bool {
    if !shape.visible {
        return false;
    }
    let local = p.rotated_about(shape.bounds().center(), -shape.rotation);
    match shape.kind() {
        ShapeKind::Line => {
            let b = shape.bounds();
            let line = Line::new(
                to_kurbo(Point::new(b.left, b.top)),
                to_kurbo(Point::new(b.right, b.bottom)),
            );
            line.nearest(to_kurbo(local), 1e-6).distance_sq <= LINE_SLOP * LINE_SLOP
        }
        ShapeKind::Triangle => inside_outline(shape, local),
        ShapeKind::Vector(vector) if vector.closed && vector.points.len() > 2 => {
            inside_outline(shape, local)
        }
        _ => shape.hit_test(p),
    }
}

fn inside_outline(shape: &Shape, local: Point) -> bool {
    shape.bounds().contains(local) && shape_path(shape).contains(to_kurbo(local))
}

/// Top-level shapes whose bounds intersect `rect`, back to front. Used for
/// marquee selection.
pub fn hit_test_rect(sketch: &Sketch, rect: &Bounds) -> Vec<EntityId> {
    let rect = rect.normalized();
    sketch
        .shapes()
        .iter()
        .filter(|shape| shape.visible && shape.bounds().intersects(&rect))
        .map(|shape| shape.id)
        .collect()
}
