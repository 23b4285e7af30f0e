//! Shape → kurbo path.
//!
//! Paths are built in canvas coordinates without rotation; the rotation is
//! returned separately by [`shape_transform`] so painting and hit testing
//! can share one path.

use folio_core::effects::PathEffect;
use folio_core::{Bounds, Point, Shape, ShapeKind};
use kurbo::{Affine, BezPath, PathEl};

/// Flattening tolerance used before jittering curves.
const FLATTEN_TOLERANCE: f64 = 0.25;

pub(crate) fn to_kurbo(p: Point) -> kurbo::Point {
    kurbo::Point::new(p.x as f64, p.y as f64)
}

pub(crate) fn to_rect(b: &Bounds) -> kurbo::Rect {
    kurbo::Rect::new(b.left as f64, b.top as f64, b.right as f64, b.bottom as f64)
}

/// Outline of a single shape. Groups have no outline of their own.
pub fn shape_path(shape: &Shape) -> BezPath {
    let b = shape.bounds();
    let mut path = BezPath::new();
    match shape.kind() {
        ShapeKind::Line => {
            path.move_to((b.left as f64, b.top as f64));
            path.line_to((b.right as f64, b.bottom as f64));
        }
        ShapeKind::Triangle => {
            let apex = (b.left + b.width() / 2.0) as f64;
            path.move_to((apex, b.top as f64));
            path.line_to((b.right as f64, b.bottom as f64));
            path.line_to((b.left as f64, b.bottom as f64));
            path.close_path();
        }
        ShapeKind::Vector(vector) => {
            let mut points = vector.points.iter().copied().map(to_kurbo);
            if let Some(first) = points.next() {
                path.move_to(first);
                for p in points {
                    path.line_to(p);
                }
                if vector.closed && vector.points.len() > 2 {
                    path.close_path();
                }
            }
        }
        ShapeKind::Group(_) => {}
    }
    path
}

/// Rotation of the shape about its bounds center.
pub fn shape_transform(shape: &Shape) -> Affine {
    if shape.rotation == 0.0 {
        return Affine::IDENTITY;
    }
    let center = to_kurbo(shape.bounds().center());
    Affine::rotate_about((shape.rotation as f64).to_radians(), center)
}

/// Run `path` through a path effect description.
pub fn apply_path_effect(path: &BezPath, effect: &PathEffect) -> BezPath {
    match effect {
        PathEffect::Dash { intervals, phase } => {
            let dashes: Vec<f64> = intervals.iter().map(|&d| d as f64).collect();
            if dashes.iter().all(|&d| d <= 0.0) {
                return path.clone();
            }
            kurbo::dash(path.iter(), *phase as f64, &dashes).collect()
        }
        PathEffect::Discrete {
            segment_length,
            deviation,
        } => jitter(path, *segment_length as f64, *deviation as f64),
        PathEffect::Compose { outer, inner } => {
            apply_path_effect(&apply_path_effect(path, inner), outer)
        }
    }
}

/// Small deterministic generator so a jittered outline is stable across
/// repaints.
struct Jitter(u32);

impl Jitter {
    /// Next value in `-1.0..=1.0`.
    fn next(&mut self) -> f64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        (self.0 as f64 / u32::MAX as f64) * 2.0 - 1.0
    }
}

/// Break the path into `segment_length` pieces and displace every interior
/// vertex perpendicular to its segment by up to `deviation`.
fn jitter(path: &BezPath, segment_length: f64, deviation: f64) -> BezPath {
    if segment_length <= 0.0 {
        return path.clone();
    }
    let mut rng = Jitter(0x9E37_79B9);
    let mut out = BezPath::new();
    let mut current = kurbo::Point::ZERO;
    let mut start = kurbo::Point::ZERO;

    kurbo::flatten(path.iter(), FLATTEN_TOLERANCE, |el| match el {
        PathEl::MoveTo(p) => {
            out.move_to(p);
            current = p;
            start = p;
        }
        PathEl::LineTo(p) => {
            push_jittered(&mut out, current, p, segment_length, deviation, &mut rng);
            current = p;
        }
        PathEl::ClosePath => {
            push_jittered(&mut out, current, start, segment_length, deviation, &mut rng);
            out.close_path();
            current = start;
        }
        // flatten only emits lines
        PathEl::QuadTo(_, p) | PathEl::CurveTo(_, _, p) => {
            out.line_to(p);
            current = p;
        }
    });
    out
}

fn push_jittered(
    out: &mut BezPath,
    from: kurbo::Point,
    to: kurbo::Point,
    segment_length: f64,
    deviation: f64,
    rng: &mut Jitter,
) {
    let delta = to - from;
    let length = delta.hypot();
    let pieces = (length / segment_length).ceil().max(1.0) as usize;
    let normal = if length > 0.0 {
        kurbo::Vec2::new(-delta.y / length, delta.x / length)
    } else {
        kurbo::Vec2::ZERO
    };
    for i in 1..pieces {
        let t = i as f64 / pieces as f64;
        out.line_to(from.lerp(to, t) + normal * (rng.next() * deviation));
    }
    out.line_to(to);
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Shape as _;
    use pretty_assertions::assert_eq;

    #[test]
    fn triangle_has_apex_at_top_center() {
        let shape = Shape::triangle(Bounds::new(0.0, 0.0, 10.0, 20.0));
        let path = shape_path(&shape);
        let first = path.elements().first().copied();
        assert_eq!(first, Some(PathEl::MoveTo(kurbo::Point::new(5.0, 0.0))));
        assert!(path.contains(kurbo::Point::new(5.0, 15.0)));
        assert!(!path.contains(kurbo::Point::new(1.0, 1.0)));
    }

    #[test]
    fn open_vector_is_not_closed() {
        let points = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)];
        let open = shape_path(&Shape::vector(points.clone(), false));
        let closed = shape_path(&Shape::vector(points, true));
        assert_eq!(open.elements().last(), Some(&PathEl::LineTo(kurbo::Point::new(10.0, 10.0))));
        assert_eq!(closed.elements().last(), Some(&PathEl::ClosePath));
    }

    #[test]
    fn rotation_pivots_on_center() {
        let mut shape = Shape::line(Bounds::new(0.0, 0.0, 10.0, 10.0));
        shape.rotation = 180.0;
        let mapped = shape_transform(&shape) * kurbo::Point::new(0.0, 0.0);
        assert!((mapped.x - 10.0).abs() < 1e-9);
        assert!((mapped.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn dash_splits_a_line_into_runs() {
        let shape = Shape::line(Bounds::new(0.0, 0.0, 32.0, 0.0));
        let dashed = apply_path_effect(
            &shape_path(&shape),
            &PathEffect::Dash {
                intervals: vec![8.0, 8.0],
                phase: 0.0,
            },
        );
        let runs = dashed
            .elements()
            .iter()
            .filter(|el| matches!(el, PathEl::MoveTo(_)))
            .count();
        assert_eq!(runs, 2);
    }

    #[test]
    fn jitter_is_stable_and_keeps_endpoints() {
        let shape = Shape::line(Bounds::new(0.0, 0.0, 100.0, 0.0));
        let effect = PathEffect::Discrete {
            segment_length: 10.0,
            deviation: 2.0,
        };
        let a = apply_path_effect(&shape_path(&shape), &effect);
        let b = apply_path_effect(&shape_path(&shape), &effect);
        assert_eq!(a, b);
        assert_eq!(a.elements().len(), 11);
        assert_eq!(a.elements().last(), Some(&PathEl::LineTo(kurbo::Point::new(100.0, 0.0))));
        let bbox = a.bounding_box();
        assert!(bbox.y0 >= -2.0 && bbox.y1 <= 2.0);
    }
}
