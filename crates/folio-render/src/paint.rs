//! Sketch → Vello drawing commands.
//!
//! Walks the shapes of a sketch back to front and paints each with the
//! resolved fill and frame paints of its style. Styles are looked up
//! through the portfolio, so shared styles paint the same everywhere.

use crate::path::{apply_path_effect, shape_path, shape_transform, to_kurbo, to_rect};
use folio_core::effects::ImageFilter;
use folio_core::{Bounds, GradientKind, Paint, Portfolio, Rgba, Shader, Shape, ShapeKind, Side, Sketch, Style};
use kurbo::{Affine, BezPath, Stroke};
use peniko::{Brush, Color, Fill, Gradient};
use vello::Scene;

/// Paint every visible shape of `sketch`.
///
/// Call once per frame with a freshly-cleared `Scene`.
pub fn paint_sketch(scene: &mut Scene, portfolio: &Portfolio, sketch: &Sketch) {
    for shape in sketch.shapes() {
        paint_shape(scene, portfolio, shape, Affine::IDENTITY);
    }
}

fn paint_shape(scene: &mut Scene, portfolio: &Portfolio, shape: &Shape, parent: Affine) {
    if !shape.visible {
        return;
    }
    let transform = parent * shape_transform(shape);

    if let ShapeKind::Group(children) = shape.kind() {
        for child in children {
            paint_shape(scene, portfolio, child, transform);
        }
        return;
    }

    let Some(style) = portfolio.shape_style(shape.id) else {
        log::warn!("shape {} has no resolvable style; skipped", shape.id);
        return;
    };
    let path = shape_path(shape);
    log::trace!("paint {} {:?} with style {}", shape.id, shape.name, style.id);

    if !matches!(shape.kind(), ShapeKind::Line) {
        paint_side(scene, style, Side::Fill, &path, &shape.bounds(), transform);
    }
    paint_side(scene, style, Side::Frame, &path, &shape.bounds(), transform);
}

fn paint_side(
    scene: &mut Scene,
    style: &Style,
    side: Side,
    path: &BezPath,
    bounds: &Bounds,
    transform: Affine,
) {
    if !style.side(side).enabled() {
        return;
    }
    let paint = style.paint(side);
    let geometry = match &paint.path_effect {
        Some(effect) => apply_path_effect(path, effect),
        None => path.clone(),
    };

    if let Some(filter) = &paint.image_filter {
        paint_shadow(scene, filter, paint, &geometry, bounds, transform);
        if blur_of(filter).is_some() {
            log::trace!("layer blur is not supported by the backend; painting sharp");
        }
    }

    let brush = brush_for(paint, bounds);
    if paint.is_stroke {
        let stroke = Stroke::new(paint.stroke_width.max(0.0) as f64);
        scene.stroke(&stroke, transform, &brush, None, &geometry);
    } else {
        scene.fill(Fill::NonZero, transform, &brush, None, &geometry);
    }
}

/// Draw the drop shadow part of a filter chain under the shape.
fn paint_shadow(
    scene: &mut Scene,
    filter: &ImageFilter,
    paint: &Paint,
    geometry: &BezPath,
    bounds: &Bounds,
    transform: Affine,
) {
    let Some((dx, dy, sigma, color)) = shadow_of(filter) else {
        return;
    };
    let offset = transform * Affine::translate((dx as f64, dy as f64));
    let color = to_color(color);
    if sigma > 0.0 {
        scene.draw_blurred_rounded_rect(offset, to_rect(bounds), color, 0.0, sigma as f64);
    } else if paint.is_stroke {
        let stroke = Stroke::new(paint.stroke_width.max(0.0) as f64);
        scene.stroke(&stroke, offset, color, None, geometry);
    } else {
        scene.fill(Fill::NonZero, offset, color, None, geometry);
    }
}

fn shadow_of(filter: &ImageFilter) -> Option<(f32, f32, f32, Rgba)> {
    match filter {
        ImageFilter::DropShadow {
            dx,
            dy,
            sigma_x,
            sigma_y,
            color,
        } => Some((*dx, *dy, sigma_x.max(*sigma_y), *color)),
        ImageFilter::Blur { .. } => None,
        ImageFilter::Compose { outer, inner } => shadow_of(inner).or_else(|| shadow_of(outer)),
    }
}

fn blur_of(filter: &ImageFilter) -> Option<(f32, f32)> {
    match filter {
        ImageFilter::Blur { sigma_x, sigma_y } => Some((*sigma_x, *sigma_y)),
        ImageFilter::DropShadow { .. } => None,
        ImageFilter::Compose { outer, inner } => blur_of(outer).or_else(|| blur_of(inner)),
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

pub fn to_color(c: Rgba) -> Color {
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color::from_rgba8(channel(c.r), channel(c.g), channel(c.b), channel(c.a))
}

/// The brush for one paint: its shader conformed to `bounds`, or the flat
/// paint color.
pub fn brush_for(paint: &Paint, bounds: &Bounds) -> Brush {
    match &paint.shader {
        Some(shader) => Brush::Gradient(gradient_for(&shader.conform_to(bounds))),
        None => Brush::Solid(to_color(paint.color)),
    }
}

fn gradient_for(shader: &Shader) -> Gradient {
    let start = to_kurbo(shader.start);
    let gradient = match shader.kind {
        GradientKind::Linear => Gradient::new_linear(start, to_kurbo(shader.end)),
        GradientKind::Radial => Gradient::new_radial(start, shader.radius),
        GradientKind::Sweep => Gradient::new_sweep(start, 0.0, std::f32::consts::TAU),
    };
    let stops: Vec<(f32, Color)> = shader
        .stops
        .iter()
        .map(|stop| (stop.offset, to_color(stop.color)))
        .collect();
    gradient.with_stops(stops.as_slice())
}
