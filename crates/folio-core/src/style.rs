//! Styles: fill and frame paint descriptions composed from colors,
//! gradients, blur, shadow, jitter and dash settings.
//!
//! Each side owns its inputs and a derived [`Paint`]. Changing an input of
//! one side rebuilds only that side's paint; the other side's revision is
//! left untouched.

use crate::color::{Rgba, presets};
use crate::effects::{
    Blur, ImageFilter, PathEffect, Shadow, dash_intervals, default_dash_pattern,
};
use crate::error::{EntityKind, Result};
use crate::gradient::Shader;
use crate::id::EntityId;
use crate::links::Link;
use crate::property::{ConnectionPoint, Connections, PropertyValue};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Fill,
    Frame,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Fill, Side::Frame];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StyleKind {
    /// The portfolio's fallback style.
    Default,
    Standard,
    /// Owned by a single shape.
    Custom,
    Text,
    /// Text style owned by a single shape.
    CustomText,
}

impl StyleKind {
    /// Shared kinds live in the portfolio collection and are referenced by
    /// id; the rest are owned by one shape.
    pub fn is_shared(self) -> bool {
        matches!(self, StyleKind::Default | StyleKind::Standard | StyleKind::Text)
    }

    pub fn is_text(self) -> bool {
        matches!(self, StyleKind::Text | StyleKind::CustomText)
    }

    /// The kind a shape-owned copy of this style takes.
    pub fn owned(self) -> StyleKind {
        if self.is_text() {
            StyleKind::CustomText
        } else {
            StyleKind::Custom
        }
    }

    /// The kind this style takes when promoted into the shared collection.
    pub fn shared(self) -> StyleKind {
        match self {
            StyleKind::Custom => StyleKind::Standard,
            StyleKind::CustomText => StyleKind::Text,
            other => other,
        }
    }
}

/// Resolved paint description for one side of a style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paint {
    pub color: Rgba,
    pub shader: Option<Shader>,
    pub image_filter: Option<ImageFilter>,
    pub path_effect: Option<PathEffect>,
    pub is_stroke: bool,
    pub stroke_width: f32,
    #[serde(skip)]
    revision: u64,
}

impl Paint {
    fn new(color: Rgba, is_stroke: bool) -> Self {
        Self {
            color,
            shader: None,
            image_filter: None,
            path_effect: None,
            is_stroke,
            stroke_width: if is_stroke { 1.0 } else { 0.0 },
            revision: 0,
        }
    }

    /// Bumped whenever the paint is rebuilt.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAttributes {
    pub size: f32,
    pub scale_x: f32,
    pub skew_x: f32,
    pub font_family: String,
    pub underline: bool,
    pub strike_thru: bool,
    pub vertical: bool,
    pub linear: bool,
}

impl Default for TextAttributes {
    fn default() -> Self {
        Self {
            size: 12.0,
            scale_x: 1.0,
            skew_x: 0.0,
            font_family: "System".to_string(),
            underline: false,
            strike_thru: false,
            vertical: false,
            linear: false,
        }
    }
}

/// Inputs of one paint side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleSide {
    pub(crate) enabled: bool,
    pub(crate) color: Option<EntityId>,
    pub(crate) gradient: Option<EntityId>,
    pub(crate) has_blur: bool,
    pub(crate) blur: Blur,
    pub(crate) has_shadow: bool,
    pub(crate) shadow: Shadow,
    pub(crate) has_jitter: bool,
    pub(crate) jitter_length: f32,
    pub(crate) jitter_deviation: f32,
    paint: Paint,
}

impl StyleSide {
    fn new(color: Rgba, is_stroke: bool) -> Self {
        Self {
            enabled: true,
            color: None,
            gradient: None,
            has_blur: false,
            blur: Blur::default(),
            has_shadow: false,
            shadow: Shadow::default(),
            has_jitter: false,
            jitter_length: 10.0,
            jitter_deviation: 2.0,
            paint: Paint::new(color, is_stroke),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn color(&self) -> Option<EntityId> {
        self.color
    }

    pub fn gradient(&self) -> Option<EntityId> {
        self.gradient
    }

    pub fn has_blur(&self) -> bool {
        self.has_blur
    }

    pub fn blur(&self) -> &Blur {
        &self.blur
    }

    pub fn has_shadow(&self) -> bool {
        self.has_shadow
    }

    pub fn shadow(&self) -> &Shadow {
        &self.shadow
    }

    pub fn has_jitter(&self) -> bool {
        self.has_jitter
    }

    pub fn jitter(&self) -> (f32, f32) {
        (self.jitter_length, self.jitter_deviation)
    }

    pub fn paint(&self) -> &Paint {
        &self.paint
    }

    fn refresh_filter(&mut self) {
        let blur = self.has_blur.then(|| self.blur.filter());
        let shadow = self.has_shadow.then(|| self.shadow.filter());
        self.paint.image_filter = ImageFilter::combine(blur, shadow);
        self.paint.touch();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub id: EntityId,
    pub name: String,
    kind: StyleKind,
    fill: StyleSide,
    frame: StyleSide,
    has_frame_dash: bool,
    dash_pattern: Vec<bool>,
    text: TextAttributes,
    pub connections: Connections,
}

impl Style {
    /// Mercury fill, one-unit black frame.
    pub fn new(name: &str, kind: StyleKind) -> Self {
        Self {
            id: EntityId::generate(),
            name: name.to_string(),
            kind,
            fill: StyleSide::new(presets::MERCURY, false),
            frame: StyleSide::new(presets::BLACK, true),
            has_frame_dash: false,
            dash_pattern: default_dash_pattern(),
            text: TextAttributes::default(),
            connections: Connections::new(),
        }
    }

    /// A neutral shape-owned style.
    pub fn custom() -> Self {
        Self::new("Custom", StyleKind::Custom)
    }

    pub fn kind(&self) -> StyleKind {
        self.kind
    }

    pub(crate) fn set_kind(&mut self, kind: StyleKind) {
        self.kind = kind;
    }

    pub fn side(&self, side: Side) -> &StyleSide {
        match side {
            Side::Fill => &self.fill,
            Side::Frame => &self.frame,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut StyleSide {
        match side {
            Side::Fill => &mut self.fill,
            Side::Frame => &mut self.frame,
        }
    }

    pub fn paint(&self, side: Side) -> &Paint {
        &self.side(side).paint
    }

    pub fn text(&self) -> &TextAttributes {
        &self.text
    }

    pub fn has_frame_dash(&self) -> bool {
        self.has_frame_dash
    }

    pub fn dash_pattern(&self) -> &[bool] {
        &self.dash_pattern
    }

    // ─── Side inputs ─────────────────────────────────────────────────────

    pub fn set_enabled(&mut self, side: Side, enabled: bool) {
        let s = self.side_mut(side);
        s.enabled = enabled;
        s.paint.touch();
    }

    /// Set the literal paint color. A linked color overrides it on its next
    /// change.
    pub fn set_paint_color(&mut self, side: Side, color: Rgba) {
        let s = self.side_mut(side);
        s.paint.color = color;
        s.paint.touch();
    }

    /// Set the shader directly, bypassing any gradient link.
    pub fn set_paint_shader(&mut self, side: Side, shader: Option<Shader>) {
        let s = self.side_mut(side);
        s.paint.shader = shader;
        s.paint.touch();
    }

    pub fn set_frame_width(&mut self, width: f32) {
        self.frame.paint.stroke_width = width.max(0.0);
        self.frame.paint.touch();
    }

    pub fn set_has_blur(&mut self, side: Side, on: bool) {
        let s = self.side_mut(side);
        s.has_blur = on;
        s.refresh_filter();
    }

    pub fn set_blur(&mut self, side: Side, horizontal: f32, vertical: f32) {
        let s = self.side_mut(side);
        s.blur.set_horizontal(horizontal);
        s.blur.set_vertical(vertical);
        s.refresh_filter();
    }

    pub fn set_has_shadow(&mut self, side: Side, on: bool) {
        let s = self.side_mut(side);
        s.has_shadow = on;
        s.refresh_filter();
    }

    pub fn set_shadow_offset(&mut self, side: Side, dx: f32, dy: f32) {
        let s = self.side_mut(side);
        s.shadow.horizontal_offset = dx;
        s.shadow.vertical_offset = dy;
        s.refresh_filter();
    }

    pub fn set_shadow_blur(&mut self, side: Side, horizontal: f32, vertical: f32) {
        let s = self.side_mut(side);
        s.shadow.horizontal_blur = horizontal;
        s.shadow.vertical_blur = vertical;
        s.refresh_filter();
    }

    pub fn set_shadow_color(&mut self, side: Side, color: Rgba) {
        let s = self.side_mut(side);
        s.shadow.set_color(color);
        s.refresh_filter();
    }

    pub fn set_has_jitter(&mut self, side: Side, on: bool) {
        self.side_mut(side).has_jitter = on;
        self.refresh_effects(side);
    }

    pub fn set_jitter(&mut self, side: Side, length: f32, deviation: f32) {
        let s = self.side_mut(side);
        s.jitter_length = length;
        s.jitter_deviation = deviation;
        self.refresh_effects(side);
    }

    pub fn set_has_frame_dash(&mut self, on: bool) {
        self.has_frame_dash = on;
        self.refresh_effects(Side::Frame);
    }

    pub fn set_dash_pattern(&mut self, pattern: Vec<bool>) {
        self.dash_pattern = pattern;
        self.refresh_effects(Side::Frame);
    }

    /// Rebuild the path effect of one side. Only the frame carries a dash.
    fn refresh_effects(&mut self, side: Side) {
        let dash = (side == Side::Frame && self.has_frame_dash)
            .then(|| dash_intervals(&self.dash_pattern))
            .filter(|intervals| !intervals.is_empty())
            .map(|intervals| PathEffect::Dash {
                intervals,
                phase: 0.0,
            });
        let s = self.side_mut(side);
        let jitter = s.has_jitter.then(|| PathEffect::Discrete {
            segment_length: s.jitter_length,
            deviation: s.jitter_deviation,
        });
        s.paint.path_effect = PathEffect::combine(jitter, dash);
        s.paint.touch();
    }

    // ─── Text ────────────────────────────────────────────────────────────

    /// Edit the text attributes; both paints count as changed.
    pub fn update_text(&mut self, edit: impl FnOnce(&mut TextAttributes)) {
        edit(&mut self.text);
        self.fill.paint.touch();
        self.frame.paint.touch();
    }

    // ─── Links ───────────────────────────────────────────────────────────

    /// Store the side's color link and take over its value.
    pub(crate) fn link_color(&mut self, side: Side, link: Option<(EntityId, Rgba)>) {
        let s = self.side_mut(side);
        s.color = link.map(|(id, _)| id);
        if let Some((_, value)) = link {
            s.paint.color = value;
        }
        s.paint.touch();
    }

    /// Store the side's gradient link and take over its shader.
    pub(crate) fn link_gradient(&mut self, side: Side, link: Option<(EntityId, Shader)>) {
        let s = self.side_mut(side);
        match link {
            Some((id, shader)) => {
                s.gradient = Some(id);
                s.paint.shader = Some(shader);
            }
            None => {
                s.gradient = None;
                s.paint.shader = None;
            }
        }
        s.paint.touch();
    }

    pub(crate) fn link_shadow_color(&mut self, side: Side, link: Option<(EntityId, Rgba)>) {
        let s = self.side_mut(side);
        s.shadow.link_color(link);
        s.refresh_filter();
    }

    /// A source this style tracks recomputed. `link` names which input.
    pub(crate) fn on_color_changed(&mut self, link: Link, color: Rgba) -> bool {
        match link {
            Link::Color(side) => {
                let s = self.side_mut(side);
                s.paint.color = color;
                s.paint.touch();
                true
            }
            Link::ShadowColor(side) => {
                let s = self.side_mut(side);
                s.shadow.set_color(color);
                s.refresh_filter();
                true
            }
            _ => false,
        }
    }

    pub(crate) fn on_gradient_changed(&mut self, side: Side, shader: &Shader) {
        let s = self.side_mut(side);
        s.paint.shader = Some(shader.clone());
        s.paint.touch();
    }

    /// Clear every input tracking `color`. Paint values keep their last
    /// color. Returns the links that were cut.
    pub(crate) fn unlink_color(&mut self, color: EntityId) -> Vec<Link> {
        let mut cut = Vec::new();
        for side in Side::BOTH {
            if self.side(side).color == Some(color) {
                self.link_color(side, None);
                cut.push(Link::Color(side));
            }
            if self.side(side).shadow.linked_color == Some(color) {
                self.link_shadow_color(side, None);
                cut.push(Link::ShadowColor(side));
            }
        }
        cut
    }

    pub(crate) fn unlink_gradient(&mut self, gradient: EntityId) -> Vec<Link> {
        let mut cut = Vec::new();
        for side in Side::BOTH {
            if self.side(side).gradient == Some(gradient) {
                self.link_gradient(side, None);
                cut.push(Link::Gradient(side));
            }
        }
        cut
    }

    /// Every `(source, link)` pair this style subscribes to.
    pub fn links(&self) -> Vec<(EntityId, Link)> {
        let mut links = Vec::new();
        for side in Side::BOTH {
            let s = self.side(side);
            if let Some(id) = s.color {
                links.push((id, Link::Color(side)));
            }
            if let Some(id) = s.gradient {
                links.push((id, Link::Gradient(side)));
            }
            if let Some(id) = s.shadow.linked_color {
                links.push((id, Link::ShadowColor(side)));
            }
        }
        links
    }

    /// Rewrite every reference through `resolve`, used when relinking a
    /// clone into its new collections.
    pub(crate) fn relink(
        &mut self,
        resolve: &mut impl FnMut(EntityKind, EntityId) -> Result<EntityId>,
    ) -> Result<()> {
        for side in Side::BOTH {
            let s = self.side_mut(side);
            if let Some(id) = s.color {
                s.color = Some(resolve(EntityKind::Color, id)?);
            }
            if let Some(id) = s.gradient {
                s.gradient = Some(resolve(EntityKind::Gradient, id)?);
            }
            if let Some(id) = s.shadow.linked_color {
                s.shadow.linked_color = Some(resolve(EntityKind::Color, id)?);
            }
        }
        for connection in self.connections.iter_mut() {
            connection.property = resolve(EntityKind::Property, connection.property)?;
        }
        Ok(())
    }

    // ─── Property binding ────────────────────────────────────────────────

    /// Apply an evaluated property value to the attribute named by
    /// `point`. Returns `false` for foreign points and mistyped values.
    pub fn apply_connection(&mut self, point: ConnectionPoint, value: &PropertyValue) -> bool {
        use ConnectionPoint as P;
        use Side::{Fill, Frame};

        if let Some(on) = value.as_bool() {
            match point {
                P::HasFrame => self.set_enabled(Frame, on),
                P::HasFill => self.set_enabled(Fill, on),
                P::HasFrameBlur => self.set_has_blur(Frame, on),
                P::HasFillBlur => self.set_has_blur(Fill, on),
                P::HasFrameShadow => self.set_has_shadow(Frame, on),
                P::HasFillShadow => self.set_has_shadow(Fill, on),
                P::HasFrameJitter => self.set_has_jitter(Frame, on),
                P::HasFillJitter => self.set_has_jitter(Fill, on),
                P::HasFrameDash => self.set_has_frame_dash(on),
                P::IsVerticalText => self.update_text(|t| t.vertical = on),
                P::StrikeThruText => self.update_text(|t| t.strike_thru = on),
                P::UnderlineText => self.update_text(|t| t.underline = on),
                _ => return false,
            }
            return true;
        }

        if let Some(n) = value.as_number() {
            let blur_side = match point {
                P::FrameHorizontalBlurAmount | P::FrameVerticalBlurAmount => Frame,
                _ => Fill,
            };
            let blur = self.side(blur_side).blur();
            let (blur_h, blur_v) = (blur.horizontal(), blur.vertical());
            match point {
                P::FrameWidth => self.set_frame_width(n),
                P::FrameHorizontalBlurAmount => self.set_blur(Frame, n, blur_v),
                P::FrameVerticalBlurAmount => self.set_blur(Frame, blur_h, n),
                P::FillHorizontalBlurAmount => self.set_blur(Fill, n, blur_v),
                P::FillVerticalBlurAmount => self.set_blur(Fill, blur_h, n),
                P::FrameShadowHorizontalOffset | P::FillShadowHorizontalOffset => {
                    let side = if point == P::FrameShadowHorizontalOffset { Frame } else { Fill };
                    let dy = self.side(side).shadow.vertical_offset;
                    self.set_shadow_offset(side, n, dy);
                }
                P::FrameShadowVerticalOffset | P::FillShadowVerticalOffset => {
                    let side = if point == P::FrameShadowVerticalOffset { Frame } else { Fill };
                    let dx = self.side(side).shadow.horizontal_offset;
                    self.set_shadow_offset(side, dx, n);
                }
                P::FrameShadowHorizontalBlurAmount | P::FillShadowHorizontalBlurAmount => {
                    let side = if point == P::FrameShadowHorizontalBlurAmount { Frame } else { Fill };
                    let v = self.side(side).shadow.vertical_blur;
                    self.set_shadow_blur(side, n, v);
                }
                P::FrameShadowVerticalBlurAmount | P::FillShadowVerticalBlurAmount => {
                    let side = if point == P::FrameShadowVerticalBlurAmount { Frame } else { Fill };
                    let h = self.side(side).shadow.horizontal_blur;
                    self.set_shadow_blur(side, h, n);
                }
                P::FrameJitterLength | P::FillJitterLength => {
                    let side = if point == P::FrameJitterLength { Frame } else { Fill };
                    let deviation = self.side(side).jitter_deviation;
                    self.set_jitter(side, n, deviation);
                }
                P::FrameJitterDeviation | P::FillJitterDeviation => {
                    let side = if point == P::FrameJitterDeviation { Frame } else { Fill };
                    let length = self.side(side).jitter_length;
                    self.set_jitter(side, length, n);
                }
                P::TextScaleX => self.update_text(|t| t.scale_x = n),
                P::TextSize => self.update_text(|t| t.size = n),
                P::TextSkewX => self.update_text(|t| t.skew_x = n),
                _ => return false,
            }
            return true;
        }

        match (point, value) {
            (P::FrameColor, PropertyValue::Color(c)) => self.set_paint_color(Frame, *c),
            (P::FillColor, PropertyValue::Color(c)) => self.set_paint_color(Fill, *c),
            (P::FrameShadowColor, PropertyValue::Color(c)) => self.set_shadow_color(Frame, *c),
            (P::FillShadowColor, PropertyValue::Color(c)) => self.set_shadow_color(Fill, *c),
            (P::FrameGradient, PropertyValue::Gradient(s)) => {
                self.set_paint_shader(Frame, Some(s.clone()))
            }
            (P::FillGradient, PropertyValue::Gradient(s)) => {
                self.set_paint_shader(Fill, Some(s.clone()))
            }
            (P::FontFamilyName, PropertyValue::Text(family)) => {
                let family = family.clone();
                self.update_text(|t| t.font_family = family);
            }
            _ => return false,
        }
        true
    }

    /// User-level copy under a fresh identity. A copied Default style
    /// becomes Standard; links and connections are kept.
    pub fn duplicate(&self) -> Style {
        let mut copy = Style {
            id: EntityId::generate(),
            ..self.clone()
        };
        if copy.kind == StyleKind::Default {
            copy.kind = StyleKind::Standard;
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn frame_inputs_leave_fill_untouched() {
        let mut style = Style::new("Outline", StyleKind::Standard);
        let fill_before = style.paint(Side::Fill).revision();
        let frame_before = style.paint(Side::Frame).revision();

        style.set_has_blur(Side::Frame, true);
        style.set_has_frame_dash(true);

        assert_eq!(style.paint(Side::Fill).revision(), fill_before);
        assert!(style.paint(Side::Frame).revision() > frame_before);
        assert!(style.paint(Side::Fill).image_filter.is_none());
    }

    #[test]
    fn frame_filter_is_shadow_then_blur() {
        let mut style = Style::new("Glow", StyleKind::Standard);
        style.set_has_blur(Side::Frame, true);
        style.set_has_shadow(Side::Frame, true);

        let expected = ImageFilter::Compose {
            outer: Box::new(style.side(Side::Frame).blur().filter()),
            inner: Box::new(style.side(Side::Frame).shadow().filter()),
        };
        assert_eq!(style.paint(Side::Frame).image_filter, Some(expected));
    }

    #[test]
    fn dash_composes_over_jitter_on_frame_only() {
        let mut style = Style::new("Sketchy", StyleKind::Standard);
        style.set_has_jitter(Side::Frame, true);
        style.set_has_frame_dash(true);
        match &style.paint(Side::Frame).path_effect {
            Some(PathEffect::Compose { outer, inner }) => {
                assert!(matches!(**outer, PathEffect::Dash { .. }));
                assert!(matches!(**inner, PathEffect::Discrete { .. }));
            }
            other => panic!("unexpected frame effect {other:?}"),
        }

        style.set_has_jitter(Side::Fill, true);
        assert!(matches!(
            style.paint(Side::Fill).path_effect,
            Some(PathEffect::Discrete { .. })
        ));
    }

    #[test]
    fn duplicate_of_default_becomes_standard() {
        let style = Style::new("Default", StyleKind::Default);
        let copy = style.duplicate();
        assert_ne!(copy.id, style.id);
        assert_eq!(copy.kind(), StyleKind::Standard);
    }

    #[test]
    fn connection_dispatch() {
        let mut style = Style::new("Bound", StyleKind::Standard);
        assert!(style.apply_connection(ConnectionPoint::FrameWidth, &PropertyValue::Number(3.0)));
        assert_eq!(style.paint(Side::Frame).stroke_width, 3.0);

        assert!(style.apply_connection(
            ConnectionPoint::FillColor,
            &PropertyValue::Color(presets::TEAL)
        ));
        assert_eq!(style.paint(Side::Fill).color, presets::TEAL);

        assert!(style.apply_connection(
            ConnectionPoint::FontFamilyName,
            &PropertyValue::Text("Menlo".into())
        ));
        assert_eq!(style.text().font_family, "Menlo");

        assert!(!style.apply_connection(ConnectionPoint::Left, &PropertyValue::Number(1.0)));
        assert!(!style.apply_connection(ConnectionPoint::HasFill, &PropertyValue::Number(1.0)));
    }
}
